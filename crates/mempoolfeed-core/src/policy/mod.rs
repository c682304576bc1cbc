//! Reconnection policy.
//!
//! ```text
//! failure → delay(attempt) → sleep (cancellable) → attempt += 1 → connect
//! ```

pub mod reconnect;

pub use reconnect::{ReconnectConfig, ReconnectPolicy};
