//! mempoolfeed-core — foundation types for the mempool push-API client.
//!
//! # Overview
//!
//! The core crate is transport-agnostic. It defines:
//!
//! - [`RawMessage`] — the missing-field-tolerant inbound envelope
//! - [`ControlMessage`] — the outbound tracking / want frames
//! - [`InboundEvent`] — typed events derived from each frame
//! - [`decode`] module — frame → envelope → events
//! - [`SubscriptionRegistry`] — tracked entities replayed on reconnect
//! - [`policy`] module — bounded exponential reconnect backoff
//! - [`StatusPublisher`] — connection-state fan-out to observers

pub mod decode;
pub mod error;
pub mod event;
pub mod message;
pub mod policy;
pub mod status;
pub mod subscription;

pub use decode::{decode_frame, DecodedFrame};
pub use error::{DecodeError, TransportError};
pub use event::{AddressTx, BlockSummary, InboundEvent, MempoolTx};
pub use message::{ControlMessage, RawMessage};
pub use policy::{ReconnectConfig, ReconnectPolicy};
pub use status::{ConnectionState, StatusPublisher, StatusReceiver};
pub use subscription::{Subscription, SubscriptionRegistry};
