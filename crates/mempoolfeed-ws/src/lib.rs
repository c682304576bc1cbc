//! mempoolfeed-ws — reconnecting WebSocket client for the mempool push API.
//!
//! # Features
//! - Single-owner connection task; callers talk to it through commands
//! - Auto-reconnect with bounded exponential backoff
//! - Subscription replay after every reconnect
//! - Typed event stream and multi-observer connection status

pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod stream;
pub mod transport;

mod connection;

pub use client::MempoolClient;
pub use config::ClientConfig;
pub use error::{ClientError, ConfigError};
pub use metrics::ClientMetrics;
pub use stream::EventStream;
pub use transport::{Connector, FrameSocket, TungsteniteConnector};

pub use mempoolfeed_core::{ConnectionState, InboundEvent, StatusReceiver, Subscription};
