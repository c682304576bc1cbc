//! Client-level error types.

use thiserror::Error;

/// Errors returned by [`MempoolClient`](crate::MempoolClient) calls.
///
/// Transport and decode failures never surface here: they are recovered
/// inside the connection task and only show up as status changes.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The connection task has stopped (the runtime is shutting down).
    #[error("connection task has stopped")]
    TaskClosed,

    /// `connect()` was called while a session is already running.
    #[error("a session is already active")]
    AlreadyActive,
}

/// Errors loading a [`ClientConfig`](crate::ClientConfig) from disk.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}
