//! Transport- and decode-level error types.

use thiserror::Error;

/// Errors raised by the socket layer (open, send, receive).
///
/// Every variant is recovered by the connection manager: the status moves
/// to `disconnected` and the reconnect policy is consulted.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Opening the WebSocket failed (DNS, TCP, TLS or handshake).
    #[error("connect to {url} failed: {reason}")]
    Connect { url: String, reason: String },

    /// Writing a control frame failed.
    #[error("WebSocket send failed: {0}")]
    Send(String),

    /// Reading the next frame failed.
    #[error("WebSocket receive failed: {0}")]
    Receive(String),

    /// The peer closed the connection (close frame or end of stream).
    #[error("WebSocket closed by peer")]
    Closed,

    /// Opening the socket took longer than the configured deadline.
    #[error("connect timed out after {ms}ms")]
    Timeout { ms: u64 },
}

/// Errors raised while decoding one inbound frame.
///
/// A decode error drops the whole frame; it never changes connection state.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The frame is not valid JSON or does not match the envelope shape.
    ///
    /// This also covers delta-tuple elements that are neither an unsigned
    /// integer, a double nor a string.
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),
}
