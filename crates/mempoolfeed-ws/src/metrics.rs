//! Counters maintained by the connection task.

use serde::Serialize;

/// Metrics snapshot for one client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClientMetrics {
    pub frames_received: u64,
    pub decode_errors: u64,
    pub events_forwarded: u64,
    pub reconnect_attempts: u64,
}
