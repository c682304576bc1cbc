//! Client configuration.

use std::path::Path;
use std::time::Duration;

use mempoolfeed_core::{ControlMessage, ReconnectConfig};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for the push-API client.
///
/// Every field has a default, so `{}` is a valid config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backoff before the first reconnect attempt; doubles per attempt.
    #[serde(default = "default_reconnect_base_ms")]
    pub reconnect_base_ms: u64,
    /// Consecutive failed attempts after which automatic reconnects stop.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    /// Deadline for opening the socket.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Data feeds requested with the initial `want` message.
    #[serde(default = "default_want")]
    pub want: Vec<String>,
}

fn default_reconnect_base_ms() -> u64 { 2_000 }
fn default_max_reconnect_attempts() -> u32 { 5 }
fn default_connect_timeout_ms() -> u64 { 10_000 }
fn default_want() -> Vec<String> { vec!["stats".into(), "blocks".into()] }

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            reconnect_base_ms: default_reconnect_base_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            connect_timeout_ms: default_connect_timeout_ms(),
            want: default_want(),
        }
    }
}

impl ClientConfig {
    /// Load a config from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn reconnect(&self) -> ReconnectConfig {
        ReconnectConfig {
            base_delay: Duration::from_millis(self.reconnect_base_ms),
            max_attempts: self.max_reconnect_attempts,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// The initial control message sent on every freshly opened socket.
    pub fn want_message(&self) -> ControlMessage {
        ControlMessage::Want(self.want.clone())
    }
}
