//! Push-API client handle.

use std::sync::{Arc, Mutex};

use mempoolfeed_core::{ConnectionState, StatusPublisher, StatusReceiver, Subscription};
use tokio::sync::{mpsc, oneshot};

use crate::config::ClientConfig;
use crate::connection::{Command, Connection};
use crate::error::ClientError;
use crate::metrics::ClientMetrics;
use crate::stream::EventStream;
use crate::transport::{Connector, TungsteniteConnector};

/// Real-time mempool event client.
///
/// Owns a background task that holds the WebSocket and handles reconnect,
/// subscription replay and decoding. Every method only sends a command to
/// that task, so the handle is cheap to share behind an `Arc`.
///
/// Subscriptions live as long as the client: they survive reconnects and
/// `disconnect()`/`connect()` cycles. Build a new client to start over
/// (e.g. when the server URL changes).
///
/// Must be created inside a Tokio runtime.
pub struct MempoolClient {
    url: String,
    cmd_tx: mpsc::UnboundedSender<Command>,
    status: StatusPublisher,
    metrics: Arc<Mutex<ClientMetrics>>,
}

impl MempoolClient {
    /// Create a client for `url` using the `tokio-tungstenite` transport.
    /// Nothing is opened until [`connect`](Self::connect).
    pub fn new(url: impl Into<String>, config: ClientConfig) -> Self {
        Self::with_connector(url, config, TungsteniteConnector)
    }

    /// Create a client with a custom socket connector.
    pub fn with_connector(
        url: impl Into<String>,
        config: ClientConfig,
        connector: impl Connector,
    ) -> Self {
        let url = url.into();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<Command>();
        let status = StatusPublisher::new();
        let metrics = Arc::new(Mutex::new(ClientMetrics::default()));

        let connection = Connection::new(
            url.clone(),
            config,
            Arc::new(connector),
            status.clone(),
            Arc::clone(&metrics),
        );
        tokio::spawn(connection.run(cmd_rx));

        Self {
            url,
            cmd_tx,
            status,
            metrics,
        }
    }

    /// Start a session and return its event stream.
    ///
    /// The session opens the socket, requests the configured feeds, replays
    /// every subscription and then reconnects on failure until the retry
    /// budget runs out. Returns [`ClientError::AlreadyActive`] if a session
    /// is already running; the running session is unaffected.
    pub async fn connect(&self) -> Result<EventStream, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Connect { reply })
            .map_err(|_| ClientError::TaskClosed)?;
        rx.await.map_err(|_| ClientError::TaskClosed)?
    }

    /// End the current session: close the socket, cancel any pending
    /// reconnect and end the event stream. Resolves once the connection
    /// task has stopped the session.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Disconnect { reply })
            .map_err(|_| ClientError::TaskClosed)?;
        rx.await.map_err(|_| ClientError::TaskClosed)
    }

    /// Track more entities. Sent immediately if a socket is open, and
    /// replayed after every reconnect.
    pub fn subscribe(
        &self,
        entries: impl IntoIterator<Item = Subscription>,
    ) -> Result<(), ClientError> {
        self.cmd_tx
            .send(Command::Subscribe(entries.into_iter().collect()))
            .map_err(|_| ClientError::TaskClosed)
    }

    pub fn track_address(&self, address: impl Into<String>) -> Result<(), ClientError> {
        self.subscribe([Subscription::Address(address.into())])
    }

    pub fn track_tx(&self, txid: impl Into<String>) -> Result<(), ClientError> {
        self.subscribe([Subscription::Transaction(txid.into())])
    }

    pub fn track_mempool_block(&self, index: u32) -> Result<(), ClientError> {
        self.subscribe([Subscription::MempoolBlock(index)])
    }

    /// Observe connection-state transitions from now on.
    pub fn subscribe_status(&self) -> StatusReceiver {
        self.status.subscribe()
    }

    /// The last published connection state.
    pub fn status(&self) -> ConnectionState {
        self.status.current()
    }

    /// Snapshot of the connection task's counters.
    pub fn metrics(&self) -> ClientMetrics {
        self.metrics
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}
