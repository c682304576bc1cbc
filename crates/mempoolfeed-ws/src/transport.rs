//! Socket abstraction used by the connection task.
//!
//! [`TungsteniteConnector`] is the production implementation; tests plug in
//! scripted connectors through the same traits.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use mempoolfeed_core::TransportError;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// An open text-frame socket.
#[async_trait]
pub trait FrameSocket: Send {
    /// Send one text frame.
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Wait for the next text frame.
    ///
    /// Must be cancel-safe: dropping the future before it completes loses
    /// no frame. Returns [`TransportError::Closed`] when the peer hangs up.
    async fn next_text(&mut self) -> Result<String, TransportError>;

    /// Close the socket. Errors are ignored.
    async fn close(&mut self);
}

/// Opens sockets to a URL.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, url: &str) -> Result<Box<dyn FrameSocket>, TransportError>;
}

/// `tokio-tungstenite` connector (`ws://` and `wss://`).
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn FrameSocket>, TransportError> {
        let (stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| TransportError::Connect {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Box::new(TungsteniteSocket { stream }))
    }
}

struct TungsteniteSocket {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl FrameSocket for TungsteniteSocket {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn next_text(&mut self) -> Result<String, TransportError> {
        loop {
            match self.stream.next().await {
                None => return Err(TransportError::Closed),
                Some(Err(e)) => return Err(TransportError::Receive(e.to_string())),
                Some(Ok(Message::Text(text))) => return Ok(text),
                Some(Ok(Message::Close(_))) => return Err(TransportError::Closed),
                Some(Ok(Message::Ping(data))) => {
                    // Respond to server pings to keep the connection alive
                    self.stream
                        .send(Message::Pong(data))
                        .await
                        .map_err(|e| TransportError::Send(e.to_string()))?;
                }
                Some(Ok(_)) => {} // binary / pong / raw frame
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!(error = %e, "error closing WebSocket");
        }
    }
}
