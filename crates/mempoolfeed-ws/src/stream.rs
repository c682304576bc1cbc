//! The ordered event stream handed to the application.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use mempoolfeed_core::InboundEvent;
use tokio::sync::mpsc;

/// Ordered, single-consumer stream of decoded events.
///
/// Minted by [`MempoolClient::connect`](crate::MempoolClient::connect). The
/// same stream survives transient reconnects and reconnect exhaustion; it
/// ends (`None`) on `disconnect()`, when the client is dropped, or when a
/// later `connect()` mints a replacement. Unbounded: a slow consumer makes
/// the queue grow.
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<InboundEvent>,
}

impl EventStream {
    pub(crate) fn channel() -> (mpsc::UnboundedSender<InboundEvent>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }

    /// Wait for the next event. Returns `None` once the stream has ended.
    pub async fn recv(&mut self) -> Option<InboundEvent> {
        self.rx.recv().await
    }

    /// Take the next queued event without waiting.
    pub fn try_recv(&mut self) -> Option<InboundEvent> {
        self.rx.try_recv().ok()
    }
}

impl Stream for EventStream {
    type Item = InboundEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
