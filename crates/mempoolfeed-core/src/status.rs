//! Connection state and its fan-out to observers.
//!
//! State transitions:
//! - `Disconnected` → `Connecting`: `connect()` or a scheduled retry
//! - `Connecting` → `Connected`:    first frame received
//! - any → `Disconnected`:          socket failure or `disconnect()`

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Connection state of the push-API client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

struct PublisherInner {
    current: ConnectionState,
    observers: Vec<mpsc::UnboundedSender<ConnectionState>>,
}

/// Publishes every state transition to any number of observers.
///
/// Each observer gets its own unbounded queue, so every observer sees the
/// same total order of transitions and none is skipped. Observers whose
/// receiver was dropped are pruned on the next publish.
#[derive(Clone)]
pub struct StatusPublisher {
    inner: Arc<Mutex<PublisherInner>>,
}

impl StatusPublisher {
    /// Create a publisher in the `Disconnected` state.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(PublisherInner {
                current: ConnectionState::Disconnected,
                observers: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PublisherInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a new observer. It receives transitions published from now on.
    pub fn subscribe(&self) -> StatusReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().observers.push(tx);
        StatusReceiver { rx }
    }

    /// Record `state` and deliver it to every live observer.
    pub fn publish(&self, state: ConnectionState) {
        let mut inner = self.lock();
        inner.current = state;
        inner.observers.retain(|tx| tx.send(state).is_ok());
    }

    /// The most recently published state.
    pub fn current(&self) -> ConnectionState {
        self.lock().current
    }

    /// Number of live observers.
    pub fn observer_count(&self) -> usize {
        let mut inner = self.lock();
        inner.observers.retain(|tx| !tx.is_closed());
        inner.observers.len()
    }
}

impl Default for StatusPublisher {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving end of one status observer.
pub struct StatusReceiver {
    rx: mpsc::UnboundedReceiver<ConnectionState>,
}

impl StatusReceiver {
    /// Wait for the next transition. Returns `None` once the publisher is gone.
    pub async fn recv(&mut self) -> Option<ConnectionState> {
        self.rx.recv().await
    }

    /// Take the next queued transition without waiting.
    pub fn try_recv(&mut self) -> Option<ConnectionState> {
        self.rx.try_recv().ok()
    }

    /// Drain every queued transition.
    pub fn drain(&mut self) -> Vec<ConnectionState> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::ConnectionState::*;

    #[test]
    fn observers_see_same_order() {
        let publisher = StatusPublisher::new();
        let mut ui = publisher.subscribe();
        let mut gate = publisher.subscribe();

        publisher.publish(Connecting);
        publisher.publish(Connected);
        publisher.publish(Disconnected);

        assert_eq!(ui.drain(), vec![Connecting, Connected, Disconnected]);
        assert_eq!(gate.drain(), vec![Connecting, Connected, Disconnected]);
        assert_eq!(publisher.current(), Disconnected);
    }

    #[test]
    fn late_observer_only_sees_later_transitions() {
        let publisher = StatusPublisher::new();
        publisher.publish(Connecting);
        let mut late = publisher.subscribe();
        publisher.publish(Connected);
        assert_eq!(late.drain(), vec![Connected]);
    }

    #[test]
    fn dropped_observers_are_pruned() {
        let publisher = StatusPublisher::new();
        let kept = publisher.subscribe();
        drop(publisher.subscribe());
        publisher.publish(Connecting);
        assert_eq!(publisher.observer_count(), 1);
        drop(kept);
        assert_eq!(publisher.observer_count(), 0);
    }

    #[test]
    fn display_is_lowercase() {
        assert_eq!(Connecting.to_string(), "connecting");
        assert_eq!(
            serde_json::to_string(&Connected).unwrap(),
            r#""connected""#
        );
    }

    #[tokio::test]
    async fn recv_ends_when_publisher_dropped() {
        let publisher = StatusPublisher::new();
        let mut rx = publisher.subscribe();
        publisher.publish(Connecting);
        drop(publisher);
        assert_eq!(rx.recv().await, Some(Connecting));
        assert_eq!(rx.recv().await, None);
    }
}
