//! Subscription registry.
//!
//! Tracks the addresses, transactions and projected mempool blocks the
//! caller wants pushed, and produces the control frames that re-establish
//! them after every (re)connect.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::message::ControlMessage;

/// An entity tracked on the push API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Subscription {
    Address(String),
    Transaction(String),
    /// Projected mempool block slot (0 = next block).
    MempoolBlock(u32),
}

impl Subscription {
    /// The control message that asks the server to track this entity.
    pub fn control_message(&self) -> ControlMessage {
        match self {
            Self::Address(addr) => ControlMessage::TrackAddress(addr.clone()),
            Self::Transaction(txid) => ControlMessage::TrackTx(txid.clone()),
            Self::MempoolBlock(index) => ControlMessage::TrackMempoolBlock(*index),
        }
    }
}

impl std::fmt::Display for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Address(addr) => write!(f, "address:{addr}"),
            Self::Transaction(txid) => write!(f, "tx:{txid}"),
            Self::MempoolBlock(index) => write!(f, "mempool-block:{index}"),
        }
    }
}

/// Accumulating set of subscriptions. Duplicates collapse; replay order is
/// first-insertion order.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionRegistry {
    order: Vec<Subscription>,
    members: HashSet<Subscription>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add entries to the set. Returns how many were not already tracked.
    pub fn subscribe(&mut self, entries: impl IntoIterator<Item = Subscription>) -> usize {
        let mut added = 0;
        for entry in entries {
            if self.members.insert(entry.clone()) {
                self.order.push(entry);
                added += 1;
            }
        }
        added
    }

    pub fn contains(&self, entry: &Subscription) -> bool {
        self.members.contains(entry)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Subscription> {
        self.order.iter()
    }

    /// Control frames that re-establish every tracked entity.
    pub fn replay_frames(&self) -> Vec<String> {
        self.order
            .iter()
            .map(|s| s.control_message().to_frame())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_collapse() {
        let mut reg = SubscriptionRegistry::new();
        let added = reg.subscribe([
            Subscription::Address("bc1qa".into()),
            Subscription::Address("bc1qa".into()),
            Subscription::Transaction("t1".into()),
        ]);
        assert_eq!(added, 2);
        assert_eq!(reg.subscribe([Subscription::Transaction("t1".into())]), 0);
        assert_eq!(reg.len(), 2);
        assert!(reg.contains(&Subscription::Address("bc1qa".into())));
        assert!(!reg.contains(&Subscription::MempoolBlock(0)));
    }

    #[test]
    fn replay_frames_in_insertion_order() {
        let mut reg = SubscriptionRegistry::new();
        reg.subscribe([
            Subscription::MempoolBlock(0),
            Subscription::Address("bc1qa".into()),
            Subscription::Transaction("t1".into()),
        ]);
        assert_eq!(
            reg.replay_frames(),
            vec![
                r#"{"track-mempool-block":0}"#.to_string(),
                r#"{"track-address":"bc1qa"}"#.to_string(),
                r#"{"track-tx":"t1"}"#.to_string(),
            ]
        );
    }

    #[test]
    fn empty_registry_replays_nothing() {
        let reg = SubscriptionRegistry::new();
        assert!(reg.is_empty());
        assert!(reg.replay_frames().is_empty());
    }
}
