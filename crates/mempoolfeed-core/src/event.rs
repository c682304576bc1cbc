//! Typed events derived from inbound frames.

use serde::{Deserialize, Serialize};

use crate::message::nullable;

// ─── AddressTx ────────────────────────────────────────────────────────────────

/// Confirmation status of an Esplora transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TxStatus {
    #[serde(deserialize_with = "nullable")]
    pub confirmed: bool,
    pub block_height: Option<u64>,
    pub block_hash: Option<String>,
    pub block_time: Option<u64>,
}

/// A transaction touching a tracked address, as pushed in
/// `address-transactions` / `address-removed-transactions`.
///
/// Only the fields the client needs are kept; everything else in the
/// Esplora transaction object is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressTx {
    #[serde(deserialize_with = "nullable")]
    pub txid: String,
    /// Absolute fee in satoshis.
    #[serde(deserialize_with = "nullable")]
    pub fee: u64,
    /// Weight units.
    #[serde(deserialize_with = "nullable")]
    pub weight: u64,
    /// Serialized size in bytes.
    #[serde(deserialize_with = "nullable")]
    pub size: u64,
    #[serde(deserialize_with = "nullable")]
    pub status: TxStatus,
}

impl AddressTx {
    /// Fee rate in sat/vB: `fee / (weight / 4)`.
    ///
    /// `weight / 4` is integer division. A transaction with fewer than four
    /// weight units has no virtual size and reports `0.0`.
    pub fn fee_rate(&self) -> f64 {
        let vbytes = self.weight / 4;
        if vbytes == 0 {
            return 0.0;
        }
        self.fee as f64 / vbytes as f64
    }
}

// ─── MempoolTx ────────────────────────────────────────────────────────────────

/// A projected mempool-block entry decoded from a delta tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MempoolTx {
    pub txid: String,
    pub fee: u64,
    pub vsize: u64,
    pub value: u64,
    /// Fee rate in sat/vB as reported by the server.
    pub fee_rate: f64,
    /// Transaction flags bitmask.
    pub flags: u64,
    pub accelerated: bool,
}

// ─── BlockSummary ─────────────────────────────────────────────────────────────

/// A newly mined block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSummary {
    /// Block hash.
    pub id: String,
    pub height: u64,
    /// Fee-rate range of the block's transactions (sat/vB).
    pub fee_range: Vec<f64>,
}

// ─── InboundEvent ─────────────────────────────────────────────────────────────

/// A domain event derived from one inbound frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum InboundEvent {
    /// An anyone-can-pay transaction entered a tracked mempool block.
    MempoolTx(MempoolTx),
    /// A new transaction touches a tracked address.
    NewTx(AddressTx),
    /// A tracked transaction confirmed.
    TxConfirmed(String),
    /// A transaction touching a tracked address left the mempool.
    TxRemoved(AddressTx),
    /// A new block was mined.
    Block(BlockSummary),
    /// Fastest recommended fee in sat/vB. `0` when the frame carried none.
    FeeUpdate(u64),
}

impl InboundEvent {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MempoolTx(_) => "mempool_tx",
            Self::NewTx(_) => "new_tx",
            Self::TxConfirmed(_) => "tx_confirmed",
            Self::TxRemoved(_) => "tx_removed",
            Self::Block(_) => "block",
            Self::FeeUpdate(_) => "fee_update",
        }
    }

    /// Returns `true` if the event affects a wallet's transaction history
    /// and should trigger a resync.
    pub fn touches_wallet(&self) -> bool {
        matches!(
            self,
            Self::NewTx(_) | Self::TxConfirmed(_) | Self::TxRemoved(_)
        )
    }

    /// Fee forwarding policy.
    ///
    /// A `FeeUpdate` of `0` is a heartbeat and must not overwrite a
    /// previously known fee, so it is never forwarded. Every other event is.
    pub fn is_forwardable(&self) -> bool {
        !matches!(self, Self::FeeUpdate(0))
    }
}
