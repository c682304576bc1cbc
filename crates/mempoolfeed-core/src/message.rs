//! Wire types for the push API.
//!
//! Inbound frames are decoded into [`RawMessage`], where every key is
//! optional: a missing key (or an explicit `null`) becomes an empty
//! collection or a zero value. Unknown keys are ignored so the server can
//! grow the protocol without breaking the client.

use serde::{Deserialize, Deserializer, Serialize};

use crate::event::AddressTx;

/// Deserialize `null` as `T::default()`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ─── Inbound envelope ─────────────────────────────────────────────────────────

/// One inbound frame, decoded.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawMessage {
    #[serde(rename = "address-transactions", deserialize_with = "nullable")]
    pub address_transactions: Vec<AddressTx>,

    #[serde(rename = "address-removed-transactions", deserialize_with = "nullable")]
    pub address_removed_transactions: Vec<AddressTx>,

    /// Txid of a tracked transaction that just confirmed (empty if none).
    #[serde(rename = "txConfirmed", deserialize_with = "nullable")]
    pub tx_confirmed: String,

    #[serde(deserialize_with = "nullable")]
    pub fees: Fees,

    #[serde(rename = "projected-block-transactions", deserialize_with = "nullable")]
    pub projected_block_transactions: ProjectedBlockTransactions,

    pub block: Option<BlockEnvelope>,
}

/// Recommended fees, sat/vB.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Fees {
    #[serde(rename = "fastestFee", deserialize_with = "nullable")]
    pub fastest_fee: u64,
}

/// Updates for one tracked projected mempool block.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectedBlockTransactions {
    #[serde(deserialize_with = "nullable")]
    pub index: u32,
    #[serde(deserialize_with = "nullable")]
    pub sequence: u64,
    /// Full snapshot, sent right after `track-mempool-block`.
    #[serde(rename = "blockTransactions", deserialize_with = "nullable")]
    pub block_transactions: Vec<DeltaTuple>,
    #[serde(deserialize_with = "nullable")]
    pub delta: MempoolBlockDelta,
}

/// Incremental change to a projected mempool block.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MempoolBlockDelta {
    #[serde(deserialize_with = "nullable")]
    pub added: Vec<DeltaTuple>,
    /// Txids that left the block.
    #[serde(deserialize_with = "nullable")]
    pub removed: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub changed: Vec<DeltaTuple>,
}

/// A mined block as pushed under the `block` key.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BlockEnvelope {
    #[serde(deserialize_with = "nullable")]
    pub id: String,
    #[serde(deserialize_with = "nullable")]
    pub height: u64,
    #[serde(deserialize_with = "nullable")]
    pub extras: BlockExtras,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BlockExtras {
    #[serde(rename = "feeRange", deserialize_with = "nullable")]
    pub fee_range: Vec<f64>,
}

// ─── Delta tuples ─────────────────────────────────────────────────────────────

/// One element of a delta tuple.
///
/// Variants are probed in declaration order: unsigned integer, then double,
/// then string. The first that parses wins, so `12` is `UInt(12)` and
/// `12.0` is `Double(12.0)`. An element matching none of them (`null`, a
/// bool, a nested array or object) fails the whole frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TupleField {
    UInt(u64),
    Double(f64),
    Text(String),
}

impl TupleField {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::UInt(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric value as `f64`; integers widen.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::UInt(n) => Some(*n as f64),
            Self::Double(d) => Some(*d),
            Self::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// A compressed mempool transaction:
/// `[txid, fee, vsize, value, rate, flags, accelerated, ...]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct DeltaTuple(pub Vec<TupleField>);

impl DeltaTuple {
    /// Minimum number of elements for a tuple to be considered.
    pub const MIN_LEN: usize = 7;

    pub const TXID: usize = 0;
    pub const FEE: usize = 1;
    pub const VSIZE: usize = 2;
    pub const VALUE: usize = 3;
    pub const RATE: usize = 4;
    pub const FLAGS: usize = 5;
    pub const ACCELERATED: usize = 6;

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_valid(&self) -> bool {
        self.0.len() >= Self::MIN_LEN
    }

    pub fn get(&self, index: usize) -> Option<&TupleField> {
        self.0.get(index)
    }
}

// ─── Outbound control messages ────────────────────────────────────────────────

/// An outbound control frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    TrackAddress(String),
    TrackTx(String),
    TrackMempoolBlock(u32),
    /// `{"action":"want","data":[...]}`
    Want(Vec<String>),
}

#[derive(Serialize)]
struct WantFrame<'a> {
    action: &'static str,
    data: &'a [String],
}

impl ControlMessage {
    /// The default initial request: stats and blocks.
    pub fn want_stats_and_blocks() -> Self {
        Self::Want(vec!["stats".into(), "blocks".into()])
    }

    /// Serialize to the exact JSON text sent on the socket.
    pub fn to_frame(&self) -> String {
        match self {
            Self::TrackAddress(addr) => serde_json::json!({ "track-address": addr }).to_string(),
            Self::TrackTx(txid) => serde_json::json!({ "track-tx": txid }).to_string(),
            Self::TrackMempoolBlock(index) => {
                serde_json::json!({ "track-mempool-block": index }).to_string()
            }
            // Serializing a struct of strings cannot fail.
            Self::Want(data) => {
                serde_json::to_string(&WantFrame { action: "want", data }).unwrap_or_default()
            }
        }
    }
}
