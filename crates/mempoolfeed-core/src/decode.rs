//! Protocol decoder: text frame → [`RawMessage`] → [`InboundEvent`]s.
//!
//! Derivation rules, in emission order:
//! 1. each `address-transactions` entry → `NewTx`
//! 2. each `address-removed-transactions` entry → `TxRemoved`
//! 3. non-empty `txConfirmed` → `TxConfirmed`
//! 4. always one `FeeUpdate` carrying `fees.fastestFee` (0 when absent)
//! 5. anyone-can-pay tuples from `projected-block-transactions`
//!    (`blockTransactions` snapshot, then `delta.added`) → `MempoolTx`
//! 6. `block` → `Block`
//!
//! Tuples shorter than [`DeltaTuple::MIN_LEN`] are skipped. A frame that is
//! not valid JSON, or that holds a tuple element which is neither an
//! unsigned integer, a double nor a string, is rejected as a whole.

use crate::error::DecodeError;
use crate::event::{BlockSummary, InboundEvent, MempoolTx};
use crate::message::{DeltaTuple, RawMessage};
use tracing::debug;

/// `sighash_acp` bit of the explorer's transaction flags bitmask.
pub const ANYONE_CAN_PAY_FLAG: u64 = 1 << 44;

/// Returns `true` if `flags` marks an anyone-can-pay signature.
pub fn is_anyone_can_pay(flags: u64) -> bool {
    flags & ANYONE_CAN_PAY_FLAG != 0
}

/// The decoded envelope plus every event derived from it.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub message: RawMessage,
    pub events: Vec<InboundEvent>,
}

impl DecodedFrame {
    /// Events that pass the fee forwarding policy
    /// (see [`InboundEvent::is_forwardable`]).
    pub fn forwardable(self) -> impl Iterator<Item = InboundEvent> {
        self.events.into_iter().filter(InboundEvent::is_forwardable)
    }
}

/// Decode one inbound text frame.
pub fn decode_frame(text: &str) -> Result<DecodedFrame, DecodeError> {
    let message: RawMessage = serde_json::from_str(text)?;
    let events = derive_events(&message);
    Ok(DecodedFrame { message, events })
}

/// Derive domain events from a decoded envelope.
pub fn derive_events(message: &RawMessage) -> Vec<InboundEvent> {
    let mut events = Vec::new();

    events.extend(
        message
            .address_transactions
            .iter()
            .cloned()
            .map(InboundEvent::NewTx),
    );
    events.extend(
        message
            .address_removed_transactions
            .iter()
            .cloned()
            .map(InboundEvent::TxRemoved),
    );

    if !message.tx_confirmed.is_empty() {
        events.push(InboundEvent::TxConfirmed(message.tx_confirmed.clone()));
    }

    events.push(InboundEvent::FeeUpdate(message.fees.fastest_fee));

    let projected = &message.projected_block_transactions;
    events.extend(
        projected
            .block_transactions
            .iter()
            .chain(projected.delta.added.iter())
            .filter_map(mempool_tx_from_tuple)
            .filter(|tx| is_anyone_can_pay(tx.flags))
            .map(InboundEvent::MempoolTx),
    );

    if let Some(block) = &message.block {
        events.push(InboundEvent::Block(BlockSummary {
            id: block.id.clone(),
            height: block.height,
            fee_range: block.extras.fee_range.clone(),
        }));
    }

    events
}

/// Convert a delta tuple into a `MempoolTx` candidate.
///
/// Returns `None` if the tuple is too short, the txid is not a string, or
/// the fee rate is not numeric.
pub fn mempool_tx_from_tuple(tuple: &DeltaTuple) -> Option<MempoolTx> {
    if !tuple.is_valid() {
        debug!(len = tuple.len(), "skipping short mempool delta tuple");
        return None;
    }
    let Some(txid) = tuple.get(DeltaTuple::TXID).and_then(|f| f.as_str()) else {
        debug!("skipping mempool delta tuple without a string txid");
        return None;
    };
    let Some(fee_rate) = tuple.get(DeltaTuple::RATE).and_then(|f| f.as_f64()) else {
        debug!(txid, "skipping mempool delta tuple with a non-numeric fee rate");
        return None;
    };
    let txid = txid.to_string();
    let uint_at = |i: usize| tuple.get(i).and_then(|f| f.as_u64()).unwrap_or(0);

    Some(MempoolTx {
        txid,
        fee: uint_at(DeltaTuple::FEE),
        vsize: uint_at(DeltaTuple::VSIZE),
        value: uint_at(DeltaTuple::VALUE),
        fee_rate,
        flags: uint_at(DeltaTuple::FLAGS),
        accelerated: tuple
            .get(DeltaTuple::ACCELERATED)
            .and_then(|f| f.as_f64())
            .is_some_and(|v| v != 0.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::TupleField;

    fn tuple(json: &str) -> DeltaTuple {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn fee_only_frame() {
        let frame = decode_frame(r#"{"fees":{"fastestFee":5}}"#).unwrap();
        assert_eq!(frame.events, vec![InboundEvent::FeeUpdate(5)]);
        let forwarded: Vec<_> = frame.forwardable().collect();
        assert_eq!(forwarded, vec![InboundEvent::FeeUpdate(5)]);
    }

    #[test]
    fn address_transaction_frame() {
        let frame = decode_frame(r#"{"address-transactions":[{"txid":"aaa111"}]}"#).unwrap();
        let forwarded: Vec<_> = frame.forwardable().collect();
        assert_eq!(forwarded.len(), 1);
        match &forwarded[0] {
            InboundEvent::NewTx(tx) => assert_eq!(tx.txid, "aaa111"),
            other => panic!("expected NewTx, got {other:?}"),
        }
    }

    #[test]
    fn missing_keys_yield_zero_fee_heartbeat() {
        let frame = decode_frame("{}").unwrap();
        assert_eq!(frame.events, vec![InboundEvent::FeeUpdate(0)]);
        assert_eq!(frame.forwardable().count(), 0);
    }

    #[test]
    fn removed_and_confirmed() {
        let frame = decode_frame(
            r#"{"address-removed-transactions":[{"txid":"r1"},{"txid":"r2"}],
                "txConfirmed":"c1"}"#,
        )
        .unwrap();
        let kinds: Vec<_> = frame.events.iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec!["tx_removed", "tx_removed", "tx_confirmed", "fee_update"]
        );
    }

    #[test]
    fn empty_tx_confirmed_ignored() {
        let frame = decode_frame(r#"{"txConfirmed":""}"#).unwrap();
        assert_eq!(frame.events, vec![InboundEvent::FeeUpdate(0)]);
    }

    #[test]
    fn block_event() {
        let frame = decode_frame(
            r#"{"block":{"id":"0000abc","height":840000,"extras":{"feeRange":[1.0,2.5,300]}}}"#,
        )
        .unwrap();
        assert_eq!(
            frame.events.last(),
            Some(&InboundEvent::Block(BlockSummary {
                id: "0000abc".into(),
                height: 840000,
                fee_range: vec![1.0, 2.5, 300.0],
            }))
        );
    }

    #[test]
    fn tuple_candidate_fee_rate() {
        let tx = mempool_tx_from_tuple(&tuple(r#"["txid1", 0, 0, 0, 12.5, 1, 0]"#)).unwrap();
        assert_eq!(tx.txid, "txid1");
        assert_eq!(tx.fee_rate, 12.5);
        assert_eq!(tx.flags, 1);
        assert!(!is_anyone_can_pay(tx.flags));
    }

    #[test]
    fn uint_and_double_rates_agree() {
        let a = mempool_tx_from_tuple(&tuple(r#"["t", 0, 0, 0, 12, 0, 0]"#)).unwrap();
        let b = mempool_tx_from_tuple(&tuple(r#"["t", 0, 0, 0, 12.0, 0, 0]"#)).unwrap();
        assert_eq!(a.fee_rate, 12.0);
        assert_eq!(b.fee_rate, 12.0);
    }

    #[test]
    fn short_tuple_is_skipped() {
        let short = DeltaTuple(vec![
            TupleField::Text("t".into()),
            TupleField::UInt(1),
            TupleField::UInt(1),
            TupleField::UInt(1),
            TupleField::Double(3.0),
            TupleField::UInt(ANYONE_CAN_PAY_FLAG),
        ]);
        assert!(mempool_tx_from_tuple(&short).is_none());
    }

    #[test]
    fn tuple_with_mistyped_txid_or_rate_is_skipped() {
        assert!(mempool_tx_from_tuple(&tuple(r#"[7, 0, 0, 0, 12.5, 0, 0]"#)).is_none());
        assert!(mempool_tx_from_tuple(&tuple(r#"["t", 0, 0, 0, "fast", 0, 0]"#)).is_none());
    }

    #[test]
    fn only_anyone_can_pay_tuples_emitted() {
        let acp = ANYONE_CAN_PAY_FLAG | 1;
        let text = format!(
            r#"{{"projected-block-transactions":{{"index":0,"sequence":7,"delta":{{
                "added":[["acp", 500, 200, 10000, 2.5, {acp}, 0],
                         ["plain", 500, 200, 10000, 2.5, 1, 0],
                         ["short", 1, 1, 1, 1.0, {acp}]],
                "removed":["gone"],"changed":[]}}}}}}"#
        );
        let frame = decode_frame(&text).unwrap();
        let mempool: Vec<_> = frame
            .events
            .iter()
            .filter_map(|e| match e {
                InboundEvent::MempoolTx(tx) => Some(tx.txid.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(mempool, vec!["acp"]);
        assert_eq!(frame.message.projected_block_transactions.sequence, 7);
        assert_eq!(frame.message.projected_block_transactions.delta.removed, vec!["gone"]);
    }

    #[test]
    fn snapshot_tuples_emitted_before_delta() {
        let acp = ANYONE_CAN_PAY_FLAG;
        let text = format!(
            r#"{{"projected-block-transactions":{{"index":1,
                "blockTransactions":[["snap", 1, 1, 1, 4, {acp}, 1]],
                "delta":{{"added":[["added", 1, 1, 1, 4, {acp}, 0]]}}}}}}"#
        );
        let frame = decode_frame(&text).unwrap();
        let mempool: Vec<_> = frame
            .events
            .iter()
            .filter_map(|e| match e {
                InboundEvent::MempoolTx(tx) => Some((tx.txid.as_str(), tx.accelerated)),
                _ => None,
            })
            .collect();
        assert_eq!(mempool, vec![("snap", true), ("added", false)]);
    }

    #[test]
    fn bad_tuple_element_drops_frame() {
        let text = r#"{"fees":{"fastestFee":9},
            "projected-block-transactions":{"delta":{"added":[["t", null, 0, 0, 1, 0, 0]]}}}"#;
        assert!(decode_frame(text).is_err());
    }

    #[test]
    fn invalid_json_is_error() {
        assert!(decode_frame("not json").is_err());
        assert!(decode_frame(r#"{"fees":"#).is_err());
    }
}
