//! Transactions: the transfer of value between outputs.

pub mod sighash;

use btcproto_derive::{BtcDeserialize, BtcSerialize};
use serde::{Deserialize, Serialize};

use crate::cached::Cached;
use crate::compactint::CompactInt;
use crate::hash::{hash_of, Hash256};
use crate::serialization::{BitcoinSerialize, SerializationError};
use crate::transparent::{TransactionInput, TransactionOutput};

/// A Bitcoin transaction.
///
/// This implementation does not support segregated witness: inputs carry
/// only a legacy `unlock_script`, never a witness stack, matching the wire
/// format described in spec.md §4.4.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BtcSerialize, BtcDeserialize)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: u32,

    #[serde(skip)]
    hash: Cached<Hash256>,
}

impl Transaction {
    pub fn new(
        version: i32,
        inputs: Vec<TransactionInput>,
        outputs: Vec<TransactionOutput>,
        lock_time: u32,
    ) -> Transaction {
        Transaction {
            version,
            inputs,
            outputs,
            lock_time,
            hash: Cached::new(),
        }
    }

    /// The transaction's hash: the double-SHA-256 of its canonical
    /// serialization, byte-reversed (spec.md §4.4).
    pub fn hash(&self) -> Hash256 {
        if let Some(hash) = self.hash.value() {
            return hash;
        }
        hash_of(self)
    }

    /// The normalized transaction ID: a hash over outpoints and outputs
    /// only, stable under input-script malleability (spec.md §9). Useful
    /// for matching a transaction across re-signings that don't change
    /// what it spends or pays.
    pub fn normalized_id(&self) -> Hash256 {
        let mut writer = crate::serialization::sha256d::Writer::default();
        CompactInt::from(self.inputs.len())
            .bitcoin_serialize(&mut writer)
            .expect("hashing writer is infallible");
        for input in &self.inputs {
            input
                .previous_output
                .bitcoin_serialize(&mut writer)
                .expect("hashing writer is infallible");
        }
        self.outputs
            .bitcoin_serialize(&mut writer)
            .expect("hashing writer is infallible");
        Hash256(writer.finish())
    }

    /// `true` if this transaction's sole input is a coinbase input.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].is_coinbase()
    }

    pub fn serialized_size(&self) -> usize {
        let mut size = 4 + CompactInt::size(self.inputs.len());
        for input in &self.inputs {
            size += input.serialized_size();
        }
        size += CompactInt::size(self.outputs.len());
        for output in &self.outputs {
            size += output.serialized_size();
        }
        size + 4
    }
}

/// Parse-time invariants beyond well-formed encoding (spec.md §4.4, §7).
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum TransactionError {
    #[error("transaction has zero inputs")]
    NoInputs,
    #[error("transaction has zero outputs")]
    NoOutputs,
}

pub fn validate(tx: &Transaction) -> Result<(), TransactionError> {
    if tx.inputs.is_empty() {
        return Err(TransactionError::NoInputs);
    }
    if tx.outputs.is_empty() {
        return Err(TransactionError::NoOutputs);
    }
    Ok(())
}

impl From<TransactionError> for SerializationError {
    fn from(_: TransactionError) -> Self {
        SerializationError::Parse("transaction invariant violated")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::{Amount, NonNegative};
    use crate::transparent::{OutPoint, Script, TransactionInput, TransactionOutput};

    fn coinbase_tx() -> Transaction {
        let input = TransactionInput::new(
            OutPoint::coinbase(),
            Script(vec![0x04, 0xde, 0xad, 0xbe, 0xef]),
            0xffffffff,
        );
        let output = TransactionOutput {
            value: Amount::<NonNegative>::try_from(50_0000_0000).unwrap(),
            lock_script: Script(vec![
                0x76, 0xa9, 20, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x88, 0xac,
            ]),
        };
        Transaction::new(1, vec![input], vec![output], 0)
    }

    #[test]
    fn coinbase_tx_round_trips_and_is_coinbase() {
        let tx = coinbase_tx();
        assert!(tx.is_coinbase());

        let bytes = tx.bitcoin_serialize_to_vec().unwrap();
        let parsed = <Transaction as crate::serialization::BitcoinDeserialize>::bitcoin_deserialize(
            &bytes[..],
        )
        .unwrap();
        assert!(parsed.is_coinbase());
        assert_eq!(parsed.hash(), tx.hash());
    }

    #[test]
    fn rejects_zero_inputs_and_outputs() {
        let empty = Transaction::new(1, vec![], vec![], 0);
        assert_eq!(validate(&empty), Err(TransactionError::NoInputs));
    }

    #[test]
    fn normalized_id_ignores_script_changes() {
        let mut tx = coinbase_tx();
        let original = tx.normalized_id();
        tx.inputs[0].unlock_script = Script(vec![0x00]);
        assert_eq!(tx.normalized_id(), original);
    }
}
