//! Transaction inputs, outputs, and the scripts that gate them.

mod address;
mod script;

pub use address::Address;
pub use script::Script;

use btcproto_derive::{BtcDeserialize, BtcSerialize};
use serde::{Deserialize, Serialize};

use crate::amount::{Amount, NonNegative};
use crate::cached::Cached;
use crate::hash::Hash256;

/// A reference to one output of a previous transaction.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, BtcSerialize)]
pub struct OutPoint {
    /// The transaction containing the referenced output.
    pub hash: Hash256,
    /// The index of the referenced output within that transaction.
    pub index: u32,
}

impl OutPoint {
    /// The outpoint's fixed encoded length in bytes.
    pub const fn len() -> usize {
        36
    }

    /// The null outpoint a coinbase input carries: an all-zero hash and an
    /// index of `0xffffffff`.
    pub fn coinbase() -> OutPoint {
        OutPoint {
            hash: Hash256::ZERO,
            index: u32::MAX,
        }
    }

    pub fn is_coinbase(&self) -> bool {
        self.hash.is_zero() && self.index == u32::MAX
    }
}

use crate::serialization::{BitcoinDeserialize, SerializationError};

impl BitcoinDeserialize for OutPoint {
    fn bitcoin_deserialize<R: std::io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(OutPoint {
            hash: Hash256::bitcoin_deserialize(&mut reader)?,
            index: u32::bitcoin_deserialize(&mut reader)?,
        })
    }
}

/// A transaction input.
///
/// Bitcoin does not distinguish coinbase inputs from ordinary ones at the
/// wire-format level; a coinbase input is an ordinary input whose outpoint
/// is [`OutPoint::coinbase`], and whose `unlock_script` holds arbitrary
/// miner-chosen data rather than a spending proof. `is_coinbase` names that
/// case explicitly so callers don't need to repeat the outpoint check.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, BtcSerialize)]
pub struct TransactionInput {
    pub previous_output: OutPoint,
    pub unlock_script: Script,
    pub sequence: u32,

    /// The BIP-34 block height recovered from a coinbase input's script,
    /// if one was present and parseable. Not part of the wire encoding.
    height: Cached<u32>,
}

impl BitcoinDeserialize for TransactionInput {
    fn bitcoin_deserialize<R: std::io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(TransactionInput {
            previous_output: OutPoint::bitcoin_deserialize(&mut reader)?,
            unlock_script: Script::bitcoin_deserialize(&mut reader)?,
            sequence: u32::bitcoin_deserialize(&mut reader)?,
            height: Cached::new(),
        })
    }
}

impl TransactionInput {
    pub fn new(previous_output: OutPoint, unlock_script: Script, sequence: u32) -> Self {
        TransactionInput {
            previous_output,
            unlock_script,
            sequence,
            height: Cached::new(),
        }
    }

    pub fn is_coinbase(&self) -> bool {
        self.previous_output.is_coinbase()
    }

    /// A coinbase input's recovered block height, if BIP 34 data was parsed.
    pub fn coinbase_height(&self) -> Option<u32> {
        self.height.value()
    }

    pub fn set_coinbase_height(&mut self, height: u32) {
        *self.height.mut_value() = Some(height);
    }

    pub fn serialized_size(&self) -> usize {
        OutPoint::len() + self.unlock_script.serialized_size() + 4
    }
}

/// A transaction output: a quantity of satoshis locked by a script.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, BtcSerialize, BtcDeserialize)]
pub struct TransactionOutput {
    pub value: Amount<NonNegative>,
    pub lock_script: Script,
}

impl TransactionOutput {
    pub fn serialized_size(&self) -> usize {
        8 + self.lock_script.serialized_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::BitcoinSerialize;

    #[test]
    fn outpoint_len_matches_wire_size() {
        let outpoint = OutPoint::coinbase();
        let bytes = outpoint.bitcoin_serialize_to_vec().unwrap();
        assert_eq!(bytes.len(), OutPoint::len());
    }

    #[test]
    fn coinbase_outpoint_is_detected() {
        assert!(OutPoint::coinbase().is_coinbase());
        let spend = OutPoint {
            hash: Hash256([1u8; 32]),
            index: 0,
        };
        assert!(!spend.is_coinbase());
    }
}
