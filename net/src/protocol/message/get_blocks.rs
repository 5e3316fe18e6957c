//! The `getblocks` message (spec.md §4.3): a sparse locator of known block
//! hashes, used to ask a peer to advertise what comes after them via `inv`.

use std::io;

use btcproto_chain::hash::Hash256;
use btcproto_chain::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GetBlocks {
    /// Known block hashes, ordered from highest height to lowest.
    pub locator_hashes: Vec<Hash256>,
    /// The last header to request; `None` (the all-zero wire value) asks
    /// for as many as the peer will send (spec.md §4.3: up to 500).
    pub stop_hash: Option<Hash256>,
}

impl BitcoinSerialize for GetBlocks {
    fn bitcoin_serialize<W: io::Write>(&self, mut target: W) -> Result<(), io::Error> {
        self.locator_hashes.bitcoin_serialize(&mut target)?;
        self.stop_hash.unwrap_or(Hash256::ZERO).bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for GetBlocks {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let locator_hashes = Vec::<Hash256>::bitcoin_deserialize(&mut reader)?;
        let raw_stop_hash = Hash256::bitcoin_deserialize(&mut reader)?;
        let stop_hash = if raw_stop_hash.is_zero() {
            None
        } else {
            Some(raw_stop_hash)
        };
        Ok(GetBlocks {
            locator_hashes,
            stop_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_wire_encoding() {
        let msg = GetBlocks {
            locator_hashes: vec![Hash256([1u8; 32]), Hash256([2u8; 32])],
            stop_hash: Some(Hash256([3u8; 32])),
        };
        let bytes = msg.bitcoin_serialize_to_vec().unwrap();
        let parsed = GetBlocks::bitcoin_deserialize(&bytes[..]).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn all_zero_stop_hash_means_none() {
        let msg = GetBlocks {
            locator_hashes: vec![],
            stop_hash: None,
        };
        let bytes = msg.bitcoin_serialize_to_vec().unwrap();
        let parsed = GetBlocks::bitcoin_deserialize(&bytes[..]).unwrap();
        assert_eq!(parsed.stop_hash, None);
    }
}
