//! The `getheaders` message (spec.md §4.3): same locator shape as
//! `getblocks`, but the response is a `headers` batch instead of `inv`.

use std::io;

use btcproto_chain::hash::Hash256;
use btcproto_chain::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GetHeaders {
    pub locator_hashes: Vec<Hash256>,
    pub stop_hash: Option<Hash256>,
}

impl BitcoinSerialize for GetHeaders {
    fn bitcoin_serialize<W: io::Write>(&self, mut target: W) -> Result<(), io::Error> {
        self.locator_hashes.bitcoin_serialize(&mut target)?;
        self.stop_hash.unwrap_or(Hash256::ZERO).bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for GetHeaders {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let locator_hashes = Vec::<Hash256>::bitcoin_deserialize(&mut reader)?;
        let raw_stop_hash = Hash256::bitcoin_deserialize(&mut reader)?;
        let stop_hash = if raw_stop_hash.is_zero() {
            None
        } else {
            Some(raw_stop_hash)
        };
        Ok(GetHeaders {
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
        let msg = GetHeaders {
            locator_hashes: vec![Hash256([9u8; 32])],
            stop_hash: None,
        };
        let bytes = msg.bitcoin_serialize_to_vec().unwrap();
        let parsed = GetHeaders::bitcoin_deserialize(&bytes[..]).unwrap();
        assert_eq!(parsed, msg);
    }
}
