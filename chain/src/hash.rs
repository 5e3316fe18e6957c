//! A generic double-SHA-256 digest, used to identify blocks, transactions,
//! and Merkle tree nodes.

use std::cmp::Ordering;
use std::{fmt, io};

use btcproto_derive::BtcSerialize;
use serde::{Deserialize, Serialize};

use crate::serialization::{sha256d, BitcoinDeserialize, BitcoinSerialize, SerializationError};

/// A 32-byte double-SHA-256 digest.
///
/// Stored internally in the natural (big-endian, as printed) byte order
/// produced by hashing. Displayed and parsed in that same order, following
/// the big-endian-hex convention Bitcoin uses for block and transaction
/// hashes; written to and read from the wire in the reversed order the
/// protocol actually transmits.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, BtcSerialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// The all-zero hash, used as `prev_block` in a genesis header and as a
    /// null outpoint hash in coinbase inputs.
    pub const ZERO: Hash256 = Hash256([0u8; 32]);

    pub fn from_bytes_exact(bytes: [u8; 32]) -> Hash256 {
        Hash256(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Interprets the digest as a big-endian 256-bit unsigned integer, for
    /// comparing a block hash against a difficulty target.
    pub fn as_u256_be(&self) -> [u8; 32] {
        self.0
    }
}

/// Hashes compare as 256-bit big-endian unsigned integers, matching the
/// target-vs-hash comparison used for proof-of-work validation.
impl Ord for Hash256 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for Hash256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut reversed = self.0;
        reversed.reverse();
        f.write_str(&hex::encode(reversed))
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut reversed = self.0;
        reversed.reverse();
        f.debug_tuple("Hash256").field(&hex::encode(reversed)).finish()
    }
}

impl BitcoinDeserialize for Hash256 {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(Hash256(<[u8; 32]>::bitcoin_deserialize(&mut reader)?))
    }
}

impl std::str::FromStr for Hash256 {
    type Err = SerializationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes[..])
            .map_err(|_| SerializationError::Parse("hex decoding error"))?;
        bytes.reverse();
        Ok(Hash256(bytes))
    }
}

/// Computes the double-SHA-256 hash of a type's wire encoding.
pub fn hash_of<T: BitcoinSerialize>(value: &T) -> Hash256 {
    let mut writer = sha256d::Writer::default();
    value
        .bitcoin_serialize(&mut writer)
        .expect("hashing writer is infallible");
    Hash256(writer.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_reversed_hex() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xab;
        bytes[31] = 0x01;
        let hash = Hash256(bytes);
        assert!(hash.to_string().starts_with("01"));
        assert!(hash.to_string().ends_with("ab"));
    }

    #[test]
    fn from_str_roundtrips_display() {
        let hash = Hash256([7u8; 32]);
        let parsed: Hash256 = hash.to_string().parse().unwrap();
        assert_eq!(hash, parsed);
    }

    #[test]
    fn ord_compares_as_big_endian_integer() {
        let small = Hash256([0u8; 32]);
        let mut big_bytes = [0u8; 32];
        big_bytes[0] = 1;
        let big = Hash256(big_bytes);
        assert!(small < big);
    }
}
