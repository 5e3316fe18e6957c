//! BIP37 Bloom filters: the probabilistic per-peer element-matching filter
//! installed via `filterload`/`filteradd`/`filterclear` (spec.md §4.5).

use std::io;

use crate::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

/// Absolute cap on a filter's encoded size, in bytes (spec.md §4.3).
pub const MAX_FILTER_BYTES: usize = 36_000;
/// Absolute cap on the number of hash functions a filter may use.
pub const MAX_HASH_FUNCS: u32 = 50;
/// Multiplier folded into each hash function's MurmurHash3 seed (spec.md §4.5).
const SEED_MULTIPLIER: u32 = 0xFBA4_C795;

/// What a matching `filterload` filter causes the peer to do with newly
/// observed outpoints: nothing, add every matched output, or add only
/// matched pay-to-pubkey outputs (for wallets that only need to watch their
/// own spends).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum UpdateFlags {
    None,
    All,
    PubKeyOnly,
}

impl UpdateFlags {
    fn from_byte(byte: u8) -> Result<UpdateFlags, BloomError> {
        match byte {
            0 => Ok(UpdateFlags::None),
            1 => Ok(UpdateFlags::All),
            2 => Ok(UpdateFlags::PubKeyOnly),
            other => Err(BloomError::UnknownUpdateFlag(other)),
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            UpdateFlags::None => 0,
            UpdateFlags::All => 1,
            UpdateFlags::PubKeyOnly => 2,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum BloomError {
    #[error("bloom filter is {0} bytes, over the {MAX_FILTER_BYTES}-byte limit")]
    FilterTooLarge(usize),
    #[error("bloom filter uses {0} hash functions, over the {MAX_HASH_FUNCS} limit")]
    TooManyHashFunctions(u32),
    #[error("unrecognized update-flags byte 0x{0:02x}")]
    UnknownUpdateFlag(u8),
}

/// A peer-installed Bloom filter over arbitrary byte strings (public key
/// hashes, outpoints, script data).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BloomFilter {
    bytes: Vec<u8>,
    hash_funcs: u32,
    tweak: u32,
    flags: UpdateFlags,
}

impl BloomFilter {
    /// Builds an empty filter sized for `element_count` elements at false
    /// positive rate `false_positive_rate`, per the BIP37 sizing formulas.
    pub fn new(
        element_count: usize,
        false_positive_rate: f64,
        tweak: u32,
        flags: UpdateFlags,
    ) -> BloomFilter {
        let filter_bits = filter_bit_count(element_count, false_positive_rate);
        let hash_funcs = hash_function_count(filter_bits, element_count);
        BloomFilter {
            bytes: vec![0u8; (filter_bits + 7) / 8],
            hash_funcs,
            tweak,
            flags,
        }
    }

    /// Reconstructs a filter from its wire fields, rejecting anything over
    /// the hard caps (spec.md §4.3).
    pub fn from_parts(
        bytes: Vec<u8>,
        hash_funcs: u32,
        tweak: u32,
        flags: UpdateFlags,
    ) -> Result<BloomFilter, BloomError> {
        if bytes.len() > MAX_FILTER_BYTES {
            return Err(BloomError::FilterTooLarge(bytes.len()));
        }
        if hash_funcs > MAX_HASH_FUNCS {
            return Err(BloomError::TooManyHashFunctions(hash_funcs));
        }
        Ok(BloomFilter {
            bytes,
            hash_funcs,
            tweak,
            flags,
        })
    }

    pub fn flags(&self) -> UpdateFlags {
        self.flags
    }

    fn bit_positions(&self, element: &[u8]) -> impl Iterator<Item = usize> + '_ {
        let bit_count = (self.bytes.len() * 8) as u32;
        (0..self.hash_funcs).map(move |k| {
            let seed = k.wrapping_mul(SEED_MULTIPLIER).wrapping_add(self.tweak);
            (murmur3_32(element, seed) % bit_count) as usize
        })
    }

    /// Sets every bit `element` hashes to.
    pub fn insert(&mut self, element: &[u8]) {
        for pos in self.bit_positions(element).collect::<Vec<_>>() {
            self.bytes[pos / 8] |= 1 << (pos % 8);
        }
    }

    /// Tests membership: `false` is a definite answer, `true` may be a false
    /// positive.
    pub fn contains(&self, element: &[u8]) -> bool {
        self.bit_positions(element)
            .all(|pos| self.bytes[pos / 8] & (1 << (pos % 8)) != 0)
    }
}

/// `min(ceil(-n * ln(p) / ln(2)^2), MAX_FILTER_BYTES * 8)`, clamped to at
/// least 8 bits.
fn filter_bit_count(element_count: usize, false_positive_rate: f64) -> usize {
    let n = element_count.max(1) as f64;
    let ideal = (-1.0 * n * false_positive_rate.ln() / std::f64::consts::LN_2.powi(2)).ceil();
    let capped = ideal.min((MAX_FILTER_BYTES * 8) as f64);
    (capped as usize).max(8)
}

/// `min(floor(filter_bits / n * ln(2)), MAX_HASH_FUNCS)`.
fn hash_function_count(filter_bits: usize, element_count: usize) -> u32 {
    let n = element_count.max(1) as f64;
    let ideal = (filter_bits as f64 / n * std::f64::consts::LN_2).floor();
    (ideal as u32).min(MAX_HASH_FUNCS).max(1)
}

/// MurmurHash3 (x86, 32-bit variant), as BIP37 requires.
fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    const C1: u32 = 0xcc9e_2d51;
    const C2: u32 = 0x1b87_3593;

    let mut hash = seed;
    let chunks = data.chunks_exact(4);
    let tail = chunks.remainder();

    for chunk in chunks {
        let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        k = k.wrapping_mul(C1);
        k = k.rotate_left(15);
        k = k.wrapping_mul(C2);

        hash ^= k;
        hash = hash.rotate_left(13);
        hash = hash.wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let mut k = 0u32;
    for (i, &byte) in tail.iter().enumerate().rev() {
        k ^= (byte as u32) << (8 * i);
        if i == 0 {
            k = k.wrapping_mul(C1);
            k = k.rotate_left(15);
            k = k.wrapping_mul(C2);
            hash ^= k;
        }
    }

    hash ^= data.len() as u32;
    hash ^= hash >> 16;
    hash = hash.wrapping_mul(0x85eb_ca6b);
    hash ^= hash >> 13;
    hash = hash.wrapping_mul(0xc2b2_ae35);
    hash ^= hash >> 16;
    hash
}

impl BitcoinSerialize for BloomFilter {
    fn bitcoin_serialize<W: io::Write>(&self, mut target: W) -> Result<(), io::Error> {
        self.bytes.bitcoin_serialize(&mut target)?;
        self.hash_funcs.bitcoin_serialize(&mut target)?;
        self.tweak.bitcoin_serialize(&mut target)?;
        self.flags.to_byte().bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for BloomFilter {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let bytes = Vec::<u8>::bitcoin_deserialize(&mut reader)?;
        let hash_funcs = u32::bitcoin_deserialize(&mut reader)?;
        let tweak = u32::bitcoin_deserialize(&mut reader)?;
        let flags = UpdateFlags::from_byte(u8::bitcoin_deserialize(&mut reader)?)
            .map_err(|_| SerializationError::Parse("unrecognized bloom filter update-flags byte"))?;
        BloomFilter::from_parts(bytes, hash_funcs, tweak, flags)
            .map_err(|_| SerializationError::Parse("bloom filter exceeds size or hash-function limits"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizing_clamps_to_minimum_eight_bits() {
        assert!(filter_bit_count(0, 0.0005) >= 8);
    }

    #[test]
    fn sizing_caps_at_max_filter_bytes() {
        let bits = filter_bit_count(10_000_000, 0.0001);
        assert_eq!(bits, MAX_FILTER_BYTES * 8);
    }

    #[test]
    fn inserted_elements_are_always_found() {
        let mut filter = BloomFilter::new(100, 0.0005, 0, UpdateFlags::None);
        let elements: Vec<Vec<u8>> = (0..100u32).map(|i| i.to_le_bytes().to_vec()).collect();
        for e in &elements {
            filter.insert(e);
        }
        for e in &elements {
            assert!(filter.contains(e));
        }
    }

    #[test]
    fn rejects_oversized_filter() {
        let err = BloomFilter::from_parts(vec![0; MAX_FILTER_BYTES + 1], 1, 0, UpdateFlags::None)
            .unwrap_err();
        assert!(matches!(err, BloomError::FilterTooLarge(_)));
    }

    #[test]
    fn rejects_too_many_hash_functions() {
        let err = BloomFilter::from_parts(vec![0; 8], MAX_HASH_FUNCS + 1, 0, UpdateFlags::None)
            .unwrap_err();
        assert!(matches!(err, BloomError::TooManyHashFunctions(_)));
    }

    #[test]
    fn roundtrips_through_wire_encoding() {
        let mut filter = BloomFilter::new(10, 0.01, 42, UpdateFlags::All);
        filter.insert(b"hello");
        let bytes = filter.bitcoin_serialize_to_vec().unwrap();
        let parsed = BloomFilter::bitcoin_deserialize(&bytes[..]).unwrap();
        assert_eq!(parsed, filter);
        assert!(parsed.contains(b"hello"));
    }
}
