//! The compact ("nBits") target encoding and the proof-of-work check.

use std::io;

use crate::hash::Hash256;
use crate::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

/// A proof-of-work target in its 32-bit wire encoding.
///
/// The high byte is an exponent `e`; the low three bytes are a signed
/// mantissa `m`. The represented value is `m * 256^(e - 3)` for `e >= 3`,
/// or `m >> (8 * (3 - e))` for smaller `e`. Bit 0x00800000 of the mantissa
/// is a sign flag; a set sign flag makes the target negative, which this
/// type treats as invalid (Bitcoin's nBits field never legitimately
/// encodes a negative target).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct CompactDifficulty(pub u32);

/// The unpacked 256-bit target threshold a block hash must not exceed.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct ExpandedDifficulty([u8; 32]);

impl CompactDifficulty {
    const SIGN_BIT: u32 = 0x0080_0000;
    const MANTISSA_MASK: u32 = 0x007f_ffff;

    pub fn to_bits(&self) -> u32 {
        self.0
    }

    /// Unpacks the compact encoding into a 256-bit big-endian target.
    ///
    /// Returns `None` for a negative (sign-bit-set) or zero mantissa, which
    /// every valid Bitcoin header avoids.
    pub fn to_expanded(&self) -> Option<ExpandedDifficulty> {
        let exponent = (self.0 >> 24) as i32;
        let mantissa = self.0 & Self::MANTISSA_MASK;
        if self.0 & Self::SIGN_BIT != 0 || mantissa == 0 {
            return None;
        }

        let mut target = [0u8; 32];
        let mantissa_bytes = mantissa.to_be_bytes();
        // mantissa_bytes is 4 bytes with a leading zero; take the low 3.
        let mantissa_bytes = &mantissa_bytes[1..];

        // Place the mantissa so its most significant byte lands at index
        // `32 - exponent` from the start of the big-endian buffer.
        let shift = exponent - 3;
        for (i, byte) in mantissa_bytes.iter().enumerate() {
            let dest = 32 - 3 + i as i32 - shift;
            if dest >= 0 && (dest as usize) < 32 {
                target[dest as usize] = *byte;
            } else if dest >= 32 {
                // overflowed past the top of a 256-bit value
                return None;
            }
        }
        Some(ExpandedDifficulty(target))
    }

    /// Packs a 256-bit target into its canonical compact form.
    pub fn from_expanded(target: &ExpandedDifficulty) -> CompactDifficulty {
        let bytes = &target.0;
        let first_nonzero = bytes.iter().position(|&b| b != 0);
        let first_nonzero = match first_nonzero {
            Some(i) => i,
            None => return CompactDifficulty(0),
        };
        let significant = &bytes[first_nonzero..];
        let mut exponent = (32 - first_nonzero) as u32;
        let mut mantissa_bytes = [0u8; 3];
        for (i, b) in significant.iter().take(3).enumerate() {
            mantissa_bytes[i] = *b;
        }
        // If the most significant byte has its high bit set, the mantissa
        // would be misread as negative; shift right and bump the exponent.
        if mantissa_bytes[0] & 0x80 != 0 {
            mantissa_bytes = [0, mantissa_bytes[0], mantissa_bytes[1]];
            exponent += 1;
        }
        let mantissa = u32::from_be_bytes([0, mantissa_bytes[0], mantissa_bytes[1], mantissa_bytes[2]]);
        CompactDifficulty((exponent << 24) | mantissa)
    }
}

impl ExpandedDifficulty {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl PartialOrd for ExpandedDifficulty {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.0.cmp(&other.0))
    }
}

impl Ord for ExpandedDifficulty {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

/// Checks that `hash`, as a 256-bit big-endian integer, does not exceed
/// `target`: the proof-of-work condition a block header's own hash must
/// satisfy against its own stated difficulty.
pub fn meets_target(hash: &Hash256, target: &ExpandedDifficulty) -> bool {
    hash.as_u256_be() <= target.0
}

impl BitcoinSerialize for CompactDifficulty {
    fn bitcoin_serialize<W: io::Write>(&self, target: W) -> Result<(), io::Error> {
        self.0.bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for CompactDifficulty {
    fn bitcoin_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        Ok(CompactDifficulty(u32::bitcoin_deserialize(reader)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mainnet_pow_limit_expands() {
        // 0x1d00ffff, Bitcoin mainnet's genesis/limit target.
        let compact = CompactDifficulty(0x1d00_ffff);
        let expanded = compact.to_expanded().unwrap();
        let repacked = CompactDifficulty::from_expanded(&expanded);
        assert_eq!(repacked.0, compact.0);
    }

    #[test]
    fn negative_sign_bit_is_invalid() {
        let compact = CompactDifficulty(0x0100_0080 | 0x0080_0000);
        assert!(compact.to_expanded().is_none());
    }

    #[test]
    fn zero_mantissa_is_invalid() {
        assert!(CompactDifficulty(0x1d00_0000).to_expanded().is_none());
    }

    #[test]
    fn hash_at_or_below_target_meets_pow() {
        let compact = CompactDifficulty(0x1d00_ffff);
        let expanded = compact.to_expanded().unwrap();
        let low_hash = Hash256::ZERO;
        assert!(meets_target(&low_hash, &expanded));
    }
}
