//! The Bitcoin variable-length integer ("var-int") encoding, used as a
//! length prefix ahead of every variable-length sequence on the wire.

use crate::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};
use byteorder::{LittleEndian, WriteBytesExt};

/// A var-int: 1, 3, 5, or 9 bytes depending on magnitude, chosen to always
/// be the shortest encoding for the value it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CompactInt(u64);

impl CompactInt {
    pub fn new() -> CompactInt {
        CompactInt(0)
    }

    pub fn from(value: usize) -> CompactInt {
        CompactInt(value as u64)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// The number of bytes `value` would occupy once encoded.
    pub fn size(value: usize) -> usize {
        if value < 253 {
            1
        } else if value <= std::u16::MAX as usize {
            3
        } else if value <= std::u32::MAX as usize {
            5
        } else {
            9
        }
    }
}

impl Default for CompactInt {
    fn default() -> Self {
        CompactInt::new()
    }
}

impl From<u64> for CompactInt {
    fn from(value: u64) -> Self {
        CompactInt(value)
    }
}

impl BitcoinSerialize for CompactInt {
    fn bitcoin_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        if self.value() < 253 {
            target.write_all(&[self.value() as u8])
        } else if self.value() <= std::u16::MAX as u64 {
            target.write_all(&[253])?;
            target.write_u16::<LittleEndian>(self.value() as u16)
        } else if self.value() <= std::u32::MAX as u64 {
            target.write_all(&[254])?;
            target.write_u32::<LittleEndian>(self.value() as u32)
        } else {
            target.write_all(&[255])?;
            target.write_u64::<LittleEndian>(self.value())
        }
    }
}

/// Rejects non-minimal encodings: a peer that sends `0xfd 0x10 0x00` for the
/// value 16 instead of the single byte `0x10` is sent a malleable var-int,
/// which this decoder refuses rather than silently accepting.
impl BitcoinDeserialize for CompactInt {
    fn bitcoin_deserialize<R: std::io::Read>(
        mut target: R,
    ) -> Result<CompactInt, SerializationError> {
        let first = u8::bitcoin_deserialize(&mut target)?;
        if first < 253 {
            return Ok(CompactInt::from(first as usize));
        }
        let value = match first {
            253 => u16::bitcoin_deserialize(&mut target)? as u64,
            254 => u32::bitcoin_deserialize(&mut target)? as u64,
            _ => u64::bitcoin_deserialize(&mut target)?,
        };
        if CompactInt::size(value as usize) != CompactInt::size_for_prefix(first) {
            return Err(SerializationError::Parse("non-minimal var-int encoding"));
        }
        Ok(CompactInt(value))
    }
}

impl CompactInt {
    /// The canonical encoded size for a value that was introduced by the
    /// given prefix byte, used to check minimality on decode.
    fn size_for_prefix(prefix: u8) -> usize {
        match prefix {
            0..=252 => 1,
            253 => 3,
            254 => 5,
            _ => 9,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_small() {
        for v in [0u64, 1, 100, 252] {
            let mut buf = Vec::new();
            CompactInt::from(v).bitcoin_serialize(&mut buf).unwrap();
            assert_eq!(buf.len(), 1);
            let parsed = CompactInt::bitcoin_deserialize(&buf[..]).unwrap();
            assert_eq!(parsed.value(), v);
        }
    }

    #[test]
    fn roundtrips_each_tier() {
        for v in [253u64, 0xFFFF, 0x1_0000, 0xFFFF_FFFF, 0x1_0000_0000] {
            let mut buf = Vec::new();
            CompactInt::from(v).bitcoin_serialize(&mut buf).unwrap();
            let parsed = CompactInt::bitcoin_deserialize(&buf[..]).unwrap();
            assert_eq!(parsed.value(), v);
        }
    }

    #[test]
    fn rejects_non_minimal_encoding() {
        // 16 should be encoded as a single byte, not via the 0xfd prefix.
        let bytes = [0xfdu8, 0x10, 0x00];
        let err = CompactInt::bitcoin_deserialize(&bytes[..]).unwrap_err();
        assert!(!err.is_end_of_data());
    }
}
