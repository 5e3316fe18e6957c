//! Consensus-critical serialization.
//!
//! This module defines `BitcoinSerialize` and `BitcoinDeserialize`, the wire
//! encode/decode traits used by every type on the network boundary, plus
//! [`sha256d`] (double-SHA-256 hashing and the envelope checksum) and
//! [`CompactInt`] (the Bitcoin variable-length integer).
//!
//! Primitive impls here read and write exactly the bytes the protocol
//! specifies: little-endian integers, a var-int length prefix ahead of
//! variable-length sequences, and big-endian ports for socket addresses.

mod deserialize;
mod error;

pub mod sha256d;

use chrono::{DateTime, Utc};
pub use deserialize::{BitcoinDeserialize, BitcoinDeserializeInto};
pub use error::SerializationError;

use crate::compactint::CompactInt;
use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use std::convert::TryFrom;
use std::net::IpAddr;

/// Writes `Self` in the consensus wire format.
pub trait BitcoinSerialize {
    fn bitcoin_serialize<W: std::io::Write>(&self, target: W) -> Result<(), std::io::Error>;

    fn bitcoin_serialize_to_vec(&self) -> Result<Vec<u8>, std::io::Error> {
        let mut data = Vec::new();
        self.bitcoin_serialize(&mut data)?;
        Ok(data)
    }
}

impl BitcoinSerialize for bool {
    fn bitcoin_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        target.write_all(&[*self as u8])
    }
}

impl BitcoinSerialize for u8 {
    fn bitcoin_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        target.write_all(&[*self])
    }
}

impl BitcoinSerialize for u16 {
    fn bitcoin_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        target.write_u16::<LittleEndian>(*self)
    }
}

impl BitcoinSerialize for u32 {
    fn bitcoin_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        target.write_u32::<LittleEndian>(*self)
    }
}

impl BitcoinSerialize for u64 {
    fn bitcoin_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        target.write_u64::<LittleEndian>(*self)
    }
}

impl BitcoinSerialize for i32 {
    fn bitcoin_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        target.write_i32::<LittleEndian>(*self)
    }
}

impl BitcoinSerialize for i64 {
    fn bitcoin_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        target.write_i64::<LittleEndian>(*self)
    }
}

/// Timestamps are truncated to a 32-bit unix time; out-of-range values
/// saturate to `u32::MAX` rather than wrapping, matching the field's use as
/// an advisory peer clock rather than a consensus value.
impl BitcoinSerialize for DateTime<Utc> {
    fn bitcoin_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        let time_u32 = u32::try_from(self.timestamp()).unwrap_or(std::u32::MAX);
        target.write_u32::<LittleEndian>(time_u32)
    }
}

impl BitcoinSerialize for std::net::Ipv6Addr {
    fn bitcoin_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        target.write_all(&self.octets())
    }
}

/// IPv4 addresses are written as IPv4-mapped IPv6, per the `addr`/`version`
/// message formats.
impl BitcoinSerialize for IpAddr {
    fn bitcoin_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        match self {
            IpAddr::V4(addr) => addr.to_ipv6_mapped().bitcoin_serialize(&mut target),
            IpAddr::V6(addr) => addr.bitcoin_serialize(&mut target),
        }
    }
}

impl BitcoinSerialize for std::net::SocketAddr {
    fn bitcoin_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        self.ip().bitcoin_serialize(&mut target)?;
        target.write_u16::<BigEndian>(self.port())
    }
}

impl BitcoinSerialize for &[u8] {
    fn bitcoin_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        target.write_all(self)
    }
}

macro_rules! impl_serializable_byte_array {
    ($size:expr) => {
        impl BitcoinSerialize for [u8; $size] {
            fn bitcoin_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
            where
                W: std::io::Write,
            {
                target.write_all(self)
            }
        }
    };
}

impl_serializable_byte_array!(4);
impl_serializable_byte_array!(12);
impl_serializable_byte_array!(16);
impl_serializable_byte_array!(20);
impl_serializable_byte_array!(32);

impl BitcoinSerialize for Vec<u8> {
    fn bitcoin_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        CompactInt::from(self.len()).bitcoin_serialize(&mut target)?;
        target.write_all(self)
    }
}

impl<T> BitcoinSerialize for Vec<T>
where
    T: BitcoinSerialize,
{
    fn bitcoin_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        CompactInt::from(self.len()).bitcoin_serialize(&mut target)?;
        for item in self.iter() {
            item.bitcoin_serialize(&mut target)?;
        }
        Ok(())
    }
}

impl<T, U> BitcoinSerialize for (T, U)
where
    T: BitcoinSerialize,
    U: BitcoinSerialize,
{
    fn bitcoin_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        self.0.bitcoin_serialize(&mut target)?;
        self.1.bitcoin_serialize(&mut target)
    }
}

impl BitcoinSerialize for String {
    fn bitcoin_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        CompactInt::from(self.len()).bitcoin_serialize(&mut target)?;
        target.write_all(self.as_bytes())
    }
}

/// Writes the contained value, or nothing at all for `None`. Only meaningful
/// for fields at the tail of a message, where omission is unambiguous.
impl<T: BitcoinSerialize> BitcoinSerialize for Option<T> {
    fn bitcoin_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        match self {
            Some(contents) => contents.bitcoin_serialize(&mut target),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u32_roundtrips() {
        let mut buf = Vec::new();
        424242u32.bitcoin_serialize(&mut buf).unwrap();
        let parsed = u32::bitcoin_deserialize(&buf[..]).unwrap();
        assert_eq!(parsed, 424242);
    }

    #[test]
    fn vec_u8_roundtrips() {
        let data = vec![1u8, 2, 3, 4, 5];
        let mut buf = Vec::new();
        data.bitcoin_serialize(&mut buf).unwrap();
        let parsed = Vec::<u8>::bitcoin_deserialize(&buf[..]).unwrap();
        assert_eq!(parsed, data);
    }
}
