use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use std::io;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};

use super::{CompactInt, SerializationError};

type Result<R> = std::result::Result<R, SerializationError>;

/// Parses `Self` from the consensus wire format.
///
/// Mirrors `BitcoinSerialize`: implementations read exactly the bytes their
/// `bitcoin_serialize` counterpart would have written, and nothing more.
pub trait BitcoinDeserialize {
    fn bitcoin_deserialize<R: io::Read>(reader: R) -> Result<Self>
    where
        Self: Sized;
}

/// Helper for deserializing more succinctly via type inference.
pub trait BitcoinDeserializeInto {
    fn bitcoin_deserialize_into<T>(self) -> Result<T>
    where
        T: BitcoinDeserialize;
}

impl<R: io::Read> BitcoinDeserializeInto for R {
    fn bitcoin_deserialize_into<T>(self) -> Result<T>
    where
        T: BitcoinDeserialize,
    {
        T::bitcoin_deserialize(self)
    }
}

impl BitcoinDeserialize for bool {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<bool> {
        match reader.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(SerializationError::Parse("invalid bool")),
        }
    }
}

impl BitcoinDeserialize for u8 {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<u8> {
        Ok(reader.read_u8()?)
    }
}

impl BitcoinDeserialize for u16 {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<u16> {
        Ok(reader.read_u16::<LittleEndian>()?)
    }
}

impl BitcoinDeserialize for u32 {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<u32> {
        Ok(reader.read_u32::<LittleEndian>()?)
    }
}

impl BitcoinDeserialize for u64 {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<u64> {
        Ok(reader.read_u64::<LittleEndian>()?)
    }
}

impl BitcoinDeserialize for i32 {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<i32> {
        Ok(reader.read_i32::<LittleEndian>()?)
    }
}

impl BitcoinDeserialize for i64 {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<i64> {
        Ok(reader.read_i64::<LittleEndian>()?)
    }
}

/// Reads a var-int length prefix followed by that many raw bytes.
impl BitcoinDeserialize for Vec<u8> {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Vec<u8>> {
        let len = CompactInt::bitcoin_deserialize(&mut reader)?.value() as usize;
        // Cap blind preallocation; the real bound is enforced by each
        // command handler's documented cap (spec.md §4.3, §5).
        let prealloc = std::cmp::min(len, 1 << 20);
        let mut buf = vec![0u8; prealloc];
        reader.read_exact(&mut buf)?;
        if len > prealloc {
            let mut rest = vec![0u8; len - prealloc];
            reader.read_exact(&mut rest)?;
            buf.extend_from_slice(&rest);
        }
        Ok(buf)
    }
}

impl<T> BitcoinDeserialize for Vec<T>
where
    T: BitcoinDeserialize,
{
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Vec<T>> {
        let len = CompactInt::bitcoin_deserialize(&mut reader)?.value() as usize;
        let blind_alloc_limit = 1024;
        let mut result: Vec<T> = Vec::with_capacity(std::cmp::min(len, blind_alloc_limit));
        for _ in 0..len {
            result.push(T::bitcoin_deserialize(&mut reader)?);
        }
        Ok(result)
    }
}

impl BitcoinDeserialize for String {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<String> {
        let bytes = Vec::<u8>::bitcoin_deserialize(&mut reader)?;
        String::from_utf8(bytes).map_err(|_| SerializationError::Parse("invalid utf-8"))
    }
}

impl BitcoinDeserialize for SocketAddr {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<SocketAddr> {
        let octets = <[u8; 16]>::bitcoin_deserialize(&mut reader)?;
        let v6 = Ipv6Addr::from(octets);
        let ip = match v6.to_ipv4() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        };
        Ok(SocketAddr::from((ip, reader.read_u16::<BigEndian>()?)))
    }
}

impl<T, U> BitcoinDeserialize for (T, U)
where
    T: BitcoinDeserialize,
    U: BitcoinDeserialize,
{
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<(T, U)> {
        Ok((
            T::bitcoin_deserialize(&mut reader)?,
            U::bitcoin_deserialize(&mut reader)?,
        ))
    }
}

macro_rules! impl_deserializable_byte_array {
    ($size:expr) => {
        impl BitcoinDeserialize for [u8; $size] {
            fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<[u8; $size]> {
                let mut result = [0u8; $size];
                reader.read_exact(&mut result)?;
                Ok(result)
            }
        }
    };
}

impl_deserializable_byte_array!(4);
impl_deserializable_byte_array!(12);
impl_deserializable_byte_array!(16);
impl_deserializable_byte_array!(20);
impl_deserializable_byte_array!(32);
