//! Double-SHA-256 hashing, used for block/transaction hashes and the
//! message-envelope checksum.

use std::fmt;
use std::io::{self, Write};

use sha2::{Digest, Sha256};

use super::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

/// An incremental double-SHA-256 writer.
///
/// Implements `io::Write` so it can be handed to a `bitcoin_serialize` call
/// directly, avoiding an intermediate buffer when only the hash is needed.
#[derive(Default)]
pub struct Writer(Sha256);

impl Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Writer {
    /// Consume the writer, returning the double-SHA-256 digest of everything written.
    pub fn finish(self) -> [u8; 32] {
        let first = self.0.finalize();
        let second = Sha256::digest(first);
        let mut out = [0u8; 32];
        out.copy_from_slice(&second);
        out
    }
}

/// A single SHA-256 digest.
pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(bytes));
    out
}

/// A double-SHA-256 digest, as used for block and transaction hashes.
pub fn double_sha256(bytes: &[u8]) -> [u8; 32] {
    let mut w = Writer::default();
    let _ = w.write_all(bytes);
    w.finish()
}

/// SHA-256 followed by RIPEMD-160, as used for address hashing (HASH160).
pub fn hash160(bytes: &[u8]) -> [u8; 20] {
    use ripemd::Ripemd160;
    let sha = Sha256::digest(bytes);
    let ripe = Ripemd160::digest(sha);
    let mut out = [0u8; 20];
    out.copy_from_slice(&ripe);
    out
}

/// Returns a new buffer with `bytes` in reverse order.
///
/// Used throughout the wire protocol: hashes are held in natural
/// (big-endian) order internally but transmitted reversed.
pub fn reverse(bytes: &[u8]) -> Vec<u8> {
    let mut out = bytes.to_vec();
    out.reverse();
    out
}

/// The first four bytes of the double-SHA-256 of a message payload, used as
/// the envelope checksum (spec.md §4.2, §8).
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Checksum(pub [u8; 4]);

/// The checksum of the zero-length payload, fixed per spec.md §8.
pub const EMPTY_PAYLOAD_CHECKSUM: Checksum = Checksum([0x5d, 0xf6, 0xe0, 0xe2]);

impl From<&[u8]> for Checksum {
    fn from(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return EMPTY_PAYLOAD_CHECKSUM;
        }
        let digest = double_sha256(bytes);
        let mut out = [0u8; 4];
        out.copy_from_slice(&digest[0..4]);
        Checksum(out)
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Checksum").field(&hex::encode(self.0)).finish()
    }
}

impl BitcoinSerialize for Checksum {
    fn bitcoin_serialize<W: Write>(&self, mut target: W) -> Result<(), io::Error> {
        target.write_all(&self.0)
    }
}

impl BitcoinDeserialize for Checksum {
    fn bitcoin_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        Ok(Checksum(<[u8; 4]>::bitcoin_deserialize(reader)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payload_checksum() {
        assert_eq!(Checksum::from(&b""[..]).0, EMPTY_PAYLOAD_CHECKSUM.0);
    }

    #[test]
    fn reverse_roundtrips() {
        let bytes = [1u8, 2, 3, 4, 5];
        assert_eq!(reverse(&reverse(&bytes)), bytes);
    }
}
