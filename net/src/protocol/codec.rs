//! Envelope framing (spec.md §4.2): magic, command name, length, checksum,
//! wrapped around a [`Message`] body.
//!
//! Adapted from the teacher's `tokio_util::codec` `Encoder`/`Decoder` pair
//! to a synchronous `encode`/`decode` pair — this crate performs no network
//! I/O, so there is no `BytesMut`-driven async framing to hook into. The
//! teacher's two-phase `DecodeState::{Head, Body}` state machine survives
//! as the two halves of [`Codec::decode`]: the header is parsed first, and
//! if the body isn't fully buffered yet `decode` reports how many more
//! bytes are needed rather than erroring.

use byteorder::ByteOrder;

use btcproto_chain::serialization::sha256d;

use crate::constants::{HEADER_LEN, MAX_BLOCK_LEN, MAX_MESSAGE_LEN};
use crate::error::NetError;
use crate::protocol::command::Command;
use crate::protocol::message::Message;
use crate::protocol::types::Magic;

/// A fully framed, not-yet-dispatched message, or an envelope whose command
/// name isn't one of the 21 this library understands.
///
/// Unknown commands are not a framing error (spec.md §4.2: "unknown
/// commands reported but not fatal") — the caller decides whether to log,
/// ignore, or reply with `reject`.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Known(Message),
    Unknown([u8; 12]),
}

/// The result of attempting to decode one envelope from a buffer.
pub enum DecodeOutcome {
    /// A full envelope was consumed from the front of the buffer.
    Frame { decoded: Decoded, consumed: usize },
    /// Fewer than `needed` bytes are buffered so far; call again once more
    /// data has arrived.
    Incomplete { needed: usize },
}

pub struct Codec {
    magic: Magic,
}

impl Codec {
    pub fn new(magic: Magic) -> Codec {
        Codec { magic }
    }

    /// Serializes a message to its full wire form: header followed by body.
    pub fn encode(&self, message: &Message) -> Result<Vec<u8>, NetError> {
        let mut body = Vec::new();
        message
            .write_body(&mut body)
            .map_err(|e| NetError::Malformed(e.to_string()))?;

        if body.len() > MAX_MESSAGE_LEN - HEADER_LEN {
            return Err(NetError::Malformed(format!(
                "message body of {} bytes exceeds the protocol limit",
                body.len()
            )));
        }

        let checksum = envelope_checksum(&body);
        let mut out = Vec::with_capacity(HEADER_LEN + body.len());
        out.extend_from_slice(&self.magic.0);
        out.extend_from_slice(&message.command().bytes());
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(&checksum);
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Attempts to decode one envelope from the front of `buf`.
    ///
    /// A malformed header (short buffer once the declared body arrives
    /// would never fit, bad magic, a length over the protocol cap, or a
    /// bad checksum) is reported immediately; per spec.md §4.10 these
    /// always force a disconnect, which is the caller's responsibility once
    /// it sees [`NetError::forces_disconnect`].
    pub fn decode(&self, buf: &[u8]) -> Result<DecodeOutcome, NetError> {
        if buf.len() < HEADER_LEN {
            return Ok(DecodeOutcome::Incomplete {
                needed: HEADER_LEN - buf.len(),
            });
        }

        let mut magic = [0u8; 4];
        magic.copy_from_slice(&buf[0..4]);
        if magic != self.magic.0 {
            return Err(NetError::Malformed("envelope magic does not match the configured network".into()));
        }

        let mut command_bytes = [0u8; 12];
        command_bytes.copy_from_slice(&buf[4..16]);

        let body_len = byteorder::LittleEndian::read_u32(&buf[16..20]) as usize;
        let mut checksum = [0u8; 4];
        checksum.copy_from_slice(&buf[20..24]);

        if HEADER_LEN + body_len > MAX_MESSAGE_LEN {
            return Err(NetError::Malformed(format!(
                "declared body length {} exceeds the protocol limit",
                body_len
            )));
        }
        if command_bytes == Command::Block.bytes() && body_len > MAX_BLOCK_LEN {
            return Err(NetError::Malformed(format!(
                "declared block body length {} exceeds the implicit block bound",
                body_len
            )));
        }

        let total_len = HEADER_LEN + body_len;
        if buf.len() < total_len {
            return Ok(DecodeOutcome::Incomplete {
                needed: total_len - buf.len(),
            });
        }

        let body = &buf[HEADER_LEN..total_len];
        if envelope_checksum(body) != checksum {
            return Err(NetError::Malformed("envelope checksum does not match the body".into()));
        }

        let decoded = match Command::parse_padded(&command_bytes) {
            Ok(command) => {
                let message = Message::read_body(command, body)?;
                Decoded::Known(message)
            }
            Err(_) => Decoded::Unknown(command_bytes),
        };

        Ok(DecodeOutcome::Frame {
            decoded,
            consumed: total_len,
        })
    }
}

/// The first four bytes of the body's double-SHA-256 (spec.md §8: the
/// empty-payload checksum is the fixed constant `5d f6 e0 e2`).
fn envelope_checksum(body: &[u8]) -> [u8; 4] {
    let digest = sha256d::double_sha256(body);
    let mut checksum = [0u8; 4];
    checksum.copy_from_slice(&digest[..4]);
    checksum
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::Nonce;

    fn magic() -> Magic {
        Magic([0xf9, 0xbe, 0xb4, 0xd9])
    }

    #[test]
    fn empty_payload_checksum_matches_the_documented_constant() {
        assert_eq!(envelope_checksum(&[]), [0x5d, 0xf6, 0xe0, 0xe2]);
    }

    #[test]
    fn round_trips_a_ping_through_the_wire_encoding() {
        let codec = Codec::new(magic());
        let message = Message::Ping(Nonce(0x0123_4567_89ab_cdef));
        let bytes = codec.encode(&message).unwrap();
        assert_eq!(bytes.len(), HEADER_LEN + 8);

        match codec.decode(&bytes).unwrap() {
            DecodeOutcome::Frame { decoded, consumed } => {
                assert_eq!(consumed, bytes.len());
                assert_eq!(decoded, Decoded::Known(message));
            }
            DecodeOutcome::Incomplete { .. } => panic!("expected a full frame"),
        }
    }

    #[test]
    fn reports_incomplete_until_the_body_arrives() {
        let codec = Codec::new(magic());
        let bytes = codec.encode(&Message::Ping(Nonce(1))).unwrap();
        match codec.decode(&bytes[..HEADER_LEN + 2]).unwrap() {
            DecodeOutcome::Incomplete { needed } => assert_eq!(needed, 6),
            DecodeOutcome::Frame { .. } => panic!("expected incomplete"),
        }
    }

    #[test]
    fn rejects_wrong_magic() {
        let codec = Codec::new(magic());
        let mut bytes = codec.encode(&Message::Verack).unwrap();
        bytes[0] ^= 0xff;
        assert!(matches!(codec.decode(&bytes), Err(NetError::Malformed(_))));
    }

    #[test]
    fn rejects_bad_checksum() {
        let codec = Codec::new(magic());
        let mut bytes = codec.encode(&Message::Ping(Nonce(7))).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        assert!(matches!(codec.decode(&bytes), Err(NetError::Malformed(_))));
    }

    #[test]
    fn unknown_command_is_reported_not_fatal() {
        let codec = Codec::new(magic());
        let mut bytes = codec.encode(&Message::Verack).unwrap();
        bytes[4..16].copy_from_slice(b"bogus\0\0\0\0\0\0\0");
        // The checksum still has to match the (empty) body for this test to
        // exercise unknown-command handling rather than a checksum failure.
        match codec.decode(&bytes).unwrap() {
            DecodeOutcome::Frame { decoded, .. } => {
                assert!(matches!(decoded, Decoded::Unknown(_)));
            }
            DecodeOutcome::Incomplete { .. } => panic!("expected a full frame"),
        }
    }
}
