//! Small newtype wrappers over primitive wire fields, so e.g. a `Nonce` and
//! a `ProtocolVersion` can't be swapped for one another by accident.

use std::io;

use btcproto_chain::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

/// The negotiated protocol version carried in `version`/`getblocks`/`getheaders`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct ProtocolVersion(pub u32);

impl BitcoinSerialize for ProtocolVersion {
    fn bitcoin_serialize<W: io::Write>(&self, target: W) -> Result<(), io::Error> {
        self.0.bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for ProtocolVersion {
    fn bitcoin_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        Ok(ProtocolVersion(u32::bitcoin_deserialize(reader)?))
    }
}

/// A nonce used by `version` (self-connection detection) and `ping`/`pong`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Nonce(pub u64);

impl BitcoinSerialize for Nonce {
    fn bitcoin_serialize<W: io::Write>(&self, target: W) -> Result<(), io::Error> {
        self.0.bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for Nonce {
    fn bitcoin_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        Ok(Nonce(u64::bitcoin_deserialize(reader)?))
    }
}

impl Nonce {
    /// A fresh random nonce, using the process-wide RNG (spec.md §5: "the
    /// static key-id nonce used in `version` is process-wide").
    pub fn random() -> Nonce {
        Nonce(rand::random())
    }
}

/// The random 32-bit tweak folded into a Bloom filter's per-hash-function
/// seed (spec.md §4.5).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Tweak(pub u32);

/// The four-byte network-selection prefix at the head of every envelope.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Magic(pub [u8; 4]);

impl From<&btcproto_chain::parameters::NetParams> for Magic {
    fn from(params: &btcproto_chain::parameters::NetParams) -> Magic {
        Magic(params.magic)
    }
}

/// `reject` message reason codes (spec.md §4.3).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum RejectReason {
    Malformed,
    Invalid,
    Obsolete,
    Duplicate,
    Nonstandard,
    Dust,
    InsufficientFee,
    Checkpoint,
}

impl RejectReason {
    pub fn code(self) -> u8 {
        match self {
            RejectReason::Malformed => 0x01,
            RejectReason::Invalid => 0x10,
            RejectReason::Obsolete => 0x11,
            RejectReason::Duplicate => 0x12,
            RejectReason::Nonstandard => 0x40,
            RejectReason::Dust => 0x41,
            RejectReason::InsufficientFee => 0x42,
            RejectReason::Checkpoint => 0x43,
        }
    }

    pub fn from_code(code: u8) -> Result<RejectReason, SerializationError> {
        match code {
            0x01 => Ok(RejectReason::Malformed),
            0x10 => Ok(RejectReason::Invalid),
            0x11 => Ok(RejectReason::Obsolete),
            0x12 => Ok(RejectReason::Duplicate),
            0x40 => Ok(RejectReason::Nonstandard),
            0x41 => Ok(RejectReason::Dust),
            0x42 => Ok(RejectReason::InsufficientFee),
            0x43 => Ok(RejectReason::Checkpoint),
            _ => Err(SerializationError::Parse("unrecognized reject reason code")),
        }
    }
}
