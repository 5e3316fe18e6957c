//! The error taxonomy from spec.md §7: each variant names how the envelope
//! or dispatcher should react (ban-score bump, disconnect, or neither).

use btcproto_chain::hash::Hash256;
use btcproto_chain::serialization::SerializationError;

use crate::protocol::types::RejectReason;

/// A framing- or command-level failure.
#[derive(thiserror::Error, Debug, Clone)]
pub enum NetError {
    /// A decoder ran out of bytes. Never recovered; the current message is
    /// rejected.
    #[error("ran out of bytes while decoding a message")]
    EndOfData,

    /// A documented cap was exceeded, a var-string was too long, or the
    /// envelope's magic/checksum didn't match. Surfaced as
    /// `reject/malformed`; ban score increased.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// A semantic invariant was violated (Merkle root mismatch, duplicate
    /// transaction, zero inputs/outputs). Surfaced as `reject/invalid`; ban
    /// score increased.
    #[error("invalid message: {0}")]
    Invalid(String),

    /// The peer's protocol version is below the configured floor. Surfaced
    /// as `reject/obsolete`; the peer is disconnected.
    #[error("peer protocol version is obsolete")]
    Obsolete,

    /// The peer lacks a required service. The peer is disconnected.
    #[error("peer lacks a required service")]
    NonStandard,

    /// A signing, verification, or encryption failure. Surfaced to the
    /// caller that requested the operation; never affects peer state unless
    /// the failing item was peer-supplied.
    #[error("cryptographic failure: {0}")]
    CryptographicFailure(String),

    /// `NetParams::init` was called twice, or used before being called.
    /// Fatal to the process.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl NetError {
    /// The `reject` reason code this error should be reported under, if
    /// any (`Obsolete`/`NonStandard` lead to disconnect rather than a
    /// `reject` round-trip, and `CryptographicFailure`/`Configuration`
    /// never touch peer state).
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            NetError::Malformed(_) => Some(RejectReason::Malformed),
            NetError::Invalid(_) => Some(RejectReason::Invalid),
            NetError::Obsolete => Some(RejectReason::Obsolete),
            _ => None,
        }
    }

    /// How much a peer's ban score should increase for this failure
    /// (spec.md §4.10). Severity-dependent: broken envelopes and invariant
    /// violations cost more than a merely obsolete version.
    pub fn ban_score_delta(&self) -> u8 {
        match self {
            NetError::EndOfData | NetError::Malformed(_) => 20,
            NetError::Invalid(_) => 20,
            NetError::Obsolete | NetError::NonStandard => 100,
            NetError::CryptographicFailure(_) | NetError::Configuration(_) => 0,
        }
    }

    /// Whether this failure always terminates the connection outright,
    /// independent of accrued ban score (spec.md §4.10: "broken envelopes...
    /// always trigger disconnect").
    pub fn forces_disconnect(&self) -> bool {
        matches!(
            self,
            NetError::EndOfData | NetError::Obsolete | NetError::NonStandard
        )
    }
}

impl From<SerializationError> for NetError {
    fn from(err: SerializationError) -> NetError {
        if err.is_end_of_data() {
            NetError::EndOfData
        } else {
            NetError::Malformed(err.to_string())
        }
    }
}

/// A parse or validation failure tagged with the peer it came from, so the
/// dispatcher can "catch a parse failure and surface it as an error
/// carrying the peer identity" (spec.md §4.3) instead of propagating an
/// untagged error to the I/O loop.
#[derive(Debug, Clone)]
pub struct PeerError {
    pub peer: std::net::SocketAddr,
    pub error: NetError,
    /// The hash of the offending block/transaction, when one is known.
    pub subject: Option<Hash256>,
}

impl PeerError {
    pub fn new(peer: std::net::SocketAddr, error: NetError) -> PeerError {
        PeerError {
            peer,
            error,
            subject: None,
        }
    }

    pub fn with_subject(mut self, subject: Hash256) -> PeerError {
        self.subject = Some(subject);
        self
    }
}

impl std::fmt::Display for PeerError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}: {}", self.peer, self.error)
    }
}

impl std::error::Error for PeerError {}
