//! Per-connection state (spec.md §3): what the library tracks about one
//! remote peer, independent of however the caller actually moves bytes over
//! a socket.

use std::collections::VecDeque;
use std::sync::Mutex;

use btcproto_chain::block::Height;
use btcproto_chain::bloom::BloomFilter;
use btcproto_chain::parameters::PeerServices;

use crate::meta_addr::PeerAddress;
use crate::protocol::message::Message;
use crate::protocol::types::ProtocolVersion;

/// The ban score at which a peer is marked for disconnect (spec.md §4.9).
pub const BAN_SCORE_DISCONNECT_THRESHOLD: u8 = 100;

/// How far through the `version`/`verack` handshake a peer has gotten.
///
/// Named fields rather than the raw 0/1/2 counter spec.md's data model uses,
/// since the count alone doesn't say whether *we* sent `version`, the peer
/// did, or both — see [`crate::dispatch`] for the state machine this drives.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum HandshakeState {
    New,
    VersionSent,
    VersionReceived,
    Ready,
}

impl HandshakeState {
    /// The 0/1/2 count spec.md §3 describes the field as.
    pub fn count(self) -> u8 {
        match self {
            HandshakeState::New => 0,
            HandshakeState::VersionSent | HandshakeState::VersionReceived => 1,
            HandshakeState::Ready => 2,
        }
    }
}

/// One remote peer: its address, negotiated capabilities, and the small
/// amount of mutable state a dispatcher needs to drive the handshake and
/// enforce the protocol's caps.
///
/// `Handle` is an opaque identifier for whatever transport or selector
/// registration the caller uses to actually move bytes (a socket, an event
/// loop token) — this crate never interprets it, only carries it alongside
/// the protocol state it's attached to.
pub struct Peer<Handle> {
    pub address: PeerAddress,
    pub handle: Handle,

    /// Bytes received but not yet framed into a complete envelope.
    pub input_buffer: Vec<u8>,
    /// Messages queued to send, in order.
    pub output_queue: VecDeque<Message>,

    pub handshake: HandshakeState,
    pub negotiated_version: Option<ProtocolVersion>,
    pub services: Option<PeerServices>,
    pub user_agent: Option<String>,
    pub reported_height: Option<Height>,

    pub disconnect: bool,
    ban_score: u8,
    /// Set by the outer layer when a `ping` has been sent and not yet
    /// answered; the core holds no timers of its own (spec.md §5) so
    /// timeout policy lives outside this struct.
    pub ping_outstanding: bool,

    /// The only field in `Peer` that needs cross-thread synchronization
    /// (spec.md §5): `filterload`/`filteradd`/`filterclear` can mutate it
    /// concurrently with a reader building an outgoing `merkleblock`.
    filter: Mutex<Option<BloomFilter>>,
}

impl<Handle> Peer<Handle> {
    pub fn new(address: PeerAddress, handle: Handle) -> Peer<Handle> {
        Peer {
            address,
            handle,
            input_buffer: Vec::new(),
            output_queue: VecDeque::new(),
            handshake: HandshakeState::New,
            negotiated_version: None,
            services: None,
            user_agent: None,
            reported_height: None,
            disconnect: false,
            ban_score: 0,
            ping_outstanding: false,
            filter: Mutex::new(None),
        }
    }

    pub fn ban_score(&self) -> u8 {
        self.ban_score
    }

    /// Increases the ban score by `delta`, saturating at 100, and marks the
    /// peer for disconnect once the threshold is reached (spec.md §4.9).
    pub fn add_ban_score(&mut self, delta: u8) {
        self.ban_score = self.ban_score.saturating_add(delta);
        if self.ban_score >= BAN_SCORE_DISCONNECT_THRESHOLD {
            self.disconnect = true;
        }
    }

    /// Installs a new filter, replacing any previous one (`filterload`).
    pub fn set_filter(&self, filter: BloomFilter) {
        *self.filter.lock().unwrap() = Some(filter);
    }

    /// Adds one element to the installed filter, if any (`filteradd`). A
    /// peer with no filter installed is a silent no-op (spec.md §4.3).
    pub fn add_filter_element(&self, element: &[u8]) {
        if let Some(filter) = self.filter.lock().unwrap().as_mut() {
            filter.insert(element);
        }
    }

    /// Drops the installed filter (`filterclear`).
    pub fn clear_filter(&self) {
        *self.filter.lock().unwrap() = None;
    }

    /// Whether `element` would match the installed filter; `false` if no
    /// filter is installed.
    pub fn filter_contains(&self, element: &[u8]) -> bool {
        self.filter
            .lock()
            .unwrap()
            .as_ref()
            .map_or(false, |f| f.contains(element))
    }

    pub fn has_filter(&self) -> bool {
        self.filter.lock().unwrap().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use btcproto_chain::bloom::UpdateFlags;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    fn peer() -> Peer<u64> {
        let address = PeerAddress::new(
            SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8333),
            PeerServices::NODE_NETWORK,
            chrono::Utc::now(),
        );
        Peer::new(address, 0)
    }

    #[test]
    fn ban_score_accrual_marks_disconnect_at_threshold() {
        let mut p = peer();
        p.add_ban_score(40);
        assert!(!p.disconnect);
        p.add_ban_score(60);
        assert!(p.disconnect);
        assert_eq!(p.ban_score(), 100);
    }

    #[test]
    fn ban_score_saturates_rather_than_wrapping() {
        let mut p = peer();
        p.add_ban_score(250);
        assert_eq!(p.ban_score(), 100);
    }

    #[test]
    fn filter_lifecycle() {
        let p = peer();
        assert!(!p.has_filter());
        assert!(!p.filter_contains(b"abc"));

        let filter = BloomFilter::new(2, 0.0005, 0, UpdateFlags::All);
        p.set_filter(filter);
        p.add_filter_element(b"abc");
        assert!(p.filter_contains(b"abc"));

        p.clear_filter();
        assert!(!p.has_filter());
    }
}
