//! End-to-end scenarios spanning framing, the handshake, and dispatch
//! together, rather than one message type in isolation.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use btcproto_chain::block::{BlockHeader, Height};
use btcproto_chain::block::merkle;
use btcproto_chain::bloom::{BloomFilter, UpdateFlags};
use btcproto_chain::hash::Hash256;
use btcproto_chain::parameters::{NetParams, PeerServices};
use btcproto_chain::work::difficulty::CompactDifficulty;

use btcproto_net::dispatch::{dispatch, note_version_sent};
use btcproto_net::listener::MessageListener;
use btcproto_net::peer::{HandshakeState, Peer};
use btcproto_net::protocol::codec::{Codec, Decoded};
use btcproto_net::protocol::message::merkle_block::MerkleBlock;
use btcproto_net::protocol::message::version::Version;
use btcproto_net::protocol::types::{Magic, Nonce, ProtocolVersion};
use btcproto_net::Message;

fn peer_addr(port: u16) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), port)
}

#[test]
fn version_round_trips_with_the_expected_fields() {
    use btcproto_chain::serialization::{BitcoinDeserialize, BitcoinSerialize};

    let version = Version::new(
        ProtocolVersion(70015),
        PeerServices::NODE_NETWORK,
        peer_addr(8333),
        PeerServices::NODE_NETWORK,
        peer_addr(40000),
        Nonce::random(),
        "/app:0.1.0/".to_owned(),
        Height(0),
        true,
    );

    let bytes = version.bitcoin_serialize_to_vec().unwrap();
    let parsed = Version::bitcoin_deserialize(&bytes[..]).unwrap();

    assert_eq!(parsed.version, ProtocolVersion(70015));
    assert_eq!(parsed.services, PeerServices::NODE_NETWORK);
    assert_eq!(parsed.user_agent, "/app:0.1.0/");
    assert_eq!(parsed.best_block, Height(0));
}

#[derive(Default)]
struct Recorder {
    pings: Vec<Nonce>,
    merkle_matches: Vec<Hash256>,
}

impl MessageListener for Recorder {
    fn on_ping(&mut self, _peer: SocketAddr, nonce: Nonce) {
        self.pings.push(nonce);
    }

    fn on_merkle_block(&mut self, _peer: SocketAddr, _header: &BlockHeader, matched: &[Hash256]) {
        self.merkle_matches.extend_from_slice(matched);
    }
}

fn ready_peer() -> (Peer<()>, Recorder) {
    // Network parameters are process-wide and one-shot; tolerate a second
    // test in this binary having already set them.
    let _ = NetParams::init(NetParams::testnet("test-app"));

    let address = btcproto_net::meta_addr::PeerAddress::new(
        peer_addr(8333),
        PeerServices::NODE_NETWORK,
        chrono::Utc::now(),
    );
    let mut peer = Peer::new(address, ());
    let mut listener = Recorder::default();

    note_version_sent(&mut peer);
    let version = Message::Version(Version::new(
        ProtocolVersion(70015),
        PeerServices::NODE_NETWORK,
        peer_addr(8333),
        PeerServices::NODE_NETWORK,
        peer_addr(40000),
        Nonce(1),
        "/app/".to_owned(),
        Height(0),
        true,
    ));
    dispatch(&mut peer, Decoded::Known(version), &mut listener).unwrap();
    dispatch(&mut peer, Decoded::Known(Message::Verack), &mut listener).unwrap();
    assert_eq!(peer.handshake, HandshakeState::Ready);

    (peer, listener)
}

#[test]
fn installing_a_filter_and_adding_an_element_makes_both_match() {
    let (peer, _listener) = ready_peer();

    let a = vec![1u8; 20];
    let b = vec![2u8; 20];
    let c = vec![3u8; 20];

    let mut filter = BloomFilter::new(2, 0.0005, 0, UpdateFlags::All);
    filter.insert(&a);
    filter.insert(&b);
    peer.set_filter(filter);
    peer.add_filter_element(&c);

    assert!(peer.filter_contains(&a));
    assert!(peer.filter_contains(&b));
    assert!(peer.filter_contains(&c));
}

#[test]
fn a_framed_ping_reaches_the_listener_through_the_codec_and_dispatcher() {
    let (mut peer, mut listener) = ready_peer();
    let codec = Codec::new(Magic([0xf9, 0xbe, 0xb4, 0xd9]));

    let wire = codec
        .encode(&Message::Ping(Nonce(0x0123_4567_89ab_cdef)))
        .unwrap();

    let decoded = match codec.decode(&wire).unwrap() {
        btcproto_net::protocol::codec::DecodeOutcome::Frame { decoded, consumed } => {
            assert_eq!(consumed, wire.len());
            decoded
        }
        btcproto_net::protocol::codec::DecodeOutcome::Incomplete { .. } => {
            panic!("expected a complete frame")
        }
    };

    dispatch(&mut peer, decoded, &mut listener).unwrap();
    assert_eq!(listener.pings, vec![Nonce(0x0123_4567_89ab_cdef)]);
}

#[test]
fn merkle_block_from_a_four_leaf_tree_reports_the_matched_transaction() {
    let (mut peer, mut listener) = ready_peer();

    let leaves: Vec<Hash256> = (1u8..=4).map(|b| Hash256([b; 32])).collect();
    let root = merkle::root(&leaves);
    let header = BlockHeader::new(
        1,
        Hash256::ZERO,
        root,
        chrono::Utc::now(),
        CompactDifficulty(0x207f_ffff),
        0,
    );
    let matches = vec![false, false, true, false];
    let branch = merkle::MerkleBranch::build(&leaves, &matches);
    let message = Message::MerkleBlock(MerkleBlock { header, branch });

    dispatch(&mut peer, Decoded::Known(message), &mut listener).unwrap();
    assert_eq!(listener.merkle_matches, vec![leaves[2]]);
}
