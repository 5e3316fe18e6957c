//! The handshake state machine and per-command dispatch (spec.md §4.9,
//! §4.10): "a pure function from the envelope plus the listener to a
//! side-effecting callback." A parse failure is caught here and surfaced as
//! a [`PeerError`] carrying the peer's identity — it must never propagate
//! to the caller's I/O loop uncaught.

use std::collections::HashSet;

use btcproto_chain::parameters::{NetParams, PeerServices};

use crate::constants::{
    MAX_ADDR_ENTRIES, MAX_FILTERADD_LEN, MAX_GETDATA_ENTRIES, MAX_HEADERS_ENTRIES,
    MAX_INV_ENTRIES, MAX_LOCATOR_HASHES,
};
use crate::error::{NetError, PeerError};
use crate::listener::MessageListener;
use crate::peer::{HandshakeState, Peer};
use crate::protocol::codec::Decoded;
use crate::protocol::message::Message;

/// Marks that this side has sent its own `version` (spec.md §4.9: "Sending
/// `version` advances from NEW").
pub fn note_version_sent<H>(peer: &mut Peer<H>) {
    if peer.handshake == HandshakeState::New {
        peer.handshake = HandshakeState::VersionSent;
    }
}

/// Feeds one decoded envelope through the handshake state machine and, once
/// the peer is `READY`, to the listener.
pub fn dispatch<H>(
    peer: &mut Peer<H>,
    decoded: Decoded,
    listener: &mut impl MessageListener,
) -> Result<(), PeerError> {
    let addr = peer.address.addr;

    let message = match decoded {
        Decoded::Known(message) => message,
        Decoded::Unknown(_) => {
            // Reported but not fatal (spec.md §4.2); nothing further to do.
            return Ok(());
        }
    };

    match (peer.handshake, &message) {
        (HandshakeState::New, Message::Version(version))
        | (HandshakeState::VersionSent, Message::Version(version)) => {
            let params = NetParams::get();
            if version.version.0 < params.min_peer_version {
                return Err(reject(peer, addr, NetError::Obsolete));
            }
            let required_services = params.services & PeerServices::NODE_NETWORK;
            if !version.services.contains(required_services) {
                return Err(reject(peer, addr, NetError::NonStandard));
            }

            peer.negotiated_version = Some(version.version);
            peer.services = Some(version.services);
            peer.user_agent = Some(version.user_agent.clone());
            peer.reported_height = Some(version.best_block);
            peer.handshake = HandshakeState::VersionReceived;
            listener.on_version(addr, version);
            Ok(())
        }
        (HandshakeState::VersionReceived, Message::Verack) => {
            peer.handshake = HandshakeState::Ready;
            listener.on_version_ack(addr);
            Ok(())
        }
        (HandshakeState::Ready, Message::Verack) | (HandshakeState::Ready, Message::Version(_)) => {
            // A redundant handshake message once already READY; ignored.
            Ok(())
        }
        (HandshakeState::Ready, _) => {
            dispatch_ready(peer, message, listener).map_err(|error| reject(peer, addr, error))
        }
        (_, _) => {
            let error = NetError::Invalid("command received before the handshake completed".into());
            Err(reject(peer, addr, error))
        }
    }
}

/// Applies an error's ban-score and disconnect consequences to `peer` and
/// wraps it as a [`PeerError`] (spec.md §4.10).
fn reject<H>(peer: &mut Peer<H>, addr: std::net::SocketAddr, error: NetError) -> PeerError {
    peer.add_ban_score(error.ban_score_delta());
    if error.forces_disconnect() {
        peer.disconnect = true;
    }
    PeerError::new(addr, error)
}

fn dispatch_ready<H>(
    peer: &mut Peer<H>,
    message: Message,
    listener: &mut impl MessageListener,
) -> Result<(), NetError> {
    let addr = peer.address.addr;
    match message {
        Message::Version(_) | Message::Verack => unreachable!("handled before dispatch_ready"),
        Message::Addr(entries) => {
            check_cap("addr", entries.len(), MAX_ADDR_ENTRIES)?;
            listener.on_addr(addr, &entries);
        }
        Message::Inv(items) => {
            check_cap("inv", items.len(), MAX_INV_ENTRIES)?;
            listener.on_inventory(addr, &items);
        }
        Message::GetData(items) => {
            check_cap("getdata", items.len(), MAX_GETDATA_ENTRIES)?;
            listener.on_inventory_request(addr, &items);
        }
        Message::NotFound(items) => {
            check_cap("notfound", items.len(), MAX_INV_ENTRIES)?;
            listener.on_not_found(addr, &items);
        }
        Message::GetBlocks(request) => {
            check_cap("getblocks", request.locator_hashes.len(), MAX_LOCATOR_HASHES)?;
            listener.on_get_blocks(addr, &request);
        }
        Message::GetHeaders(request) => {
            check_cap("getheaders", request.locator_hashes.len(), MAX_LOCATOR_HASHES)?;
            listener.on_get_headers(addr, &request);
        }
        Message::Headers(headers) => {
            check_cap("headers", headers.len(), MAX_HEADERS_ENTRIES)?;
            let pow_limit = &NetParams::get().pow_limit;
            let now = chrono::Utc::now();
            for counted in &headers {
                counted
                    .header
                    .validate(pow_limit, now)
                    .map_err(|e| NetError::Invalid(e.to_string()))?;
            }
            listener.on_headers(addr, &headers);
        }
        Message::Block(block) => {
            if !block.merkle_root_is_valid() {
                return Err(NetError::Invalid("block's Merkle root does not match its transactions".into()));
            }
            let mut seen = HashSet::with_capacity(block.transactions.len());
            for tx in &block.transactions {
                if !seen.insert(tx.hash()) {
                    return Err(NetError::Invalid("duplicate transaction in block".into()));
                }
                btcproto_chain::transaction::validate(tx).map_err(|e| NetError::Invalid(e.to_string()))?;
            }
            block
                .header
                .validate(&NetParams::get().pow_limit, chrono::Utc::now())
                .map_err(|e| NetError::Invalid(e.to_string()))?;
            listener.on_block(addr, &block);
        }
        Message::Tx(tx) => {
            btcproto_chain::transaction::validate(&tx).map_err(|e| NetError::Invalid(e.to_string()))?;
            listener.on_transaction(addr, &tx);
        }
        Message::MerkleBlock(merkle_block) => {
            merkle_block
                .header
                .validate(&NetParams::get().pow_limit, chrono::Utc::now())
                .map_err(|e| NetError::Invalid(e.to_string()))?;
            let matched = merkle_block
                .verify()
                .map_err(|e| NetError::Invalid(e.to_string()))?;
            listener.on_merkle_block(addr, &merkle_block.header, &matched);
        }
        Message::FilterLoad(filter) => {
            peer.set_filter(filter.clone());
            listener.on_filter_load(addr, &filter);
        }
        Message::FilterAdd { data } => {
            check_cap("filteradd", data.len(), MAX_FILTERADD_LEN)?;
            // Silently ignored if no filter is installed (spec.md §4.3).
            peer.add_filter_element(&data);
        }
        Message::FilterClear => {
            peer.clear_filter();
            listener.on_filter_clear(addr);
        }
        Message::GetAddr => listener.on_get_addr(addr),
        Message::Mempool => {}
        Message::Ping(nonce) => listener.on_ping(addr, nonce),
        Message::Pong(nonce) => listener.on_pong(addr, nonce),
        Message::Reject {
            message,
            ccode,
            reason,
            data,
        } => listener.on_reject(addr, &message, ccode, &reason, data),
        Message::Alert(alert) => listener.on_alert(addr, &alert),
    }
    Ok(())
}

fn check_cap(what: &'static str, len: usize, max: usize) -> Result<(), NetError> {
    if len > max {
        Err(NetError::Malformed(format!(
            "{what} carried {len} entries, over the {max} limit"
        )))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta_addr::PeerAddress;
    use crate::protocol::types::{Nonce, ProtocolVersion};
    use btcproto_chain::block::Height;
    use btcproto_chain::parameters::PeerServices;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    #[derive(Default)]
    struct Recorder {
        pings: Vec<Nonce>,
        versions: usize,
        acks: usize,
    }

    impl MessageListener for Recorder {
        fn on_ping(&mut self, _peer: SocketAddr, nonce: Nonce) {
            self.pings.push(nonce);
        }
        fn on_version(&mut self, _peer: SocketAddr, _version: &crate::protocol::message::version::Version) {
            self.versions += 1;
        }
        fn on_version_ack(&mut self, _peer: SocketAddr) {
            self.acks += 1;
        }
    }

    /// Network parameters are process-wide and one-shot; tests in this
    /// binary share a single `OnceCell`, so later callers tolerate it
    /// already being set.
    fn init_params() {
        let _ = btcproto_chain::parameters::NetParams::init(
            btcproto_chain::parameters::NetParams::mainnet("test-app"),
        );
    }

    fn peer() -> Peer<()> {
        let address = PeerAddress::new(
            SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8333),
            PeerServices::NODE_NETWORK,
            chrono::Utc::now(),
        );
        Peer::new(address, ())
    }

    fn version_message() -> Message {
        Message::Version(crate::protocol::message::version::Version::new(
            ProtocolVersion(70015),
            PeerServices::NODE_NETWORK,
            SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8333),
            PeerServices::NODE_NETWORK,
            SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8334),
            Nonce(1),
            "/test/".to_owned(),
            Height(0),
            true,
        ))
    }

    #[test]
    fn handshake_reaches_ready_before_other_commands_are_accepted() {
        init_params();
        let mut p = peer();
        let mut listener = Recorder::default();

        dispatch(&mut p, Decoded::Known(version_message()), &mut listener).unwrap();
        assert_eq!(p.handshake, HandshakeState::VersionReceived);
        assert_eq!(listener.versions, 1);

        dispatch(&mut p, Decoded::Known(Message::Verack), &mut listener).unwrap();
        assert_eq!(p.handshake, HandshakeState::Ready);
        assert_eq!(listener.acks, 1);

        dispatch(&mut p, Decoded::Known(Message::Ping(Nonce(9))), &mut listener).unwrap();
        assert_eq!(listener.pings, vec![Nonce(9)]);
    }

    #[test]
    fn non_version_command_before_handshake_is_a_protocol_violation() {
        let mut p = peer();
        let mut listener = Recorder::default();
        let err = dispatch(&mut p, Decoded::Known(Message::Ping(Nonce(1))), &mut listener).unwrap_err();
        assert!(matches!(err.error, NetError::Invalid(_)));
        assert!(p.ban_score() > 0);
    }

    #[test]
    fn oversized_inv_is_rejected_and_accrues_ban_score() {
        init_params();
        let mut p = peer();
        let mut listener = Recorder::default();
        dispatch(&mut p, Decoded::Known(version_message()), &mut listener).unwrap();
        dispatch(&mut p, Decoded::Known(Message::Verack), &mut listener).unwrap();

        let items: Vec<_> = (0..MAX_INV_ENTRIES + 1)
            .map(|i| btcproto_chain::inventory::InventoryItem::block(btcproto_chain::hash::Hash256([i as u8; 32])))
            .collect();
        let err = dispatch(&mut p, Decoded::Known(Message::Inv(items)), &mut listener).unwrap_err();
        assert!(matches!(err.error, NetError::Malformed(_)));
        assert!(p.ban_score() > 0);
    }

    #[test]
    fn obsolete_version_is_rejected_and_disconnects() {
        init_params();
        let mut p = peer();
        let mut listener = Recorder::default();

        let message = Message::Version(crate::protocol::message::version::Version::new(
            ProtocolVersion(70000),
            PeerServices::NODE_NETWORK,
            SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8333),
            PeerServices::NODE_NETWORK,
            SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8334),
            Nonce(1),
            "/test/".to_owned(),
            Height(0),
            true,
        ));
        let err = dispatch(&mut p, Decoded::Known(message), &mut listener).unwrap_err();
        assert!(matches!(err.error, NetError::Obsolete));
        assert!(p.disconnect);
        assert_eq!(p.handshake, HandshakeState::New);
        assert_eq!(listener.versions, 0);
    }

    #[test]
    fn version_without_node_network_service_is_rejected_and_disconnects() {
        init_params();
        let mut p = peer();
        let mut listener = Recorder::default();

        let message = Message::Version(crate::protocol::message::version::Version::new(
            ProtocolVersion(70015),
            PeerServices::NODE_BLOOM,
            SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8333),
            PeerServices::NODE_NETWORK,
            SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8334),
            Nonce(1),
            "/test/".to_owned(),
            Height(0),
            true,
        ));
        let err = dispatch(&mut p, Decoded::Known(message), &mut listener).unwrap_err();
        assert!(matches!(err.error, NetError::NonStandard));
        assert!(p.disconnect);
        assert_eq!(listener.versions, 0);
    }

    fn ready_peer() -> Peer<()> {
        init_params();
        let mut p = peer();
        let mut listener = Recorder::default();
        dispatch(&mut p, Decoded::Known(version_message()), &mut listener).unwrap();
        dispatch(&mut p, Decoded::Known(Message::Verack), &mut listener).unwrap();
        p
    }

    fn zero_input_transaction() -> btcproto_chain::transaction::Transaction {
        btcproto_chain::transaction::Transaction::new(1, vec![], vec![], 0)
    }

    #[test]
    fn zero_input_transaction_is_rejected_as_invalid() {
        let mut p = ready_peer();
        let mut listener = Recorder::default();
        let message = Message::Tx(std::sync::Arc::new(zero_input_transaction()));
        let err = dispatch(&mut p, Decoded::Known(message), &mut listener).unwrap_err();
        assert!(matches!(err.error, NetError::Invalid(_)));
    }

    #[test]
    fn block_with_mismatched_merkle_root_is_rejected() {
        let mut p = ready_peer();
        let mut listener = Recorder::default();

        let input = btcproto_chain::transparent::TransactionInput::new(
            btcproto_chain::transparent::OutPoint::coinbase(),
            btcproto_chain::transparent::Script(vec![0x01]),
            0xffff_ffff,
        );
        let output = btcproto_chain::transparent::TransactionOutput {
            value: btcproto_chain::amount::Amount::<btcproto_chain::amount::NonNegative>::try_from(50_0000_0000)
                .unwrap(),
            lock_script: btcproto_chain::transparent::Script(vec![0x6a]),
        };
        let tx = btcproto_chain::transaction::Transaction::new(1, vec![input], vec![output], 0);

        let header = btcproto_chain::block::BlockHeader::new(
            1,
            btcproto_chain::hash::Hash256::ZERO,
            btcproto_chain::block::merkle::Root(btcproto_chain::hash::Hash256::ZERO),
            chrono::Utc::now(),
            btcproto_chain::work::difficulty::CompactDifficulty(0x1d00_ffff),
            0,
        );
        let block = btcproto_chain::block::Block::new(header, vec![tx]);
        let message = Message::Block(std::sync::Arc::new(block));
        let err = dispatch(&mut p, Decoded::Known(message), &mut listener).unwrap_err();
        assert!(matches!(err.error, NetError::Invalid(_)));
    }
}
