//! The capability interface a caller implements to actually react to
//! incoming messages (spec.md §6, §9: "Listener as capability interface").
//!
//! [`MessageListener`] is a polymorphic sink: the dispatcher calls exactly
//! one method per accepted command, naming the originating peer and
//! carrying the typed payload, and does no routing of its own beyond that.
//! Every method defaults to a no-op so an implementor only overrides what
//! it cares about.

use std::net::SocketAddr;

use btcproto_chain::block::header::CountedHeader;
use btcproto_chain::block::{Block, BlockHeader};
use btcproto_chain::bloom::BloomFilter;
use btcproto_chain::hash::Hash256;
use btcproto_chain::inventory::InventoryItem;
use btcproto_chain::transaction::Transaction;

use crate::meta_addr::PeerAddress;
use crate::protocol::message::alert::Alert;
use crate::protocol::message::get_blocks::GetBlocks;
use crate::protocol::message::get_headers::GetHeaders;
use crate::protocol::message::version::Version;
use crate::protocol::types::{Nonce, RejectReason};

#[allow(unused_variables)]
pub trait MessageListener {
    /// A peer announced objects it has (`inv`).
    fn on_inventory(&mut self, peer: SocketAddr, items: &[InventoryItem]) {}

    /// A peer asked for objects by hash (`getdata`).
    fn on_inventory_request(&mut self, peer: SocketAddr, items: &[InventoryItem]) {}

    /// A peer reported it couldn't satisfy a request (`notfound`).
    fn on_not_found(&mut self, peer: SocketAddr, items: &[InventoryItem]) {}

    /// A peer announced addresses it knows of (`addr`).
    fn on_addr(&mut self, peer: SocketAddr, entries: &[PeerAddress]) {}

    /// A peer broadcast an alert. Signature verification is this method's
    /// responsibility, not the dispatcher's (spec.md §4.3).
    fn on_alert(&mut self, peer: SocketAddr, alert: &Alert) {}

    /// A peer sent a full block (`block`).
    fn on_block(&mut self, peer: SocketAddr, block: &Block) {}

    /// A peer sent a batch of headers (`headers`).
    fn on_headers(&mut self, peer: SocketAddr, headers: &[CountedHeader]) {}

    /// A peer asked to install a Bloom filter (`filterload`).
    fn on_filter_load(&mut self, peer: SocketAddr, filter: &BloomFilter) {}

    /// A peer asked to drop its installed filter (`filterclear`).
    fn on_filter_clear(&mut self, peer: SocketAddr) {}

    /// A peer asked for known addresses (`getaddr`).
    fn on_get_addr(&mut self, peer: SocketAddr) {}

    /// A peer asked for blocks after a locator (`getblocks`).
    fn on_get_blocks(&mut self, peer: SocketAddr, request: &GetBlocks) {}

    /// A peer asked for headers after a locator (`getheaders`).
    fn on_get_headers(&mut self, peer: SocketAddr, request: &GetHeaders) {}

    /// A peer sent an SPV proof (`merkleblock`).
    fn on_merkle_block(&mut self, peer: SocketAddr, header: &BlockHeader, matched: &[Hash256]) {}

    /// A peer sent a `ping`; the listener decides whether/how to `pong`.
    fn on_ping(&mut self, peer: SocketAddr, nonce: Nonce) {}

    /// A peer answered a `ping` with `pong`.
    fn on_pong(&mut self, peer: SocketAddr, nonce: Nonce) {}

    /// A peer rejected something this node sent.
    fn on_reject(
        &mut self,
        peer: SocketAddr,
        message: &str,
        ccode: RejectReason,
        reason: &str,
        data: Option<Hash256>,
    ) {
    }

    /// A peer sent a transaction (`tx`).
    fn on_transaction(&mut self, peer: SocketAddr, tx: &Transaction) {}

    /// A peer completed the first half of the handshake (`version`).
    fn on_version(&mut self, peer: SocketAddr, version: &Version) {}

    /// A peer completed the handshake (`verack`).
    fn on_version_ack(&mut self, peer: SocketAddr) {}
}
