//! The `Message` envelope payload (spec.md §4.3): one variant per entry in
//! the 21-command closed set. Ported from the teacher's `message.rs` +
//! `message/*.rs` submodules for the commands both protocols share; the
//! teacher's BIP152 compact-block variants (`CompactBlock`, `GetBlockTxn`,
//! `BlockTxn`, `SendCompact`, `FeeFilter`, `SendHeaders`) are not carried
//! forward, and `Alert` is added fresh.

use std::io;
use std::sync::Arc;

use btcproto_chain::block::header::CountedHeader;
use btcproto_chain::block::Block;
use btcproto_chain::bloom::BloomFilter;
use btcproto_chain::hash::Hash256;
use btcproto_chain::inventory::InventoryItem;
use btcproto_chain::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};
use btcproto_chain::transaction::Transaction;

use crate::meta_addr::PeerAddress;
use crate::protocol::command::Command;
use crate::protocol::message::alert::Alert;
use crate::protocol::message::get_blocks::GetBlocks;
use crate::protocol::message::get_headers::GetHeaders;
use crate::protocol::message::merkle_block::MerkleBlock;
use crate::protocol::message::version::Version;
use crate::protocol::types::{Nonce, RejectReason};

pub mod alert;
pub mod get_blocks;
pub mod get_headers;
pub mod merkle_block;
pub mod version;

/// The body of a single framed message, already stripped of its envelope.
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    Version(Version),
    Verack,
    Addr(Vec<PeerAddress>),
    Inv(Vec<InventoryItem>),
    GetData(Vec<InventoryItem>),
    NotFound(Vec<InventoryItem>),
    GetBlocks(GetBlocks),
    GetHeaders(GetHeaders),
    Headers(Vec<CountedHeader>),
    Block(Arc<Block>),
    Tx(Arc<Transaction>),
    MerkleBlock(MerkleBlock),
    FilterLoad(BloomFilter),
    FilterAdd { data: Vec<u8> },
    FilterClear,
    GetAddr,
    Mempool,
    Ping(Nonce),
    Pong(Nonce),
    Reject {
        message: String,
        ccode: RejectReason,
        reason: String,
        data: Option<Hash256>,
    },
    Alert(Alert),
}

impl Message {
    /// The command name this message is framed under.
    pub fn command(&self) -> Command {
        match self {
            Message::Version(_) => Command::Version,
            Message::Verack => Command::Verack,
            Message::Addr(_) => Command::Addr,
            Message::Inv(_) => Command::Inv,
            Message::GetData(_) => Command::GetData,
            Message::NotFound(_) => Command::NotFound,
            Message::GetBlocks(_) => Command::GetBlocks,
            Message::GetHeaders(_) => Command::GetHeaders,
            Message::Headers(_) => Command::Headers,
            Message::Block(_) => Command::Block,
            Message::Tx(_) => Command::Tx,
            Message::MerkleBlock(_) => Command::MerkleBlock,
            Message::FilterLoad(_) => Command::FilterLoad,
            Message::FilterAdd { .. } => Command::FilterAdd,
            Message::FilterClear => Command::FilterClear,
            Message::GetAddr => Command::GetAddr,
            Message::Mempool => Command::Mempool,
            Message::Ping(_) => Command::Ping,
            Message::Pong(_) => Command::Pong,
            Message::Reject { .. } => Command::Reject,
            Message::Alert(_) => Command::Alert,
        }
    }

    /// Serializes the payload body (the part that follows the envelope
    /// header). Empty-bodied commands (`verack`, `filterclear`, `getaddr`,
    /// `mempool`) write nothing.
    pub fn write_body<W: io::Write>(&self, mut target: W) -> Result<(), io::Error> {
        match self {
            Message::Version(v) => v.bitcoin_serialize(target),
            Message::Verack => Ok(()),
            Message::Addr(entries) => entries.bitcoin_serialize(target),
            Message::Inv(items) => items.bitcoin_serialize(target),
            Message::GetData(items) => items.bitcoin_serialize(target),
            Message::NotFound(items) => items.bitcoin_serialize(target),
            Message::GetBlocks(body) => body.bitcoin_serialize(target),
            Message::GetHeaders(body) => body.bitcoin_serialize(target),
            Message::Headers(headers) => headers.bitcoin_serialize(target),
            Message::Block(block) => block.bitcoin_serialize(target),
            Message::Tx(tx) => tx.bitcoin_serialize(target),
            Message::MerkleBlock(body) => body.bitcoin_serialize(target),
            Message::FilterLoad(filter) => filter.bitcoin_serialize(target),
            Message::FilterAdd { data } => data.bitcoin_serialize(target),
            Message::FilterClear => Ok(()),
            Message::GetAddr => Ok(()),
            Message::Mempool => Ok(()),
            Message::Ping(nonce) => nonce.bitcoin_serialize(target),
            Message::Pong(nonce) => nonce.bitcoin_serialize(target),
            Message::Reject {
                message,
                ccode,
                reason,
                data,
            } => {
                message.bitcoin_serialize(&mut target)?;
                ccode.code().bitcoin_serialize(&mut target)?;
                reason.bitcoin_serialize(&mut target)?;
                data.bitcoin_serialize(target)
            }
            Message::Alert(alert) => alert.bitcoin_serialize(target),
        }
    }

    /// Parses a message body given the command name already read from the
    /// envelope header.
    pub fn read_body<R: io::Read>(
        command: Command,
        mut reader: R,
    ) -> Result<Message, SerializationError> {
        Ok(match command {
            Command::Version => Message::Version(Version::bitcoin_deserialize(reader)?),
            Command::Verack => Message::Verack,
            Command::Addr => Message::Addr(Vec::<PeerAddress>::bitcoin_deserialize(reader)?),
            Command::Inv => Message::Inv(Vec::<InventoryItem>::bitcoin_deserialize(reader)?),
            Command::GetData => Message::GetData(Vec::<InventoryItem>::bitcoin_deserialize(reader)?),
            Command::NotFound => Message::NotFound(Vec::<InventoryItem>::bitcoin_deserialize(reader)?),
            Command::GetBlocks => Message::GetBlocks(GetBlocks::bitcoin_deserialize(reader)?),
            Command::GetHeaders => Message::GetHeaders(GetHeaders::bitcoin_deserialize(reader)?),
            Command::Headers => Message::Headers(Vec::<CountedHeader>::bitcoin_deserialize(reader)?),
            Command::Block => Message::Block(Arc::new(Block::bitcoin_deserialize(reader)?)),
            Command::Tx => Message::Tx(Arc::new(Transaction::bitcoin_deserialize(reader)?)),
            Command::MerkleBlock => Message::MerkleBlock(MerkleBlock::bitcoin_deserialize(reader)?),
            Command::FilterLoad => Message::FilterLoad(BloomFilter::bitcoin_deserialize(reader)?),
            Command::FilterAdd => Message::FilterAdd {
                data: Vec::<u8>::bitcoin_deserialize(reader)?,
            },
            Command::FilterClear => Message::FilterClear,
            Command::GetAddr => Message::GetAddr,
            Command::Mempool => Message::Mempool,
            Command::Ping => Message::Ping(Nonce::bitcoin_deserialize(reader)?),
            Command::Pong => Message::Pong(Nonce::bitcoin_deserialize(reader)?),
            Command::Reject => {
                let message = String::bitcoin_deserialize(&mut reader)?;
                let ccode = RejectReason::from_code(u8::bitcoin_deserialize(&mut reader)?)?;
                let reason = String::bitcoin_deserialize(&mut reader)?;
                let data = Hash256::bitcoin_deserialize(&mut reader).ok();
                Message::Reject {
                    message,
                    ccode,
                    reason,
                    data,
                }
            }
            Command::Alert => Message::Alert(Alert::bitcoin_deserialize(reader)?),
        })
    }
}

/// `UpdateFlags` is re-exported here so callers building a `FilterLoad`
/// message don't need to reach into `btcproto_chain` directly.
pub use btcproto_chain::bloom::UpdateFlags as FilterUpdateFlags;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta_addr::UntimestampedAddress;
    use btcproto_chain::block::Height;
    use btcproto_chain::parameters::PeerServices;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), port)
    }

    fn round_trip(msg: &Message) -> Message {
        let mut bytes = Vec::new();
        msg.write_body(&mut bytes).unwrap();
        Message::read_body(msg.command(), &bytes[..]).unwrap()
    }

    #[test]
    fn verack_has_an_empty_body() {
        let msg = Message::Verack;
        let mut bytes = Vec::new();
        msg.write_body(&mut bytes).unwrap();
        assert!(bytes.is_empty());
    }

    #[test]
    fn ping_pong_round_trip() {
        assert_eq!(round_trip(&Message::Ping(Nonce(42))), Message::Ping(Nonce(42)));
        assert_eq!(round_trip(&Message::Pong(Nonce(42))), Message::Pong(Nonce(42)));
    }

    #[test]
    fn reject_round_trips_with_and_without_hash() {
        let with_hash = Message::Reject {
            message: "tx".to_owned(),
            ccode: RejectReason::Duplicate,
            reason: "already in mempool".to_owned(),
            data: Some(Hash256([7u8; 32])),
        };
        assert_eq!(round_trip(&with_hash), with_hash);

        let without_hash = Message::Reject {
            message: "version".to_owned(),
            ccode: RejectReason::Obsolete,
            reason: "protocol too old".to_owned(),
            data: None,
        };
        assert_eq!(round_trip(&without_hash), without_hash);
    }

    #[test]
    fn filter_load_round_trips() {
        let filter = BloomFilter::new(3, 0.01, 0, UpdateFlags::None);
        let msg = Message::FilterLoad(filter.clone());
        assert_eq!(round_trip(&msg), Message::FilterLoad(filter));
    }

    #[test]
    fn filter_add_round_trips() {
        let msg = Message::FilterAdd {
            data: vec![1, 2, 3, 4],
        };
        assert_eq!(round_trip(&msg), msg);
    }

    #[test]
    fn version_command_maps_to_version_variant() {
        let version = Version::new(
            crate::protocol::types::ProtocolVersion(70015),
            PeerServices::NODE_NETWORK,
            addr(8333),
            PeerServices::NODE_NETWORK,
            addr(8334),
            Nonce(1),
            "/test/".to_owned(),
            Height(0),
            true,
        );
        let msg = Message::Version(version);
        assert_eq!(msg.command(), Command::Version);
        let _ = UntimestampedAddress {
            services: PeerServices::NODE_NETWORK,
            addr: addr(1),
        };
    }
}
