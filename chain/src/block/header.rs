use std::io;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::hash::Hash256;
use crate::serialization::{sha256d, BitcoinDeserialize, BitcoinSerialize, SerializationError};
use crate::work::chainwork::ChainWork;
use crate::work::difficulty::{meets_target, CompactDifficulty};

use super::merkle;

/// A block's height: its distance from the genesis block, which is height 0.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Height(pub u32);

/// A block header: the 80 bytes that get hashed to produce a block hash,
/// plus the chain-position metadata the external chain layer attaches once
/// it has connected this header into a chain.
///
/// How are blocks chained together? Each one points backwards, via
/// `previous_block_hash`, to its parent, all the way back to the genesis
/// block.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockHeader {
    pub version: i32,
    pub previous_block_hash: Hash256,

    /// The root of the Bitcoin-inherited transaction Merkle tree, binding
    /// the header to the transactions in the block.
    ///
    /// Note that because of a flaw in Bitcoin's design, the `merkle_root`
    /// does not always precisely bind the contents of the block
    /// (CVE-2012-2459): it is sometimes possible to construct distinct
    /// transaction sets with the same root.
    pub merkle_root: merkle::Root,

    pub time: DateTime<Utc>,
    pub difficulty_threshold: CompactDifficulty,
    pub nonce: u32,

    hash: Hash256,

    /// Whether this header has been connected to the best chain. Not part
    /// of the consensus encoding; set by the external chain layer.
    on_chain: bool,
    /// This header's height in the chain it's connected to, if any.
    height: Option<Height>,
    /// Total accumulated proof-of-work through this block, if known.
    chain_work: Option<ChainWork>,
    /// For a header delivered via `merkleblock`, the transaction hashes the
    /// peer's filter matched.
    matched_transactions: Option<Vec<Hash256>>,
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum BlockHeaderError {
    #[error("block target {0:?} is not in range (1, proof-of-work limit]")]
    TargetOutOfRange(CompactDifficulty),
    #[error("block hash does not meet its own stated difficulty target")]
    HashAboveTarget,
    #[error("block time {found:?} is more than two hours past {limit:?}")]
    TimeTooFarInFuture {
        found: DateTime<Utc>,
        limit: DateTime<Utc>,
    },
}

impl BlockHeader {
    /// The length of a header's consensus encoding, in bytes.
    pub const fn len() -> usize {
        80
    }

    pub fn new(
        version: i32,
        previous_block_hash: Hash256,
        merkle_root: merkle::Root,
        time: DateTime<Utc>,
        difficulty_threshold: CompactDifficulty,
        nonce: u32,
    ) -> BlockHeader {
        let mut header = BlockHeader {
            version,
            previous_block_hash,
            merkle_root,
            time,
            difficulty_threshold,
            nonce,
            hash: Hash256::ZERO,
            on_chain: false,
            height: None,
            chain_work: None,
            matched_transactions: None,
        };
        header.hash = header.compute_hash();
        header
    }

    fn compute_hash(&self) -> Hash256 {
        let mut writer = sha256d::Writer::default();
        self.write_consensus_fields(&mut writer)
            .expect("hashing writer is infallible");
        Hash256(writer.finish())
    }

    /// The header's hash: the double-SHA-256 of its 80-byte encoding.
    pub fn hash(&self) -> Hash256 {
        self.hash
    }

    pub fn on_chain(&self) -> bool {
        self.on_chain
    }

    pub fn height(&self) -> Option<Height> {
        self.height
    }

    pub fn chain_work(&self) -> Option<&ChainWork> {
        self.chain_work.as_ref()
    }

    pub fn matched_transactions(&self) -> Option<&[Hash256]> {
        self.matched_transactions.as_deref()
    }

    /// Connects this header to a chain at `height`, with `chain_work`
    /// accumulated through it. Called by the external chain layer, never
    /// derived from the header's own fields.
    pub fn connect_to_chain(&mut self, height: Height, chain_work: ChainWork) {
        self.on_chain = true;
        self.height = Some(height);
        self.chain_work = Some(chain_work);
    }

    pub fn set_matched_transactions(&mut self, matched: Vec<Hash256>) {
        self.matched_transactions = Some(matched);
    }

    /// Validates the parse-time invariants from spec.md §7: the target is
    /// in range, the header's own hash meets it, and the timestamp isn't
    /// implausibly far in the future.
    pub fn validate(&self, pow_limit: &CompactDifficulty, now: DateTime<Utc>) -> Result<(), BlockHeaderError> {
        let target = self
            .difficulty_threshold
            .to_expanded()
            .ok_or(BlockHeaderError::TargetOutOfRange(self.difficulty_threshold))?;
        let limit = pow_limit
            .to_expanded()
            .expect("a network's configured proof-of-work limit is always a valid target");
        if target > limit {
            return Err(BlockHeaderError::TargetOutOfRange(self.difficulty_threshold));
        }
        if !meets_target(&self.hash, &target) {
            return Err(BlockHeaderError::HashAboveTarget);
        }

        let limit_time = now
            .checked_add_signed(Duration::hours(2))
            .expect("adding two hours to now does not overflow");
        if self.time > limit_time {
            return Err(BlockHeaderError::TimeTooFarInFuture {
                found: self.time,
                limit: limit_time,
            });
        }
        Ok(())
    }

    fn write_consensus_fields<W: io::Write>(&self, mut target: W) -> Result<(), io::Error> {
        self.version.bitcoin_serialize(&mut target)?;
        self.previous_block_hash.bitcoin_serialize(&mut target)?;
        self.merkle_root.bitcoin_serialize(&mut target)?;
        self.time.bitcoin_serialize(&mut target)?;
        self.difficulty_threshold.bitcoin_serialize(&mut target)?;
        self.nonce.bitcoin_serialize(&mut target)
    }
}

impl BitcoinSerialize for BlockHeader {
    fn bitcoin_serialize<W: io::Write>(&self, target: W) -> Result<(), io::Error> {
        self.write_consensus_fields(target)
    }
}

impl BitcoinDeserialize for BlockHeader {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let version = i32::bitcoin_deserialize(&mut reader)?;
        let previous_block_hash = Hash256::bitcoin_deserialize(&mut reader)?;
        let merkle_root = merkle::Root::bitcoin_deserialize(&mut reader)?;
        let time = <DateTime<Utc>>::bitcoin_deserialize(&mut reader)?;
        let difficulty_threshold = CompactDifficulty::bitcoin_deserialize(&mut reader)?;
        let nonce = u32::bitcoin_deserialize(&mut reader)?;
        Ok(BlockHeader::new(
            version,
            previous_block_hash,
            merkle_root,
            time,
            difficulty_threshold,
            nonce,
        ))
    }
}

/// A header paired with the number of transactions in its block, as sent in
/// a `headers` message.
#[derive(Clone, Debug, PartialEq)]
pub struct CountedHeader {
    pub header: BlockHeader,
    pub transaction_count: crate::compactint::CompactInt,
}

impl BitcoinSerialize for CountedHeader {
    fn bitcoin_serialize<W: io::Write>(&self, mut target: W) -> Result<(), io::Error> {
        self.header.bitcoin_serialize(&mut target)?;
        self.transaction_count.bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for CountedHeader {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(CountedHeader {
            header: BlockHeader::bitcoin_deserialize(&mut reader)?,
            transaction_count: crate::compactint::CompactInt::bitcoin_deserialize(reader)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> BlockHeader {
        BlockHeader::new(
            1,
            Hash256::ZERO,
            merkle::Root(Hash256::ZERO),
            Utc::now(),
            CompactDifficulty(0x207f_ffff),
            0,
        )
    }

    #[test]
    fn hash_is_cached_at_construction() {
        let header = sample_header();
        assert_eq!(header.hash(), header.compute_hash());
    }

    #[test]
    fn roundtrips_through_wire_encoding() {
        let header = sample_header();
        let bytes = header.bitcoin_serialize_to_vec().unwrap();
        assert_eq!(bytes.len(), BlockHeader::len());
        let parsed = BlockHeader::bitcoin_deserialize(&bytes[..]).unwrap();
        assert_eq!(parsed.hash(), header.hash());
    }

    #[test]
    fn validate_accepts_easy_target_header() {
        let header = sample_header();
        let pow_limit = CompactDifficulty(0x207f_ffff);
        assert!(header.validate(&pow_limit, Utc::now()).is_ok());
    }

    #[test]
    fn validate_rejects_time_far_in_future() {
        let mut header = sample_header();
        header.time = Utc::now() + Duration::hours(3);
        let pow_limit = CompactDifficulty(0x207f_ffff);
        let err = header.validate(&pow_limit, Utc::now()).unwrap_err();
        assert!(matches!(err, BlockHeaderError::TimeTooFarInFuture { .. }));
    }

    #[test]
    fn connect_to_chain_records_height_and_work() {
        let mut header = sample_header();
        assert!(!header.on_chain());
        header.connect_to_chain(Height(100), ChainWork::from_u64(12345));
        assert!(header.on_chain());
        assert_eq!(header.height(), Some(Height(100)));
        assert_eq!(header.chain_work(), Some(&ChainWork::from_u64(12345)));
    }
}
