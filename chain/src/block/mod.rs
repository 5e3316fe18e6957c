//! Blocks: a header plus the ordered transactions it commits to.

pub mod header;
pub mod merkle;

use std::io;

use crate::compactint::CompactInt;
use crate::hash::Hash256;
use crate::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};
use crate::transaction::Transaction;

pub use header::{BlockHeader, BlockHeaderError, CountedHeader, Height};

/// A full block: a header and its complete, ordered transaction list.
///
/// The Merkle root commits to `transactions`, but the tree itself is built
/// lazily on first request rather than at construction time, since many
/// callers (most peer-message handling) only ever need the header.
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
    tree: std::cell::RefCell<Option<Vec<Vec<Hash256>>>>,
}

impl Block {
    pub fn new(header: BlockHeader, transactions: Vec<Transaction>) -> Block {
        Block {
            header,
            transactions,
            tree: std::cell::RefCell::new(None),
        }
    }

    /// The root of the transaction Merkle tree, computing and caching the
    /// full tree on first call.
    pub fn merkle_root(&self) -> merkle::Root {
        let mut cache = self.tree.borrow_mut();
        if cache.is_none() {
            let leaves: Vec<Hash256> = self.transactions.iter().map(|tx| tx.hash()).collect();
            *cache = Some(merkle::build_tree(&leaves));
        }
        let layers = cache.as_ref().unwrap();
        merkle::Root(layers.last().unwrap()[0])
    }

    /// Whether the block's own Merkle root matches its committed
    /// transactions.
    pub fn merkle_root_is_valid(&self) -> bool {
        self.merkle_root() == self.header.merkle_root
    }

    /// Builds the partial Merkle tree (SPV proof) a `merkleblock` message
    /// carries for the transactions a peer's Bloom filter matched.
    pub fn build_merkle_branch(&self, matches: &[bool]) -> merkle::MerkleBranch {
        let leaves: Vec<Hash256> = self.transactions.iter().map(|tx| tx.hash()).collect();
        merkle::MerkleBranch::build(&leaves, matches)
    }
}

impl BitcoinSerialize for Block {
    fn bitcoin_serialize<W: io::Write>(&self, mut target: W) -> Result<(), io::Error> {
        self.header.bitcoin_serialize(&mut target)?;
        self.transactions.bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for Block {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let header = BlockHeader::bitcoin_deserialize(&mut reader)?;
        let transactions = Vec::<Transaction>::bitcoin_deserialize(reader)?;
        Ok(Block::new(header, transactions))
    }
}

impl Block {
    pub fn serialized_size(&self) -> usize {
        let mut size = BlockHeader::len() + CompactInt::size(self.transactions.len());
        for tx in &self.transactions {
            size += tx.serialized_size();
        }
        size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::{Amount, NonNegative};
    use crate::transparent::{OutPoint, Script, TransactionInput, TransactionOutput};
    use crate::work::difficulty::CompactDifficulty;
    use chrono::Utc;

    fn coinbase_tx() -> Transaction {
        let input = TransactionInput::new(OutPoint::coinbase(), Script(vec![0x01]), 0xffffffff);
        let output = TransactionOutput {
            value: Amount::<NonNegative>::try_from(50_0000_0000).unwrap(),
            lock_script: Script(vec![0x6a]),
        };
        Transaction::new(1, vec![input], vec![output], 0)
    }

    #[test]
    fn merkle_root_matches_single_transaction_hash() {
        let tx = coinbase_tx();
        let header = BlockHeader::new(
            1,
            Hash256::ZERO,
            merkle::Root(tx.hash()),
            Utc::now(),
            CompactDifficulty(0x207f_ffff),
            0,
        );
        let block = Block::new(header, vec![tx.clone()]);
        assert_eq!(block.merkle_root().0, tx.hash());
        assert!(block.merkle_root_is_valid());
    }

    #[test]
    fn wrong_committed_root_is_detected() {
        let tx = coinbase_tx();
        let header = BlockHeader::new(
            1,
            Hash256::ZERO,
            merkle::Root(Hash256::ZERO),
            Utc::now(),
            CompactDifficulty(0x207f_ffff),
            0,
        );
        let block = Block::new(header, vec![tx]);
        assert!(!block.merkle_root_is_valid());
    }
}
