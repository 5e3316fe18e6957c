//! The `merkleblock` message (spec.md §4.3): an SPV proof naming the
//! transactions a peer's installed Bloom filter matched in a given block.

use std::io;

use btcproto_chain::block::merkle::MerkleBranch;
use btcproto_chain::block::BlockHeader;
use btcproto_chain::hash::Hash256;
use btcproto_chain::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

#[derive(Clone, Debug, PartialEq)]
pub struct MerkleBlock {
    pub header: BlockHeader,
    pub branch: MerkleBranch,
}

/// Failure reconstructing the committed root from a peer-supplied partial
/// tree (spec.md §4.3: "reconstruct Merkle root... verify equal to the
/// header's").
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum MerkleBlockError {
    #[error("partial Merkle tree did not parse: {0}")]
    Malformed(#[from] btcproto_chain::block::merkle::MerkleError),
    #[error("reconstructed Merkle root does not match the block header")]
    RootMismatch,
}

impl MerkleBlock {
    /// Reconstructs the root from `branch` and checks it against `header`,
    /// returning the matched transaction hashes on success.
    pub fn verify(&self) -> Result<Vec<Hash256>, MerkleBlockError> {
        let (root, matched) = self.branch.extract_matches()?;
        if root != self.header.merkle_root {
            return Err(MerkleBlockError::RootMismatch);
        }
        Ok(matched)
    }
}

impl BitcoinSerialize for MerkleBlock {
    fn bitcoin_serialize<W: io::Write>(&self, mut target: W) -> Result<(), io::Error> {
        self.header.bitcoin_serialize(&mut target)?;
        self.branch.bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for MerkleBlock {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let header = BlockHeader::bitcoin_deserialize(&mut reader)?;
        let branch = MerkleBranch::bitcoin_deserialize(reader)?;
        Ok(MerkleBlock { header, branch })
    }
}
