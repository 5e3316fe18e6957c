//! The Bitcoin-inherited transaction Merkle tree, and the partial branch
//! (SPV proof) format used by `merkleblock` (spec.md §4.6).

use std::io;

use btcproto_derive::{BtcDeserialize, BtcSerialize};

use crate::hash::Hash256;
use crate::serialization::{sha256d, BitcoinDeserialize, BitcoinSerialize, SerializationError};

/// The Merkle root of a block's transactions.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, BtcSerialize, BtcDeserialize)]
pub struct Root(pub Hash256);

fn parent_hash(left: &Hash256, right: &Hash256) -> Hash256 {
    let mut writer = sha256d::Writer::default();
    io::Write::write_all(&mut writer, &left.0).expect("infallible");
    io::Write::write_all(&mut writer, &right.0).expect("infallible");
    Hash256(writer.finish())
}

/// Builds every layer of the tree, bottom (transaction hashes) to top (root).
/// A layer with an odd count duplicates its last element before pairing.
pub fn build_tree(leaves: &[Hash256]) -> Vec<Vec<Hash256>> {
    if leaves.is_empty() {
        return vec![vec![Hash256::ZERO]];
    }
    let mut layers = vec![leaves.to_vec()];
    while layers.last().unwrap().len() > 1 {
        let prev = layers.last().unwrap();
        let mut next = Vec::with_capacity((prev.len() + 1) / 2);
        let mut i = 0;
        while i < prev.len() {
            let left = &prev[i];
            let right = if i + 1 < prev.len() { &prev[i + 1] } else { left };
            next.push(parent_hash(left, right));
            i += 2;
        }
        layers.push(next);
    }
    layers
}

/// Computes just the Merkle root for `leaves`.
pub fn root(leaves: &[Hash256]) -> Root {
    let layers = build_tree(leaves);
    Root(layers.last().unwrap()[0])
}

/// A partial Merkle tree: the proof format carried by `merkleblock`.
///
/// Encodes a depth-first traversal of the tree: a flag bit per visited node
/// (1 = "subtree contains a match, or is on the path to one"), and a hash
/// emitted for every node whose flag is 0 or that is a matched leaf.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MerkleBranch {
    pub transaction_count: u32,
    pub hashes: Vec<Hash256>,
    /// Flags packed 8-per-byte, least-significant-bit first.
    pub flags: Vec<u8>,
}

struct BuildState {
    hashes: Vec<Hash256>,
    flag_bits: Vec<bool>,
}

impl MerkleBranch {
    /// Builds the partial tree for `leaves`, marking the positions in
    /// `matches` (by index) as the ones to preserve.
    pub fn build(leaves: &[Hash256], matches: &[bool]) -> MerkleBranch {
        assert_eq!(leaves.len(), matches.len());
        let height = tree_height(leaves.len());
        let mut state = BuildState {
            hashes: Vec::new(),
            flag_bits: Vec::new(),
        };
        traverse_build(&mut state, leaves, matches, height, 0, 0);
        MerkleBranch {
            transaction_count: leaves.len() as u32,
            hashes: state.hashes,
            flags: pack_bits(&state.flag_bits),
        }
    }

    /// Reconstructs the root and the set of matched leaf hashes.
    pub fn extract_matches(&self) -> Result<(Root, Vec<Hash256>), MerkleError> {
        if self.transaction_count == 0 {
            return Err(MerkleError::EmptyTree);
        }
        let height = tree_height(self.transaction_count as usize);
        let flag_bits = unpack_bits(&self.flags);
        let mut cursor = ExtractCursor {
            hashes: &self.hashes,
            flag_bits: &flag_bits,
            hash_pos: 0,
            flag_pos: 0,
            matched: Vec::new(),
        };
        let root_hash = traverse_extract(
            &mut cursor,
            height,
            0,
            self.transaction_count as usize,
        )?;
        if cursor.hash_pos != self.hashes.len() {
            return Err(MerkleError::UnconsumedHashes);
        }
        Ok((Root(root_hash), cursor.matched))
    }
}

#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum MerkleError {
    #[error("partial Merkle tree has no transactions")]
    EmptyTree,
    #[error("ran out of flag bits while walking the partial tree")]
    OutOfFlags,
    #[error("ran out of hashes while walking the partial tree")]
    OutOfHashes,
    #[error("partial tree left unconsumed hashes")]
    UnconsumedHashes,
}

fn tree_height(leaf_count: usize) -> u32 {
    let mut height = 0;
    let mut width = leaf_count;
    while width > 1 {
        width = (width + 1) / 2;
        height += 1;
    }
    height
}

/// The number of leaves covered by the subtree rooted at (`height`, `pos`).
fn layer_width(leaf_count: usize, height: u32, total_height: u32) -> usize {
    (leaf_count + (1 << (total_height - height)) - 1) >> (total_height - height)
}

fn traverse_build(
    state: &mut BuildState,
    leaves: &[Hash256],
    matches: &[bool],
    height: u32,
    pos: usize,
    depth_from_root: u32,
) -> Hash256 {
    let total_height = tree_height(leaves.len());
    let any_match = subtree_matches(leaves, matches, height, pos, total_height);
    state.flag_bits.push(any_match);

    if height == 0 {
        return leaves[pos];
    }

    if !any_match {
        let hash = compute_subtree_hash(leaves, height, pos, total_height);
        state.hashes.push(hash);
        return hash;
    }

    let width = layer_width(leaves.len(), height, total_height);
    let left = traverse_build(state, leaves, matches, height - 1, pos * 2, depth_from_root + 1);
    let right = if pos * 2 + 1 < width {
        traverse_build(state, leaves, matches, height - 1, pos * 2 + 1, depth_from_root + 1)
    } else {
        left
    };
    parent_hash(&left, &right)
}

fn subtree_matches(
    leaves: &[Hash256],
    matches: &[bool],
    height: u32,
    pos: usize,
    total_height: u32,
) -> bool {
    if height == 0 {
        return matches[pos];
    }
    let width = layer_width(leaves.len(), height, total_height);
    let left = subtree_matches(leaves, matches, height - 1, pos * 2, total_height);
    let right = if pos * 2 + 1 < width {
        subtree_matches(leaves, matches, height - 1, pos * 2 + 1, total_height)
    } else {
        false
    };
    left || right
}

fn compute_subtree_hash(leaves: &[Hash256], height: u32, pos: usize, total_height: u32) -> Hash256 {
    if height == 0 {
        return leaves[pos];
    }
    let width = layer_width(leaves.len(), height, total_height);
    let left = compute_subtree_hash(leaves, height - 1, pos * 2, total_height);
    let right = if pos * 2 + 1 < width {
        compute_subtree_hash(leaves, height - 1, pos * 2 + 1, total_height)
    } else {
        left
    };
    parent_hash(&left, &right)
}

struct ExtractCursor<'a> {
    hashes: &'a [Hash256],
    flag_bits: &'a [bool],
    hash_pos: usize,
    flag_pos: usize,
    matched: Vec<Hash256>,
}

fn traverse_extract(
    cursor: &mut ExtractCursor,
    height: u32,
    pos: usize,
    leaf_count: usize,
) -> Result<Hash256, MerkleError> {
    let total_height = tree_height(leaf_count);
    let flag = *cursor.flag_bits.get(cursor.flag_pos).ok_or(MerkleError::OutOfFlags)?;
    cursor.flag_pos += 1;

    if height == 0 || !flag {
        let hash = *cursor.hashes.get(cursor.hash_pos).ok_or(MerkleError::OutOfHashes)?;
        cursor.hash_pos += 1;
        if height == 0 && flag {
            cursor.matched.push(hash);
        }
        return Ok(hash);
    }

    let width = layer_width(leaf_count, height, total_height);
    let left = traverse_extract(cursor, height - 1, pos * 2, leaf_count)?;
    let right = if pos * 2 + 1 < width {
        traverse_extract(cursor, height - 1, pos * 2 + 1, leaf_count)?
    } else {
        left
    };
    Ok(parent_hash(&left, &right))
}

fn pack_bits(bits: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; (bits.len() + 7) / 8];
    for (i, &bit) in bits.iter().enumerate() {
        if bit {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }
    bytes
}

fn unpack_bits(bytes: &[u8]) -> Vec<bool> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for byte in bytes {
        for i in 0..8 {
            bits.push(byte & (1 << i) != 0);
        }
    }
    bits
}

impl BitcoinSerialize for MerkleBranch {
    fn bitcoin_serialize<W: io::Write>(&self, mut target: W) -> Result<(), io::Error> {
        self.transaction_count.bitcoin_serialize(&mut target)?;
        self.hashes.bitcoin_serialize(&mut target)?;
        self.flags.bitcoin_serialize(&mut target)
    }
}

impl BitcoinDeserialize for MerkleBranch {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(MerkleBranch {
            transaction_count: u32::bitcoin_deserialize(&mut reader)?,
            hashes: Vec::<Hash256>::bitcoin_deserialize(&mut reader)?,
            flags: Vec::<u8>::bitcoin_deserialize(&mut reader)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(byte: u8) -> Hash256 {
        Hash256([byte; 32])
    }

    #[test]
    fn single_leaf_root_is_leaf_hash() {
        let leaves = [leaf(1)];
        assert_eq!(root(&leaves).0, leaves[0]);
    }

    #[test]
    fn odd_layer_duplicates_last() {
        let leaves = [leaf(1), leaf(2), leaf(3)];
        let dup = [leaf(1), leaf(2), leaf(3), leaf(3)];
        assert_eq!(root(&leaves), root(&dup));
    }

    #[test]
    fn partial_tree_roundtrips_root_and_matches() {
        let leaves = vec![leaf(1), leaf(2), leaf(3), leaf(4)];
        let matches = vec![false, true, false, false];
        let branch = MerkleBranch::build(&leaves, &matches);
        let (extracted_root, matched) = branch.extract_matches().unwrap();
        assert_eq!(extracted_root, root(&leaves));
        assert_eq!(matched, vec![leaf(2)]);
    }

    #[test]
    fn no_matches_extracts_only_root() {
        let leaves = vec![leaf(1), leaf(2), leaf(3), leaf(4)];
        let matches = vec![false; 4];
        let branch = MerkleBranch::build(&leaves, &matches);
        let (extracted_root, matched) = branch.extract_matches().unwrap();
        assert_eq!(extracted_root, root(&leaves));
        assert!(matched.is_empty());
    }
}
