//! Bitcoin data model and wire serialization.
//!
//! This crate is data structures and pure functions only: it has no network
//! I/O and performs no consensus-complete validation (no UTXO tracking, no
//! script execution against connected outputs, no difficulty retargeting,
//! no chain-reorg logic). Those belong to a node's chain and consensus
//! layers, built on top of the types here.

pub mod amount;
pub mod block;
pub mod bloom;
pub mod cached;
pub mod compactint;
pub mod hash;
pub mod inventory;
pub mod keys;
pub mod parameters;
pub mod serialization;
pub mod transaction;
pub mod transparent;
pub mod work;

pub use amount::Amount;
pub use block::{Block, BlockHeader};
pub use hash::Hash256;
pub use parameters::{NetParams, Network};
pub use serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};
pub use transaction::Transaction;
