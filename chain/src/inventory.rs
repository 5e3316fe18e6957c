//! Inventory vectors: the (type, hash) pairs exchanged in `inv`, `getdata`,
//! and `notfound` (spec.md §3).

use std::io;

use crate::hash::Hash256;
use crate::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

/// What an [`InventoryItem`]'s hash identifies.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum InventoryType {
    /// A peer couldn't find the requested object.
    Error,
    Transaction,
    Block,
    /// A block, requested back as a `merkleblock` rather than full `block`.
    FilteredBlock,
}

impl InventoryType {
    fn from_code(code: u32) -> Result<InventoryType, SerializationError> {
        match code {
            0 => Ok(InventoryType::Error),
            1 => Ok(InventoryType::Transaction),
            2 => Ok(InventoryType::Block),
            3 => Ok(InventoryType::FilteredBlock),
            _ => Err(SerializationError::Parse("unrecognized inventory type code")),
        }
    }

    fn to_code(self) -> u32 {
        match self {
            InventoryType::Error => 0,
            InventoryType::Transaction => 1,
            InventoryType::Block => 2,
            InventoryType::FilteredBlock => 3,
        }
    }
}

/// An announcement or request naming one object by type and hash.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct InventoryItem {
    pub inventory_type: InventoryType,
    pub hash: Hash256,
}

impl InventoryItem {
    pub fn transaction(hash: Hash256) -> InventoryItem {
        InventoryItem {
            inventory_type: InventoryType::Transaction,
            hash,
        }
    }

    pub fn block(hash: Hash256) -> InventoryItem {
        InventoryItem {
            inventory_type: InventoryType::Block,
            hash,
        }
    }
}

impl BitcoinSerialize for InventoryItem {
    fn bitcoin_serialize<W: io::Write>(&self, mut target: W) -> Result<(), io::Error> {
        self.inventory_type.to_code().bitcoin_serialize(&mut target)?;
        self.hash.bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for InventoryItem {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let inventory_type = InventoryType::from_code(u32::bitcoin_deserialize(&mut reader)?)?;
        let hash = Hash256::bitcoin_deserialize(reader)?;
        Ok(InventoryItem { inventory_type, hash })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_wire_encoding() {
        let item = InventoryItem::block(Hash256([7u8; 32]));
        let bytes = item.bitcoin_serialize_to_vec().unwrap();
        let parsed = InventoryItem::bitcoin_deserialize(&bytes[..]).unwrap();
        assert_eq!(parsed, item);
    }

    #[test]
    fn rejects_unknown_type_code() {
        let mut bytes = 99u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 32]);
        assert!(InventoryItem::bitcoin_deserialize(&bytes[..]).is_err());
    }
}
