//! Base58Check-encoded addresses.

use std::{fmt, io};

use secp256k1::PublicKey;

use crate::{
    parameters::NetParams,
    serialization::{sha256d, BitcoinDeserialize, BitcoinSerialize, SerializationError},
};

use super::Script;

/// A Bitcoin address: a version byte, a 20-byte hash, and a 4-byte
/// Base58Check checksum.
///
/// <https://en.bitcoin.it/wiki/Base58Check_encoding>
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Address {
    /// P2SH (pay-to-script-hash).
    PayToScriptHash { script_hash: [u8; 20] },
    /// P2PKH (pay-to-public-key-hash).
    PayToPublicKeyHash { pub_key_hash: [u8; 20] },
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Address::PayToScriptHash { script_hash } => f
                .debug_struct("Address::PayToScriptHash")
                .field("script_hash", &hex::encode(script_hash))
                .finish(),
            Address::PayToPublicKeyHash { pub_key_hash } => f
                .debug_struct("Address::PayToPublicKeyHash")
                .field("pub_key_hash", &hex::encode(pub_key_hash))
                .finish(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut bytes = Vec::new();
        let _ = self.bitcoin_serialize(&mut bytes);
        f.write_str(&bs58::encode(bytes).with_check().into_string())
    }
}

impl std::str::FromStr for Address {
    type Err = SerializationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .with_check(None)
            .into_vec()
            .map_err(|_| SerializationError::Parse("address base58check decoding error"))?;
        Self::bitcoin_deserialize(&bytes[..])
    }
}

impl BitcoinSerialize for Address {
    fn bitcoin_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        let params = NetParams::get();
        match self {
            Address::PayToScriptHash { script_hash } => {
                writer.write_all(&[params.p2sh_version])?;
                writer.write_all(script_hash)
            }
            Address::PayToPublicKeyHash { pub_key_hash } => {
                writer.write_all(&[params.p2pkh_version])?;
                writer.write_all(pub_key_hash)
            }
        }
    }
}

impl BitcoinDeserialize for Address {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let version = u8::bitcoin_deserialize(&mut reader)?;
        let hash = <[u8; 20]>::bitcoin_deserialize(&mut reader)?;
        let params = NetParams::get();
        if version == params.p2sh_version {
            Ok(Address::PayToScriptHash { script_hash: hash })
        } else if version == params.p2pkh_version {
            Ok(Address::PayToPublicKeyHash { pub_key_hash: hash })
        } else {
            Err(SerializationError::Parse("unrecognized address version byte"))
        }
    }
}

/// Derives a standard 20-byte address payload (SHA-256 then RIPEMD-160) from
/// a script or public key encoding.
fn hash_payload(bytes: &[u8]) -> [u8; 20] {
    sha256d::hash160(bytes)
}

pub trait ToAddress {
    fn to_address(&self) -> Address;
}

impl ToAddress for Script {
    fn to_address(&self) -> Address {
        Address::PayToScriptHash {
            script_hash: hash_payload(self.bytes()),
        }
    }
}

impl ToAddress for PublicKey {
    fn to_address(&self) -> Address {
        Address::PayToPublicKeyHash {
            pub_key_hash: hash_payload(&self.serialize()),
        }
    }
}
