//! Network-selection parameters: the values that differ between mainnet and
//! testnet (magic bytes, address version bytes, genesis block, proof-of-work
//! limit) plus the deployment-chosen values (minimum peer version, app name,
//! advertised services).
//!
//! [`NetParams::init`] is a one-shot call: every other entry point in this
//! crate assumes the network has already been selected and calls
//! [`NetParams::get`], which panics if `init` was never called. This mirrors
//! the rest of the crate's assumption that network selection happens once,
//! at process startup, before any wire traffic is parsed.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::hash::Hash256;
use crate::serialization::BitcoinSerialize as _;
use crate::work::difficulty::CompactDifficulty;

/// Which Bitcoin network this process is participating in.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Network {
    Mainnet,
    Testnet,
}

bitflags::bitflags! {
    /// Services a peer advertises in its `version`/`addr` messages.
    pub struct PeerServices: u64 {
        const NODE_NETWORK = 1 << 0;
        const NODE_GETUTXO = 1 << 1;
        const NODE_BLOOM = 1 << 2;
        const NODE_WITNESS = 1 << 3;
        const NODE_NETWORK_LIMITED = 1 << 10;
    }
}

impl Serialize for PeerServices {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PeerServices {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(PeerServices::from_bits_truncate(u64::deserialize(deserializer)?))
    }
}

impl crate::serialization::BitcoinSerialize for PeerServices {
    fn bitcoin_serialize<W: std::io::Write>(&self, target: W) -> Result<(), std::io::Error> {
        self.bits().bitcoin_serialize(target)
    }
}

impl crate::serialization::BitcoinDeserialize for PeerServices {
    fn bitcoin_deserialize<R: std::io::Read>(
        reader: R,
    ) -> Result<Self, crate::serialization::SerializationError> {
        Ok(PeerServices::from_bits_truncate(u64::bitcoin_deserialize(
            reader,
        )?))
    }
}

/// The magic bytes, address formats, genesis data, and policy knobs that
/// distinguish one Bitcoin network from another, plus this deployment's
/// locally-chosen policy values.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetParams {
    pub network: Network,

    /// First four bytes of every message envelope (spec.md §4.2).
    pub magic: [u8; 4],

    /// Base58Check version byte for P2PKH addresses.
    pub p2pkh_version: u8,

    /// Base58Check version byte for P2SH addresses.
    pub p2sh_version: u8,

    /// Base58Check version byte for dumped (WIF) private keys.
    pub dumped_key_version: u8,

    pub genesis_hash: Hash256,
    pub genesis_time: u32,

    /// The loosest (easiest) target any block's difficulty may claim.
    pub pow_limit: CompactDifficulty,

    /// Peers below this protocol version are rejected as obsolete.
    pub min_peer_version: u32,

    /// Included in the `version` message user-agent string.
    pub app_name: String,

    /// Services this node advertises to peers.
    pub services: PeerServices,
}

impl NetParams {
    pub fn mainnet(app_name: impl Into<String>) -> NetParams {
        NetParams {
            network: Network::Mainnet,
            magic: [0xf9, 0xbe, 0xb4, 0xd9],
            p2pkh_version: 0,
            p2sh_version: 5,
            dumped_key_version: 128,
            genesis_hash: "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
                .parse()
                .expect("hard-coded hash parses"),
            genesis_time: 1231006505,
            pow_limit: CompactDifficulty(0x1d00_ffff),
            min_peer_version: 70001,
            app_name: app_name.into(),
            services: PeerServices::NODE_NETWORK | PeerServices::NODE_BLOOM,
        }
    }

    pub fn testnet(app_name: impl Into<String>) -> NetParams {
        NetParams {
            network: Network::Testnet,
            magic: [0xfa, 0xbf, 0xb5, 0xda],
            p2pkh_version: 111,
            p2sh_version: 196,
            dumped_key_version: 239,
            genesis_hash: "000000000933ea01ad0ee984209779baaec3ced90fa3f408719526f8d77f4943"
                .parse()
                .expect("hard-coded hash parses"),
            genesis_time: 1296688602,
            pow_limit: CompactDifficulty(0x207f_ffff),
            min_peer_version: 70001,
            app_name: app_name.into(),
            services: PeerServices::NODE_NETWORK | PeerServices::NODE_BLOOM,
        }
    }

    /// Installs the process-wide network parameters. Must be called at most
    /// once; returns an error if parameters were already set.
    pub fn init(params: NetParams) -> Result<(), NetParams> {
        PARAMS.set(params)
    }

    /// Returns the process-wide network parameters.
    ///
    /// # Panics
    /// Panics if [`NetParams::init`] has not yet been called.
    pub fn get() -> &'static NetParams {
        PARAMS
            .get()
            .expect("NetParams::init must be called before use")
    }
}

static PARAMS: OnceCell<NetParams> = OnceCell::new();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mainnet_and_testnet_differ() {
        let main = NetParams::mainnet("test-app");
        let test = NetParams::testnet("test-app");
        assert_ne!(main.magic, test.magic);
        assert_ne!(main.p2pkh_version, test.p2pkh_version);
        assert_ne!(main.pow_limit.to_bits(), test.pow_limit.to_bits());
    }
}
