//! The `version` message (spec.md §4.3): the handshake's `ClientHello`
//! analogue.

use std::io;
use std::net::SocketAddr;

use btcproto_chain::block::Height;
use btcproto_chain::parameters::PeerServices;
use btcproto_chain::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};
use chrono::{DateTime, TimeZone, Utc};

use crate::meta_addr::UntimestampedAddress;
use crate::protocol::types::{Nonce, ProtocolVersion};

/// A `version` message.
///
/// `relay` is the explicit tx-relay parameter spec.md §9 calls for: the
/// teacher's builder derived it from the local services bitfield, which
/// conflates two concepts the redesign flag asks to separate.
#[derive(Clone, Debug, PartialEq)]
pub struct Version {
    pub version: ProtocolVersion,
    pub services: PeerServices,
    pub timestamp: DateTime<Utc>,
    pub address_recv: UntimestampedAddress,
    pub address_from: UntimestampedAddress,
    pub nonce: Nonce,
    pub user_agent: String,
    pub best_block: Height,
    /// Absent for peers running a protocol version that predates the
    /// tx-relay byte; parsed tolerantly (spec.md §4.3, scenario 6).
    pub relay: Option<bool>,
}

impl Version {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        version: ProtocolVersion,
        our_services: PeerServices,
        our_addr: SocketAddr,
        their_services: PeerServices,
        their_addr: SocketAddr,
        nonce: Nonce,
        user_agent: String,
        best_block: Height,
        relay: bool,
    ) -> Version {
        Version {
            version,
            services: our_services,
            timestamp: Utc::now(),
            address_recv: UntimestampedAddress {
                services: their_services,
                addr: their_addr,
            },
            address_from: UntimestampedAddress {
                services: our_services,
                addr: our_addr,
            },
            nonce,
            user_agent,
            best_block,
            relay: Some(relay),
        }
    }
}

impl BitcoinSerialize for Version {
    fn bitcoin_serialize<W: io::Write>(&self, mut target: W) -> Result<(), io::Error> {
        self.version.bitcoin_serialize(&mut target)?;
        self.services.bitcoin_serialize(&mut target)?;
        self.timestamp.bitcoin_serialize_i64(&mut target)?;
        self.address_recv.bitcoin_serialize(&mut target)?;
        self.address_from.bitcoin_serialize(&mut target)?;
        self.nonce.bitcoin_serialize(&mut target)?;
        self.user_agent.bitcoin_serialize(&mut target)?;
        self.best_block.0.bitcoin_serialize(&mut target)?;
        if let Some(relay) = self.relay {
            relay.bitcoin_serialize(&mut target)?;
        }
        Ok(())
    }
}

impl BitcoinDeserialize for Version {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let version = ProtocolVersion::bitcoin_deserialize(&mut reader)?;
        let services = PeerServices::bitcoin_deserialize(&mut reader)?;
        let timestamp = i64::bitcoin_deserialize(&mut reader)?;
        let address_recv = UntimestampedAddress::bitcoin_deserialize(&mut reader)?;
        let address_from = UntimestampedAddress::bitcoin_deserialize(&mut reader)?;
        let nonce = Nonce::bitcoin_deserialize(&mut reader)?;
        let user_agent = String::bitcoin_deserialize(&mut reader)?;
        let best_block = Height(u32::bitcoin_deserialize(&mut reader)?);
        // The tx-relay byte is absent on older peers; its absence is not an
        // error (spec.md §4.3, §8 scenario 6).
        let relay = bool::bitcoin_deserialize(&mut reader).ok();
        Ok(Version {
            version,
            services,
            timestamp: Utc.timestamp(timestamp, 0),
            address_recv,
            address_from,
            nonce,
            user_agent,
            best_block,
            relay,
        })
    }
}

/// `version`'s timestamp field is the one 8-byte (not 4-byte) time field in
/// the protocol; the rest of the crate's `DateTime<Utc>` impl is 4 bytes, so
/// this is written out by hand rather than generalizing that impl.
trait SerializeI64Timestamp {
    fn bitcoin_serialize_i64<W: io::Write>(&self, target: W) -> Result<(), io::Error>;
}

impl SerializeI64Timestamp for DateTime<Utc> {
    fn bitcoin_serialize_i64<W: io::Write>(&self, target: W) -> Result<(), io::Error> {
        self.timestamp().bitcoin_serialize(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), port)
    }

    #[test]
    fn round_trips_through_wire_encoding() {
        let version = Version::new(
            ProtocolVersion(70015),
            PeerServices::NODE_NETWORK,
            addr(8333),
            PeerServices::NODE_NETWORK,
            addr(8334),
            Nonce(0x0123_4567_89ab_cdef),
            "/test:0.1/".to_owned(),
            Height(540_000),
            true,
        );
        let bytes = version.bitcoin_serialize_to_vec().unwrap();
        let parsed = Version::bitcoin_deserialize(&bytes[..]).unwrap();
        assert_eq!(parsed, version);
    }

    #[test]
    fn missing_relay_byte_parses_tolerantly() {
        let version = Version::new(
            ProtocolVersion(60000),
            PeerServices::NODE_NETWORK,
            addr(8333),
            PeerServices::NODE_NETWORK,
            addr(8334),
            Nonce(1),
            "/old/".to_owned(),
            Height(0),
            true,
        );
        let mut bytes = version.bitcoin_serialize_to_vec().unwrap();
        // Drop the trailing relay byte to simulate a pre-70001 peer.
        bytes.pop();
        let parsed = Version::bitcoin_deserialize(&bytes[..]).unwrap();
        assert_eq!(parsed.relay, None);
    }
}
