//! `PeerAddress` (spec.md §3): a remote address as carried in `addr` and
//! `version`, plus the bookkeeping (last-seen time, static flag, connected
//! flag) a node keeps about a peer it knows of but may not be connected to.

use std::io;
use std::net::SocketAddr;

use btcproto_chain::parameters::PeerServices;
use btcproto_chain::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};
use chrono::{DateTime, TimeZone, Utc};

/// A known network address: who it is, what it claims to support, and when
/// it was last seen alive.
#[derive(Clone, Debug, PartialEq)]
pub struct PeerAddress {
    pub addr: SocketAddr,
    pub services: PeerServices,
    pub last_seen: DateTime<Utc>,

    /// Suppresses this entry from relayed `addr` lists (spec.md §3): used
    /// for addresses configured locally (e.g. `-connect`) rather than
    /// learned from the network.
    pub is_static: bool,
    /// Whether a live connection to this address currently exists.
    pub is_connected: bool,
}

impl PeerAddress {
    pub fn new(addr: SocketAddr, services: PeerServices, last_seen: DateTime<Utc>) -> PeerAddress {
        PeerAddress {
            addr,
            services,
            last_seen,
            is_static: false,
            is_connected: false,
        }
    }

    /// Whether this entry is recent enough to relay or to accept from a
    /// peer's `addr` message (spec.md §4.3: "newer than 15 minutes").
    pub fn is_recent(&self, now: DateTime<Utc>, max_age_secs: i64) -> bool {
        (now - self.last_seen).num_seconds() <= max_age_secs
    }
}

/// Wire form used inside `addr`: a 4-byte timestamp ahead of the
/// (services, address) pair (spec.md §4.3).
impl BitcoinSerialize for PeerAddress {
    fn bitcoin_serialize<W: io::Write>(&self, mut target: W) -> Result<(), io::Error> {
        self.last_seen.bitcoin_serialize(&mut target)?;
        self.services.bitcoin_serialize(&mut target)?;
        self.addr.bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for PeerAddress {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let timestamp = u32::bitcoin_deserialize(&mut reader)?;
        let services = PeerServices::bitcoin_deserialize(&mut reader)?;
        let addr = SocketAddr::bitcoin_deserialize(&mut reader)?;
        Ok(PeerAddress::new(
            addr,
            services,
            Utc.timestamp(timestamp as i64, 0),
        ))
    }
}

/// Wire form used inside `version`: no timestamp, just (services, address)
/// (spec.md §4.3 `version` row: "recv-addr (26 B), from-addr (26 B)").
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct UntimestampedAddress {
    pub services: PeerServices,
    pub addr: SocketAddr,
}

impl BitcoinSerialize for UntimestampedAddress {
    fn bitcoin_serialize<W: io::Write>(&self, mut target: W) -> Result<(), io::Error> {
        self.services.bitcoin_serialize(&mut target)?;
        self.addr.bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for UntimestampedAddress {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(UntimestampedAddress {
            services: PeerServices::bitcoin_deserialize(&mut reader)?,
            addr: SocketAddr::bitcoin_deserialize(&mut reader)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn addr_entry_round_trips() {
        let entry = PeerAddress::new(
            SocketAddr::new(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 6)), 8333),
            PeerServices::NODE_NETWORK,
            Utc.timestamp(1_600_000_000, 0),
        );
        let bytes = entry.bitcoin_serialize_to_vec().unwrap();
        assert_eq!(bytes.len(), 30);
        let parsed = PeerAddress::bitcoin_deserialize(&bytes[..]).unwrap();
        assert_eq!(parsed.addr, entry.addr);
        assert_eq!(parsed.services, entry.services);
        assert_eq!(parsed.last_seen, entry.last_seen);
    }

    #[test]
    fn untimestamped_address_is_26_bytes() {
        let addr = UntimestampedAddress {
            services: PeerServices::NODE_NETWORK,
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8333),
        };
        let bytes = addr.bitcoin_serialize_to_vec().unwrap();
        assert_eq!(bytes.len(), 26);
        let parsed = UntimestampedAddress::bitcoin_deserialize(&bytes[..]).unwrap();
        assert_eq!(parsed, addr);
    }
}
