//! The 21-member closed set of command names (spec.md §2, §4.2), and their
//! 12-byte zero-padded ASCII wire form.

use std::io;

use btcproto_chain::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Command {
    Version,
    Verack,
    Addr,
    Inv,
    GetData,
    NotFound,
    GetBlocks,
    GetHeaders,
    Headers,
    Block,
    Tx,
    MerkleBlock,
    FilterLoad,
    FilterAdd,
    FilterClear,
    GetAddr,
    Mempool,
    Ping,
    Pong,
    Reject,
    Alert,
}

impl Command {
    fn as_str(self) -> &'static str {
        match self {
            Command::Version => "version",
            Command::Verack => "verack",
            Command::Addr => "addr",
            Command::Inv => "inv",
            Command::GetData => "getdata",
            Command::NotFound => "notfound",
            Command::GetBlocks => "getblocks",
            Command::GetHeaders => "getheaders",
            Command::Headers => "headers",
            Command::Block => "block",
            Command::Tx => "tx",
            Command::MerkleBlock => "merkleblock",
            Command::FilterLoad => "filterload",
            Command::FilterAdd => "filteradd",
            Command::FilterClear => "filterclear",
            Command::GetAddr => "getaddr",
            Command::Mempool => "mempool",
            Command::Ping => "ping",
            Command::Pong => "pong",
            Command::Reject => "reject",
            Command::Alert => "alert",
        }
    }

    /// The 12-byte zero-padded ASCII command name as it appears on the wire.
    pub fn bytes(self) -> [u8; 12] {
        let mut out = [0u8; 12];
        let name = self.as_str().as_bytes();
        out[..name.len()].copy_from_slice(name);
        out
    }

    fn from_str(name: &str) -> Result<Command, SerializationError> {
        match name {
            "version" => Ok(Command::Version),
            "verack" => Ok(Command::Verack),
            "addr" => Ok(Command::Addr),
            "inv" => Ok(Command::Inv),
            "getdata" => Ok(Command::GetData),
            "notfound" => Ok(Command::NotFound),
            "getblocks" => Ok(Command::GetBlocks),
            "getheaders" => Ok(Command::GetHeaders),
            "headers" => Ok(Command::Headers),
            "block" => Ok(Command::Block),
            "tx" => Ok(Command::Tx),
            "merkleblock" => Ok(Command::MerkleBlock),
            "filterload" => Ok(Command::FilterLoad),
            "filteradd" => Ok(Command::FilterAdd),
            "filterclear" => Ok(Command::FilterClear),
            "getaddr" => Ok(Command::GetAddr),
            "mempool" => Ok(Command::Mempool),
            "ping" => Ok(Command::Ping),
            "pong" => Ok(Command::Pong),
            "reject" => Ok(Command::Reject),
            "alert" => Ok(Command::Alert),
            _other => Err(SerializationError::Parse("unrecognized command name")),
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl BitcoinSerialize for Command {
    fn bitcoin_serialize<W: io::Write>(&self, target: W) -> Result<(), io::Error> {
        self.bytes().bitcoin_serialize(target)
    }
}

/// Parses a command name from its 12-byte zero-padded field. Unlike most
/// wire types this isn't used directly by the codec (which needs to
/// distinguish "unrecognized but not fatal" from a parse error — see
/// `parse_padded`), but it's kept for symmetry and for tests.
impl BitcoinDeserialize for Command {
    fn bitcoin_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        let raw = <[u8; 12]>::bitcoin_deserialize(reader)?;
        Command::parse_padded(&raw)
    }
}

impl Command {
    /// Parses a command name from its raw 12-byte field, truncating at the
    /// first zero byte (spec.md §4.2).
    pub fn parse_padded(raw: &[u8; 12]) -> Result<Command, SerializationError> {
        let end = raw.iter().position(|&b| b == 0).unwrap_or(12);
        let name = std::str::from_utf8(&raw[..end])
            .map_err(|_| SerializationError::Parse("command name is not valid ascii"))?;
        Command::from_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_padded_bytes() {
        for command in [
            Command::Version,
            Command::Verack,
            Command::Addr,
            Command::Inv,
            Command::GetData,
            Command::NotFound,
            Command::GetBlocks,
            Command::GetHeaders,
            Command::Headers,
            Command::Block,
            Command::Tx,
            Command::MerkleBlock,
            Command::FilterLoad,
            Command::FilterAdd,
            Command::FilterClear,
            Command::GetAddr,
            Command::Mempool,
            Command::Ping,
            Command::Pong,
            Command::Reject,
            Command::Alert,
        ] {
            let bytes = command.bytes();
            assert_eq!(Command::parse_padded(&bytes).unwrap(), command);
        }
    }

    #[test]
    fn unrecognized_command_is_rejected() {
        let mut raw = [0u8; 12];
        raw[..7].copy_from_slice(b"bogus12");
        assert!(Command::parse_padded(&raw).is_err());
    }
}
