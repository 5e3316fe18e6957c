//! Protocol-wide constants: size caps and the version this library speaks.

use btcproto_chain::compactint::CompactInt;

use crate::protocol::types::ProtocolVersion;

/// The protocol version this library negotiates when it initiates a
/// handshake (spec.md §6: "byte-exact compatibility... at versions ≥
/// 70001").
pub const CURRENT_VERSION: ProtocolVersion = ProtocolVersion(70015);

/// Below this, Bloom filters (BIP37) are unsupported; below it a peer is
/// rejected as obsolete (spec.md §4.3 `version` row).
pub const BLOOM_FILTER_VERSION: ProtocolVersion = ProtocolVersion(70001);

/// Length of a message envelope's fixed header (spec.md §4.2).
pub const HEADER_LEN: usize = 24;

/// Absolute cap on a framed message, header included (spec.md §4.2).
pub const MAX_MESSAGE_LEN: usize = 2 * 1024 * 1024;

/// Implicit cap on a `block` message's transaction payload (spec.md §4.2).
pub const MAX_BLOCK_LEN: usize = 1024 * 1024;

/// `addr` message caps (spec.md §4.3).
pub const MAX_ADDR_ENTRIES: usize = 1000;
pub const ADDR_BUILD_CAP: usize = 250;
pub const ADDR_MAX_AGE_SECS: i64 = 15 * 60;

/// `inv` / `notfound` entry cap.
pub const MAX_INV_ENTRIES: usize = 1000;
/// `getdata` entry cap.
pub const MAX_GETDATA_ENTRIES: usize = 50_000;
/// `getblocks` / `getheaders` locator-hash cap.
pub const MAX_LOCATOR_HASHES: usize = 500;
/// `headers` entry cap.
pub const MAX_HEADERS_ENTRIES: usize = 2000;

/// `filterload` caps (BIP37, spec.md §4.5).
pub const MAX_FILTER_BYTES: usize = 36_000;
pub const MAX_HASH_FUNCS: u32 = 50;
/// `filteradd` element cap (spec.md §4.3, §9).
pub const MAX_FILTERADD_LEN: usize = 520;

/// The length, in bytes, a `CompactInt` encoding of `len` would occupy.
pub fn compact_int_len(len: usize) -> usize {
    CompactInt::size(len)
}
