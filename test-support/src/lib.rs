//! Shared test infrastructure, trimmed from the teacher's `zebra-test`:
//! tracing setup for tests that want to see log output, and a small hex
//! fixture helper so test modules don't each re-derive it.

use std::sync::Once;

static INIT: Once = Once::new();

/// Installs a `tracing` subscriber that prints to the test harness's
/// captured stdout. Safe to call from every test; only the first call takes
/// effect.
pub fn init() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(
                std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_owned()),
            )
            .init();
    });
}

/// Decodes a hex fixture string, panicking with the source string on
/// failure so a bad fixture is obvious at the call site.
pub fn from_hex(s: &str) -> Vec<u8> {
    hex::decode(s).unwrap_or_else(|e| panic!("invalid hex fixture {s:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_hex_decodes_valid_input() {
        assert_eq!(from_hex("deadbeef"), vec![0xde, 0xad, 0xbe, 0xef]);
    }
}
