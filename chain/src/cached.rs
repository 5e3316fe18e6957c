use crate::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

/// An `Option` that is never itself (de)serialized.
///
/// Lets a struct carry a lazily-computed field (typically a hash) without
/// the field being part of its wire or equality representation. Decoding
/// always produces an empty cache; callers populate it once on first use.
#[derive(Clone, Copy, Eq)]
pub struct Cached<T: Clone + Copy>(Option<T>);

impl<T: Clone + Copy> Cached<T> {
    pub fn new() -> Cached<T> {
        Cached(None)
    }

    pub fn from(val: T) -> Cached<T> {
        Cached(Some(val))
    }

    pub fn value(&self) -> Option<T> {
        self.0
    }

    pub fn mut_value(&mut self) -> &mut Option<T> {
        &mut self.0
    }

    pub fn has_value(&self) -> bool {
        self.0.is_some()
    }
}

impl<T: Clone + Copy> Default for Cached<T> {
    fn default() -> Self {
        Cached::new()
    }
}

/// Two caches are equal unless both are populated and disagree. This lets
/// freshly-constructed values (empty cache) compare equal to their
/// deserialized counterparts (always populated on decode).
impl<T: PartialEq + Copy> PartialEq for Cached<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self.0, other.0) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }
}

impl<T: Clone + Copy> std::fmt::Debug for Cached<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl<T: Clone + Copy> BitcoinSerialize for Cached<T> {
    fn bitcoin_serialize<W>(&self, _target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        Ok(())
    }
}

impl<T: Clone + Copy> BitcoinDeserialize for Cached<T> {
    fn bitcoin_deserialize<R: std::io::Read>(_target: R) -> Result<Self, SerializationError> {
        Ok(Cached(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cache_matches_any_value() {
        assert_eq!(Cached::<u32>::new(), Cached::from(42));
        assert_eq!(Cached::from(42), Cached::<u32>::new());
    }

    #[test]
    fn populated_caches_compare_by_value() {
        assert_eq!(Cached::from(1u32), Cached::from(1));
        assert_ne!(Cached::from(1u32), Cached::from(2));
    }
}
