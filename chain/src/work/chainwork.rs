//! Cumulative proof-of-work, as an arbitrary-precision unsigned integer.
//!
//! A single block's work and the running chain total are both set by the
//! external chain layer (no retargeting or chain-reorg logic lives here);
//! this type only has to hold and add arbitrarily large totals correctly.

use std::fmt;

/// An arbitrary-precision unsigned integer, stored as little-endian base
/// `2^32` limbs with no trailing zero limb (other than representing zero
/// itself as a single `0` limb).
#[derive(Clone, Eq, PartialEq)]
pub struct ChainWork(Vec<u32>);

impl ChainWork {
    pub fn zero() -> ChainWork {
        ChainWork(vec![0])
    }

    pub fn from_u64(value: u64) -> ChainWork {
        let mut work = ChainWork(vec![value as u32, (value >> 32) as u32]);
        work.trim();
        work
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&limb| limb == 0)
    }

    /// The big-endian byte representation, with no leading zero bytes
    /// (other than a single zero byte for a zero value).
    pub fn to_be_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.0.len() * 4);
        for limb in self.0.iter().rev() {
            bytes.extend_from_slice(&limb.to_be_bytes());
        }
        while bytes.len() > 1 && bytes[0] == 0 {
            bytes.remove(0);
        }
        bytes
    }

    fn trim(&mut self) {
        while self.0.len() > 1 && *self.0.last().unwrap() == 0 {
            self.0.pop();
        }
    }
}

impl std::ops::Add for &ChainWork {
    type Output = ChainWork;

    fn add(self, other: &ChainWork) -> ChainWork {
        let len = self.0.len().max(other.0.len()) + 1;
        let mut result = vec![0u32; len];
        let mut carry: u64 = 0;
        for i in 0..len {
            let a = *self.0.get(i).unwrap_or(&0) as u64;
            let b = *other.0.get(i).unwrap_or(&0) as u64;
            let sum = a + b + carry;
            result[i] = sum as u32;
            carry = sum >> 32;
        }
        let mut work = ChainWork(result);
        work.trim();
        work
    }
}

impl std::ops::AddAssign<&ChainWork> for ChainWork {
    fn add_assign(&mut self, other: &ChainWork) {
        *self = &*self + other;
    }
}

impl Ord for ChainWork {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.to_be_bytes()
            .len()
            .cmp(&other.to_be_bytes().len())
            .then_with(|| self.to_be_bytes().cmp(&other.to_be_bytes()))
    }
}

impl PartialOrd for ChainWork {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for ChainWork {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("ChainWork").field(&hex::encode(self.to_be_bytes())).finish()
    }
}

impl Default for ChainWork {
    fn default() -> Self {
        ChainWork::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_zero() {
        assert!(ChainWork::zero().is_zero());
        assert!(!ChainWork::from_u64(1).is_zero());
    }

    #[test]
    fn add_carries_across_limbs() {
        let a = ChainWork::from_u64(u64::MAX);
        let b = ChainWork::from_u64(1);
        let sum = &a + &b;
        assert_eq!(sum.to_be_bytes(), vec![1, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn ordering_compares_magnitude() {
        assert!(ChainWork::from_u64(1) < ChainWork::from_u64(2));
        let big = &ChainWork::from_u64(u64::MAX) + &ChainWork::from_u64(1);
        assert!(ChainWork::from_u64(u64::MAX) < big);
    }
}
