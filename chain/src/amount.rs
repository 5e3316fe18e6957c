//! A transaction output value, denominated in the smallest unit (satoshis).
//!
//! The wire format is a signed 64-bit integer (BIP141 §tx), but valid output
//! values are never negative; `-1` only appears as the synthetic placeholder
//! value substituted into truncated outputs during `SIGHASH_SINGLE` signing
//! (spec.md §4.4). `Amount<C>` carries that distinction in its type so a
//! value pulled off the wire can't silently be treated as spendable.

use std::fmt;
use std::io;
use std::marker::PhantomData;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

use crate::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

/// Bounds the set of `i64` values an `Amount<C>` may hold.
pub trait Constraint {
    fn is_valid(value: i64) -> bool;
    const NAME: &'static str;
}

/// Only nonnegative values: real transaction output values.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NonNegative {}

impl Constraint for NonNegative {
    fn is_valid(value: i64) -> bool {
        value >= 0
    }
    const NAME: &'static str = "NonNegative";
}

/// Any signed 64-bit value: the `SIGHASH_SINGLE` placeholder output value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NegativeAllowed {}

impl Constraint for NegativeAllowed {
    fn is_valid(_value: i64) -> bool {
        true
    }
    const NAME: &'static str = "NegativeAllowed";
}

/// A validated quantity of satoshis.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Amount<C = NonNegative>(i64, #[serde(skip)] PhantomData<C>);

#[derive(thiserror::Error, Debug, Clone, Copy, Eq, PartialEq)]
#[error("{value} is not a valid amount under constraint {constraint}")]
pub struct AmountError {
    value: i64,
    constraint: &'static str,
}

impl<C: Constraint> Amount<C> {
    pub fn try_from(value: i64) -> Result<Self, AmountError> {
        if C::is_valid(value) {
            Ok(Amount(value, PhantomData))
        } else {
            Err(AmountError {
                value,
                constraint: C::NAME,
            })
        }
    }

    pub fn zero() -> Self {
        Amount(0, PhantomData)
    }

    pub fn satoshis(&self) -> i64 {
        self.0
    }

    /// Reinterprets this amount under a looser constraint. Always succeeds:
    /// every `NonNegative` value is also a valid `NegativeAllowed` one.
    pub fn relax(self) -> Amount<NegativeAllowed> {
        Amount(self.0, PhantomData)
    }
}

impl<C: Constraint> fmt::Debug for Amount<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Amount").field(&self.0).finish()
    }
}

impl<C: Constraint> fmt::Display for Amount<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Amount<NonNegative> {
    type Output = Result<Amount<NonNegative>, AmountError>;

    fn add(self, rhs: Self) -> Self::Output {
        Amount::try_from(
            self.0
                .checked_add(rhs.0)
                .ok_or(AmountError { value: self.0, constraint: NonNegative::NAME })?,
        )
    }
}

impl Sub for Amount<NonNegative> {
    type Output = Result<Amount<NonNegative>, AmountError>;

    fn sub(self, rhs: Self) -> Self::Output {
        Amount::try_from(
            self.0
                .checked_sub(rhs.0)
                .ok_or(AmountError { value: self.0, constraint: NonNegative::NAME })?,
        )
    }
}

impl<C: Constraint> BitcoinSerialize for Amount<C> {
    fn bitcoin_serialize<W: io::Write>(&self, target: W) -> Result<(), io::Error> {
        self.0.bitcoin_serialize(target)
    }
}

impl<C: Constraint> BitcoinDeserialize for Amount<C> {
    fn bitcoin_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        let raw = i64::bitcoin_deserialize(reader)?;
        Amount::try_from(raw).map_err(|_| SerializationError::Parse("amount out of range"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_for_nonnegative() {
        assert!(Amount::<NonNegative>::try_from(-1).is_err());
        assert!(Amount::<NonNegative>::try_from(0).is_ok());
    }

    #[test]
    fn negative_allowed_accepts_minus_one() {
        let placeholder = Amount::<NegativeAllowed>::try_from(-1).unwrap();
        assert_eq!(placeholder.satoshis(), -1);
    }

    #[test]
    fn roundtrips_on_wire() {
        let amount = Amount::<NonNegative>::try_from(5_000_000_000).unwrap();
        let mut buf = Vec::new();
        amount.bitcoin_serialize(&mut buf).unwrap();
        let parsed = Amount::<NonNegative>::bitcoin_deserialize(&buf[..]).unwrap();
        assert_eq!(parsed, amount);
    }

    #[test]
    fn deserialize_rejects_negative() {
        let mut buf = Vec::new();
        (-1i64).bitcoin_serialize(&mut buf).unwrap();
        assert!(Amount::<NonNegative>::bitcoin_deserialize(&buf[..]).is_err());
    }
}
