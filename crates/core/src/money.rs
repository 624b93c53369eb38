//! Fixed-point money.
//!
//! All amounts are carried in the smallest currency unit (e.g. cents) as an
//! unsigned integer. Floating point is never used for money; arithmetic is
//! checked so overflow surfaces as a domain failure instead of a wrap.

use serde::{Deserialize, Serialize};

use crate::value_object::ValueObject;

/// An amount of money in the smallest currency unit (e.g. cents).
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    pub const fn cents(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Add two amounts; `None` on overflow.
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Multiply by a unitless factor (e.g. a quantity); `None` on overflow.
    pub fn checked_mul(self, factor: u64) -> Option<Money> {
        self.0.checked_mul(factor).map(Money)
    }
}

impl ValueObject for Money {}

impl core::fmt::Display for Money {
    /// Renders in major units with two decimals, e.g. `1234` -> `12.34`.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}
