//! Money value object in minor currency units.
//!
//! All amounts are integers (kobo, cents, ...) to keep fee and discount
//! arithmetic exact. The checked operations return `None` on overflow;
//! callers in the pricing path surface that as
//! [`DomainError::ArithmeticOverflow`](crate::error::DomainError).

use serde::{Deserialize, Serialize};
use std::fmt;

/// An amount of money in minor currency units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Zero amount.
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from minor units.
    #[must_use]
    pub const fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    /// Creates a `Money` value from major units (1 major = 100 minor).
    ///
    /// Returns `None` if the conversion would overflow.
    #[must_use]
    pub const fn checked_from_major(major: u64) -> Option<Self> {
        match major.checked_mul(100) {
            Some(minor) => Some(Self(minor)),
            None => None,
        }
    }

    /// Returns the amount in minor units.
    #[must_use]
    pub const fn minor(&self) -> u64 {
        self.0
    }

    /// Returns `true` if the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two amounts, `None` on overflow.
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(sum) => Some(Self(sum)),
            None => None,
        }
    }

    /// Subtracts `other`, `None` if the result would be negative.
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        if self.0 >= other.0 {
            Some(Self(self.0 - other.0))
        } else {
            None
        }
    }

    /// Multiplies by a quantity, `None` on overflow.
    #[must_use]
    pub const fn checked_mul(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as u64) {
            Some(product) => Some(Self(product)),
            None => None,
        }
    }

    /// Computes a basis-point portion of this amount, rounded down.
    ///
    /// `Money::from_minor(10_000).bps(150)` is 1.5% of the amount, i.e. 150.
    /// Returns `None` on overflow.
    #[must_use]
    pub const fn bps(self, basis_points: u32) -> Option<Self> {
        match self.0.checked_mul(basis_points as u64) {
            Some(product) => Some(Self(product / 10_000)),
            None => None,
        }
    }

    /// Returns the smaller of two amounts.
    #[must_use]
    pub const fn min(self, other: Self) -> Self {
        if self.0 <= other.0 { self } else { other }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn major_conversion() {
        assert_eq!(Money::checked_from_major(25).unwrap(), Money::from_minor(2500));
        assert!(Money::checked_from_major(u64::MAX).is_none());
    }

    #[test]
    fn checked_sub_refuses_negative() {
        let a = Money::from_minor(100);
        let b = Money::from_minor(250);
        assert!(a.checked_sub(b).is_none());
        assert_eq!(b.checked_sub(a).unwrap(), Money::from_minor(150));
    }

    #[test]
    fn bps_rounds_down() {
        // 1.5% of 9,999 minor units is 149.985, so 149.
        assert_eq!(Money::from_minor(9_999).bps(150).unwrap(), Money::from_minor(149));
        assert_eq!(Money::from_minor(10_000).bps(150).unwrap(), Money::from_minor(150));
        assert_eq!(Money::ZERO.bps(10_000).unwrap(), Money::ZERO);
    }

    #[test]
    fn display_pads_minor_units() {
        assert_eq!(Money::from_minor(250_005).to_string(), "2500.05");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }

    proptest! {
        #[test]
        fn add_then_sub_round_trips(a in 0u64..u64::MAX / 2, b in 0u64..u64::MAX / 2) {
            let a = Money::from_minor(a);
            let b = Money::from_minor(b);
            let sum = a.checked_add(b).unwrap();
            prop_assert_eq!(sum.checked_sub(b).unwrap(), a);
        }

        #[test]
        fn bps_never_exceeds_original(amount in 0u64..1_000_000_000_000u64, bps in 0u32..=10_000u32) {
            let amount = Money::from_minor(amount);
            let portion = amount.bps(bps).unwrap();
            prop_assert!(portion <= amount);
        }
    }
}
