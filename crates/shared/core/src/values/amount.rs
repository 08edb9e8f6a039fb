//! Integer money representation
//!
//! Balances, prices and payouts are stored as `i64` minor currency units
//! (e.g. cents), so ledger arithmetic never accumulates floating error.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use super::Quantity;

/// Currency amount in minor units
///
/// Arithmetic operators are provided for convenience on values already known
/// to be in range; ledger and venue code uses the `checked_*` variants.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Create from raw minor units
    #[inline(always)]
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Get the raw minor units
    #[inline(always)]
    pub const fn minor(self) -> i64 {
        self.0
    }

    #[inline(always)]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline(always)]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[inline(always)]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }

    /// Price × quantity, `None` on overflow
    pub fn checked_mul_qty(self, quantity: Quantity) -> Option<Amount> {
        self.0.checked_mul(quantity).map(Amount)
    }

    /// Multiply by a decimal factor, rounding half away from zero to the
    /// nearest minor unit. `None` if the result does not fit in `i64`.
    pub fn scale(self, factor: Decimal) -> Option<Amount> {
        Decimal::from(self.0)
            .checked_mul(factor)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .map(Amount)
    }

    /// The smaller of two amounts
    pub fn min(self, other: Amount) -> Amount {
        Amount(self.0.min(other.0))
    }
}

impl From<i64> for Amount {
    fn from(minor: i64) -> Self {
        Amount(minor)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Decimal {
        Decimal::from(amount.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Amount {
    type Output = Amount;
    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0 + rhs.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Amount {
    type Output = Amount;
    fn sub(self, rhs: Self) -> Self::Output {
        Amount(self.0 - rhs.0)
    }
}

impl SubAssign for Amount {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Amount {
    type Output = Amount;
    fn neg(self) -> Self::Output {
        Amount(-self.0)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, |acc, a| acc + a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_checked_arithmetic() {
        let a = Amount::from_minor(500);
        assert_eq!(a.checked_add(Amount::from_minor(250)), Some(Amount::from_minor(750)));
        assert_eq!(a.checked_sub(Amount::from_minor(600)), Some(Amount::from_minor(-100)));
        assert_eq!(Amount::from_minor(i64::MAX).checked_add(a), None);
    }

    #[test]
    fn test_mul_qty_overflow() {
        assert_eq!(Amount::from_minor(50).checked_mul_qty(10), Some(Amount::from_minor(500)));
        assert_eq!(Amount::from_minor(i64::MAX / 2).checked_mul_qty(3), None);
    }

    #[test]
    fn test_scale_rounds_half_away_from_zero() {
        assert_eq!(Amount::from_minor(200).scale(dec!(1.1)), Some(Amount::from_minor(220)));
        assert_eq!(Amount::from_minor(5).scale(dec!(0.5)), Some(Amount::from_minor(3)));
        assert_eq!(Amount::from_minor(-5).scale(dec!(0.5)), Some(Amount::from_minor(-3)));
        assert_eq!(Amount::from_minor(333).scale(dec!(0.25)), Some(Amount::from_minor(83)));
    }

    #[test]
    fn test_scale_overflow_is_none() {
        // Exceeds Decimal's 96-bit mantissa
        assert_eq!(Amount::from_minor(i64::MAX).scale(dec!(100000000000)), None);
        // Fits in Decimal but not in i64
        assert_eq!(Amount::from_minor(i64::MAX).scale(dec!(2)), None);
    }

    #[test]
    fn test_sum() {
        let total: Amount = [100, -40, 15].into_iter().map(Amount::from_minor).sum();
        assert_eq!(total, Amount::from_minor(75));
    }
}
