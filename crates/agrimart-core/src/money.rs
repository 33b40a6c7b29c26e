//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Decimal Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌                                  │
//! │                                                                         │
//! │  Invoice math also needs sub-cent precision before rounding:           │
//! │    3 × 333.33165 = 999.99495 (+ tax) → total 999.995                   │
//! │    round(999.995) = 1000, round-off = 0.005                            │
//! │                                                                         │
//! │  OUR SOLUTION: rust_decimal::Decimal                                   │
//! │    Exact base-10 arithmetic, rounding only where the rules say so      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use agrimart_core::money::Money;
//!
//! let price = Money::from_minor(109_950); // 1099.50
//! let line = price.checked_mul_quantity(2);
//! assert_eq!(line, Some(Money::from_minor(219_900)));
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use crate::types::Percent;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount in the store's single currency.
///
/// ## Design Decisions
/// - **Decimal, signed**: discounts and round-off deltas may be negative
/// - **Single field tuple struct**: zero-cost wrapper over `Decimal`
/// - **Serialized as a string** so JSON consumers never see a float
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero money value.
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Wraps an exact decimal amount.
    #[inline]
    pub const fn new(amount: Decimal) -> Self {
        Money(amount)
    }

    /// Creates money from whole currency units.
    ///
    /// ```rust
    /// use agrimart_core::money::Money;
    ///
    /// assert_eq!(Money::from_major(1000).to_string(), "1000.00");
    /// ```
    #[inline]
    pub fn from_major(units: i64) -> Self {
        Money(Decimal::from(units))
    }

    /// Creates money from minor units (1/100 of the currency unit).
    #[inline]
    pub fn from_minor(minor: i64) -> Self {
        Money(Decimal::new(minor, 2))
    }

    /// Returns the underlying decimal amount.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the value is strictly greater than zero.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Checks if the value is strictly less than zero.
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Multiplies by an item quantity. `None` on overflow.
    #[inline]
    pub fn checked_mul_quantity(&self, qty: i64) -> Option<Money> {
        self.0.checked_mul(Decimal::from(qty)).map(Money)
    }

    #[inline]
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    #[inline]
    pub fn checked_sub(&self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// Checked [`percent`](Self::percent). `None` on overflow.
    pub fn checked_percent(&self, rate: Percent) -> Option<Money> {
        self.0
            .checked_mul(rate.as_decimal())
            .and_then(|scaled| scaled.checked_div(Decimal::ONE_HUNDRED))
            .map(Money)
    }

    /// Returns `rate` percent of this amount, unrounded.
    ///
    /// ```rust
    /// use agrimart_core::money::Money;
    /// use agrimart_core::types::Percent;
    ///
    /// let base = Money::from_major(200);
    /// let rate = Percent::from_whole(5).unwrap();
    /// assert_eq!(base.percent(rate), Money::from_major(10));
    /// ```
    pub fn percent(&self, rate: Percent) -> Money {
        Money(self.0 * rate.as_decimal() / Decimal::ONE_HUNDRED)
    }

    /// Rounds to the nearest whole currency unit, halves away from zero.
    ///
    /// ```rust
    /// use agrimart_core::money::Money;
    ///
    /// let total: Money = "999.995".parse().unwrap();
    /// assert_eq!(total.round_to_whole(), Money::from_major(1000));
    /// ```
    pub fn round_to_whole(&self) -> Money {
        Money(
            self.0
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Returns zero for negative amounts.
    #[inline]
    pub fn clamp_non_negative(&self) -> Money {
        if self.is_negative() {
            Money::ZERO
        } else {
            *self
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows at least two decimal places and never hides sub-cent digits,
/// so a round-off of 0.005 prints as `0.005`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.0.normalize();
        if value.scale() < 2 {
            write!(f, "{:.2}", value)
        } else {
            write!(f, "{}", value)
        }
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str_exact(s.trim()).map(Money)
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Money(value)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_constructors() {
        assert_eq!(Money::from_minor(1099).amount(), dec!(10.99));
        assert_eq!(Money::from_major(10).amount(), dec!(10));
        assert_eq!(Money::new(dec!(1.5)), "1.5".parse().unwrap());
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_minor(1099).to_string(), "10.99");
        assert_eq!(Money::from_major(5).to_string(), "5.00");
        assert_eq!(Money::new(dec!(-5.5)).to_string(), "-5.50");
        assert_eq!(Money::new(dec!(0.005)).to_string(), "0.005");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_major(1000);
        let b = Money::from_major(400);

        assert_eq!(a - b, Money::from_major(600));
        assert_eq!(a + b, Money::from_major(1400));
        assert_eq!(-b, Money::from_major(-400));

        let total: Money = [a, b, b].iter().sum();
        assert_eq!(total, Money::from_major(1800));
    }

    #[test]
    fn test_percent() {
        let base = Money::from_major(1000);
        let ten = Percent::from_whole(10).unwrap();
        assert_eq!(base.percent(ten), Money::from_major(100));

        // Fractional rates stay exact
        let gst = Percent::new(dec!(2.5)).unwrap();
        assert_eq!(Money::from_minor(1999).percent(gst).amount(), dec!(0.49975));
    }

    #[test]
    fn test_checked_arithmetic_reports_overflow() {
        let huge = Money::new(Decimal::MAX);
        assert_eq!(huge.checked_mul_quantity(2), None);
        assert_eq!(huge.checked_add(Money::from_major(1)), None);
        assert_eq!(Money::new(Decimal::MIN).checked_sub(Money::from_major(1)), None);
        assert_eq!(huge.checked_percent(Percent::from_whole(100).unwrap()), None);

        let price = Money::from_major(250);
        assert_eq!(price.checked_mul_quantity(4), Some(Money::from_major(1000)));
        assert_eq!(
            price.checked_percent(Percent::from_whole(10).unwrap()),
            Some(Money::from_major(25))
        );
    }

    #[test]
    fn test_round_to_whole() {
        assert_eq!(Money::new(dec!(999.995)).round_to_whole(), Money::from_major(1000));
        assert_eq!(Money::new(dec!(1000.49)).round_to_whole(), Money::from_major(1000));
        assert_eq!(Money::new(dec!(1000.5)).round_to_whole(), Money::from_major(1001));
        assert_eq!(Money::new(dec!(-2.5)).round_to_whole(), Money::from_major(-3));
    }

    #[test]
    fn test_clamp_non_negative() {
        assert_eq!(Money::from_major(-1).clamp_non_negative(), Money::ZERO);
        assert_eq!(Money::from_major(7).clamp_non_negative(), Money::from_major(7));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("abc".parse::<Money>().is_err());
        assert!("".parse::<Money>().is_err());
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&Money::new(dec!(12.50))).unwrap();
        assert_eq!(json, "\"12.50\"");
    }
}
