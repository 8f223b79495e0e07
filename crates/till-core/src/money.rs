//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    25000 * 0.07 = 1750.0000000000002  ❌ WRONG!                         │
//! │                                                                         │
//! │  OUR SOLUTION: Integer đồng                                             │
//! │    VND has no minor unit, so 1 unit = 1 đồng.                           │
//! │    Percentages are applied in i128 and FLOORED,                        │
//! │    exactly matching what the backend charges.                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use till_core::money::Money;
//!
//! let price = Money::from_dong(25_000);
//! let line = price * 2;                         // 50.000 ₫
//! let discount = line.percent_floor(10.0);      // 10% → 5.000 ₫
//! assert_eq!((line - discount).dong(), 45_000);
//! ```

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

/// Millionths of a percent; percentages are exact to six decimals.
const PERCENT_SCALE: i128 = 1_000_000;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in đồng (the smallest VND unit).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative intermediate values (refund display)
/// - **Single field tuple struct**: Serializes as a bare JSON number
/// - **Lenient deserialization**: The backend sometimes sends `50000.0`
///   for decimal columns; fractional parts are dropped
///
/// ## Where Money is Used
/// ```text
/// Product.price ──► CartItem.unit_price ──► line total ──► Cart.subtotal
///                                                              │
///                        Promotion evaluator ◄─────────────────┤
///                              │                               │
///                              ▼                               ▼
///                        Cart.discount ──────────────────► Cart.total
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from đồng.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// let price = Money::from_dong(25_000);
    /// assert_eq!(price.dong(), 25_000);
    /// ```
    #[inline]
    pub const fn from_dong(dong: i64) -> Self {
        Money(dong)
    }

    /// Returns the value in đồng.
    #[inline]
    pub const fn dong(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Subtracts without going below zero.
    ///
    /// A fixed-amount promotion may exceed the subtotal; the register never
    /// shows a negative amount to pay.
    ///
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// let subtotal = Money::from_dong(15_000);
    /// let discount = Money::from_dong(20_000);
    /// assert_eq!(subtotal.saturating_sub(discount), Money::zero());
    /// ```
    #[inline]
    pub fn saturating_sub(&self, other: Money) -> Money {
        Money((self.0 - other.0).max(0))
    }

    /// Returns the smaller of two amounts (used for discount caps).
    #[inline]
    pub fn min(self, other: Money) -> Money {
        Money(self.0.min(other.0))
    }

    /// Calculates display tax, rounding half up.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`.
    /// The +5000 provides rounding (5000/10000 = 0.5).
    ///
    /// ```rust
    /// use till_core::money::Money;
    /// use till_core::types::TaxRate;
    ///
    /// let subtotal = Money::from_dong(45_005);
    /// let tax = subtotal.calculate_tax(TaxRate::from_bps(1000)); // 10%
    /// assert_eq!(tax.dong(), 4_501);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        // i128 prevents overflow on large amounts
        let tax = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_dong(tax as i64)
    }

    /// Takes `percent` percent of this amount, FLOORED:
    /// `floor(amount × percent / 100)`.
    ///
    /// ## Implementation
    /// The percentage is scaled to millionths of a percent and the product is
    /// taken in i128, so `33.333` means exactly 33.333% rather than whatever
    /// the nearest f64 multiplies out to.
    ///
    /// Flooring (not rounding) is what promotions use: the customer is never
    /// promised a đồng more than the backend will grant.
    ///
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// assert_eq!(Money::from_dong(50_000).percent_floor(10.0).dong(), 5_000);
    /// assert_eq!(Money::from_dong(100_000).percent_floor(33.333).dong(), 33_333);
    /// ```
    pub fn percent_floor(&self, percent: f64) -> Money {
        if !percent.is_finite() || percent <= 0.0 {
            return Money::zero();
        }
        let micros = (percent * PERCENT_SCALE as f64).round() as i128;
        let amount = (self.0 as i128 * micros).div_euclid(100 * PERCENT_SCALE);
        Money::from_dong(amount.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }

    /// Multiplies money by a quantity, saturating instead of overflowing.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Displays money the way Vietnamese receipts print it: `50.000 ₫`.
///
/// ## Note
/// This is for logs and the terminal shell. Browser front-ends format with
/// `Intl.NumberFormat` instead.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{} ₫", sign, grouped)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
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

/// Multiplication by i64 (for quantity calculations).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Lenient Deserialization
// =============================================================================

struct MoneyVisitor;

impl<'de> Visitor<'de> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an amount in đồng (integer, decimal or numeric string)")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        Ok(Money(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        i64::try_from(v)
            .map(Money)
            .map_err(|_| E::custom(format!("amount {} out of range", v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        if !v.is_finite() {
            return Err(E::custom("amount is not a finite number"));
        }
        Ok(Money(v.floor() as i64))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        let trimmed = v.trim();
        if let Ok(whole) = trimmed.parse::<i64>() {
            return Ok(Money(whole));
        }
        trimmed
            .parse::<f64>()
            .map_err(|_| E::custom(format!("invalid amount '{}'", v)))
            .and_then(|f| self.visit_f64(f))
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Money::from_dong(50_000).to_string(), "50.000 ₫");
        assert_eq!(Money::from_dong(1_250_000).to_string(), "1.250.000 ₫");
        assert_eq!(Money::from_dong(500).to_string(), "500 ₫");
        assert_eq!(Money::from_dong(0).to_string(), "0 ₫");
        assert_eq!(Money::from_dong(-5_000).to_string(), "-5.000 ₫");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_dong(30_000);
        let b = Money::from_dong(5_000);

        assert_eq!((a + b).dong(), 35_000);
        assert_eq!((a - b).dong(), 25_000);
        assert_eq!((a * 3).dong(), 90_000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.dong(), 40_000);
    }

    #[test]
    fn test_percent_floor_never_rounds_up() {
        // 10% of 45,999 = 4,599.9 → 4,599
        assert_eq!(Money::from_dong(45_999).percent_floor(10.0).dong(), 4_599);
        // 7.5% of 50,000 = 3,750
        assert_eq!(Money::from_dong(50_000).percent_floor(7.5).dong(), 3_750);
        // 12.5% of 87,654 = 10,956.75 → 10,956
        assert_eq!(Money::from_dong(87_654).percent_floor(12.5).dong(), 10_956);
    }

    #[test]
    fn test_percent_floor_keeps_sub_basis_point_precision() {
        assert_eq!(Money::from_dong(100_000).percent_floor(33.333).dong(), 33_333);
        assert_eq!(Money::from_dong(1_000_000).percent_floor(0.125).dong(), 1_250);
        assert_eq!(Money::from_dong(50_000).percent_floor(-5.0), Money::zero());
        assert_eq!(Money::from_dong(50_000).percent_floor(f64::NAN), Money::zero());
    }

    #[test]
    fn test_quantity_arithmetic_saturates() {
        let price = Money::from_dong(25_000);
        assert_eq!(price.multiply_quantity(i64::MAX).dong(), i64::MAX);
        assert_eq!((Money::from_dong(i64::MAX) + price).dong(), i64::MAX);
    }

    #[test]
    fn test_tax_rounds_half_up() {
        let rate = TaxRate::from_bps(1000);
        assert_eq!(Money::from_dong(50_000).calculate_tax(rate).dong(), 5_000);
        assert_eq!(Money::from_dong(5).calculate_tax(rate).dong(), 1); // 0.5 → 1
        assert_eq!(Money::from_dong(4).calculate_tax(rate).dong(), 0);
    }

    #[test]
    fn test_saturating_sub() {
        let subtotal = Money::from_dong(10_000);
        assert_eq!(subtotal.saturating_sub(Money::from_dong(4_000)).dong(), 6_000);
        assert_eq!(subtotal.saturating_sub(Money::from_dong(40_000)), Money::zero());
    }

    #[test]
    fn test_deserialize_lenient_shapes() {
        let from_int: Money = serde_json::from_str("50000").unwrap();
        let from_float: Money = serde_json::from_str("50000.0").unwrap();
        let from_string: Money = serde_json::from_str("\"45000\"").unwrap();
        let from_decimal_string: Money = serde_json::from_str("\"45000.75\"").unwrap();

        assert_eq!(from_int.dong(), 50_000);
        assert_eq!(from_float.dong(), 50_000);
        assert_eq!(from_string.dong(), 45_000);
        assert_eq!(from_decimal_string.dong(), 45_000);
        assert!(serde_json::from_str::<Money>("\"abc\"").is_err());
    }

    #[test]
    fn test_serializes_as_bare_number() {
        let json = serde_json::to_string(&Money::from_dong(25_000)).unwrap();
        assert_eq!(json, "25000");
    }
}
