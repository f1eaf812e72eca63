//! # Money Module
//!
//! Provides the `Money` type for handling rupee amounts safely.
//!
//! ## Why Integer Paise?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    476.19 * 2.5 / 100 = 11.904749999999999  ❌ rounds the wrong way     │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Paise                                            │
//! │    47619 paise * 250 bps / 10000 = 1190.475 → 1190 paise (half-up)      │
//! │    Every intermediate is rounded to the paisa explicitly               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Store Boundary
//! The record store keeps amounts as decimal rupee numbers (`476.19`).
//! `Money` serializes to that shape and deserializes from numbers or
//! numeric strings, rounding to the nearest paisa.
//!
//! ## Usage
//! ```rust
//! use dukaan_core::money::Money;
//!
//! let price = Money::from_paise(150_000); // ₹1500.00
//! let line = price * 2_i64;               // ₹3000.00
//! assert_eq!(line, Money::from_rupees(3000));
//! ```

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

use crate::error::ValidationError;

// =============================================================================
// Money Type
// =============================================================================

/// A rupee amount held as integer paise (1 rupee = 100 paise).
///
/// ## Design Decisions
/// - **i64 (signed)**: negative values appear for stock returns and
///   intermediate differences, never for stored invoice totals
/// - **Half-up rounding**: every ratio (`mul_ratio`) rounds to the nearest
///   paisa with halves away from zero
///
/// ## Where Money is Used
/// ```text
/// Product.retail_price ──► CartLineItem.unit_price ──► CartLineItem.line_total
///                                                          │
///                                       extract_tax() ◄────┘
///                                                          │
/// Cart.subtotal ──► Discount Stepper ──► Cart.grand_total ──► Invoice
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

/// Paise in one rupee.
pub const PAISE_PER_RUPEE: i64 = 100;

impl Money {
    /// Creates a Money value from paise (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use dukaan_core::money::Money;
    ///
    /// let price = Money::from_paise(47_619); // ₹476.19
    /// assert_eq!(price.paise(), 47_619);
    /// ```
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from whole rupees.
    #[inline]
    pub const fn from_rupees(rupees: i64) -> Self {
        Money(rupees * PAISE_PER_RUPEE)
    }

    /// Creates a Money value from a decimal rupee amount, rounding to the
    /// nearest paisa.
    ///
    /// This is the decode path for amounts arriving from the record store.
    /// Non-finite input decodes as zero.
    pub fn from_rupees_f64(rupees: f64) -> Self {
        if !rupees.is_finite() {
            return Money::zero();
        }
        Money((rupees * PAISE_PER_RUPEE as f64).round() as i64)
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion (truncated toward zero).
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / PAISE_PER_RUPEE
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % PAISE_PER_RUPEE).abs()
    }

    /// Returns the amount as decimal rupees, for the store boundary only.
    #[inline]
    pub fn to_rupees_f64(&self) -> f64 {
        self.0 as f64 / PAISE_PER_RUPEE as f64
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

    /// Checks if the value is greater than zero.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is less than zero.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use dukaan_core::money::Money;
    ///
    /// let unit_price = Money::from_rupees(1500);
    /// assert_eq!(unit_price.multiply_quantity(2), Money::from_rupees(3000));
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Multiplies by `numerator / denominator`, rounding half-up to the paisa.
    ///
    /// All GST arithmetic goes through here so that every intermediate is
    /// rounded independently.
    ///
    /// ## Example
    /// ```rust
    /// use dukaan_core::money::Money;
    ///
    /// // ₹476.19 × 250 / 10000 = ₹11.904750 → ₹11.90
    /// let taxable = Money::from_paise(47_619);
    /// assert_eq!(taxable.mul_ratio(250, 10_000).paise(), 1_190);
    /// ```
    ///
    /// A zero denominator yields zero.
    pub fn mul_ratio(&self, numerator: i64, denominator: i64) -> Money {
        if denominator == 0 {
            return Money::zero();
        }
        let product = self.0 as i128 * numerator as i128;
        Money(div_round_half_up(product, denominator as i128) as i64)
    }

    /// Remainder of this amount modulo `modulus`, always in `[0, modulus)`.
    ///
    /// Used by the discount stepper to find the distance to the next lower
    /// round figure. A non-positive modulus returns zero.
    pub fn rem_floor(&self, modulus: Money) -> Money {
        if modulus.0 <= 0 {
            return Money::zero();
        }
        Money(self.0.rem_euclid(modulus.0))
    }
}

/// Integer division rounding halves away from zero.
fn div_round_half_up(numerator: i128, denominator: i128) -> i128 {
    let (numerator, denominator) = if denominator < 0 {
        (-numerator, -denominator)
    } else {
        (numerator, denominator)
    };
    if numerator >= 0 {
        (2 * numerator + denominator) / (2 * denominator)
    } else {
        -((2 * -numerator + denominator) / (2 * denominator))
    }
}

// =============================================================================
// Parsing & Display
// =============================================================================

impl FromStr for Money {
    type Err = ValidationError;

    /// Parses a decimal rupee string such as `"1500"`, `"476.19"` or `"-2.5"`.
    ///
    /// More than two fractional digits are rounded half-up.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: format!("'{}' is not a rupee amount", s),
        };

        let trimmed = s.trim().trim_start_matches('₹').replace(',', "");
        if trimmed.is_empty() {
            return Err(invalid());
        }

        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.as_str()),
        };

        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };

        // Keep three fractional digits so the third one can round the paisa.
        let mut frac_digits: String = frac.chars().take(3).collect();
        while frac_digits.len() < 3 {
            frac_digits.push('0');
        }
        let milli: i64 = frac_digits.parse().map_err(|_| invalid())?;
        let mut paise = whole * PAISE_PER_RUPEE + milli / 10;
        if milli % 10 >= 5 {
            paise += 1;
        }

        Ok(Money(if negative { -paise } else { paise }))
    }
}

/// Shows money as `₹1500.00`. UI formatting with lakh grouping happens
/// outside this crate.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.rupees().abs(), self.paise_part())
    }
}

// =============================================================================
// Serde (store boundary: decimal rupees)
// =============================================================================

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_rupees_f64())
    }
}

struct MoneyVisitor;

impl<'de> Visitor<'de> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a rupee amount as a number or numeric string")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        Ok(Money::from_rupees_f64(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        Ok(Money::from_rupees(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        i64::try_from(v)
            .map(Money::from_rupees)
            .map_err(|_| E::custom("rupee amount out of range"))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        v.parse().map_err(E::custom)
    }

    // Loosely-typed records use null for "not set".
    fn visit_unit<E: de::Error>(self) -> Result<Money, E> {
        Ok(Money::zero())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

// =============================================================================
// Operators
// =============================================================================

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
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(self.0.saturating_neg())
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }
}

impl Mul<u32> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: u32) -> Self {
        Money(self.0.saturating_mul(i64::from(qty)))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_paise_parts() {
        let money = Money::from_paise(47_619);
        assert_eq!(money.rupees(), 476);
        assert_eq!(money.paise_part(), 19);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_paise(47_619).to_string(), "₹476.19");
        assert_eq!(Money::from_rupees(5).to_string(), "₹5.00");
        assert_eq!(Money::from_paise(-550).to_string(), "-₹5.50");
        assert_eq!(Money::zero().to_string(), "₹0.00");
    }

    #[test]
    fn test_mul_ratio_rounds_half_up() {
        // 47619 × 250 / 10000 = 1190.475 → 1190
        assert_eq!(Money::from_paise(47_619).mul_ratio(250, 10_000).paise(), 1_190);
        // 1 × 1 / 2 = 0.5 → 1
        assert_eq!(Money::from_paise(1).mul_ratio(1, 2).paise(), 1);
        // -1 × 1 / 2 = -0.5 → -1 (away from zero)
        assert_eq!(Money::from_paise(-1).mul_ratio(1, 2).paise(), -1);
        assert_eq!(Money::from_paise(100).mul_ratio(1, 0), Money::zero());
    }

    #[test]
    fn test_rem_floor() {
        let hundred = Money::from_rupees(100);
        assert_eq!(Money::from_rupees(1540).rem_floor(hundred), Money::from_rupees(40));
        assert_eq!(Money::from_rupees(1500).rem_floor(hundred), Money::zero());
        assert_eq!(Money::from_paise(1_050).rem_floor(hundred), Money::from_paise(1_050));
        assert_eq!(Money::from_rupees(-25).rem_floor(hundred), Money::from_rupees(75));
    }

    #[test]
    fn test_parse() {
        assert_eq!("1500".parse::<Money>().unwrap(), Money::from_rupees(1500));
        assert_eq!("476.19".parse::<Money>().unwrap().paise(), 47_619);
        assert_eq!("2.5".parse::<Money>().unwrap().paise(), 250);
        assert_eq!("0.125".parse::<Money>().unwrap().paise(), 13);
        assert_eq!("₹1,500.00".parse::<Money>().unwrap(), Money::from_rupees(1500));
        assert_eq!("-5.50".parse::<Money>().unwrap().paise(), -550);
        assert!("abc".parse::<Money>().is_err());
        assert!("".parse::<Money>().is_err());
        assert!("1.2.3".parse::<Money>().is_err());
    }

    #[test]
    fn test_serde_store_shape() {
        let json = serde_json::to_value(Money::from_paise(47_619)).unwrap();
        assert_eq!(json, serde_json::json!(476.19));

        let back: Money = serde_json::from_value(serde_json::json!(476.19)).unwrap();
        assert_eq!(back.paise(), 47_619);

        let from_int: Money = serde_json::from_value(serde_json::json!(1500)).unwrap();
        assert_eq!(from_int, Money::from_rupees(1500));

        let from_str: Money = serde_json::from_value(serde_json::json!("11.90")).unwrap();
        assert_eq!(from_str.paise(), 1_190);

        let from_null: Money = serde_json::from_value(serde_json::Value::Null).unwrap();
        assert!(from_null.is_zero());
    }

    #[test]
    fn test_sum() {
        let items = [Money::from_rupees(10), Money::from_paise(50)];
        let total: Money = items.iter().sum();
        assert_eq!(total.paise(), 1_050);
    }

    #[test]
    fn test_operators_saturate() {
        let max = Money::from_paise(i64::MAX);
        assert_eq!(max * 2_i64, max);
        assert_eq!(max * 3_u32, max);
        assert_eq!(max + Money::from_paise(1), max);
        assert_eq!(-max - Money::from_rupees(5), Money::from_paise(i64::MIN));
    }
}
