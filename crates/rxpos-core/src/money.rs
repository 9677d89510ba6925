//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely, and the
//! `Percentage` type used for tax rates and discounts.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A register summing 40 lines at 0.10 each drifts before tax is even    │
//! │  applied.                                                               │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    Every amount is an i64 count of the smallest currency unit.          │
//! │    Floats only appear at the edges: exchange rates and wire values.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use rxpos_core::money::{Money, Percentage};
//!
//! let price = Money::from_cents(10000); // 100.00
//! let line = price * 3;                 // 300.00
//! let discounted = line.apply_percentage_discount(Percentage::from_percent(10.0));
//! assert_eq!(discounted.cents(), 27000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

/// Number of minor units in one major unit.
pub const MINOR_UNITS: i64 = 100;

/// Largest amount, in major units, accepted from the wire (1e15 cents).
pub const MAX_MAJOR_AMOUNT: f64 = 1e13;

/// Basis points in 100%.
const FULL_BPS: u32 = 10_000;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// `Money` carries no currency code: the cart keeps the currency beside the
/// amount (`CartLine::price_currency`, `Cart::display_currency`) and every
/// cross-currency step goes through [`crate::currency::convert`].
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                                                                         │
/// │  Product.price_amount ──► CartLine.price ──► convert ──► line total    │
/// │                                                                         │
/// │  Σ line totals ──► subtotal ──► + tax − order discount ──► total       │
/// │                                                                         │
/// │  total ──► paid amount ──► balance / change                             │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use rxpos_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from a decimal amount in major units.
    ///
    /// Only used at the wire boundary: catalog prices and typed-in paid
    /// amounts arrive as JSON numbers. Rounds half away from zero; values
    /// beyond [`MAX_MAJOR_AMOUNT`] are capped there, non-finite values give
    /// zero.
    ///
    /// ## Example
    /// ```rust
    /// use rxpos_core::money::Money;
    ///
    /// assert_eq!(Money::from_major(12.5).cents(), 1250);
    /// assert_eq!(Money::from_major(19.999).cents(), 2000);
    /// ```
    pub fn from_major(amount: f64) -> Self {
        if !amount.is_finite() {
            return Money::zero();
        }
        Money::from_major_unchecked(amount.clamp(-MAX_MAJOR_AMOUNT, MAX_MAJOR_AMOUNT))
    }

    /// Like [`from_major`](Self::from_major) but `None` for non-finite or
    /// out-of-range values.
    ///
    /// ## Example
    /// ```rust
    /// use rxpos_core::money::Money;
    ///
    /// assert_eq!(Money::try_from_major(3.5).map(|m| m.cents()), Some(350));
    /// assert!(Money::try_from_major(1e17).is_none());
    /// ```
    pub fn try_from_major(amount: f64) -> Option<Self> {
        if !amount.is_finite() || amount.abs() > MAX_MAJOR_AMOUNT {
            return None;
        }
        Some(Money::from_major_unchecked(amount))
    }

    fn from_major_unchecked(amount: f64) -> Self {
        Money((amount * MINOR_UNITS as f64).round() as i64)
    }

    /// Returns the amount in major units, for JSON payloads.
    #[inline]
    pub fn to_major(&self) -> f64 {
        self.0 as f64 / MINOR_UNITS as f64
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major_part(&self) -> i64 {
        self.0 / MINOR_UNITS
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % MINOR_UNITS).abs()
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

    /// Floors the value at zero.
    ///
    /// ## Example
    /// ```rust
    /// use rxpos_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(-50).non_negative(), Money::zero());
    /// assert_eq!(Money::from_cents(50).non_negative().cents(), 50);
    /// ```
    #[inline]
    pub const fn non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            Money(self.0)
        }
    }

    /// Multiplies money by a quantity, saturating at the `i64` bounds.
    #[inline]
    pub const fn multiply_quantity(&self, qty: u32) -> Self {
        Money(self.0.saturating_mul(qty as i64))
    }

    /// Returns `rate` of this amount, rounded to the nearest cent.
    ///
    /// Used for tax (`subtotal × tax rate`) and percent order discounts.
    ///
    /// ## Example
    /// ```rust
    /// use rxpos_core::money::{Money, Percentage};
    ///
    /// let subtotal = Money::from_cents(1000);
    /// let tax = subtotal.percentage(Percentage::from_bps(825)); // 8.25%
    /// assert_eq!(tax.cents(), 83);
    /// ```
    pub fn percentage(&self, rate: Percentage) -> Money {
        // i128 keeps large carts from overflowing before the division
        let scaled = self.0 as i128 * rate.bps() as i128;
        Money::from_cents(div_round(scaled, FULL_BPS as i128) as i64)
    }

    /// Applies a percentage discount and returns the discounted amount.
    ///
    /// ## Example
    /// ```rust
    /// use rxpos_core::money::{Money, Percentage};
    ///
    /// let subtotal = Money::from_cents(10000);
    /// let discounted = subtotal.apply_percentage_discount(Percentage::from_percent(10.0));
    /// assert_eq!(discounted.cents(), 9000);
    /// ```
    pub fn apply_percentage_discount(&self, discount: Percentage) -> Money {
        *self - self.percentage(discount)
    }

    /// Multiplies the amount by a floating-point factor (an exchange-rate
    /// ratio or `1 − discount`), rounding half away from zero.
    ///
    /// A non-finite factor yields zero; results past the `i64` range
    /// saturate.
    pub fn scale(&self, factor: f64) -> Money {
        let scaled = self.0 as f64 * factor;
        if !scaled.is_finite() {
            return Money::zero();
        }
        Money(scaled.round() as i64)
    }
}

/// Integer division rounding half away from zero.
fn div_round(numerator: i128, denominator: i128) -> i128 {
    let half = denominator / 2;
    if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        (numerator - half) / denominator
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows the plain decimal amount without a currency symbol; the
/// caller prefixes the display currency.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}{}.{:02}",
            sign,
            self.major_part().abs(),
            self.minor_part()
        )
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
        *self = *self + other;
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
        *self = *self - other;
    }
}

/// Multiplication by a cart quantity.
impl Mul<u32> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: u32) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Percentage
// =============================================================================

/// A percentage in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1000 bps = 10% (a typical line discount)
///
/// Values are clamped to 0–100% on construction from a float; that is the
/// clamping rule line discounts and percent order discounts need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Percentage(u32);

impl Percentage {
    /// Creates a percentage from basis points, capped at 100%.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        if bps > FULL_BPS {
            Percentage(FULL_BPS)
        } else {
            Percentage(bps)
        }
    }

    /// Creates a percentage from a value such as `8.25`, clamped to [0, 100].
    ///
    /// ## Example
    /// ```rust
    /// use rxpos_core::money::Percentage;
    ///
    /// assert_eq!(Percentage::from_percent(8.25).bps(), 825);
    /// assert_eq!(Percentage::from_percent(150.0).bps(), 10000);
    /// assert_eq!(Percentage::from_percent(-5.0).bps(), 0);
    /// ```
    pub fn from_percent(pct: f64) -> Self {
        if !pct.is_finite() || pct <= 0.0 {
            return Percentage::zero();
        }
        let bps = (pct.min(100.0) * 100.0).round() as u32;
        Percentage::from_bps(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display and wire payloads).
    #[inline]
    pub fn percent(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Percentage(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Percentage {
    fn default() -> Self {
        Percentage::zero()
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

/// Clamps a typed-in percentage to [0, 100] without rounding it.
///
/// Line discounts keep the exact value the cashier entered; NaN reads as 0.
///
/// ## Example
/// ```rust
/// use rxpos_core::money::clamp_percent;
///
/// assert_eq!(clamp_percent(12.345), 12.345);
/// assert_eq!(clamp_percent(150.0), 100.0);
/// assert_eq!(clamp_percent(-3.0), 0.0);
/// ```
pub fn clamp_percent(pct: f64) -> f64 {
    if pct.is_nan() {
        return 0.0;
    }
    pct.clamp(0.0, 100.0)
}

// =============================================================================
// Serde helpers
// =============================================================================

/// (De)serializes `Money` as a decimal number of major units (`12.5`).
///
/// The sale service and the catalog props speak decimals; this keeps that
/// representation at the field level. Non-finite or out-of-range values are
/// rejected rather than capped.
pub mod major_units {
    use super::{Money, MAX_MAJOR_AMOUNT};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Money, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.to_major())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Money, D::Error> {
        let amount = f64::deserialize(deserializer)?;
        parse::<D::Error>(amount)
    }

    pub(super) fn parse<E: Error>(amount: f64) -> Result<Money, E> {
        Money::try_from_major(amount).ok_or_else(|| {
            E::custom(format!(
                "amount {} is outside ±{}",
                amount, MAX_MAJOR_AMOUNT
            ))
        })
    }
}

/// Optional variant of [`major_units`].
pub mod option_major_units {
    use super::Money;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Money>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(money) => serializer.serialize_some(&money.to_major()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Money>, D::Error> {
        Option::<f64>::deserialize(deserializer)?
            .map(super::major_units::parse::<D::Error>)
            .transpose()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
