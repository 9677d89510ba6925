//! # Currency Conversion
//!
//! Converts amounts between the shop's currencies for display.
//!
//! ## Rate Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every rate is relative to the shop BASE currency (rate 1.0).           │
//! │                                                                         │
//! │    rates = { USD: 1.0, EUR: 0.9, SYP: 13000.0 }                         │
//! │                                                                         │
//! │    convert(10 EUR → SYP) = 10 × 13000 / 0.9                             │
//! │                                                                         │
//! │  Missing rates fall back instead of failing:                            │
//! │    from: rates[from] → rates[base] → 1.0                                │
//! │    to:   rates[to]   → 1.0                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Unknown currency codes convert at rate 1. That keeps a cart usable when
//! the rate table is stale, at the price of silently wrong display totals;
//! it is logged at `debug` so it shows up in traces.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Currency Code
// =============================================================================

/// An ISO 4217 style currency code, normalized to upper case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(from = "String", into = "String")]
#[ts(export)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(code: impl AsRef<str>) -> Self {
        CurrencyCode(code.as_ref().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CurrencyCode {
    fn from(code: String) -> Self {
        CurrencyCode::new(code)
    }
}

impl From<&str> for CurrencyCode {
    fn from(code: &str) -> Self {
        CurrencyCode::new(code)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Exchange Rate Table
// =============================================================================

/// Currency code → rate relative to the shop base currency.
///
/// Delivered with the page props of the sale screen; never persisted here.
/// Serializes as a plain JSON object: `{"USD": 1.0, "EUR": 0.9}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct ExchangeRateTable(BTreeMap<CurrencyCode, f64>);

impl ExchangeRateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the rate for a currency, replacing any previous one.
    pub fn insert(&mut self, code: impl Into<CurrencyCode>, rate: f64) {
        self.0.insert(code.into(), rate);
    }

    /// Returns the configured rate, if any.
    pub fn rate(&self, code: &CurrencyCode) -> Option<f64> {
        self.0.get(code).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn currencies(&self) -> impl Iterator<Item = &CurrencyCode> {
        self.0.keys()
    }
}

impl<C: Into<CurrencyCode>> FromIterator<(C, f64)> for ExchangeRateTable {
    fn from_iter<I: IntoIterator<Item = (C, f64)>>(iter: I) -> Self {
        ExchangeRateTable(iter.into_iter().map(|(c, r)| (c.into(), r)).collect())
    }
}

// =============================================================================
// Conversion
// =============================================================================

/// Converts `amount` from one currency to another.
///
/// ## Rules
/// - A zero amount short-circuits to zero.
/// - `from_rate = rates[from] ?? rates[base] ?? 1`, `to_rate = rates[to] ?? 1`.
/// - Result is `amount × to_rate / from_rate`, rounded to the cent.
/// - A zero `to_rate` or zero `from_rate` yields zero instead of infinity.
///
/// ## Example
/// ```rust
/// use rxpos_core::currency::{convert, CurrencyCode, ExchangeRateTable};
/// use rxpos_core::money::Money;
///
/// let rates: ExchangeRateTable = [("X", 1.0), ("Y", 2.0)].into_iter().collect();
/// let x = CurrencyCode::new("X");
/// let y = CurrencyCode::new("Y");
///
/// // 10.00 Y is worth 5.00 X
/// let converted = convert(Money::from_cents(1000), &y, &x, &rates, &x);
/// assert_eq!(converted.cents(), 500);
/// ```
pub fn convert(
    amount: Money,
    from: &CurrencyCode,
    to: &CurrencyCode,
    rates: &ExchangeRateTable,
    base: &CurrencyCode,
) -> Money {
    if amount.is_zero() {
        return Money::zero();
    }
    let from_rate = rates.rate(from).or_else(|| rates.rate(base)).unwrap_or_else(|| {
        debug!(currency = %from, "No exchange rate for source currency, using 1");
        1.0
    });
    let to_rate = rates.rate(to).unwrap_or_else(|| {
        debug!(currency = %to, "No exchange rate for target currency, using 1");
        1.0
    });

    if to_rate == 0.0 || from_rate == 0.0 {
        return Money::zero();
    }

    amount.scale(to_rate / from_rate)
}

/// The shop's currency setup: base currency plus rate table.
///
/// Bundles the two arguments every conversion needs so callers pass one
/// value through the pricing engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CurrencySettings {
    pub base_currency: CurrencyCode,
    #[serde(default)]
    pub rates: ExchangeRateTable,
}

impl CurrencySettings {
    pub fn new(base_currency: impl Into<CurrencyCode>, rates: ExchangeRateTable) -> Self {
        CurrencySettings {
            base_currency: base_currency.into(),
            rates,
        }
    }

    /// A single-currency shop: everything converts at 1.
    pub fn single(base_currency: impl Into<CurrencyCode>) -> Self {
        Self::new(base_currency, ExchangeRateTable::new())
    }

    pub fn convert(&self, amount: Money, from: &CurrencyCode, to: &CurrencyCode) -> Money {
        convert(amount, from, to, &self.rates, &self.base_currency)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rates() -> ExchangeRateTable {
        [("X", 1.0), ("Y", 2.0), ("Z", 0.0)].into_iter().collect()
    }

    #[test]
    fn test_codes_are_normalized() {
        assert_eq!(CurrencyCode::new(" usd "), CurrencyCode::new("USD"));
        let parsed: CurrencyCode = serde_json::from_str("\"eur\"").unwrap();
        assert_eq!(parsed.as_str(), "EUR");
    }

    #[test]
    fn test_convert_into_base() {
        let x = CurrencyCode::new("X");
        let y = CurrencyCode::new("Y");
        assert_eq!(convert(Money::from_cents(1000), &y, &x, &rates(), &x).cents(), 500);
        assert_eq!(convert(Money::from_cents(500), &x, &y, &rates(), &x).cents(), 1000);
    }

    #[test]
    fn test_zero_amount_short_circuits() {
        let x = CurrencyCode::new("X");
        let z = CurrencyCode::new("Z");
        assert!(convert(Money::zero(), &z, &x, &rates(), &x).is_zero());
    }

    #[test]
    fn test_zero_rates_yield_zero() {
        let x = CurrencyCode::new("X");
        let z = CurrencyCode::new("Z");
        assert!(convert(Money::from_cents(1000), &x, &z, &rates(), &x).is_zero());
        assert!(convert(Money::from_cents(1000), &z, &x, &rates(), &x).is_zero());
    }

    #[test]
    fn test_unknown_source_falls_back_to_base_rate() {
        let y = CurrencyCode::new("Y");
        let unknown = CurrencyCode::new("QQQ");
        // from_rate = rates[base=Y] = 2, to_rate = rates[Y] = 2
        assert_eq!(convert(Money::from_cents(700), &unknown, &y, &rates(), &y).cents(), 700);
    }

    #[test]
    fn test_unknown_currencies_default_to_one() {
        let a = CurrencyCode::new("AAA");
        let b = CurrencyCode::new("BBB");
        let empty = ExchangeRateTable::new();
        assert_eq!(convert(Money::from_cents(1234), &a, &b, &empty, &a).cents(), 1234);
    }

    #[test]
    fn test_round_trip_within_a_cent() {
        let table: ExchangeRateTable = [("USD", 1.0), ("EUR", 0.91), ("JPY", 151.37)]
            .into_iter()
            .collect();
        let settings = CurrencySettings::new("USD", table);
        let eur = CurrencyCode::new("EUR");
        let jpy = CurrencyCode::new("JPY");

        for cents in [1, 99, 1000, 123_456, 9_999_999] {
            let amount = Money::from_cents(cents);
            let there = settings.convert(amount, &eur, &jpy);
            let back = settings.convert(there, &jpy, &eur);
            assert!((back - amount).cents().abs() <= 1, "{cents} -> {back:?}");
        }
    }

    #[test]
    fn test_rate_table_serde() {
        let table: ExchangeRateTable = serde_json::from_str(r#"{"usd": 1.0, "EUR": 0.9}"#).unwrap();
        assert_eq!(table.rate(&CurrencyCode::new("USD")), Some(1.0));
        assert_eq!(table.len(), 2);
    }
}
