//! # Pricing Engine
//!
//! Derives the cart totals shown on the register.
//!
//! ## Calculation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  for each line:                                                         │
//! │      net   = price × qty × (1 − discount%)        (line currency)       │
//! │      total = convert(net, line currency → display currency)             │
//! │                                                                         │
//! │  subtotal        = Σ line totals                                        │
//! │  tax             = subtotal × tax rate                                  │
//! │  order discount  = subtotal × value%   (percent)                        │
//! │                  = value               (fixed, already display ccy)     │
//! │  total           = max(0, subtotal + tax − order discount)              │
//! │                                                                         │
//! │  paid ──► balance = max(0, total − paid)                                │
//! │           change  = paid − total  if paid > total, else 0               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is recomputed from the cart on demand; nothing is cached.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::{Cart, CartLine};
use crate::currency::{CurrencyCode, CurrencySettings};
use crate::money::Money;

/// A line's contribution to the subtotal, in the display currency.
pub fn line_total(line: &CartLine, display: &CurrencyCode, currency: &CurrencySettings) -> Money {
    currency.convert(line.net_amount(), &line.price_currency, display)
}

/// A line's unit price in the display currency, as sent with a sale.
pub fn display_unit_price(
    line: &CartLine,
    display: &CurrencyCode,
    currency: &CurrencySettings,
) -> Money {
    currency.convert(line.price, &line.price_currency, display)
}

// =============================================================================
// Cart Totals
// =============================================================================

/// Cart totals summary, all amounts in `currency`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartTotals {
    pub currency: CurrencyCode,
    pub item_count: usize,
    pub total_quantity: u64,
    /// Sum of converted line totals (after line discounts).
    pub subtotal: Money,
    /// What line discounts took off, converted.
    pub line_discount_total: Money,
    pub tax_amount: Money,
    pub order_discount_amount: Money,
    /// Never negative.
    pub total: Money,
}

impl CartTotals {
    /// Computes the totals of `cart` in its display currency.
    ///
    /// ## Example
    /// ```rust
    /// use rxpos_core::{Cart, CartTotals, CurrencySettings, OrderDiscount};
    /// # use rxpos_core::{Product, ProductId, money::Money};
    /// # let product = Product {
    /// #     id: ProductId::new("1"), name: "Insulin pen".into(), code: "INS".into(),
    /// #     barcode: None, stock: 10, price_amount: Money::from_cents(10000),
    /// #     price_currency: "USD".into(), wholesale_price_amount: None,
    /// #     category_id: None, image_url: None,
    /// # };
    ///
    /// let mut cart = Cart::new("USD");
    /// cart.add_line(&product).unwrap();
    /// cart.set_order_discount(OrderDiscount::percent(10.0)).unwrap();
    ///
    /// let totals = CartTotals::compute(&cart, &CurrencySettings::single("USD"));
    /// assert_eq!(totals.subtotal.cents(), 10000);
    /// assert_eq!(totals.order_discount_amount.cents(), 1000);
    /// assert_eq!(totals.total.cents(), 9000);
    /// ```
    pub fn compute(cart: &Cart, currency: &CurrencySettings) -> Self {
        let display = cart.display_currency();

        let mut subtotal = Money::zero();
        let mut line_discount_total = Money::zero();
        for line in cart.lines() {
            let gross = currency.convert(line.gross_amount(), &line.price_currency, display);
            let net = line_total(line, display, currency);
            subtotal += net;
            line_discount_total += gross - net;
        }

        let tax_amount = subtotal.percentage(cart.tax_rate());
        let order_discount_amount = cart.order_discount().amount_for(subtotal);
        let total = (subtotal + tax_amount - order_discount_amount).non_negative();

        CartTotals {
            currency: display.clone(),
            item_count: cart.line_count(),
            total_quantity: cart.total_quantity(),
            subtotal,
            line_discount_total,
            tax_amount,
            order_discount_amount,
            total,
        }
    }
}

// =============================================================================
// Payment Summary
// =============================================================================

/// What the customer handed over against a total.
///
/// At most one of `balance` and `change` is nonzero; both are zero when the
/// customer paid exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PaymentSummary {
    pub total: Money,
    pub paid: Money,
    /// Still owed.
    pub balance: Money,
    /// To hand back.
    pub change: Money,
}

impl PaymentSummary {
    /// Settles `paid` against `total`. `None` means "paid exactly".
    pub fn settle(total: Money, paid: Option<Money>) -> Self {
        let paid = paid.unwrap_or(total);
        let balance = (total - paid).non_negative();
        let change = if paid > total {
            paid - total
        } else {
            Money::zero()
        };
        PaymentSummary {
            total,
            paid,
            balance,
            change,
        }
    }

    pub fn is_fully_paid(&self) -> bool {
        self.balance.is_zero()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::ExchangeRateTable;
    use crate::types::{OrderDiscount, Product, ProductId};

    fn product(id: &str, price_cents: i64, currency: &str, stock: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {}", id),
            code: format!("P{}", id),
            barcode: None,
            stock,
            price_amount: Money::from_cents(price_cents),
            price_currency: currency.into(),
            wholesale_price_amount: None,
            category_id: None,
            image_url: None,
        }
    }

    fn settings() -> CurrencySettings {
        let rates: ExchangeRateTable = [("X", 1.0), ("Y", 2.0)].into_iter().collect();
        CurrencySettings::new("X", rates)
    }

    /// One line at 100.00 X, quantity 3, 10% line discount.
    fn scenario_a_cart() -> Cart {
        let p = product("1", 10000, "X", 10);
        let mut cart = Cart::new("X");
        cart.add_line(&p).unwrap();
        cart.update_quantity(&p.id, 3).unwrap();
        cart.set_line_discount(&p.id, 10.0).unwrap();
        cart
    }

    #[test]
    fn test_line_discount_subtotal() {
        let totals = CartTotals::compute(&scenario_a_cart(), &settings());
        assert_eq!(totals.subtotal.cents(), 27000);
        assert_eq!(totals.line_discount_total.cents(), 3000);
        assert!(totals.tax_amount.is_zero());
        assert_eq!(totals.total.cents(), 27000);
    }

    #[test]
    fn test_fractional_line_discount_subtotal() {
        let p = product("1", 100_000, "X", 10);
        let mut cart = Cart::new("X");
        cart.add_line(&p).unwrap();
        cart.set_line_discount(&p.id, 12.345).unwrap();

        let totals = CartTotals::compute(&cart, &settings());
        assert_eq!(totals.subtotal.cents(), 87_655);
        assert_eq!(totals.line_discount_total.cents(), 12_345);
    }

    #[test]
    fn test_compute_saturates_on_huge_amounts() {
        let p = product("1", i64::MAX / 2, "X", 10);
        let mut cart = Cart::new("X");
        cart.add_line(&p).unwrap();
        cart.update_quantity(&p.id, 2).unwrap();
        cart.set_tax_rate(10.0).unwrap();

        let totals = CartTotals::compute(&cart, &settings());
        assert!(totals.subtotal.cents() > 0);
        assert_eq!(totals.total.cents(), i64::MAX);
    }

    #[test]
    fn test_percent_order_discount() {
        let mut cart = scenario_a_cart();
        cart.set_order_discount(OrderDiscount::percent(10.0)).unwrap();
        let totals = CartTotals::compute(&cart, &settings());
        assert_eq!(totals.order_discount_amount.cents(), 2700);
        assert_eq!(totals.total.cents(), 24300);
    }

    #[test]
    fn test_tax_applies_to_subtotal() {
        let mut cart = scenario_a_cart();
        cart.set_tax_rate(10.0).unwrap();
        cart.set_order_discount(OrderDiscount::percent(10.0)).unwrap();
        let totals = CartTotals::compute(&cart, &settings());
        assert_eq!(totals.tax_amount.cents(), 2700);
        assert_eq!(totals.total.cents(), 27000);
    }

    #[test]
    fn test_fixed_discount_never_drives_total_negative() {
        let mut cart = scenario_a_cart();
        cart.set_order_discount(OrderDiscount::fixed(Money::from_cents(1_000_000)))
            .unwrap();
        let totals = CartTotals::compute(&cart, &settings());
        assert_eq!(totals.order_discount_amount.cents(), 1_000_000);
        assert!(totals.total.is_zero());
    }

    #[test]
    fn test_lines_in_other_currencies_are_converted() {
        let mut cart = Cart::new("X");
        cart.add_line(&product("1", 1000, "Y", 5)).unwrap();
        cart.add_line(&product("2", 300, "X", 5)).unwrap();

        let totals = CartTotals::compute(&cart, &settings());
        // 10.00 Y → 5.00 X, plus 3.00 X
        assert_eq!(totals.subtotal.cents(), 800);

        cart.set_display_currency("Y");
        let totals = CartTotals::compute(&cart, &settings());
        assert_eq!(totals.currency.as_str(), "Y");
        assert_eq!(totals.subtotal.cents(), 1600);
    }

    #[test]
    fn test_display_unit_price() {
        let mut cart = Cart::new("X");
        cart.add_line(&product("1", 1000, "Y", 5)).unwrap();
        let line = &cart.lines()[0];
        assert_eq!(display_unit_price(line, cart.display_currency(), &settings()).cents(), 500);
    }

    #[test]
    fn test_empty_cart_totals() {
        let totals = CartTotals::compute(&Cart::new("X"), &settings());
        assert_eq!(totals.item_count, 0);
        assert!(totals.total.is_zero());
    }

    #[test]
    fn test_overpayment_gives_change() {
        let total = Money::from_cents(24300);
        let summary = PaymentSummary::settle(total, Some(total + Money::from_cents(5000)));
        assert_eq!(summary.change.cents(), 5000);
        assert!(summary.balance.is_zero());
        assert!(summary.is_fully_paid());
    }

    #[test]
    fn test_underpayment_leaves_balance() {
        let summary =
            PaymentSummary::settle(Money::from_cents(1000), Some(Money::from_cents(400)));
        assert_eq!(summary.balance.cents(), 600);
        assert!(summary.change.is_zero());
        assert!(!summary.is_fully_paid());
    }

    #[test]
    fn test_paid_defaults_to_total() {
        let summary = PaymentSummary::settle(Money::from_cents(1000), None);
        assert_eq!(summary.paid.cents(), 1000);
        assert!(summary.balance.is_zero());
        assert!(summary.change.is_zero());
    }
}
