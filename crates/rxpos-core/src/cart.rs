//! # Cart
//!
//! The sale being rung up: lines, order discount, tax rate, sale mode and
//! display currency.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Register Action          Cart Method             Cart Change           │
//! │  ───────────────          ───────────             ───────────           │
//! │                                                                         │
//! │  Scan / click product ──► add_line() ───────────► qty + 1 or new line  │
//! │                                                                         │
//! │  Type quantity ─────────► update_quantity() ────► qty = n (0 removes)  │
//! │                                                                         │
//! │  Click remove ──────────► remove_line() ────────► line dropped         │
//! │                                                                         │
//! │  Line discount field ───► set_line_discount() ──► clamped to 0..=100   │
//! │                                                                         │
//! │  Retail/Wholesale ──────► set_sale_mode() ──────► every line re-priced │
//! │                                                                         │
//! │  New / after submit ────► clear() ──────────────► empty + new number   │
//! │                                                                         │
//! │  NOTE: A rejected mutation leaves the cart exactly as it was.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stock Invariant
//! `quantity <= max_stock` holds after every mutation. Mutators refuse
//! instead of clamping. `max_stock` is a snapshot of the product stock taken
//! when the line was last added; [`Cart::refresh_stock`] can lower it below
//! the quantity, which is what the pre-submit check catches.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use ts_rs::TS;

use crate::catalog::Catalog;
use crate::currency::CurrencyCode;
use crate::error::{CoreError, CoreResult};
use crate::money::{clamp_percent, Money, Percentage};
use crate::order::{OrderNumber, DEFAULT_ORDER_PREFIX};
use crate::types::{DiscountKind, OrderDiscount, Product, ProductId, SaleMode};
use crate::validation::{validate_discount_value, validate_tax_rate};
use crate::MAX_CART_LINES;

// =============================================================================
// Cart Line
// =============================================================================

/// One product in the cart.
///
/// ## Design Notes
/// - `product_id` is the line key; adding the same product again bumps the
///   quantity instead of creating a second line.
/// - `name`, `code` and `price` are frozen copies taken from the catalog.
///   Only a sale-mode switch re-prices a line.
/// - `price` is in `price_currency`; conversion to the display currency
///   happens in the pricing engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub code: String,
    /// Unit price in `price_currency`.
    pub price: Money,
    pub price_currency: CurrencyCode,
    pub quantity: u32,
    /// Stock available when the line was last added.
    pub max_stock: u32,
    /// Percent off this line, 0–100, kept exactly as typed.
    pub discount_percent: f64,
    pub image_url: Option<String>,
}

impl CartLine {
    fn from_product(product: &Product, mode: SaleMode, can_sell_wholesale: bool) -> Self {
        CartLine {
            product_id: product.id.clone(),
            name: product.name.clone(),
            code: product.code.clone(),
            price: product.effective_price(mode, can_sell_wholesale),
            price_currency: product.price_currency.clone(),
            quantity: 1,
            max_stock: product.available_stock(),
            discount_percent: 0.0,
            image_url: product.image_url.clone(),
        }
    }

    /// `price × quantity`, in the line's own currency.
    pub fn gross_amount(&self) -> Money {
        self.price.multiply_quantity(self.quantity)
    }

    /// `price × quantity × (1 − discount)`, in the line's own currency.
    ///
    /// The discount amount is rounded to cents, half away from zero.
    pub fn net_amount(&self) -> Money {
        let gross = self.gross_amount();
        gross - gross.scale(self.discount_percent / 100.0)
    }

    pub fn exceeds_stock(&self) -> bool {
        self.quantity > self.max_stock
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The shopping cart.
///
/// ## Invariants
/// - Lines are unique by `product_id` and kept in insertion order
/// - Every line has `1 <= quantity <= max_stock` after a mutation
/// - At most [`MAX_CART_LINES`] lines
/// - Order discount and tax rate are never negative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Cart {
    lines: Vec<CartLine>,
    order_discount: OrderDiscount,
    tax_rate: Percentage,
    sale_mode: SaleMode,
    display_currency: CurrencyCode,
    can_sell_wholesale: bool,
    order_prefix: String,
    order_number: OrderNumber,
}

impl Cart {
    /// Creates an empty retail cart displayed in `display_currency`.
    pub fn new(display_currency: impl Into<CurrencyCode>) -> Self {
        Cart {
            lines: Vec::new(),
            order_discount: OrderDiscount::none(),
            tax_rate: Percentage::zero(),
            sale_mode: SaleMode::Retail,
            display_currency: display_currency.into(),
            can_sell_wholesale: false,
            order_prefix: DEFAULT_ORDER_PREFIX.to_string(),
            order_number: OrderNumber::random(DEFAULT_ORDER_PREFIX),
        }
    }

    /// Allows (or forbids) wholesale pricing for this seller.
    pub fn with_wholesale_permission(mut self, allowed: bool) -> Self {
        self.can_sell_wholesale = allowed;
        self
    }

    /// Uses `prefix` for this and every following order number.
    pub fn with_order_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.order_prefix = prefix.into();
        self.order_number = OrderNumber::random(&self.order_prefix);
        self
    }

    // =========================================================================
    // Line Mutators
    // =========================================================================

    /// Adds one unit of `product`.
    ///
    /// ## Behavior
    /// - Product already in cart: quantity + 1, if stock allows
    /// - Product not in cart: new line with quantity 1 at the effective price
    ///   for the current sale mode
    ///
    /// ## Returns
    /// The line's new quantity.
    ///
    /// ## Errors
    /// - `InsufficientStock` when the extra unit exceeds the product stock
    /// - `CartTooLarge` when a new line would exceed [`MAX_CART_LINES`]
    pub fn add_line(&mut self, product: &Product) -> CoreResult<u32> {
        let available = product.available_stock();

        if let Some(line) = self.line_mut(&product.id) {
            let requested = line.quantity.saturating_add(1);
            if requested > available {
                warn!(product_id = %product.id, available, requested, "Add rejected: insufficient stock");
                return Err(CoreError::InsufficientStock {
                    code: product.code.clone(),
                    available,
                    requested,
                });
            }
            line.quantity = requested;
            line.max_stock = available;
            debug!(product_id = %product.id, quantity = requested, "Line quantity increased");
            return Ok(requested);
        }

        if available < 1 {
            warn!(product_id = %product.id, "Add rejected: out of stock");
            return Err(CoreError::InsufficientStock {
                code: product.code.clone(),
                available,
                requested: 1,
            });
        }

        if self.lines.len() >= MAX_CART_LINES {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_LINES,
            });
        }

        self.lines.push(CartLine::from_product(
            product,
            self.sale_mode,
            self.can_sell_wholesale,
        ));
        debug!(product_id = %product.id, "Line added");
        Ok(1)
    }

    /// Sets a line's quantity.
    ///
    /// ## Behavior
    /// - `quantity == 0`: removes the line
    /// - `quantity > max_stock`: rejected, prior quantity kept
    pub fn update_quantity(&mut self, product_id: &ProductId, quantity: u32) -> CoreResult<()> {
        if quantity < 1 {
            self.remove_line(product_id);
            return Ok(());
        }

        let line = self
            .line_mut(product_id)
            .ok_or_else(|| CoreError::LineNotFound(product_id.to_string()))?;

        if quantity > line.max_stock {
            warn!(%product_id, available = line.max_stock, requested = quantity, "Quantity update rejected");
            return Err(CoreError::InsufficientStock {
                code: line.code.clone(),
                available: line.max_stock,
                requested: quantity,
            });
        }

        line.quantity = quantity;
        debug!(%product_id, quantity, "Line quantity set");
        Ok(())
    }

    /// Removes a line. Removing a product that is not in the cart is a no-op.
    ///
    /// ## Returns
    /// Whether a line was removed.
    pub fn remove_line(&mut self, product_id: &ProductId) -> bool {
        let initial_len = self.lines.len();
        self.lines.retain(|l| &l.product_id != product_id);
        let removed = self.lines.len() != initial_len;
        if removed {
            debug!(%product_id, "Line removed");
        }
        removed
    }

    /// Sets a line discount, clamped to 0–100%.
    pub fn set_line_discount(&mut self, product_id: &ProductId, percent: f64) -> CoreResult<()> {
        let line = self
            .line_mut(product_id)
            .ok_or_else(|| CoreError::LineNotFound(product_id.to_string()))?;
        line.discount_percent = clamp_percent(percent);
        debug!(%product_id, discount = line.discount_percent, "Line discount set");
        Ok(())
    }

    /// Empties the cart and starts a new order.
    ///
    /// Lines go, the order discount resets to `{percent, 0}` and a new order
    /// number is drawn. Tax rate, sale mode and display currency stay.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.order_discount = OrderDiscount::none();
        self.order_number = OrderNumber::random(&self.order_prefix);
        debug!(order_number = %self.order_number, "Cart cleared");
    }

    // =========================================================================
    // Sale Settings
    // =========================================================================

    /// Switches between retail and wholesale pricing.
    ///
    /// Every line is re-priced from the current catalog snapshot; quantities
    /// and discounts stay. A line whose product left the catalog keeps its
    /// price.
    pub fn set_sale_mode(&mut self, mode: SaleMode, catalog: &Catalog) {
        self.sale_mode = mode;
        for line in &mut self.lines {
            match catalog.get(&line.product_id) {
                Some(product) => {
                    line.price = product.effective_price(mode, self.can_sell_wholesale);
                    line.price_currency = product.price_currency.clone();
                }
                None => {
                    warn!(product_id = %line.product_id, "Product missing from catalog, price kept");
                }
            }
        }
        debug!(%mode, lines = self.lines.len(), "Sale mode changed");
    }

    /// Sets the order discount.
    ///
    /// Negative values are rejected; a percent discount is capped at 100.
    pub fn set_order_discount(&mut self, discount: OrderDiscount) -> CoreResult<()> {
        validate_discount_value(discount.value)?;
        self.order_discount = match discount.kind {
            DiscountKind::Percent => OrderDiscount::percent(discount.value.min(100.0)),
            DiscountKind::Fixed => discount,
        };
        Ok(())
    }

    /// Sets the tax rate from a percentage such as `8.25`.
    pub fn set_tax_rate(&mut self, percent: f64) -> CoreResult<()> {
        validate_tax_rate(percent)?;
        self.tax_rate = Percentage::from_percent(percent);
        Ok(())
    }

    pub fn set_display_currency(&mut self, currency: impl Into<CurrencyCode>) {
        self.display_currency = currency.into();
    }

    /// Updates every line's stock snapshot from a reloaded catalog.
    ///
    /// Quantities are not touched, so a line can end up above its new
    /// `max_stock`; [`Cart::ensure_within_stock`] reports those before a
    /// submit.
    pub fn refresh_stock(&mut self, catalog: &Catalog) {
        for line in &mut self.lines {
            if let Some(product) = catalog.get(&line.product_id) {
                line.max_stock = product.available_stock();
            }
        }
    }

    // =========================================================================
    // Stock Checks
    // =========================================================================

    /// True when any line holds more than its stock snapshot.
    pub fn has_exceeded_stock(&self) -> bool {
        self.lines.iter().any(CartLine::exceeds_stock)
    }

    /// Pre-submit stock check.
    pub fn ensure_within_stock(&self) -> CoreResult<()> {
        let codes: Vec<String> = self
            .lines
            .iter()
            .filter(|l| l.exceeds_stock())
            .map(|l| l.code.clone())
            .collect();
        if codes.is_empty() {
            Ok(())
        } else {
            Err(CoreError::StockExceeded { codes })
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.product_id == product_id)
    }

    fn line_mut(&mut self, product_id: &ProductId) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|l| &l.product_id == product_id)
    }

    pub fn order_discount(&self) -> OrderDiscount {
        self.order_discount
    }

    pub fn tax_rate(&self) -> Percentage {
        self.tax_rate
    }

    pub fn sale_mode(&self) -> SaleMode {
        self.sale_mode
    }

    pub fn display_currency(&self) -> &CurrencyCode {
        &self.display_currency
    }

    pub fn can_sell_wholesale(&self) -> bool {
        self.can_sell_wholesale
    }

    pub fn order_number(&self) -> &OrderNumber {
        &self.order_number
    }

    /// Number of distinct lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Sum of all line quantities.
    pub fn total_quantity(&self) -> u64 {
        self.lines.iter().map(|l| l.quantity as u64).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of line prices before any discount, ignoring currency. Only
    /// meaningful for single-currency carts; used by tests and logs.
    pub fn gross_amount(&self) -> Money {
        self.lines.iter().map(CartLine::gross_amount).sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
