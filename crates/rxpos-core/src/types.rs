//! # Domain Types
//!
//! Core domain types used by the sale screen.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    SaleMode     │   │  OrderDiscount  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  Retail         │   │  type: percent  │       │
//! │  │  code           │   │  Wholesale      │   │     or fixed    │       │
//! │  │  stock          │   └─────────────────┘   │  value          │       │
//! │  │  price_amount   │                         └─────────────────┘       │
//! │  │  price_currency │   ┌─────────────────┐                             │
//! │  │  wholesale_…?   │   │    Customer     │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identifiers
//! The backend hands out ids as JSON numbers or strings depending on the
//! endpoint. Every id type accepts both and keeps the textual form.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::currency::CurrencyCode;
use crate::error::ValidationError;
use crate::money::{self, Money};

// =============================================================================
// Identifiers
// =============================================================================

/// Wire shape of an id: `42` or `"42"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(s) => s,
            RawId::Signed(n) => n.to_string(),
            RawId::Unsigned(n) => n.to_string(),
        }
    }
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, TS)]
        #[ts(export)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                $name(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                $name(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                $name(id)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                $name(id.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                RawId::deserialize(deserializer).map(|raw| $name(raw.into_string()))
            }
        }
    };
}

entity_id!(
    /// Catalog product id; unique key of a cart line.
    ProductId
);
entity_id!(
    /// Product category id.
    CategoryId
);
entity_id!(
    /// Customer id.
    CustomerId
);
entity_id!(
    /// Server-assigned id of a created (draft or finalized) sale.
    SaleId
);

// =============================================================================
// Sale Mode
// =============================================================================

/// Which product price field a sale uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum SaleMode {
    /// Regular shelf price.
    #[default]
    Retail,
    /// Wholesale price, for sellers allowed to use it.
    Wholesale,
}

impl fmt::Display for SaleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaleMode::Retail => write!(f, "retail"),
            SaleMode::Wholesale => write!(f, "wholesale"),
        }
    }
}

impl FromStr for SaleMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "retail" => Ok(SaleMode::Retail),
            "wholesale" => Ok(SaleMode::Wholesale),
            other => Err(ValidationError::InvalidFormat {
                field: "sale mode".to_string(),
                reason: format!("unknown mode '{}', expected retail or wholesale", other),
            }),
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product, as delivered with the sale screen props.
///
/// Read-only here: the backend owns stock and prices. `stock` is the
/// available quantity at the time the catalog was loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub barcode: Option<String>,
    /// Available quantity. Can be zero or negative after oversells.
    pub stock: i64,
    /// Retail unit price in `price_currency`.
    #[serde(with = "money::major_units")]
    #[ts(type = "number")]
    pub price_amount: Money,
    pub price_currency: CurrencyCode,
    /// Wholesale unit price in `price_currency`, when the product has one.
    #[serde(default, with = "money::option_major_units")]
    #[ts(type = "number | null")]
    pub wholesale_price_amount: Option<Money>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Product {
    /// Available stock as a cart quantity (negative stock reads as zero).
    pub fn available_stock(&self) -> u32 {
        self.stock.clamp(0, u32::MAX as i64) as u32
    }

    /// Resolves the unit price for a sale.
    ///
    /// The wholesale price is used only when all three hold: the sale is in
    /// wholesale mode, the seller may sell wholesale, and the product has a
    /// wholesale price. Otherwise the retail price applies.
    ///
    /// ## Example
    /// ```rust
    /// # use rxpos_core::{Product, ProductId, SaleMode, money::Money};
    /// # let product = Product {
    /// #     id: ProductId::new("1"), name: "Amoxicillin".into(), code: "AMX".into(),
    /// #     barcode: None, stock: 10, price_amount: Money::from_cents(1000),
    /// #     price_currency: "USD".into(), wholesale_price_amount: Some(Money::from_cents(800)),
    /// #     category_id: None, image_url: None,
    /// # };
    /// assert_eq!(product.effective_price(SaleMode::Wholesale, true).cents(), 800);
    /// assert_eq!(product.effective_price(SaleMode::Wholesale, false).cents(), 1000);
    /// assert_eq!(product.effective_price(SaleMode::Retail, true).cents(), 1000);
    /// ```
    pub fn effective_price(&self, mode: SaleMode, can_sell_wholesale: bool) -> Money {
        match (mode, can_sell_wholesale, self.wholesale_price_amount) {
            (SaleMode::Wholesale, true, Some(wholesale)) => wholesale,
            _ => self.price_amount,
        }
    }
}

// =============================================================================
// Order Discount
// =============================================================================

/// How an order discount value is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum DiscountKind {
    /// `value` is a percentage of the subtotal.
    #[default]
    Percent,
    /// `value` is a flat amount in the display currency.
    Fixed,
}

/// A discount applied once to the whole order, after line discounts and
/// before tax.
///
/// A fixed value is taken as already being in the display currency; it is
/// not converted when the display currency changes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderDiscount {
    #[serde(rename = "type")]
    pub kind: DiscountKind,
    pub value: f64,
}

impl OrderDiscount {
    /// No discount (`{percent, 0}`), the state after a cart reset.
    pub const fn none() -> Self {
        OrderDiscount {
            kind: DiscountKind::Percent,
            value: 0.0,
        }
    }

    pub const fn percent(value: f64) -> Self {
        OrderDiscount {
            kind: DiscountKind::Percent,
            value,
        }
    }

    pub fn fixed(amount: Money) -> Self {
        OrderDiscount {
            kind: DiscountKind::Fixed,
            value: amount.to_major(),
        }
    }

    /// Discount amount for a given subtotal (display currency).
    pub fn amount_for(&self, subtotal: Money) -> Money {
        match self.kind {
            DiscountKind::Percent => subtotal.scale(self.value / 100.0),
            DiscountKind::Fixed => Money::from_major(self.value),
        }
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer the sale can be attached to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Customer {
    pub id: CustomerId,
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================
