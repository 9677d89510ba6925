//! # rxpos-core: Pure Sale Logic for RxPOS
//!
//! Cart math, currency conversion and the submission state machine for the
//! RxPOS pharmacy register. No I/O happens in this crate.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        RxPOS Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Register front end                           │   │
//! │  │    Product grid ──► Cart ──► Payment ──► Receipt                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    rxpos-client                                 │   │
//! │  │    SaleSession, HTTP gateway, config, recent products          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ rxpos-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   money   │  │ currency  │  │   cart    │  │submission │  │   │
//! │  │   │   Money   │  │  convert  │  │   Cart    │  │ state     │  │   │
//! │  │   │Percentage │  │  rates    │  │ CartLine  │  │ SaleDraft │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • NO FILE SYSTEM                          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Integer money and basis-point percentages
//! - [`currency`] - Currency codes, rate tables, conversion
//! - [`types`] - Products, ids, sale mode, order discount, customers
//! - [`catalog`] - Read-only product snapshot
//! - [`cart`] - Cart lines and mutators
//! - [`pricing`] - Totals and payment settlement
//! - [`submission`] - Two-phase submit state machine and snapshot
//! - [`order`] - Display order numbers
//! - [`error`] - Domain error types
//! - [`validation`] - Input checks
//!
//! ## Example Usage
//!
//! ```rust
//! use rxpos_core::{Cart, CartTotals, CurrencySettings, Product, ProductId};
//! use rxpos_core::money::Money;
//!
//! let product = Product {
//!     id: ProductId::new("1"),
//!     name: "Paracetamol 500mg".into(),
//!     code: "PARA-500".into(),
//!     barcode: None,
//!     stock: 20,
//!     price_amount: Money::from_cents(250),
//!     price_currency: "USD".into(),
//!     wholesale_price_amount: None,
//!     category_id: None,
//!     image_url: None,
//! };
//!
//! let mut cart = Cart::new("USD");
//! cart.add_line(&product).unwrap();
//! cart.add_line(&product).unwrap();
//!
//! let totals = CartTotals::compute(&cart, &CurrencySettings::single("USD"));
//! assert_eq!(totals.total.cents(), 500);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod catalog;
pub mod currency;
pub mod error;
pub mod money;
pub mod order;
pub mod pricing;
pub mod submission;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports
// =============================================================================

pub use cart::{Cart, CartLine};
pub use catalog::Catalog;
pub use currency::{convert, CurrencyCode, CurrencySettings, ExchangeRateTable};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, Percentage};
pub use order::OrderNumber;
pub use pricing::{CartTotals, PaymentSummary};
pub use submission::{DraftLine, SaleDraft, SubmissionStage, SubmissionState};
pub use types::{
    CategoryId, Customer, CustomerId, DiscountKind, OrderDiscount, Product, ProductId, SaleId,
    SaleMode,
};

// =============================================================================
// Constants
// =============================================================================

/// Maximum number of distinct lines in one cart.
pub const MAX_CART_LINES: usize = 100;
