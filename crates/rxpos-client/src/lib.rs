//! # rxpos-client: Sale Submission Client for RxPOS
//!
//! Owns the register session and every call to the sale service.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Register Session                                 │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                    SaleSession (orchestrator)                    │  │
//! │  │                                                                  │  │
//! │  │  Cart edits, totals, customer, two-phase checkout                │  │
//! │  └───────────┬──────────────────────┬──────────────────┬────────────┘  │
//! │              ▼                      ▼                  ▼               │
//! │  ┌────────────────────┐  ┌────────────────────┐  ┌─────────────────┐  │
//! │  │ SessionContext     │  │ SaleGateway        │  │ RecentProducts  │  │
//! │  │                    │  │                    │  │                 │  │
//! │  │ shop, currency,    │  │ POST sales         │  │ JSON file of    │  │
//! │  │ permissions,       │  │ POST finalize      │  │ product ids     │  │
//! │  │ catalog, register  │  │ POST quick-customer│  │                 │  │
//! │  └────────────────────┘  └────────────────────┘  └─────────────────┘  │
//! │                                                                         │
//! │  OUTPUTS TO THE FRONT END:                                             │
//! │  • SaleOutcome / Receipt - completed sale                              │
//! │  • Notice - coded, user-facing error with field messages               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//! - [`session`] - `SaleSession`, the register orchestrator
//! - [`gateway`] - `SaleGateway` trait and its HTTP implementation
//! - [`context`] - Shop, currency, permissions and catalog for a session
//! - [`config`] - TOML configuration with environment overrides
//! - [`notice`] - Front-end error payloads
//! - [`receipt`] - Printable receipt
//! - [`recent`] - Recently added products
//! - [`telemetry`] - `tracing` subscriber setup
//! - [`error`] - Client error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rxpos_client::{ClientConfig, SaleSession, SessionContext};
//!
//! rxpos_client::init_tracing();
//! let config = ClientConfig::load_or_default(None);
//! let session = SaleSession::from_config(context, &config)?;
//!
//! session.add_by_code("PARA-500")?;
//! let outcome = session.checkout(None).await?;
//! println!("Sale {} completed", outcome.sale_id);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod context;
pub mod error;
pub mod gateway;
pub mod notice;
pub mod receipt;
pub mod recent;
pub mod session;
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ClientConfig, RegisterSettings, SaleSettings, ServerSettings, StorageSettings};
pub use context::{Permissions, RegisterBinding, SessionContext, ShopInfo};
pub use error::{ClientError, ClientResult, FieldErrors};
pub use gateway::{
    CreateSaleRequest, CreatedSale, FinalizeSaleRequest, FinalizedSale, HttpSaleGateway,
    QuickCustomerRequest, SaleGateway, SaleLineRequest, IDEMPOTENCY_KEY_HEADER,
};
pub use notice::{Notice, NoticeCode};
pub use receipt::Receipt;
pub use recent::RecentProducts;
pub use session::{SaleOutcome, SaleSession};
pub use telemetry::init_tracing;
