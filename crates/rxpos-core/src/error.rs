//! # Error Types
//!
//! Domain-specific error types for rxpos-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  rxpos-core errors (this file)                                          │
//! │  ├── CoreError        - Rejected cart mutations, illegal transitions   │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  rxpos-client errors (separate crate)                                   │
//! │  └── ClientError      - Sale service / config / storage failures       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ClientError → Notice → UI          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant's `Display` is the message the cashier sees. A rejected
//! mutation must never fail silently.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Product is not part of the catalog snapshot.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Product has no line in the cart.
    #[error("Product {0} is not in the cart")]
    LineNotFound(String),

    /// Not enough stock for the requested quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Scan "Paracetamol 500mg" (qty in cart: 3, stock: 3)
    ///      │
    ///      ▼
    /// add_line → 3 + 1 > 3
    ///      │
    ///      ▼
    /// InsufficientStock { code: "PARA-500", available: 3, requested: 4 }
    ///      │
    ///      ▼
    /// UI shows: "Insufficient stock for PARA-500: available 3, requested 4"
    /// ```
    #[error("Insufficient stock for {code}: available {available}, requested {requested}")]
    InsufficientStock {
        code: String,
        available: u32,
        requested: u32,
    },

    /// A line holds more than its stock snapshot. Mutators never produce
    /// this; it is reported by the pre-submit check.
    #[error("Quantity exceeds available stock for: {}", .codes.join(", "))]
    StockExceeded { codes: Vec<String> },

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Nothing to submit.
    #[error("Cart is empty")]
    EmptyCart,

    /// The submission state machine refused a transition.
    ///
    /// ## When This Occurs
    /// - Pressing "Pay" while a create request is in flight
    /// - Finalizing before a draft sale exists
    #[error("Cannot {action} while sale is {state}")]
    InvalidTransition { state: String, action: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// True for errors caused by stock limits, client side.
    pub fn is_stock_error(&self) -> bool {
        matches!(
            self,
            CoreError::InsufficientStock { .. } | CoreError::StockExceeded { .. }
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: f64, max: f64 },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g. a currency code that is not three letters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
