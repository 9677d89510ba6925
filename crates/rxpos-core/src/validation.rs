//! # Validation Module
//!
//! Input validation for values typed at the register.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE (client)                                         │
//! │  ├── Format and range checks                                           │
//! │  └── Immediate cashier feedback, no round trip                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Sale service (server)                                        │
//! │  ├── Authoritative stock, price and permission rules                   │
//! │  └── 422 field errors surfaced verbatim                                │
//! │                                                                         │
//! │  The two layers share rules, not code. The client check is a hint.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest customer name accepted by the quick-customer form.
pub const MAX_CUSTOMER_NAME_LEN: usize = 120;

/// Longest phone number accepted by the quick-customer form.
pub const MAX_PHONE_LEN: usize = 20;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a three-letter currency code.
///
/// ## Example
/// ```rust
/// use rxpos_core::validation::validate_currency_code;
///
/// assert!(validate_currency_code("USD").is_ok());
/// assert!(validate_currency_code("usd").is_ok());
/// assert!(validate_currency_code("US").is_err());
/// ```
pub fn validate_currency_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "currency".to_string(),
        });
    }

    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::InvalidFormat {
            field: "currency".to_string(),
            reason: "must be a three-letter code".to_string(),
        });
    }

    Ok(())
}

/// Validates a customer name for inline creation.
///
/// ## Returns
/// The trimmed name.
pub fn validate_customer_name(name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > MAX_CUSTOMER_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_CUSTOMER_NAME_LEN,
        });
    }

    Ok(name.to_string())
}

/// Validates an optional phone number.
///
/// ## Rules
/// - Empty or whitespace means "no phone" (`Ok(None)`)
/// - Digits, spaces, `+`, `-`, `(`, `)` only
/// - At most 20 characters
pub fn validate_phone(phone: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(phone) = phone.map(str::trim).filter(|p| !p.is_empty()) else {
        return Ok(None);
    };

    if phone.len() > MAX_PHONE_LEN {
        return Err(ValidationError::TooLong {
            field: "phone".to_string(),
            max: MAX_PHONE_LEN,
        });
    }

    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain only digits, spaces, +, - and parentheses".to_string(),
        });
    }

    Ok(Some(phone.to_string()))
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a tax rate given as a percentage.
///
/// ## Example
/// ```rust
/// use rxpos_core::validation::validate_tax_rate;
///
/// assert!(validate_tax_rate(0.0).is_ok());
/// assert!(validate_tax_rate(8.25).is_ok());
/// assert!(validate_tax_rate(120.0).is_err());
/// ```
pub fn validate_tax_rate(percent: f64) -> ValidationResult<()> {
    if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
        return Err(ValidationError::OutOfRange {
            field: "tax rate".to_string(),
            min: 0.0,
            max: 100.0,
        });
    }

    Ok(())
}

/// Validates an order discount value (percent or flat amount).
pub fn validate_discount_value(value: f64) -> ValidationResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::Negative {
            field: "discount".to_string(),
        });
    }

    Ok(())
}

/// Validates an exchange rate.
///
/// Zero is accepted: conversion treats it as "no value" and yields zero.
pub fn validate_exchange_rate(rate: f64) -> ValidationResult<()> {
    if !rate.is_finite() || rate < 0.0 {
        return Err(ValidationError::Negative {
            field: "exchange rate".to_string(),
        });
    }

    Ok(())
}

/// Validates the amount handed over by the customer, in cents.
pub fn validate_paid_amount(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::Negative {
            field: "paid amount".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
