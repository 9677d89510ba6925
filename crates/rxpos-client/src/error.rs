//! # Client Error Types
//!
//! Error types for sale service calls, configuration and local storage.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Client Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Register       │  │   Sale service  │  │     Transport           │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Core(..)       │  │  Validation 422 │  │  Http (reqwest)         │ │
//! │  │  stock, empty   │  │  Rejected       │  │  InvalidResponse        │ │
//! │  │  transitions    │  │  Unauthorized   │  │  Serialization          │ │
//! │  │                 │  │  Server 5xx     │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────────────────────────────────┐  │
//! │  │  Configuration  │  │  Finalize { sale_id, source }               │  │
//! │  │                 │  │  The draft exists on the server; the error  │  │
//! │  │  InvalidConfig  │  │  carries its id so it stays addressable.    │  │
//! │  │  InvalidUrl     │  │                                             │  │
//! │  │  Load / Save    │  └─────────────────────────────────────────────┘  │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;

use rxpos_core::{CoreError, SaleId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

// =============================================================================
// Field Errors
// =============================================================================

/// Field-level messages from a 422 response: `{"errors": {"field": ["msg"]}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Messages for one field (e.g. `lines.0.quantity`).
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The first message in field order, if any.
    pub fn first_message(&self) -> Option<&str> {
        self.0.values().flatten().next().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// =============================================================================
// Client Error
// =============================================================================

/// Client error type covering every failure a register operation can hit.
#[derive(Debug, Error)]
pub enum ClientError {
    // =========================================================================
    // Register Errors
    // =========================================================================
    /// A cart rule or state transition refused the operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    // =========================================================================
    // Sale Service Errors
    // =========================================================================
    /// The server rejected the payload (HTTP 422). `message` is shown as is.
    #[error("{message}")]
    Validation { message: String, errors: FieldErrors },

    /// The server answered `{"success": false}`.
    #[error("{0}")]
    Rejected(String),

    /// Session expired or missing.
    #[error("Authentication required")]
    Unauthorized,

    /// Permission denied.
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-success status.
    #[error("Sale service error ({status}): {message}")]
    Server { status: u16, message: String },

    /// A draft was created but finalizing it failed.
    #[error("Sale {sale_id} was saved as a draft but could not be finalized: {source}")]
    Finalize {
        sale_id: SaleId,
        #[source]
        source: Box<ClientError>,
    },

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // =========================================================================
    // Configuration & Storage Errors
    // =========================================================================
    /// Invalid client configuration.
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),

    /// Invalid sale service URL.
    #[error("Invalid sale service URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    /// Local file read/write failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}

impl From<toml::de::Error> for ClientError {
    fn from(err: toml::de::Error) -> Self {
        ClientError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ClientError {
    fn from(err: toml::ser::Error) -> Self {
        ClientError::ConfigSaveFailed(err.to_string())
    }
}

impl From<rxpos_core::ValidationError> for ClientError {
    fn from(err: rxpos_core::ValidationError) -> Self {
        ClientError::Core(CoreError::Validation(err))
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl ClientError {
    /// Wraps a finalize failure with the id of the draft it left behind.
    pub fn finalize(sale_id: SaleId, source: ClientError) -> Self {
        ClientError::Finalize {
            sale_id,
            source: Box::new(source),
        }
    }

    /// Returns true if trying the same request again may succeed.
    ///
    /// Nothing retries automatically; this decides whether the register
    /// offers a "try again" action.
    ///
    /// ## Retryable Errors
    /// - Connection failures and timeouts
    /// - 5xx responses
    ///
    /// ## Non-Retryable Errors
    /// - Validation and business rejections
    /// - Authentication and configuration problems
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ClientError::Server { status, .. } => *status >= 500,
            ClientError::Finalize { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Returns true if the server refused the content of the request.
    pub fn is_validation(&self) -> bool {
        match self {
            ClientError::Validation { .. } | ClientError::Rejected(_) => true,
            ClientError::Finalize { source, .. } => source.is_validation(),
            _ => false,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ClientError::InvalidConfig(_)
                | ClientError::InvalidUrl(_)
                | ClientError::ConfigLoadFailed(_)
                | ClientError::ConfigSaveFailed(_)
        )
    }

    /// The draft left on the server by a failed finalize, if any.
    pub fn draft_sale_id(&self) -> Option<&SaleId> {
        match self {
            ClientError::Finalize { sale_id, .. } => Some(sale_id),
            _ => None,
        }
    }
}
