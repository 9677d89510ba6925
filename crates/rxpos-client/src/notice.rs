//! # Notices
//!
//! What the register shows the cashier when something fails.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  cart.add_line(..) ── CoreError::InsufficientStock ──┐                  │
//! │                                                      │                  │
//! │  session.checkout(..) ── ClientError::Validation ────┼──► Notice ──► UI │
//! │                                                      │                  │
//! │  HttpSaleGateway ── ClientError::Http ───────────────┘                  │
//! │                                                                         │
//! │  {                                                                      │
//! │    "code": "INSUFFICIENT_STOCK",                                        │
//! │    "message": "Insufficient stock for PARA-500: available 3, ..."       │
//! │  }                                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The message is always something a cashier can read. Server messages pass
//! through verbatim; transport details are logged, not shown.

use rxpos_core::{CoreError, SaleId};
use serde::Serialize;
use ts_rs::TS;

use crate::error::{ClientError, FieldErrors};

/// A user-facing failure notice.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Notice {
    /// Machine-readable code for the front end.
    pub code: NoticeCode,

    /// Human-readable message for display.
    pub message: String,

    /// Field-level messages from a 422 response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,

    /// Draft sale left behind by a failed finalize.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_id: Option<SaleId>,
}

/// Notice codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum NoticeCode {
    /// Product or line not found
    NotFound,

    /// Input or payload rejected
    ValidationError,

    /// Not enough stock for the requested quantity
    InsufficientStock,

    /// Cart rule (size, emptiness) refused the change
    CartError,

    /// A submission is already in flight, or the action does not fit the
    /// current state
    InvalidState,

    /// Session expired
    Unauthorized,

    /// Missing permission
    Forbidden,

    /// Sale service unreachable or timed out
    NetworkError,

    /// Sale service failed
    ServerError,

    /// Draft created, finalize failed
    FinalizeFailed,

    /// Bad local configuration
    ConfigError,

    /// Anything else
    Internal,
}

impl Notice {
    pub fn new(code: NoticeCode, message: impl Into<String>) -> Self {
        Notice {
            code,
            message: message.into(),
            fields: None,
            sale_id: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Notice::new(NoticeCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Notice::new(NoticeCode::Internal, message)
    }
}

impl From<&CoreError> for Notice {
    fn from(err: &CoreError) -> Self {
        let code = match err {
            CoreError::ProductNotFound(_) | CoreError::LineNotFound(_) => NoticeCode::NotFound,
            CoreError::InsufficientStock { .. } | CoreError::StockExceeded { .. } => {
                NoticeCode::InsufficientStock
            }
            CoreError::CartTooLarge { .. } | CoreError::EmptyCart => NoticeCode::CartError,
            CoreError::InvalidTransition { .. } => NoticeCode::InvalidState,
            CoreError::Validation(_) => NoticeCode::ValidationError,
        };
        Notice::new(code, err.to_string())
    }
}

impl From<CoreError> for Notice {
    fn from(err: CoreError) -> Self {
        Notice::from(&err)
    }
}

impl From<&ClientError> for Notice {
    fn from(err: &ClientError) -> Self {
        match err {
            ClientError::Core(core) => Notice::from(core),
            ClientError::Validation { message, errors } => Notice {
                fields: (!errors.is_empty()).then(|| errors.clone()),
                ..Notice::validation(message.clone())
            },
            ClientError::Rejected(message) => Notice::validation(message.clone()),
            ClientError::Unauthorized => Notice::new(
                NoticeCode::Unauthorized,
                "Your session has expired. Please sign in again.",
            ),
            ClientError::Forbidden(_) => Notice::new(
                NoticeCode::Forbidden,
                "You do not have permission to do this.",
            ),
            ClientError::NotFound(message) => Notice::new(NoticeCode::NotFound, message.clone()),
            ClientError::Server { status, message } => {
                tracing::error!(status, %message, "Sale service error");
                Notice::new(
                    NoticeCode::ServerError,
                    "The sale could not be processed. Please try again.",
                )
            }
            ClientError::Finalize { sale_id, source } => {
                let inner = Notice::from(source.as_ref());
                Notice {
                    code: NoticeCode::FinalizeFailed,
                    message: format!(
                        "Sale {} was saved as a draft but not completed: {}",
                        sale_id, inner.message
                    ),
                    fields: inner.fields,
                    sale_id: Some(sale_id.clone()),
                }
            }
            ClientError::Http(e) => {
                tracing::warn!(error = %e, "Sale service request failed");
                Notice::new(
                    NoticeCode::NetworkError,
                    "Could not reach the server. Check the connection and try again.",
                )
            }
            ClientError::InvalidResponse(_) | ClientError::Serialization(_) => {
                tracing::error!(error = %err, "Unexpected sale service response");
                Notice::internal("The server sent an unexpected response.")
            }
            ClientError::InvalidConfig(_)
            | ClientError::InvalidUrl(_)
            | ClientError::ConfigLoadFailed(_)
            | ClientError::ConfigSaveFailed(_) => {
                Notice::new(NoticeCode::ConfigError, err.to_string())
            }
            ClientError::Storage(_) => Notice::internal(err.to_string()),
        }
    }
}

impl From<ClientError> for Notice {
    fn from(err: ClientError) -> Self {
        Notice::from(&err)
    }
}
