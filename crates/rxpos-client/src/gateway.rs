//! # Sale Gateway
//!
//! The seam between the register and the sale service.
//!
//! ## Endpoints
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  POST /sales                          phase 1: create draft             │
//! │    { customer_id?, currency, sale_mode,                                 │
//! │      lines: [{ product_id, quantity, unit_price, discount_percent? }],  │
//! │      cash_register_id?, cash_register_session_id? }                     │
//! │    ◄── { sale: { id, ... } }                                            │
//! │                                                                         │
//! │  POST /sales/{id}/finalize            phase 2: finalize                 │
//! │    { paid_amount }                                                      │
//! │    ◄── { success, message? }                                            │
//! │                                                                         │
//! │  POST /sales/quick-customer           inline customer creation          │
//! │    { name, phone? }                                                     │
//! │    ◄── { success, customer: { id, full_name, phone, email } }           │
//! │                                                                         │
//! │  422 ◄── { message, errors: { field: [msg, ...] } }                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every create and finalize attempt carries its own `Idempotency-Key`
//! header so the server can drop a duplicate submit.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use rxpos_core::money::{self, Money};
use rxpos_core::{CurrencyCode, Customer, CustomerId, ProductId, SaleDraft, SaleId, SaleMode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::config::ServerSettings;
use crate::context::RegisterBinding;
use crate::error::{ClientError, ClientResult, FieldErrors};

pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

const DEFAULT_VALIDATION_MESSAGE: &str = "The given data was invalid.";
const DEFAULT_REJECTION_MESSAGE: &str = "The sale service rejected the request.";

// =============================================================================
// Requests
// =============================================================================

/// One line of a create-sale request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaleLineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Unit price in the sale currency.
    #[serde(with = "money::major_units")]
    pub unit_price: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<f64>,
}

/// Phase 1 body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateSaleRequest {
    pub customer_id: Option<CustomerId>,
    pub currency: CurrencyCode,
    pub sale_mode: SaleMode,
    pub lines: Vec<SaleLineRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash_register_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash_register_session_id: Option<String>,
}

impl CreateSaleRequest {
    /// Builds the request from a submit-time snapshot. A zero line discount
    /// is left out of the payload.
    pub fn from_draft(
        draft: &SaleDraft,
        customer_id: Option<&CustomerId>,
        register: &RegisterBinding,
    ) -> Self {
        CreateSaleRequest {
            customer_id: customer_id.cloned(),
            currency: draft.currency.clone(),
            sale_mode: draft.sale_mode,
            lines: draft
                .lines
                .iter()
                .map(|line| SaleLineRequest {
                    product_id: line.product_id.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    discount_percent: (line.discount_percent > 0.0)
                        .then_some(line.discount_percent),
                })
                .collect(),
            cash_register_id: register.cash_register_id.clone(),
            cash_register_session_id: register.cash_register_session_id.clone(),
        }
    }
}

/// Phase 2 body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FinalizeSaleRequest {
    #[serde(with = "money::major_units")]
    pub paid_amount: Money,
}

/// Inline customer creation body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickCustomerRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

// =============================================================================
// Responses
// =============================================================================

/// The draft sale returned by phase 1. Extra fields are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatedSale {
    pub id: SaleId,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateSaleResponse {
    sale: CreatedSale,
}

/// Envelope used by finalize and quick-customer.
#[derive(Debug, Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    customer: Option<Customer>,
}

/// Result of a successful finalize.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinalizedSale {
    pub message: Option<String>,
}

/// Error body shape shared by 4xx/5xx responses.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    errors: FieldErrors,
}

impl ErrorBody {
    fn message(&self) -> Option<String> {
        self.message
            .clone()
            .or_else(|| self.error.clone())
            .filter(|m| !m.trim().is_empty())
    }
}

// =============================================================================
// Gateway Trait
// =============================================================================

/// Sale service operations.
///
/// `idempotency_key` is fresh for every attempt; the caller generates it so
/// it can be logged next to the outcome.
#[async_trait]
pub trait SaleGateway: Send + Sync {
    async fn create_sale(
        &self,
        request: &CreateSaleRequest,
        idempotency_key: Uuid,
    ) -> ClientResult<CreatedSale>;

    async fn finalize_sale(
        &self,
        sale_id: &SaleId,
        request: &FinalizeSaleRequest,
        idempotency_key: Uuid,
    ) -> ClientResult<FinalizedSale>;

    async fn quick_customer(&self, request: &QuickCustomerRequest) -> ClientResult<Customer>;
}

// =============================================================================
// HTTP Gateway
// =============================================================================

/// [`SaleGateway`] over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpSaleGateway {
    client: Client,
    server: ServerSettings,
}

impl HttpSaleGateway {
    pub fn new(server: ServerSettings) -> ClientResult<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        // Makes the backend answer validation failures with JSON, not a redirect
        headers.insert(
            "X-Requested-With",
            header::HeaderValue::from_static("XMLHttpRequest"),
        );

        let client = Client::builder()
            .timeout(server.timeout())
            .default_headers(headers)
            .build()?;

        // Fail early on a bad base URL
        server.endpoint(&server.create_sale_path)?;

        Ok(HttpSaleGateway { client, server })
    }

    pub fn base_url(&self) -> &str {
        &self.server.base_url
    }

    /// Fills `{id}` in the finalize path as a single, percent-encoded
    /// path segment.
    fn finalize_url(&self, sale_id: &SaleId) -> ClientResult<Url> {
        let id = sale_id.as_str();
        if matches!(id, "" | "." | "..") {
            return Err(ClientError::InvalidUrl(format!(
                "sale id {:?} is not a path segment",
                id
            )));
        }

        let mut url = self.server.endpoint("")?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                ClientError::InvalidUrl(format!("{} cannot take a path", self.server.base_url))
            })?;
            segments.pop_if_empty();
            for segment in self.server.finalize_sale_path.trim_start_matches('/').split('/') {
                segments.push(if segment == "{id}" { id } else { segment });
            }
        }
        Ok(url)
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        url: Url,
        body: &B,
        idempotency_key: Option<Uuid>,
    ) -> ClientResult<T> {
        debug!(%url, ?idempotency_key, "POST");
        let mut request = self.client.post(url).json(body);
        if let Some(key) = idempotency_key {
            request = request.header(IDEMPOTENCY_KEY_HEADER, key.to_string());
        }
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Maps the HTTP response onto a value or a [`ClientError`].
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            return serde_json::from_str(&text)
                .map_err(|e| ClientError::InvalidResponse(format!("{} ({})", e, status)));
        }

        let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
        warn!(status = status.as_u16(), message = ?body.message(), "Sale service returned an error");

        Err(match status {
            StatusCode::UNPROCESSABLE_ENTITY => {
                let message = body
                    .message()
                    .or_else(|| body.errors.first_message().map(str::to_string))
                    .unwrap_or_else(|| DEFAULT_VALIDATION_MESSAGE.to_string());
                ClientError::Validation {
                    message,
                    errors: body.errors,
                }
            }
            // 419: expired CSRF session on the backend
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
            s if s.as_u16() == 419 => ClientError::Unauthorized,
            StatusCode::FORBIDDEN => ClientError::Forbidden(body.message().unwrap_or(text)),
            StatusCode::NOT_FOUND => ClientError::NotFound(body.message().unwrap_or(text)),
            s if s.is_client_error() => match body.message() {
                Some(message) => ClientError::Rejected(message),
                None => ClientError::Server {
                    status: s.as_u16(),
                    message: text,
                },
            },
            s => ClientError::Server {
                status: s.as_u16(),
                message: body.message().unwrap_or(text),
            },
        })
    }
}

#[async_trait]
impl SaleGateway for HttpSaleGateway {
    async fn create_sale(
        &self,
        request: &CreateSaleRequest,
        idempotency_key: Uuid,
    ) -> ClientResult<CreatedSale> {
        let url = self.server.endpoint(&self.server.create_sale_path)?;
        let response: CreateSaleResponse = self.post(url, request, Some(idempotency_key)).await?;
        Ok(response.sale)
    }

    async fn finalize_sale(
        &self,
        sale_id: &SaleId,
        request: &FinalizeSaleRequest,
        idempotency_key: Uuid,
    ) -> ClientResult<FinalizedSale> {
        let url = self.finalize_url(sale_id)?;
        let envelope: Envelope = self.post(url, request, Some(idempotency_key)).await?;
        if !envelope.success {
            return Err(ClientError::Rejected(
                envelope
                    .message
                    .unwrap_or_else(|| DEFAULT_REJECTION_MESSAGE.to_string()),
            ));
        }
        Ok(FinalizedSale {
            message: envelope.message,
        })
    }

    async fn quick_customer(&self, request: &QuickCustomerRequest) -> ClientResult<Customer> {
        let url = self.server.endpoint(&self.server.quick_customer_path)?;
        let envelope: Envelope = self.post(url, request, None).await?;
        match envelope {
            Envelope {
                success: true,
                customer: Some(customer),
                ..
            } => Ok(customer),
            Envelope {
                success: true,
                customer: None,
                ..
            } => Err(ClientError::InvalidResponse(
                "Missing customer in quick-customer response".to_string(),
            )),
            Envelope { message, .. } => Err(ClientError::Rejected(
                message.unwrap_or_else(|| DEFAULT_REJECTION_MESSAGE.to_string()),
            )),
        }
    }
}
