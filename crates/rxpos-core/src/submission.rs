//! # Sale Submission
//!
//! The two-phase submit protocol as a pure state machine, plus the cart
//! snapshot that gets submitted.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Editing ──begin_draft──► SubmittingDraft ──draft_created──┐          │
//! │      ▲                          │      │                     │          │
//! │      │                     fail │      │ draft_saved         ▼          │
//! │      │                          ▼      └──► Editing   AwaitingFinalize  │
//! │      │                 Failed{create}                  │        │       │
//! │      │                   (retry: begin_draft)  begin_finalize   cancel  │
//! │      │                                                 ▼        ▼       │
//! │      │                                          Finalizing   Cancelled  │
//! │      │                                         │        │               │
//! │      │                               finalized │        │ fail          │
//! │      │                                         ▼        ▼               │
//! │      └────────── reset ───────────────── Completed   Failed{finalize}   │
//! │                                                   (retry: begin_finalize)│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only one request may be in flight: `SubmittingDraft` and `Finalizing`
//! refuse every transition except their own completion or failure.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::cart::Cart;
use crate::currency::{CurrencyCode, CurrencySettings};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::order::OrderNumber;
use crate::pricing::{display_unit_price, line_total, CartTotals};
use crate::types::{ProductId, SaleId, SaleMode};

// =============================================================================
// Submission State
// =============================================================================

/// Which request a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SubmissionStage {
    /// Phase 1: creating the draft sale.
    Create,
    /// Phase 2: finalizing an existing draft.
    Finalize,
}

/// Where the register is in the submit protocol.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(tag = "state", rename_all = "snake_case")]
#[ts(export)]
pub enum SubmissionState {
    #[default]
    Editing,
    SubmittingDraft,
    AwaitingFinalize {
        sale_id: SaleId,
    },
    Finalizing {
        sale_id: SaleId,
    },
    Completed {
        sale_id: SaleId,
    },
    /// A request failed. A finalize failure keeps the draft's id so it can
    /// be retried or opened later.
    Failed {
        stage: SubmissionStage,
        sale_id: Option<SaleId>,
        message: String,
    },
    /// The cashier walked away from an awaiting draft. The draft still
    /// exists on the server.
    Cancelled {
        sale_id: Option<SaleId>,
    },
}

impl SubmissionState {
    pub fn name(&self) -> &'static str {
        match self {
            SubmissionState::Editing => "editing",
            SubmissionState::SubmittingDraft => "submitting draft",
            SubmissionState::AwaitingFinalize { .. } => "awaiting finalize",
            SubmissionState::Finalizing { .. } => "finalizing",
            SubmissionState::Completed { .. } => "completed",
            SubmissionState::Failed { .. } => "failed",
            SubmissionState::Cancelled { .. } => "cancelled",
        }
    }

    /// True while a request is in flight.
    pub fn is_processing(&self) -> bool {
        matches!(
            self,
            SubmissionState::SubmittingDraft | SubmissionState::Finalizing { .. }
        )
    }

    /// The server-side sale this state refers to, if one exists.
    pub fn sale_id(&self) -> Option<&SaleId> {
        match self {
            SubmissionState::AwaitingFinalize { sale_id }
            | SubmissionState::Finalizing { sale_id }
            | SubmissionState::Completed { sale_id } => Some(sale_id),
            SubmissionState::Failed { sale_id, .. } | SubmissionState::Cancelled { sale_id } => {
                sale_id.as_ref()
            }
            SubmissionState::Editing | SubmissionState::SubmittingDraft => None,
        }
    }

    fn reject<T>(&self, action: &str) -> CoreResult<T> {
        Err(CoreError::InvalidTransition {
            state: self.name().to_string(),
            action: action.to_string(),
        })
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Starts phase 1.
    ///
    /// Allowed from `Editing`, `Completed`, `Cancelled` and a create
    /// failure. A finalize failure must be retried with
    /// [`begin_finalize`](Self::begin_finalize) or cancelled first, so the
    /// same cart is never turned into two drafts.
    pub fn begin_draft(&mut self) -> CoreResult<()> {
        match self {
            SubmissionState::Editing
            | SubmissionState::Completed { .. }
            | SubmissionState::Cancelled { .. }
            | SubmissionState::Failed {
                stage: SubmissionStage::Create,
                ..
            } => {
                *self = SubmissionState::SubmittingDraft;
                Ok(())
            }
            _ => self.reject("submit a sale"),
        }
    }

    /// Phase 1 succeeded and phase 2 follows.
    pub fn draft_created(&mut self, sale_id: SaleId) -> CoreResult<()> {
        match self {
            SubmissionState::SubmittingDraft => {
                *self = SubmissionState::AwaitingFinalize { sale_id };
                Ok(())
            }
            _ => self.reject("record a created draft"),
        }
    }

    /// Phase 1 succeeded for a save-as-draft; the register goes back to
    /// editing a fresh cart.
    pub fn draft_saved(&mut self) -> CoreResult<()> {
        match self {
            SubmissionState::SubmittingDraft => {
                *self = SubmissionState::Editing;
                Ok(())
            }
            _ => self.reject("record a saved draft"),
        }
    }

    /// Starts phase 2 and returns the id of the draft being finalized.
    ///
    /// Allowed from `AwaitingFinalize` and from a finalize failure (retry).
    pub fn begin_finalize(&mut self) -> CoreResult<SaleId> {
        let sale_id = match self {
            SubmissionState::AwaitingFinalize { sale_id } => sale_id.clone(),
            SubmissionState::Failed {
                stage: SubmissionStage::Finalize,
                sale_id: Some(sale_id),
                ..
            } => sale_id.clone(),
            _ => return self.reject("finalize"),
        };
        *self = SubmissionState::Finalizing {
            sale_id: sale_id.clone(),
        };
        Ok(sale_id)
    }

    /// Phase 2 succeeded.
    pub fn finalized(&mut self) -> CoreResult<SaleId> {
        match self {
            SubmissionState::Finalizing { sale_id } => {
                let sale_id = sale_id.clone();
                *self = SubmissionState::Completed {
                    sale_id: sale_id.clone(),
                };
                Ok(sale_id)
            }
            _ => self.reject("complete a sale"),
        }
    }

    /// The in-flight request failed with `message`.
    pub fn fail(&mut self, message: impl Into<String>) -> CoreResult<()> {
        let (stage, sale_id) = match self {
            SubmissionState::SubmittingDraft => (SubmissionStage::Create, None),
            SubmissionState::Finalizing { sale_id } => {
                (SubmissionStage::Finalize, Some(sale_id.clone()))
            }
            _ => return self.reject("record a failure"),
        };
        *self = SubmissionState::Failed {
            stage,
            sale_id,
            message: message.into(),
        };
        Ok(())
    }

    /// Abandons a draft that is waiting for (or failed) finalization.
    ///
    /// In-flight requests cannot be cancelled.
    pub fn cancel(&mut self) -> CoreResult<()> {
        match self {
            SubmissionState::AwaitingFinalize { sale_id } => {
                *self = SubmissionState::Cancelled {
                    sale_id: Some(sale_id.clone()),
                };
                Ok(())
            }
            SubmissionState::Failed { sale_id, .. } => {
                *self = SubmissionState::Cancelled {
                    sale_id: sale_id.clone(),
                };
                Ok(())
            }
            _ => self.reject("cancel"),
        }
    }

    /// Returns to `Editing` once the outcome has been shown.
    pub fn reset(&mut self) -> CoreResult<()> {
        if self.is_processing() {
            return self.reject("start a new sale");
        }
        *self = SubmissionState::Editing;
        Ok(())
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Sale Draft (submit-time snapshot)
// =============================================================================

/// One line as submitted, priced in the display currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DraftLine {
    pub product_id: ProductId,
    pub name: String,
    pub code: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub discount_percent: f64,
    pub line_total: Money,
}

/// Everything a submission needs, copied out of the cart at submit time.
///
/// Responses are applied to this snapshot, never to the live cart, so a
/// late response cannot bring back lines the cashier already changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleDraft {
    pub order_number: OrderNumber,
    pub currency: CurrencyCode,
    pub sale_mode: SaleMode,
    pub lines: Vec<DraftLine>,
    pub totals: CartTotals,
}

impl SaleDraft {
    /// Snapshots `cart`.
    ///
    /// ## Errors
    /// - `EmptyCart` when there is nothing to sell
    /// - `StockExceeded` when a line holds more than its stock snapshot
    pub fn from_cart(cart: &Cart, currency: &CurrencySettings) -> CoreResult<Self> {
        if cart.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        cart.ensure_within_stock()?;

        let display = cart.display_currency();
        let lines = cart
            .lines()
            .iter()
            .map(|line| DraftLine {
                product_id: line.product_id.clone(),
                name: line.name.clone(),
                code: line.code.clone(),
                quantity: line.quantity,
                unit_price: display_unit_price(line, display, currency),
                discount_percent: line.discount_percent,
                line_total: line_total(line, display, currency),
            })
            .collect();

        Ok(SaleDraft {
            order_number: cart.order_number().clone(),
            currency: display.clone(),
            sale_mode: cart.sale_mode(),
            lines,
            totals: CartTotals::compute(cart, currency),
        })
    }

    pub fn total(&self) -> Money {
        self.totals.total
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
