//! # Receipt
//!
//! Printable summary of a completed sale, built from the submit-time
//! snapshot rather than the live cart (which is already cleared by then).

use chrono::{DateTime, Utc};
use rxpos_core::{CartTotals, Customer, DraftLine, OrderNumber, PaymentSummary, SaleDraft, SaleId};
use serde::Serialize;
use std::fmt::Write as _;
use ts_rs::TS;

const WIDTH: usize = 40;

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Receipt {
    pub sale_id: SaleId,
    pub order_number: OrderNumber,
    pub shop_name: String,
    #[ts(type = "string")]
    pub issued_at: DateTime<Utc>,
    pub customer: Option<Customer>,
    pub lines: Vec<DraftLine>,
    pub totals: CartTotals,
    pub payment: PaymentSummary,
}

impl Receipt {
    pub fn new(
        sale_id: SaleId,
        draft: &SaleDraft,
        payment: PaymentSummary,
        customer: Option<Customer>,
        shop_name: impl Into<String>,
    ) -> Self {
        Receipt {
            sale_id,
            order_number: draft.order_number.clone(),
            shop_name: shop_name.into(),
            issued_at: Utc::now(),
            customer,
            lines: draft.lines.clone(),
            totals: draft.totals.clone(),
            payment,
        }
    }

    /// Plain-text rendering for a receipt printer.
    pub fn render_text(&self) -> String {
        let ccy = self.totals.currency.as_str();
        let rule = "-".repeat(WIDTH);
        let mut out = String::new();

        if !self.shop_name.is_empty() {
            let _ = writeln!(out, "{:^width$}", self.shop_name, width = WIDTH);
        }
        let _ = writeln!(out, "Order {}  (sale #{})", self.order_number, self.sale_id);
        let _ = writeln!(out, "{}", self.issued_at.format("%Y-%m-%d %H:%M"));
        if let Some(customer) = &self.customer {
            let _ = writeln!(out, "Customer: {}", customer.full_name);
        }
        let _ = writeln!(out, "{}", rule);

        for line in &self.lines {
            let _ = writeln!(out, "{}", line.name);
            let mut detail = format!("  {} x {}", line.quantity, line.unit_price);
            if line.discount_percent > 0.0 {
                let _ = write!(detail, " -{}%", line.discount_percent);
            }
            let _ = writeln!(out, "{}", columns(&detail, &line.line_total.to_string()));
        }

        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "{}", columns("Subtotal", &self.totals.subtotal.to_string()));
        if !self.totals.tax_amount.is_zero() {
            let _ = writeln!(out, "{}", columns("Tax", &self.totals.tax_amount.to_string()));
        }
        if !self.totals.order_discount_amount.is_zero() {
            let _ = writeln!(
                out,
                "{}",
                columns(
                    "Discount",
                    &format!("-{}", self.totals.order_discount_amount)
                )
            );
        }
        let _ = writeln!(
            out,
            "{}",
            columns(&format!("TOTAL {}", ccy), &self.totals.total.to_string())
        );
        let _ = writeln!(out, "{}", columns("Paid", &self.payment.paid.to_string()));
        if !self.payment.change.is_zero() {
            let _ = writeln!(out, "{}", columns("Change", &self.payment.change.to_string()));
        }
        if !self.payment.balance.is_zero() {
            let _ = writeln!(out, "{}", columns("Balance due", &self.payment.balance.to_string()));
        }
        out
    }
}

/// Left label, right-aligned amount, padded to the receipt width.
fn columns(left: &str, right: &str) -> String {
    let pad = WIDTH.saturating_sub(left.chars().count() + right.chars().count()).max(1);
    format!("{}{}{}", left, " ".repeat(pad), right)
}
