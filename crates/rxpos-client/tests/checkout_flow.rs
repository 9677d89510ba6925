//! End-to-end register flow against a fake sale service.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use rxpos_client::{
    ClientConfig, ClientError, RecentProducts, SaleSession, SessionContext, IDEMPOTENCY_KEY_HEADER,
};
use rxpos_core::{
    Catalog, CurrencySettings, ExchangeRateTable, Money, Product, ProductId, SaleId, SaleMode,
    SubmissionState,
};
use serde_json::{json, Value};
use tempfile::TempDir;

// =============================================================================
// Fake sale service
// =============================================================================

#[derive(Clone, Default)]
struct Backend {
    next_id: Arc<AtomicUsize>,
    /// Finalize calls to fail with a 500 before succeeding.
    finalize_failures: Arc<AtomicUsize>,
    creates: Arc<Mutex<Vec<Value>>>,
    finalizes: Arc<Mutex<Vec<(String, Value)>>>,
    keys: Arc<Mutex<Vec<String>>>,
}

impl Backend {
    fn record_key(&self, headers: &HeaderMap) {
        if let Some(key) = headers.get(IDEMPOTENCY_KEY_HEADER) {
            self.keys
                .lock()
                .unwrap()
                .push(key.to_str().unwrap().to_string());
        }
    }
}

async fn create_sale(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    backend.record_key(&headers);
    let lines = body["lines"].as_array().cloned().unwrap_or_default();
    backend.creates.lock().unwrap().push(body);

    if lines.iter().any(|l| l["quantity"].as_u64() > Some(50)) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "message": "The quantity may not be greater than 50.",
                "errors": {"lines.0.quantity": ["The quantity may not be greater than 50."]}
            })),
        );
    }

    let id = 500 + backend.next_id.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::CREATED,
        Json(json!({"sale": {"id": id, "status": "draft"}})),
    )
}

async fn finalize_sale(
    State(backend): State<Backend>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    backend.record_key(&headers);
    backend.finalizes.lock().unwrap().push((id, body));

    let failures = &backend.finalize_failures;
    if failures.load(Ordering::SeqCst) > 0 {
        failures.fetch_sub(1, Ordering::SeqCst);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "Server Error"})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({"success": true, "message": "Sale completed successfully."})),
    )
}

async fn start(backend: Backend) -> String {
    let app = Router::new()
        .route("/api/sales", post(create_sale))
        .route("/api/sales/{id}/finalize", post(finalize_sale))
        .with_state(backend);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api", addr)
}

// =============================================================================
// Fixtures
// =============================================================================

fn catalog() -> Catalog {
    Catalog::new(vec![
        Product {
            id: ProductId::new("1"),
            name: "Ibuprofen 400mg".into(),
            code: "IBU-400".into(),
            barcode: Some("6291041500213".into()),
            stock: 100,
            price_amount: Money::from_cents(400),
            price_currency: "USD".into(),
            wholesale_price_amount: Some(Money::from_cents(300)),
            category_id: None,
            image_url: None,
        },
        Product {
            id: ProductId::new("2"),
            name: "Cough Syrup".into(),
            code: "CSY".into(),
            barcode: None,
            stock: 10,
            price_amount: Money::from_cents(2000),
            price_currency: "EUR".into(),
            wholesale_price_amount: None,
            category_id: None,
            image_url: None,
        },
    ])
}

fn context() -> SessionContext {
    let rates: ExchangeRateTable = [("USD", 1.0), ("EUR", 0.8)].into_iter().collect();
    SessionContext::new(CurrencySettings::new("USD", rates), catalog())
}

fn config(base_url: String, dir: &TempDir) -> ClientConfig {
    let mut config = ClientConfig::new();
    config.server.base_url = base_url;
    config.register.cash_register_id = Some("3".into());
    config.register.cash_register_session_id = Some("41".into());
    config.sale.auto_open_receipt = true;
    config.storage.recent_products_path = Some(dir.path().join("recent.json"));
    config
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_checkout_over_http() {
    let backend = Backend::default();
    let dir = TempDir::new().unwrap();
    let session =
        SaleSession::from_config(context(), &config(start(backend.clone()).await, &dir)).unwrap();

    session.add_by_code("6291041500213").unwrap();
    session.add_by_code("CSY").unwrap();
    session.update_quantity(&ProductId::new("1"), 5).unwrap();

    // 5 x 4.00 + 20.00 EUR at 0.8 = 20.00 + 25.00
    assert_eq!(session.totals().total, Money::from_cents(4500));

    let outcome = session
        .checkout(Some(Money::from_cents(5000)))
        .await
        .unwrap();
    assert_eq!(outcome.sale_id, SaleId::new("500"));
    assert_eq!(outcome.payment.change, Money::from_cents(500));
    assert_eq!(
        outcome.message.as_deref(),
        Some("Sale completed successfully.")
    );
    let receipt = outcome.receipt.expect("receipt");
    assert!(receipt.render_text().contains("Cough Syrup"));

    let creates = backend.creates.lock().unwrap();
    assert_eq!(creates[0]["currency"], "USD");
    assert_eq!(creates[0]["cash_register_id"], "3");
    assert_eq!(creates[0]["cash_register_session_id"], "41");
    assert_eq!(creates[0]["lines"][0]["quantity"], 5);
    assert_eq!(creates[0]["lines"][1]["unit_price"], 25.0);

    let finalizes = backend.finalizes.lock().unwrap();
    assert_eq!(finalizes[0].0, "500");
    assert_eq!(finalizes[0].1["paid_amount"], 50.0);

    let keys = backend.keys.lock().unwrap();
    assert_eq!(keys.len(), 2);
    assert_ne!(keys[0], keys[1]);

    assert!(session.with_cart(|cart| cart.is_empty()));

    let recent = RecentProducts::load(dir.path().join("recent.json"), 12);
    assert_eq!(recent.ids(), &[ProductId::new("2"), ProductId::new("1")]);
}

#[tokio::test]
async fn test_validation_error_keeps_cart() {
    let backend = Backend::default();
    let dir = TempDir::new().unwrap();
    let session =
        SaleSession::from_config(context(), &config(start(backend.clone()).await, &dir)).unwrap();

    session.add_product(&ProductId::new("1")).unwrap();
    session.update_quantity(&ProductId::new("1"), 60).unwrap();

    let err = session.checkout(None).await.unwrap_err();
    match &err {
        ClientError::Validation { message, errors } => {
            assert_eq!(message, "The quantity may not be greater than 50.");
            assert_eq!(errors.get("lines.0.quantity").len(), 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(session.with_cart(|cart| cart.total_quantity()), 60);
    assert!(!session.is_processing());
    assert!(backend.finalizes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_finalize_failure_then_retry() {
    let backend = Backend::default();
    backend.finalize_failures.store(1, Ordering::SeqCst);
    let dir = TempDir::new().unwrap();
    let session =
        SaleSession::from_config(context(), &config(start(backend.clone()).await, &dir)).unwrap();

    session.set_sale_mode(SaleMode::Wholesale);
    session.add_product(&ProductId::new("1")).unwrap();

    let err = session.checkout(None).await.unwrap_err();
    assert_eq!(err.draft_sale_id(), Some(&SaleId::new("500")));
    assert!(err.is_retryable());
    assert!(matches!(
        session.submission_state(),
        SubmissionState::Failed { .. }
    ));
    assert_eq!(session.with_cart(|cart| cart.line_count()), 1);

    let outcome = session.retry_finalize(None).await.unwrap();
    assert_eq!(outcome.sale_id, SaleId::new("500"));
    assert_eq!(backend.creates.lock().unwrap().len(), 1);

    let finalizes = backend.finalizes.lock().unwrap();
    assert_eq!(finalizes.len(), 2);
    // Without wholesale permission the retail price is charged
    assert_eq!(finalizes[1].1["paid_amount"], 4.0);
}

#[tokio::test]
async fn test_save_draft_over_http() {
    let backend = Backend::default();
    let dir = TempDir::new().unwrap();
    let session =
        SaleSession::from_config(context(), &config(start(backend.clone()).await, &dir)).unwrap();

    session.add_product(&ProductId::new("2")).unwrap();
    let sale_id = session.save_draft().await.unwrap();

    assert_eq!(sale_id, SaleId::new("500"));
    assert!(backend.finalizes.lock().unwrap().is_empty());
    assert!(session.with_cart(|cart| cart.is_empty()));
}
