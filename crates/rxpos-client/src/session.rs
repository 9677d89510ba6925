//! # Sale Session
//!
//! One register screen: the cart, the submission state, the selected
//! customer and the recent-products row, wired to a [`SaleGateway`].
//!
//! ## Thread Safety
//! Cart and submission state each sit behind `Arc<Mutex<T>>`:
//! 1. Every cart mutation is synchronous and holds the lock briefly
//! 2. Locks are never held across an `.await`
//! 3. A session can be shared between tasks (`Arc<SaleSession>`)
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  checkout(paid)                                                         │
//! │     │                                                                   │
//! │     ├─ snapshot cart ──► SaleDraft        (cart lock, released)         │
//! │     ├─ state.begin_draft()                (rejects a second submit)     │
//! │     │                                                                   │
//! │     ├─ POST /sales ──────────── error ──► Failed{create}, cart kept     │
//! │     │      │                                                            │
//! │     │      ▼ sale id                                                    │
//! │     ├─ state.draft_created(id)                                          │
//! │     │                                                                   │
//! │     ├─ POST /sales/{id}/finalize ─ error ► Failed{finalize, id}         │
//! │     │      │                               draft kept for retry         │
//! │     │      ▼                                                            │
//! │     └─ state.finalized(), cart cleared, SaleOutcome (+ receipt)         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Responses are applied to the snapshot taken at submit time. Whatever the
//! cashier does to the cart while a request is in flight is never replaced
//! by the submitted lines.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rxpos_core::validation::{validate_customer_name, validate_paid_amount, validate_phone};
use rxpos_core::{
    Cart, CartTotals, Catalog, CoreError, CurrencyCode, Customer, Money, OrderDiscount,
    OrderNumber, PaymentSummary, Product, ProductId, SaleDraft, SaleId, SaleMode,
    SubmissionState,
};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{ClientConfig, SaleSettings};
use crate::context::SessionContext;
use crate::error::{ClientError, ClientResult};
use crate::gateway::{
    CreateSaleRequest, FinalizeSaleRequest, HttpSaleGateway, QuickCustomerRequest, SaleGateway,
};
use crate::receipt::Receipt;
use crate::recent::RecentProducts;

/// Locks a mutex, recovering the data if a previous holder panicked.
///
/// Cart and state stay internally consistent because every mutation either
/// completes or returns before touching them.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Outcomes
// =============================================================================

/// A completed sale, for the success indicator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleOutcome {
    pub sale_id: SaleId,
    pub order_number: OrderNumber,
    pub currency: CurrencyCode,
    pub payment: PaymentSummary,
    /// Server message from the finalize response.
    pub message: Option<String>,
    /// Present when the register opens receipts automatically.
    pub receipt: Option<Receipt>,
}

impl SaleOutcome {
    pub fn total(&self) -> Money {
        self.payment.total
    }
}

/// A draft waiting for phase 2.
#[derive(Debug, Clone)]
struct PendingSale {
    sale_id: SaleId,
    draft: SaleDraft,
    customer: Option<Customer>,
}

// =============================================================================
// Sale Session
// =============================================================================

pub struct SaleSession {
    context: SessionContext,
    settings: SaleSettings,
    gateway: Arc<dyn SaleGateway>,
    catalog: Mutex<Catalog>,
    cart: Arc<Mutex<Cart>>,
    state: Arc<Mutex<SubmissionState>>,
    pending: Mutex<Option<PendingSale>>,
    customer: Mutex<Option<Customer>>,
    recent: Mutex<RecentProducts>,
}

impl SaleSession {
    /// Starts a session with an empty cart.
    pub fn new(
        context: SessionContext,
        gateway: Arc<dyn SaleGateway>,
        settings: SaleSettings,
    ) -> Self {
        let mut cart = Cart::new(context.initial_display_currency())
            .with_wholesale_permission(context.permissions.can_sell_wholesale)
            .with_order_prefix(settings.order_number_prefix.clone());
        if let Err(e) = cart.set_tax_rate(context.tax_rate) {
            warn!(error = %e, tax_rate = context.tax_rate, "Ignoring invalid default tax rate");
        }

        let recent = RecentProducts::in_memory(settings.recent_products_limit);
        let catalog = context.catalog.clone();

        SaleSession {
            context,
            settings,
            gateway,
            catalog: Mutex::new(catalog),
            cart: Arc::new(Mutex::new(cart)),
            state: Arc::new(Mutex::new(SubmissionState::default())),
            pending: Mutex::new(None),
            customer: Mutex::new(None),
            recent: Mutex::new(recent),
        }
    }

    /// Starts a session against the HTTP sale service described by `config`.
    ///
    /// The register binding from config fills whatever the context leaves
    /// empty, and recent products load from the configured file.
    pub fn from_config(mut context: SessionContext, config: &ClientConfig) -> ClientResult<Self> {
        context.apply_register_defaults(&config.register);
        let gateway = HttpSaleGateway::new(config.server.clone())?;
        let session = SaleSession::new(context, Arc::new(gateway), config.sale.clone());

        if let Some(path) = config.recent_products_path() {
            let recent = RecentProducts::load(path, config.sale.recent_products_limit);
            *lock(&session.recent) = recent;
        }
        info!(base_url = %config.server.base_url, "Sale session started");
        Ok(session)
    }

    /// Replaces the recent-products store.
    pub fn with_recent_products(self, recent: RecentProducts) -> Self {
        *lock(&self.recent) = recent;
        self
    }

    // =========================================================================
    // Cart Access
    // =========================================================================

    /// Executes a function with read access to the cart.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let lines = session.with_cart(|cart| cart.line_count());
    /// ```
    pub fn with_cart<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Cart) -> R,
    {
        let cart = lock(&self.cart);
        f(&cart)
    }

    /// Executes a function with write access to the cart.
    pub fn with_cart_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Cart) -> R,
    {
        let mut cart = lock(&self.cart);
        f(&mut cart)
    }

    pub fn cart_snapshot(&self) -> Cart {
        self.with_cart(Cart::clone)
    }

    pub fn totals(&self) -> CartTotals {
        self.with_cart(|cart| CartTotals::compute(cart, &self.context.currency))
    }

    /// Balance and change for an amount handed over (`None`: exact).
    pub fn payment_summary(&self, paid: Option<Money>) -> PaymentSummary {
        PaymentSummary::settle(self.totals().total, paid)
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    // =========================================================================
    // Cart Actions
    // =========================================================================

    /// Adds one unit of a catalog product and remembers it as recent.
    pub fn add_product(&self, product_id: &ProductId) -> ClientResult<u32> {
        let product = self.product(product_id)?;
        let quantity = self.with_cart_mut(|cart| cart.add_line(&product))?;
        lock(&self.recent).record(product_id);
        Ok(quantity)
    }

    /// Adds one unit of the product with this code or barcode.
    pub fn add_by_code(&self, code: &str) -> ClientResult<u32> {
        let product_id = lock(&self.catalog)
            .find_by_code(code)
            .map(|p| p.id.clone())
            .ok_or_else(|| CoreError::ProductNotFound(code.trim().to_string()))?;
        self.add_product(&product_id)
    }

    pub fn update_quantity(&self, product_id: &ProductId, quantity: u32) -> ClientResult<()> {
        Ok(self.with_cart_mut(|cart| cart.update_quantity(product_id, quantity))?)
    }

    pub fn remove_line(&self, product_id: &ProductId) -> bool {
        self.with_cart_mut(|cart| cart.remove_line(product_id))
    }

    pub fn set_line_discount(&self, product_id: &ProductId, percent: f64) -> ClientResult<()> {
        Ok(self.with_cart_mut(|cart| cart.set_line_discount(product_id, percent))?)
    }

    pub fn set_order_discount(&self, discount: OrderDiscount) -> ClientResult<()> {
        Ok(self.with_cart_mut(|cart| cart.set_order_discount(discount))?)
    }

    pub fn set_tax_rate(&self, percent: f64) -> ClientResult<()> {
        Ok(self.with_cart_mut(|cart| cart.set_tax_rate(percent))?)
    }

    pub fn set_display_currency(&self, currency: impl Into<CurrencyCode>) {
        let currency = currency.into();
        self.with_cart_mut(|cart| cart.set_display_currency(currency));
    }

    /// Switches retail/wholesale and re-prices from the current catalog.
    pub fn set_sale_mode(&self, mode: SaleMode) {
        let catalog = lock(&self.catalog);
        self.with_cart_mut(|cart| cart.set_sale_mode(mode, &catalog));
    }

    /// Installs a reloaded catalog and refreshes every line's stock snapshot.
    pub fn refresh_catalog(&self, catalog: Catalog) {
        self.with_cart_mut(|cart| cart.refresh_stock(&catalog));
        *lock(&self.catalog) = catalog;
    }

    /// Empties the cart and starts a new order number.
    pub fn clear_cart(&self) {
        self.with_cart_mut(Cart::clear);
    }

    /// Starts over: empty cart, walk-in customer, state back to editing.
    ///
    /// Refused while a request is in flight.
    pub fn new_sale(&self) -> ClientResult<()> {
        lock(&self.state).reset()?;
        lock(&self.pending).take();
        self.clear_cart();
        lock(&self.customer).take();
        Ok(())
    }

    // =========================================================================
    // Catalog & Recent Products
    // =========================================================================

    pub fn product(&self, product_id: &ProductId) -> ClientResult<Product> {
        lock(&self.catalog)
            .get(product_id)
            .cloned()
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()).into())
    }

    /// Recently added products still in the catalog, newest first.
    pub fn recent_products(&self) -> Vec<Product> {
        let catalog = lock(&self.catalog);
        let products = lock(&self.recent)
            .resolve(&catalog)
            .into_iter()
            .cloned()
            .collect();
        products
    }

    // =========================================================================
    // Customer
    // =========================================================================

    /// Attaches a customer to the sale (`None`: walk-in).
    pub fn set_customer(&self, customer: Option<Customer>) {
        *lock(&self.customer) = customer;
    }

    pub fn customer(&self) -> Option<Customer> {
        lock(&self.customer).clone()
    }

    /// Creates a customer inline and attaches it to the sale.
    pub async fn quick_customer(&self, name: &str, phone: Option<&str>) -> ClientResult<Customer> {
        let request = QuickCustomerRequest {
            name: validate_customer_name(name)?,
            phone: validate_phone(phone)?,
        };
        let customer = self.gateway.quick_customer(&request).await?;
        info!(customer_id = %customer.id, "Customer created");
        self.set_customer(Some(customer.clone()));
        Ok(customer)
    }

    // =========================================================================
    // Submission
    // =========================================================================

    pub fn submission_state(&self) -> SubmissionState {
        lock(&self.state).clone()
    }

    pub fn is_processing(&self) -> bool {
        lock(&self.state).is_processing()
    }

    /// Snapshots the cart and moves the state machine into phase 1.
    fn begin_submit(&self) -> ClientResult<(SaleDraft, Option<Customer>)> {
        let draft = self.with_cart(|cart| SaleDraft::from_cart(cart, &self.context.currency))?;
        lock(&self.state).begin_draft()?;
        Ok((draft, self.customer()))
    }

    /// Phase 1: creates the draft sale on the server.
    async fn create_draft(
        &self,
        draft: &SaleDraft,
        customer: Option<&Customer>,
    ) -> ClientResult<SaleId> {
        let request = CreateSaleRequest::from_draft(
            draft,
            customer.map(|c| &c.id),
            &self.context.register,
        );
        let key = Uuid::new_v4();
        info!(order_number = %draft.order_number, lines = draft.lines.len(), idempotency_key = %key, "Creating sale");

        match self.gateway.create_sale(&request, key).await {
            Ok(sale) => {
                debug!(sale_id = %sale.id, status = ?sale.status, "Draft sale created");
                Ok(sale.id)
            }
            Err(e) => {
                warn!(error = %e, "Creating sale failed");
                self.record_failure(&e);
                Err(e)
            }
        }
    }

    fn record_failure(&self, error: &ClientError) {
        if let Err(transition) = lock(&self.state).fail(error.to_string()) {
            warn!(error = %transition, "Could not record submission failure");
        }
    }

    /// Runs both phases: create the draft, then finalize it with `paid`
    /// (defaults to the total).
    ///
    /// ## Errors
    /// - `Core(..)` when the cart is empty, over stock, or a submission is
    ///   already running; nothing was sent
    /// - any gateway error from phase 1; the cart is untouched
    /// - `Finalize { sale_id, .. }` when phase 2 fails; the draft stays on
    ///   the server and [`retry_finalize`](Self::retry_finalize) can finish it
    pub async fn checkout(&self, paid: Option<Money>) -> ClientResult<SaleOutcome> {
        if let Some(paid) = paid {
            validate_paid_amount(paid.cents())?;
        }
        let (draft, customer) = self.begin_submit()?;

        let sale_id = self.create_draft(&draft, customer.as_ref()).await?;
        lock(&self.state).draft_created(sale_id.clone())?;
        *lock(&self.pending) = Some(PendingSale {
            sale_id,
            draft,
            customer,
        });

        self.finalize_pending(paid).await
    }

    /// Phase 1 only: stores the cart as a draft sale, clears the cart and
    /// returns the draft's id so the caller can open it.
    pub async fn save_draft(&self) -> ClientResult<SaleId> {
        let (draft, customer) = self.begin_submit()?;
        let sale_id = self.create_draft(&draft, customer.as_ref()).await?;

        lock(&self.state).draft_saved()?;
        self.clear_cart();
        lock(&self.customer).take();
        info!(%sale_id, order_number = %draft.order_number, "Sale saved as draft");
        Ok(sale_id)
    }

    /// Retries phase 2 for a draft whose finalize failed.
    pub async fn retry_finalize(&self, paid: Option<Money>) -> ClientResult<SaleOutcome> {
        if let Some(paid) = paid {
            validate_paid_amount(paid.cents())?;
        }
        self.finalize_pending(paid).await
    }

    async fn finalize_pending(&self, paid: Option<Money>) -> ClientResult<SaleOutcome> {
        let sale_id = lock(&self.state).begin_finalize()?;
        let pending = lock(&self.pending).clone();
        let Some(pending) = pending.filter(|p| p.sale_id == sale_id) else {
            let error =
                ClientError::InvalidResponse(format!("No submitted cart for sale {}", sale_id));
            warn!(%sale_id, "Finalize without a submitted cart");
            self.record_failure(&error);
            return Err(ClientError::finalize(sale_id, error));
        };

        let payment = PaymentSummary::settle(pending.draft.total(), paid);
        let request = FinalizeSaleRequest {
            paid_amount: payment.paid,
        };
        let key = Uuid::new_v4();
        info!(%sale_id, paid = %payment.paid, idempotency_key = %key, "Finalizing sale");

        let finalized = match self.gateway.finalize_sale(&sale_id, &request, key).await {
            Ok(finalized) => finalized,
            Err(e) => {
                warn!(%sale_id, error = %e, "Finalizing sale failed");
                self.record_failure(&e);
                return Err(ClientError::finalize(sale_id, e));
            }
        };

        lock(&self.state).finalized()?;
        lock(&self.pending).take();
        self.clear_cart();
        lock(&self.customer).take();
        info!(%sale_id, total = %payment.total, change = %payment.change, "Sale completed");

        let receipt = self.settings.auto_open_receipt.then(|| {
            Receipt::new(
                sale_id.clone(),
                &pending.draft,
                payment,
                pending.customer.clone(),
                self.context.shop.name.clone(),
            )
        });

        Ok(SaleOutcome {
            sale_id,
            order_number: pending.draft.order_number.clone(),
            currency: pending.draft.currency.clone(),
            payment,
            message: finalized.message,
            receipt,
        })
    }

    /// Abandons a draft awaiting (or failed at) finalize. The draft stays on
    /// the server; its id is returned. The cart is kept.
    pub fn cancel(&self) -> ClientResult<Option<SaleId>> {
        let mut state = lock(&self.state);
        state.cancel()?;
        let sale_id = state.sale_id().cloned();
        drop(state);
        lock(&self.pending).take();
        info!(sale_id = ?sale_id, "Submission cancelled");
        Ok(sale_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FieldErrors;
    use crate::gateway::{CreatedSale, FinalizedSale};
    use rxpos_core::{CurrencySettings, SubmissionStage};
    use std::collections::VecDeque;
    use tokio::sync::Notify;

    // =========================================================================
    // Fake gateway
    // =========================================================================

    #[derive(Default)]
    struct FakeGateway {
        create_results: Mutex<VecDeque<ClientResult<CreatedSale>>>,
        finalize_results: Mutex<VecDeque<ClientResult<FinalizedSale>>>,
        creates: Mutex<Vec<(CreateSaleRequest, Uuid)>>,
        finalizes: Mutex<Vec<(SaleId, FinalizeSaleRequest, Uuid)>>,
        quick_customers: Mutex<Vec<QuickCustomerRequest>>,
        /// When set, create_sale signals `started` and waits on `release`.
        hold: Option<(Arc<Notify>, Arc<Notify>)>,
    }

    impl FakeGateway {
        fn fail_next_create(&self, error: ClientError) {
            lock(&self.create_results).push_back(Err(error));
        }

        fn fail_next_finalize(&self, error: ClientError) {
            lock(&self.finalize_results).push_back(Err(error));
        }

        fn create_count(&self) -> usize {
            lock(&self.creates).len()
        }

        fn finalize_count(&self) -> usize {
            lock(&self.finalizes).len()
        }
    }

    #[async_trait::async_trait]
    impl SaleGateway for FakeGateway {
        async fn create_sale(
            &self,
            request: &CreateSaleRequest,
            idempotency_key: Uuid,
        ) -> ClientResult<CreatedSale> {
            let n = {
                let mut creates = lock(&self.creates);
                creates.push((request.clone(), idempotency_key));
                creates.len()
            };
            if let Some((started, release)) = &self.hold {
                started.notify_one();
                release.notified().await;
            }
            let scripted = lock(&self.create_results).pop_front();
            scripted.unwrap_or_else(|| {
                Ok(CreatedSale {
                    id: SaleId::new(format!("{}", 100 + n)),
                    status: Some("draft".into()),
                })
            })
        }

        async fn finalize_sale(
            &self,
            sale_id: &SaleId,
            request: &FinalizeSaleRequest,
            idempotency_key: Uuid,
        ) -> ClientResult<FinalizedSale> {
            lock(&self.finalizes).push((sale_id.clone(), *request, idempotency_key));
            let scripted = lock(&self.finalize_results).pop_front();
            scripted.unwrap_or_else(|| {
                Ok(FinalizedSale {
                    message: Some("Sale completed".into()),
                })
            })
        }

        async fn quick_customer(&self, request: &QuickCustomerRequest) -> ClientResult<Customer> {
            lock(&self.quick_customers).push(request.clone());
            Ok(Customer {
                id: "31".into(),
                full_name: request.name.clone(),
                phone: request.phone.clone(),
                email: None,
            })
        }
    }

    // =========================================================================
    // Fixtures
    // =========================================================================

    fn product(id: &str, code: &str, cents: i64, stock: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {}", code),
            code: code.into(),
            barcode: None,
            stock,
            price_amount: Money::from_cents(cents),
            price_currency: "USD".into(),
            wholesale_price_amount: None,
            category_id: None,
            image_url: None,
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(vec![
            product("1", "AMX", 10000, 5),
            product("2", "SAL", 250, 2),
        ])
    }

    fn session_with(gateway: Arc<FakeGateway>, settings: SaleSettings) -> SaleSession {
        let context = SessionContext::new(CurrencySettings::single("USD"), catalog());
        SaleSession::new(context, gateway, settings)
    }

    fn session(gateway: Arc<FakeGateway>) -> SaleSession {
        session_with(gateway, SaleSettings::default())
    }

    fn pid(id: &str) -> ProductId {
        ProductId::new(id)
    }

    fn validation_error() -> ClientError {
        let mut errors = FieldErrors::new();
        errors.insert("lines.0.quantity", "Not enough stock.");
        ClientError::Validation {
            message: "Not enough stock.".into(),
            errors,
        }
    }

    // =========================================================================
    // Cart actions
    // =========================================================================

    #[test]
    fn test_add_and_scan() {
        let session = session(Arc::new(FakeGateway::default()));
        assert_eq!(session.add_product(&pid("1")).unwrap(), 1);
        assert_eq!(session.add_by_code("amx").unwrap(), 2);
        assert_eq!(session.add_by_code("SAL").unwrap(), 1);

        assert_eq!(session.totals().total, Money::from_cents(20250));
        let recent: Vec<_> = session.recent_products().into_iter().map(|p| p.code).collect();
        assert_eq!(recent, vec!["SAL", "AMX"]);
    }

    #[test]
    fn test_unknown_product() {
        let session = session(Arc::new(FakeGateway::default()));
        let err = session.add_by_code("NOPE").unwrap_err();
        assert!(matches!(err, ClientError::Core(CoreError::ProductNotFound(_))));
        assert!(session.with_cart(Cart::is_empty));
    }

    #[test]
    fn test_stock_limit_surfaces_as_core_error() {
        let session = session(Arc::new(FakeGateway::default()));
        session.add_product(&pid("2")).unwrap();
        session.add_product(&pid("2")).unwrap();
        let err = session.add_product(&pid("2")).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Core(CoreError::InsufficientStock { available: 2, .. })
        ));
    }

    #[test]
    fn test_payment_summary() {
        let session = session(Arc::new(FakeGateway::default()));
        session.add_product(&pid("1")).unwrap();
        session.set_order_discount(OrderDiscount::percent(10.0)).unwrap();

        let summary = session.payment_summary(Some(Money::from_cents(8000)));
        assert_eq!(summary.total, Money::from_cents(9000));
        assert_eq!(summary.balance, Money::from_cents(1000));
        assert!(summary.change.is_zero());
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    #[tokio::test]
    async fn test_checkout_runs_both_phases() {
        let gateway = Arc::new(FakeGateway::default());
        let session = session(gateway.clone());
        session.add_product(&pid("1")).unwrap();
        session.add_product(&pid("2")).unwrap();

        let outcome = session.checkout(Some(Money::from_cents(11000))).await.unwrap();

        assert_eq!(outcome.sale_id, SaleId::new("101"));
        assert_eq!(outcome.total(), Money::from_cents(10250));
        assert_eq!(outcome.payment.change, Money::from_cents(750));
        assert_eq!(outcome.message.as_deref(), Some("Sale completed"));
        assert!(outcome.receipt.is_none());

        let creates = lock(&gateway.creates);
        let finalizes = lock(&gateway.finalizes);
        assert_eq!(creates.len(), 1);
        assert_eq!(creates[0].0.lines.len(), 2);
        assert_eq!(finalizes.len(), 1);
        assert_eq!(finalizes[0].0, SaleId::new("101"));
        assert_eq!(finalizes[0].1.paid_amount, Money::from_cents(11000));
        assert_ne!(creates[0].1, finalizes[0].2);

        assert!(session.with_cart(Cart::is_empty));
        assert_eq!(
            session.submission_state(),
            SubmissionState::Completed {
                sale_id: SaleId::new("101")
            }
        );
    }

    #[tokio::test]
    async fn test_checkout_defaults_paid_to_total() {
        let gateway = Arc::new(FakeGateway::default());
        let session = session(gateway.clone());
        session.add_product(&pid("2")).unwrap();

        let outcome = session.checkout(None).await.unwrap();
        assert_eq!(outcome.payment.paid, Money::from_cents(250));
        assert_eq!(lock(&gateway.finalizes)[0].1.paid_amount, Money::from_cents(250));
    }

    #[tokio::test]
    async fn test_checkout_rejects_negative_paid() {
        let gateway = Arc::new(FakeGateway::default());
        let session = session(gateway.clone());
        session.add_product(&pid("2")).unwrap();

        let err = session.checkout(Some(Money::from_cents(-1))).await.unwrap_err();
        assert!(matches!(err, ClientError::Core(CoreError::Validation(_))));
        assert_eq!(gateway.create_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_cart_sends_nothing() {
        let gateway = Arc::new(FakeGateway::default());
        let session = session(gateway.clone());

        let err = session.checkout(None).await.unwrap_err();
        assert!(matches!(err, ClientError::Core(CoreError::EmptyCart)));
        assert_eq!(gateway.create_count(), 0);
        assert_eq!(session.submission_state(), SubmissionState::Editing);
    }

    #[tokio::test]
    async fn test_exceeded_stock_blocks_submit() {
        let gateway = Arc::new(FakeGateway::default());
        let session = session(gateway.clone());
        session.add_product(&pid("1")).unwrap();
        session.add_product(&pid("1")).unwrap();

        session.refresh_catalog(Catalog::new(vec![product("1", "AMX", 10000, 1)]));
        let err = session.checkout(None).await.unwrap_err();
        match err {
            ClientError::Core(CoreError::StockExceeded { codes }) => assert_eq!(codes, vec!["AMX"]),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(gateway.create_count(), 0);
    }

    #[tokio::test]
    async fn test_second_submit_while_in_flight_is_rejected() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let gateway = Arc::new(FakeGateway {
            hold: Some((started.clone(), release.clone())),
            ..FakeGateway::default()
        });
        let session = Arc::new(session(gateway.clone()));
        session.add_product(&pid("1")).unwrap();

        let first = tokio::spawn({
            let session = session.clone();
            async move { session.checkout(None).await }
        });
        started.notified().await;
        assert!(session.is_processing());

        let err = session.checkout(None).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Core(CoreError::InvalidTransition { .. })
        ));

        // Edits during the request do not change what was sent
        session.add_product(&pid("2")).unwrap();
        release.notify_one();

        let outcome = first.await.unwrap().unwrap();
        assert_eq!(outcome.total(), Money::from_cents(10000));
        assert_eq!(gateway.create_count(), 1);
        assert_eq!(lock(&gateway.creates)[0].0.lines.len(), 1);
    }

    #[tokio::test]
    async fn test_create_failure_keeps_cart() {
        let gateway = Arc::new(FakeGateway::default());
        gateway.fail_next_create(validation_error());
        let session = session(gateway.clone());
        session.add_product(&pid("1")).unwrap();

        let err = session.checkout(None).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "Not enough stock.");
        assert_eq!(session.with_cart(Cart::line_count), 1);
        assert!(matches!(
            session.submission_state(),
            SubmissionState::Failed {
                stage: SubmissionStage::Create,
                sale_id: None,
                ..
            }
        ));

        // Fixing the cart and paying again starts a new draft
        let outcome = session.checkout(None).await.unwrap();
        assert_eq!(outcome.sale_id, SaleId::new("102"));
        let creates = lock(&gateway.creates);
        assert_ne!(creates[0].1, creates[1].1);
    }

    #[tokio::test]
    async fn test_finalize_failure_keeps_draft_for_retry() {
        let gateway = Arc::new(FakeGateway::default());
        gateway.fail_next_finalize(ClientError::Server {
            status: 500,
            message: "boom".into(),
        });
        let session = session(gateway.clone());
        session.add_product(&pid("1")).unwrap();

        let err = session.checkout(None).await.unwrap_err();
        assert_eq!(err.draft_sale_id(), Some(&SaleId::new("101")));
        assert_eq!(session.with_cart(Cart::line_count), 1);

        // Paying again must not create a second draft
        let again = session.checkout(None).await.unwrap_err();
        assert!(matches!(
            again,
            ClientError::Core(CoreError::InvalidTransition { .. })
        ));
        assert_eq!(gateway.create_count(), 1);

        let outcome = session
            .retry_finalize(Some(Money::from_cents(10000)))
            .await
            .unwrap();
        assert_eq!(outcome.sale_id, SaleId::new("101"));
        assert_eq!(gateway.create_count(), 1);

        let finalizes = lock(&gateway.finalizes);
        assert_eq!(finalizes.len(), 2);
        assert_ne!(finalizes[0].2, finalizes[1].2);
        assert!(session.with_cart(Cart::is_empty));
    }

    #[tokio::test]
    async fn test_retry_without_failure_is_rejected() {
        let gateway = Arc::new(FakeGateway::default());
        let session = session(gateway.clone());
        let err = session.retry_finalize(None).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Core(CoreError::InvalidTransition { .. })
        ));
        assert_eq!(gateway.finalize_count(), 0);
    }

    #[tokio::test]
    async fn test_finalize_without_submitted_cart_records_failure() {
        let gateway = Arc::new(FakeGateway::default());
        let session = session(gateway.clone());
        *lock(&session.state) = SubmissionState::AwaitingFinalize {
            sale_id: SaleId::new("9"),
        };

        let err = session.retry_finalize(None).await.unwrap_err();
        assert_eq!(err.draft_sale_id(), Some(&SaleId::new("9")));
        assert_eq!(gateway.finalize_count(), 0);
        match session.submission_state() {
            SubmissionState::Failed {
                stage,
                sale_id,
                message,
            } => {
                assert_eq!(stage, SubmissionStage::Finalize);
                assert_eq!(sale_id, Some(SaleId::new("9")));
                assert!(message.contains("No submitted cart for sale 9"));
            }
            other => panic!("unexpected state: {other:?}"),
        }
        assert!(!session.is_processing());
    }

    #[tokio::test]
    async fn test_cancel_after_finalize_failure() {
        let gateway = Arc::new(FakeGateway::default());
        gateway.fail_next_finalize(ClientError::Rejected("Register closed".into()));
        let session = session(gateway.clone());
        session.add_product(&pid("1")).unwrap();
        session.checkout(None).await.unwrap_err();

        assert_eq!(session.cancel().unwrap(), Some(SaleId::new("101")));
        assert_eq!(session.with_cart(Cart::line_count), 1);

        let outcome = session.checkout(None).await.unwrap();
        assert_eq!(outcome.sale_id, SaleId::new("102"));
        assert_eq!(gateway.create_count(), 2);
    }

    #[test]
    fn test_cancel_while_editing_is_rejected() {
        let session = session(Arc::new(FakeGateway::default()));
        assert!(session.cancel().is_err());
    }

    #[tokio::test]
    async fn test_save_draft() {
        let gateway = Arc::new(FakeGateway::default());
        let session = session(gateway.clone());
        session.add_product(&pid("1")).unwrap();
        let before = session.with_cart(|cart| cart.order_number().clone());

        let sale_id = session.save_draft().await.unwrap();

        assert_eq!(sale_id, SaleId::new("101"));
        assert_eq!(gateway.finalize_count(), 0);
        assert!(session.with_cart(Cart::is_empty));
        assert_ne!(session.with_cart(|cart| cart.order_number().clone()), before);
        assert_eq!(session.submission_state(), SubmissionState::Editing);
    }

    #[tokio::test]
    async fn test_receipt_when_auto_open() {
        let gateway = Arc::new(FakeGateway::default());
        let settings = SaleSettings {
            auto_open_receipt: true,
            ..SaleSettings::default()
        };
        let session = session_with(gateway, settings);
        session.add_product(&pid("2")).unwrap();
        session.add_product(&pid("2")).unwrap();

        let outcome = session.checkout(Some(Money::from_cents(1000))).await.unwrap();
        let receipt = outcome.receipt.unwrap();
        assert_eq!(receipt.sale_id, outcome.sale_id);
        assert_eq!(receipt.lines.len(), 1);
        assert_eq!(receipt.payment.change, Money::from_cents(500));
    }

    // =========================================================================
    // Customers & reset
    // =========================================================================

    #[tokio::test]
    async fn test_quick_customer_attaches_to_sale() {
        let gateway = Arc::new(FakeGateway::default());
        let session = session(gateway.clone());

        let err = session.quick_customer("  ", None).await.unwrap_err();
        assert!(matches!(err, ClientError::Core(CoreError::Validation(_))));
        assert!(lock(&gateway.quick_customers).is_empty());

        let customer = session
            .quick_customer(" Rana Haddad ", Some("0933 123 456"))
            .await
            .unwrap();
        assert_eq!(customer.full_name, "Rana Haddad");
        assert_eq!(session.customer(), Some(customer.clone()));

        session.add_product(&pid("2")).unwrap();
        session.checkout(None).await.unwrap();
        assert_eq!(
            lock(&gateway.creates)[0].0.customer_id,
            Some(customer.id.clone())
        );
        assert!(session.customer().is_none());
    }

    #[tokio::test]
    async fn test_new_sale_resets_everything() {
        let gateway = Arc::new(FakeGateway::default());
        gateway.fail_next_create(ClientError::Unauthorized);
        let session = session(gateway);
        session.add_product(&pid("1")).unwrap();
        session.set_customer(Some(Customer {
            id: "5".into(),
            full_name: "Walk In".into(),
            phone: None,
            email: None,
        }));
        session.checkout(None).await.unwrap_err();

        session.new_sale().unwrap();
        assert!(session.with_cart(Cart::is_empty));
        assert!(session.customer().is_none());
        assert_eq!(session.submission_state(), SubmissionState::Editing);
    }
}
