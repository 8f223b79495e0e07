//! In-memory backend and scripted dialogs for workflow tests.
//!
//! `FakePosApi` keeps invoices in a map the way the server would: holds are
//! PENDING, checkouts are COMPLETED, and resume hands back what was stored,
//! joined with the catalog, customer and promotion tables it was seeded with.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use till_api::{
    ApiError, ApiResult, PaymentRequest, PaymentResponse, PaymentVerification, PosApi,
    ValidationResponse,
};
use till_core::{
    CheckoutItem, CheckoutRequest, Customer, DiscountType, EntityId, HoldBillRequest,
    HoldPaymentMethod, Invoice, InvoiceLine, InvoiceStatus, Money, OrderType, Product, Promotion,
    PromotionStatus,
};

use crate::config::TillConfig;
use crate::prompt::Prompter;
use crate::session::{Session, SessionContext};

pub(crate) const EMPLOYEE_ID: EntityId = 7;
pub(crate) const BRANCH_ID: EntityId = 3;

/// What `process_payment` answers.
#[derive(Debug, Clone)]
pub(crate) enum PaymentScript {
    /// Success with a transaction id and no gateway URL.
    Approve,
    /// Success with a gateway URL under `paymentUrl`.
    Gateway(String),
    /// `success: false` with a message.
    Decline(String),
    /// Transport-level failure with this HTTP status.
    Fail(u16),
    /// 401.
    Unauthorized,
}

struct FakeState {
    next_id: EntityId,
    invoices: HashMap<EntityId, Invoice>,
    catalog: HashMap<EntityId, Product>,
    customers: HashMap<EntityId, Customer>,
    promotions: Vec<Promotion>,
    validation: ValidationResponse,
    creation_failure: Option<u16>,
    update_failure: Option<u16>,
    payment: PaymentScript,
    verified: bool,
    calls: Vec<String>,
    hold_requests: Vec<HoldBillRequest>,
    checkout_requests: Vec<CheckoutRequest>,
    payment_requests: Vec<PaymentRequest>,
}

pub(crate) struct FakePosApi {
    state: Mutex<FakeState>,
}

impl Default for FakePosApi {
    fn default() -> Self {
        FakePosApi {
            state: Mutex::new(FakeState {
                next_id: 100,
                invoices: HashMap::new(),
                catalog: HashMap::new(),
                customers: HashMap::new(),
                promotions: Vec::new(),
                validation: ValidationResponse::accepted(),
                creation_failure: None,
                update_failure: None,
                payment: PaymentScript::Approve,
                verified: true,
                calls: Vec::new(),
                hold_requests: Vec::new(),
                checkout_requests: Vec::new(),
                payment_requests: Vec::new(),
            }),
        }
    }
}

fn server_error(status: u16, message: &str) -> ApiError {
    ApiError::Server {
        status,
        message: Some(message.to_string()),
    }
}

impl FakePosApi {
    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub(crate) fn promotion(
        id: EntityId,
        code: &str,
        discount_type: DiscountType,
        value: f64,
    ) -> Promotion {
        Promotion {
            id,
            code: code.to_string(),
            name: format!("Khuyến mãi {code}"),
            discount_type,
            discount_value: value,
            minimum_purchase: None,
            max_discount: None,
            usage_limit: None,
            usage_limit_per_scope: None,
            used_count: 0,
            end_date: None,
            status: PromotionStatus::Active,
        }
    }

    // -------------------------------------------------------------------------
    // Seeding
    // -------------------------------------------------------------------------

    pub(crate) fn add_product(&self, product: Product) {
        self.state().catalog.insert(product.id, product);
    }

    pub(crate) fn add_customer(&self, customer: Customer) {
        self.state().customers.insert(customer.id, customer);
    }

    pub(crate) fn set_promotions(&self, promotions: Vec<Promotion>) {
        self.state().promotions = promotions;
    }

    pub(crate) fn reject(&self, reasons: &[&str]) {
        self.state().validation =
            ValidationResponse::rejected(reasons.iter().map(|r| r.to_string()).collect());
    }

    pub(crate) fn fail_creation(&self, status: u16) {
        self.state().creation_failure = Some(status);
    }

    pub(crate) fn fail_updates(&self, status: u16) {
        self.state().update_failure = Some(status);
    }

    pub(crate) fn script_payment(&self, script: PaymentScript) {
        self.state().payment = script;
    }

    pub(crate) fn set_verified(&self, verified: bool) {
        self.state().verified = verified;
    }

    /// Puts an invoice straight into the server's table.
    pub(crate) fn insert_invoice(&self, invoice: Invoice) {
        self.state().invoices.insert(invoice.id, invoice);
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    pub(crate) fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub(crate) fn count(&self, prefix: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub(crate) fn invoice(&self, id: EntityId) -> Option<Invoice> {
        self.state().invoices.get(&id).cloned()
    }

    pub(crate) fn hold_requests(&self) -> Vec<HoldBillRequest> {
        self.state().hold_requests.clone()
    }

    pub(crate) fn checkout_requests(&self) -> Vec<CheckoutRequest> {
        self.state().checkout_requests.clone()
    }

    pub(crate) fn payment_requests(&self) -> Vec<PaymentRequest> {
        self.state().payment_requests.clone()
    }
}

struct InvoiceDraft<'a> {
    items: &'a [CheckoutItem],
    customer_id: Option<EntityId>,
    promotion_id: Option<EntityId>,
    discount: Money,
    table: Option<String>,
    order_type: OrderType,
    note: Option<String>,
}

impl<'a> From<&'a HoldBillRequest> for InvoiceDraft<'a> {
    fn from(req: &'a HoldBillRequest) -> Self {
        InvoiceDraft {
            items: &req.items,
            customer_id: req.customer_id,
            promotion_id: req.promotion_id,
            discount: req.discount,
            table: req.table.clone(),
            order_type: req.order_type,
            note: req.note.clone(),
        }
    }
}

impl<'a> From<&'a CheckoutRequest> for InvoiceDraft<'a> {
    fn from(req: &'a CheckoutRequest) -> Self {
        InvoiceDraft {
            items: &req.items,
            customer_id: req.customer_id,
            promotion_id: req.promotion_id,
            discount: req.discount,
            table: req.table.clone(),
            order_type: req.order_type,
            note: None,
        }
    }
}

impl FakeState {
    fn record(&mut self, call: impl Into<String>) {
        self.calls.push(call.into());
    }

    fn build(&self, id: EntityId, status: InvoiceStatus, draft: InvoiceDraft<'_>) -> Invoice {
        let lines: Vec<InvoiceLine> = draft
            .items
            .iter()
            .map(|item| {
                let product = self.catalog.get(&item.product_id);
                InvoiceLine {
                    product_id: item.product_id,
                    product_name: product.map(|p| p.name.clone()).unwrap_or_default(),
                    unit_price: item.unit_price,
                    quantity: item.quantity,
                    note: item.note.clone(),
                    image_url: product.and_then(|p| p.image_url.clone()),
                }
            })
            .collect();

        let subtotal = lines
            .iter()
            .fold(Money::zero(), |acc, l| acc + l.unit_price.multiply_quantity(l.quantity));
        let total = subtotal.saturating_sub(draft.discount);

        Invoice {
            id,
            code: format!("HD{id:06}"),
            status,
            subtotal,
            discount: draft.discount,
            total,
            points_earned: total.dong() / 10_000,
            lines,
            customer: draft
                .customer_id
                .and_then(|cid| self.customers.get(&cid).cloned()),
            promotion: draft
                .promotion_id
                .and_then(|pid| self.promotions.iter().find(|p| p.id == pid).cloned()),
            table: draft.table,
            order_type: Some(draft.order_type),
            note: draft.note,
        }
    }

    fn create(&mut self, status: InvoiceStatus, draft: InvoiceDraft<'_>) -> ApiResult<Invoice> {
        if let Some(status) = self.creation_failure {
            return Err(server_error(status, "Không thể tạo hóa đơn"));
        }
        self.next_id += 1;
        let invoice = self.build(self.next_id, status, draft);
        self.invoices.insert(invoice.id, invoice.clone());
        Ok(invoice)
    }

    fn pending_mut(&mut self, id: EntityId) -> ApiResult<&mut Invoice> {
        match self.invoices.get_mut(&id) {
            Some(invoice) if invoice.is_pending() => Ok(invoice),
            Some(_) => Err(server_error(409, "Hóa đơn không ở trạng thái chờ")),
            None => Err(server_error(404, "Không tìm thấy hóa đơn")),
        }
    }
}

#[async_trait]
impl PosApi for FakePosApi {
    async fn validate_checkout(&self, request: &CheckoutRequest) -> ApiResult<ValidationResponse> {
        let mut state = self.state();
        state.record("validate");
        state.checkout_requests.push(request.clone());
        Ok(state.validation.clone())
    }

    async fn checkout(&self, request: &CheckoutRequest) -> ApiResult<Invoice> {
        let mut state = self.state();
        state.record("checkout");
        state.create(InvoiceStatus::Completed, request.into())
    }

    async fn hold(&self, request: &HoldBillRequest) -> ApiResult<Invoice> {
        let mut state = self.state();
        state.record("hold");
        state.hold_requests.push(request.clone());
        state.create(InvoiceStatus::Pending, request.into())
    }

    async fn update_pending(
        &self,
        invoice_id: EntityId,
        request: &HoldBillRequest,
    ) -> ApiResult<Invoice> {
        let mut state = self.state();
        state.record(format!("update-pending:{invoice_id}"));
        state.hold_requests.push(request.clone());
        if let Some(status) = state.update_failure {
            return Err(server_error(status, "Cập nhật thất bại"));
        }

        let previous_note = state.pending_mut(invoice_id)?.note.clone();
        let mut updated = state.build(invoice_id, InvoiceStatus::Pending, request.into());
        updated.note = updated.note.or(previous_note);
        state.invoices.insert(invoice_id, updated.clone());
        Ok(updated)
    }

    async fn resume(&self, invoice_id: EntityId) -> ApiResult<Invoice> {
        let mut state = self.state();
        state.record(format!("resume:{invoice_id}"));
        state
            .invoices
            .get(&invoice_id)
            .cloned()
            .ok_or_else(|| server_error(404, "Không tìm thấy hóa đơn"))
    }

    async fn complete_pending(
        &self,
        invoice_id: EntityId,
        method: HoldPaymentMethod,
    ) -> ApiResult<Invoice> {
        let mut state = self.state();
        state.record(format!("complete:{invoice_id}:{}", method.as_code()));
        let invoice = state.pending_mut(invoice_id)?;
        invoice.status = InvoiceStatus::Completed;
        Ok(invoice.clone())
    }

    async fn cancel_pending(&self, invoice_id: EntityId) -> ApiResult<()> {
        let mut state = self.state();
        state.record(format!("cancel:{invoice_id}"));
        state.pending_mut(invoice_id)?.status = InvoiceStatus::Cancelled;
        Ok(())
    }

    async fn process_payment(&self, request: &PaymentRequest) -> ApiResult<PaymentResponse> {
        let mut state = self.state();
        state.record("process-payment");
        state.payment_requests.push(request.clone());

        let transaction_id = Some(format!("TX{}", request.invoice_id));
        match state.payment.clone() {
            PaymentScript::Approve => Ok(PaymentResponse {
                transaction_id,
                ..PaymentResponse::default()
            }),
            PaymentScript::Gateway(url) => Ok(PaymentResponse {
                transaction_id,
                payment_url: Some(url),
                ..PaymentResponse::default()
            }),
            PaymentScript::Decline(message) => Ok(PaymentResponse {
                success: false,
                message: Some(message),
                ..PaymentResponse::default()
            }),
            PaymentScript::Fail(status) => Err(server_error(status, "Cổng thanh toán lỗi")),
            PaymentScript::Unauthorized => Err(ApiError::Unauthorized),
        }
    }

    async fn verify_payment(&self, transaction_id: &str) -> ApiResult<PaymentVerification> {
        let mut state = self.state();
        state.record(format!("verify:{transaction_id}"));
        Ok(PaymentVerification {
            transaction_id: Some(transaction_id.to_string()),
            success: state.verified,
            status: None,
            message: None,
        })
    }

    async fn active_promotions(&self, branch_id: EntityId) -> ApiResult<Vec<Promotion>> {
        let mut state = self.state();
        state.record(format!("promotions:{branch_id}"));
        Ok(state.promotions.clone())
    }
}

// =============================================================================
// Session builders
// =============================================================================

pub(crate) fn test_config() -> TillConfig {
    let mut config = TillConfig::default();
    config.operator.employee_id = EMPLOYEE_ID;
    config.operator.branch_id = Some(BRANCH_ID);
    config
}

pub(crate) fn fake_context(api: Arc<FakePosApi>) -> SessionContext {
    SessionContext::new(api, Arc::new(test_config()))
}

pub(crate) fn fake_session(api: Arc<FakePosApi>) -> Session {
    Session::new(api, Arc::new(test_config()))
}

// =============================================================================
// Scripted dialogs
// =============================================================================

/// Answers dialogs from a script; an exhausted script dismisses.
#[derive(Default)]
pub(crate) struct ScriptedPrompter {
    confirms: Mutex<VecDeque<bool>>,
    texts: Mutex<VecDeque<Option<String>>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub(crate) fn answering(text: Option<&str>) -> Self {
        let prompter = Self::default();
        prompter
            .texts
            .lock()
            .unwrap()
            .push_back(text.map(String::from));
        prompter
    }

    pub(crate) fn confirming(answer: bool) -> Self {
        let prompter = Self::default();
        prompter.confirms.lock().unwrap().push_back(answer);
        prompter
    }

    pub(crate) fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn confirm(&self, message: &str) -> bool {
        self.asked.lock().unwrap().push(message.to_string());
        self.confirms.lock().unwrap().pop_front().unwrap_or(false)
    }

    async fn prompt_text(&self, message: &str) -> Option<String> {
        self.asked.lock().unwrap().push(message.to_string());
        self.texts.lock().unwrap().pop_front().flatten()
    }
}
