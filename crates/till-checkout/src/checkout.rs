//! # Checkout Orchestrator
//!
//! Runs one checkout attempt from the current cart to a settled (or parked)
//! invoice.
//!
//! ## Attempt State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Idle ──► Validating ──local check / server says no──► Invalid ──┐     │
//! │                │                                                  │     │
//! │                ▼                                                  │     │
//! │           Submitting                                              │     │
//! │          ┌─────┴───────────────────────┐                          │     │
//! │          │ cash / card / transfer      │ VNPay                    │     │
//! │          ▼                             ▼                          │     │
//! │   create (or update + complete   hold (or update-pending)         │     │
//! │   the held bill)                       │                          │     │
//! │          │                        process payment                 │     │
//! │   process payment (non-cash)      ┌────┴─────────┐                │     │
//! │     ┌────┴─────┐                  │ URL          │ no URL / error │     │
//! │     ▼          ▼                  ▼              ▼                │     │
//! │  Settled  PartiallySettled  AwaitingGateway  PartiallySettled     │     │
//! │     │          │             Redirect        (HeldForLater)       │     │
//! │     └──────────┴────────────────┴──────────────┴──────► Idle ◄────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Policy
//! - Nothing leaves the register before local preconditions pass.
//! - A failed create leaves the cart untouched so the operator can retry.
//! - Once an invoice exists it is never rolled back. Payment failures become
//!   warnings on the outcome, and the cart is cleared because the order now
//!   lives on the server.
//! - VNPay failures degrade to "still on hold"; the order is never lost.

use std::sync::Arc;
use std::time::Duration;

use till_api::error::GENERIC_ERROR_MESSAGE;
use till_api::PaymentRequest;
use till_core::validation::validate_checkout;
use till_core::{CardDetails, Cart, CheckoutRequest, EntityId, Invoice, Money, PaymentMethod};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{CheckoutError, CheckoutResult};
use crate::events::PosEvent;
use crate::session::SessionContext;

// =============================================================================
// Phase / Navigation / Outcome
// =============================================================================

/// Where the current attempt is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckoutPhase {
    #[default]
    Idle,
    Validating,
    Invalid,
    Submitting,
    AwaitingGatewayRedirect,
    Settled,
    PartiallySettled,
}

/// Screen the shell should move to after an outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Open the invoice detail once `after` has passed.
    InvoiceDetail { invoice_id: EntityId, after: Duration },
    /// Back to the table map; the order is parked or unpaid.
    TableSelection,
    /// Leave for the payment gateway, replacing history.
    Gateway { url: String },
    /// Session is over.
    Login,
}

/// What the success screen shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutReceipt {
    pub invoice_id: EntityId,
    pub code: String,
    /// Server total the customer was billed.
    pub total: Money,
    pub points_earned: i64,
    pub method: PaymentMethod,
    pub transaction_id: Option<String>,
}

impl CheckoutReceipt {
    fn new(invoice: &Invoice, method: PaymentMethod) -> Self {
        CheckoutReceipt {
            invoice_id: invoice.id,
            code: invoice.code.clone(),
            total: invoice.total,
            points_earned: invoice.points_earned,
            method,
            transaction_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// Invoice created and paid.
    Settled {
        receipt: CheckoutReceipt,
        navigation: Navigation,
    },
    /// Invoice created, payment did not go through.
    PartiallySettled {
        receipt: CheckoutReceipt,
        warning: String,
        navigation: Navigation,
    },
    /// Customer is being sent to the gateway; the invoice stays PENDING until
    /// the gateway calls back.
    Redirect {
        invoice_id: EntityId,
        url: String,
        navigation: Navigation,
    },
    /// Gateway payment could not start; the invoice is parked as PENDING.
    HeldForLater {
        invoice_id: EntityId,
        code: String,
        warning: String,
        navigation: Navigation,
    },
}

impl CheckoutOutcome {
    pub fn navigation(&self) -> &Navigation {
        match self {
            CheckoutOutcome::Settled { navigation, .. }
            | CheckoutOutcome::PartiallySettled { navigation, .. }
            | CheckoutOutcome::Redirect { navigation, .. }
            | CheckoutOutcome::HeldForLater { navigation, .. } => navigation,
        }
    }

    /// Warning to show the operator, if the outcome is not a clean success.
    pub fn warning(&self) -> Option<&str> {
        match self {
            CheckoutOutcome::PartiallySettled { warning, .. }
            | CheckoutOutcome::HeldForLater { warning, .. } => Some(warning),
            _ => None,
        }
    }

    pub fn invoice_id(&self) -> EntityId {
        match self {
            CheckoutOutcome::Settled { receipt, .. }
            | CheckoutOutcome::PartiallySettled { receipt, .. } => receipt.invoice_id,
            CheckoutOutcome::Redirect { invoice_id, .. }
            | CheckoutOutcome::HeldForLater { invoice_id, .. } => *invoice_id,
        }
    }
}

/// Puts the phase back to `Idle` however the attempt ends.
struct PhaseReset<'a>(&'a watch::Sender<CheckoutPhase>);

impl Drop for PhaseReset<'_> {
    fn drop(&mut self) {
        self.0.send_replace(CheckoutPhase::Idle);
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

#[derive(Clone)]
pub struct CheckoutOrchestrator {
    ctx: SessionContext,
    phase: Arc<watch::Sender<CheckoutPhase>>,
}

impl CheckoutOrchestrator {
    pub fn new(ctx: SessionContext) -> Self {
        let (phase, _) = watch::channel(CheckoutPhase::Idle);
        CheckoutOrchestrator {
            ctx,
            phase: Arc::new(phase),
        }
    }

    pub fn phase(&self) -> CheckoutPhase {
        *self.phase.borrow()
    }

    /// Phase transitions, for a progress indicator.
    pub fn subscribe_phase(&self) -> watch::Receiver<CheckoutPhase> {
        self.phase.subscribe()
    }

    /// Whether any submitting operation of this session is running.
    pub fn processing(&self) -> bool {
        self.ctx.gate.is_busy()
    }

    fn set_phase(&self, phase: CheckoutPhase) {
        debug!(?phase, "Checkout phase");
        self.phase.send_replace(phase);
    }

    /// Checks out the current cart with `method`.
    ///
    /// `card` is required for Visa / Mastercard / JCB and ignored otherwise.
    pub async fn checkout(
        &self,
        method: PaymentMethod,
        card: Option<CardDetails>,
    ) -> CheckoutResult<CheckoutOutcome> {
        let _guard = self.ctx.enter()?;
        let _reset = PhaseReset(&self.phase);
        let attempt = Uuid::new_v4();
        self.set_phase(CheckoutPhase::Validating);

        let cart = self.ctx.store.snapshot();
        if let Err(e) = validate_checkout(&cart, &self.ctx.operator, method, card.as_ref()) {
            self.set_phase(CheckoutPhase::Invalid);
            debug!(%attempt, error = %e, "Checkout precondition failed");
            return Err(e.into());
        }

        let card = card.filter(|_| method.is_card());
        let request = cart.to_checkout_request(&self.ctx.operator, method.to_checkout(), attempt);
        debug!(
            %attempt,
            %method,
            items = request.items.len(),
            resuming = ?cart.current_invoice_id(),
            "Validating checkout"
        );

        let verdict = self
            .ctx
            .api
            .validate_checkout(&request)
            .await
            .map_err(|e| self.ctx.api_error(e))?;
        if !verdict.valid {
            self.set_phase(CheckoutPhase::Invalid);
            warn!(%attempt, reasons = ?verdict.errors, "Checkout rejected by server");
            return Err(CheckoutError::Rejected(verdict.errors));
        }

        self.set_phase(CheckoutPhase::Submitting);
        if method.is_redirect_gateway() {
            return self.pay_through_gateway(&cart, method, attempt).await;
        }

        let invoice = self.create_invoice(&cart, &request, method, attempt).await?;
        Ok(self.settle(invoice, method, card).await)
    }

    /// Creates the COMPLETED-track invoice, or finalizes the held bill the
    /// cart is editing after pushing its latest contents.
    async fn create_invoice(
        &self,
        cart: &Cart,
        request: &CheckoutRequest,
        method: PaymentMethod,
        attempt: Uuid,
    ) -> CheckoutResult<Invoice> {
        let api = &self.ctx.api;
        let invoice = match cart.current_invoice_id() {
            None => api.checkout(request).await,
            Some(held_id) => {
                let update = cart.to_hold_request(&self.ctx.operator, None, attempt);
                api.update_pending(held_id, &update)
                    .await
                    .map_err(|e| self.ctx.api_error(e))?;
                api.complete_pending(held_id, method.to_hold_completion())
                    .await
            }
        }
        .map_err(|e| self.ctx.api_error(e))?;

        info!(
            %attempt,
            invoice_id = invoice.id,
            code = %invoice.code,
            total = %invoice.total,
            "Invoice created"
        );
        Ok(invoice)
    }

    /// Charges non-cash methods against the invoice's own total. Never fails:
    /// the invoice exists, so a payment problem is a warning.
    async fn settle(
        &self,
        invoice: Invoice,
        method: PaymentMethod,
        card: Option<CardDetails>,
    ) -> CheckoutOutcome {
        let mut receipt = CheckoutReceipt::new(&invoice, method);

        if method.requires_processing() {
            let request = PaymentRequest {
                invoice_id: invoice.id,
                amount: invoice.total,
                payment_method: method.to_checkout(),
                card_brand: method.card_brand().map(String::from),
                card_details: card,
                return_url: None,
            };

            let failure = match self.ctx.api.process_payment(&request).await {
                Ok(response) if response.success => {
                    receipt.transaction_id = response.transaction_id;
                    if method == PaymentMethod::BankTransfer {
                        if let Some(tx) = receipt.transaction_id.clone() {
                            self.schedule_transfer_verification(tx);
                        }
                    }
                    None
                }
                Ok(response) => Some(
                    response
                        .message
                        .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string()),
                ),
                Err(e) => {
                    self.ctx.note_auth_failure(&e);
                    Some(e.user_message())
                }
            };

            if let Some(reason) = failure {
                self.finish(invoice.id);
                self.set_phase(CheckoutPhase::PartiallySettled);
                warn!(
                    invoice_id = invoice.id,
                    %method,
                    %reason,
                    "Invoice created but payment failed"
                );
                let warning = format!(
                    "Hóa đơn {} đã được tạo nhưng chưa thanh toán: {}",
                    receipt.code, reason
                );
                return CheckoutOutcome::PartiallySettled {
                    receipt,
                    warning,
                    navigation: Navigation::TableSelection,
                };
            }
        }

        self.finish(invoice.id);
        self.set_phase(CheckoutPhase::Settled);
        info!(invoice_id = invoice.id, %method, "Checkout settled");
        CheckoutOutcome::Settled {
            navigation: Navigation::InvoiceDetail {
                invoice_id: receipt.invoice_id,
                after: self.ctx.config.success_redirect_delay(),
            },
            receipt,
        }
    }

    /// VNPay: park the order as PENDING, then ask the gateway for a URL.
    async fn pay_through_gateway(
        &self,
        cart: &Cart,
        method: PaymentMethod,
        attempt: Uuid,
    ) -> CheckoutResult<CheckoutOutcome> {
        let hold = cart.to_hold_request(&self.ctx.operator, None, attempt);
        let invoice = match cart.current_invoice_id() {
            Some(held_id) => self.ctx.api.update_pending(held_id, &hold).await,
            None => self.ctx.api.hold(&hold).await,
        }
        .map_err(|e| self.ctx.api_error(e))?;

        let request = PaymentRequest {
            invoice_id: invoice.id,
            amount: invoice.total,
            payment_method: method.to_checkout(),
            card_brand: None,
            card_details: None,
            return_url: Some(self.ctx.config.return_url()),
        };
        let result = self.ctx.api.process_payment(&request).await;

        // The order is on the server either way
        self.ctx.store.clear();

        let url = match &result {
            Ok(response) if response.success => response.gateway_url().map(String::from),
            _ => None,
        };
        if let Some(url) = url {
            self.set_phase(CheckoutPhase::AwaitingGatewayRedirect);
            info!(%attempt, invoice_id = invoice.id, "Redirecting to payment gateway");
            return Ok(CheckoutOutcome::Redirect {
                invoice_id: invoice.id,
                navigation: Navigation::Gateway { url: url.clone() },
                url,
            });
        }

        let reason = match result {
            Ok(response) => response
                .message
                .unwrap_or_else(|| "Không nhận được liên kết thanh toán".to_string()),
            Err(e) => {
                self.ctx.note_auth_failure(&e);
                e.user_message()
            }
        };
        self.set_phase(CheckoutPhase::PartiallySettled);
        warn!(
            %attempt,
            invoice_id = invoice.id,
            %reason,
            "Gateway payment not started, invoice left pending"
        );
        Ok(CheckoutOutcome::HeldForLater {
            invoice_id: invoice.id,
            warning: format!(
                "Hóa đơn {} đang chờ thanh toán VNPay: {}",
                invoice.code, reason
            ),
            code: invoice.code,
            navigation: Navigation::TableSelection,
        })
    }

    /// Clears the cart and resume link, then tells other views.
    fn finish(&self, invoice_id: EntityId) {
        self.ctx.store.clear();
        self.ctx
            .events
            .publish(PosEvent::InvoiceCreated { invoice_id });
    }

    /// One-shot delayed check of a bank transfer. Detached; the result only
    /// reaches the event bus and the log.
    fn schedule_transfer_verification(&self, transaction_id: String) -> JoinHandle<()> {
        let ctx = self.ctx.clone();
        let delay = ctx.config.transfer_verify_delay();
        debug!(%transaction_id, ?delay, "Scheduling transfer verification");

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match ctx.api.verify_payment(&transaction_id).await {
                Ok(verification) => {
                    info!(
                        %transaction_id,
                        success = verification.success,
                        "Transfer verification finished"
                    );
                    ctx.events.publish(PosEvent::PaymentVerified {
                        transaction_id,
                        success: verification.success,
                    });
                }
                Err(e) => {
                    ctx.note_auth_failure(&e);
                    warn!(%transaction_id, error = %e, "Transfer verification failed");
                }
            }
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fake_context, FakePosApi, PaymentScript, BRANCH_ID};
    use till_api::PosApi;
    use till_core::{CheckoutPaymentMethod, InvoiceStatus, Product, ValidationError};
    use tokio::sync::broadcast::error::TryRecvError;

    fn coffee() -> Product {
        Product::new(1, "Cà phê sữa", Money::from_dong(25_000))
    }

    fn card() -> CardDetails {
        CardDetails {
            card_number: "4111111111111111".to_string(),
            card_holder: "NGUYEN VAN A".to_string(),
            expiry: "12/29".to_string(),
            cvv: "123".to_string(),
        }
    }

    async fn hold_current(api: &FakePosApi, ctx: &SessionContext, note: &str) -> Invoice {
        let request = ctx
            .store
            .snapshot()
            .to_hold_request(&ctx.operator, Some(note.to_string()), Uuid::new_v4());
        let held = api.hold(&request).await.unwrap();
        ctx.store.set_current_invoice_id(Some(held.id));
        held
    }

    fn setup() -> (Arc<FakePosApi>, CheckoutOrchestrator, SessionContext) {
        let api = Arc::new(FakePosApi::default());
        api.add_product(coffee());
        let ctx = fake_context(api.clone());
        ctx.store.add_item(coffee(), 2);
        (api, CheckoutOrchestrator::new(ctx.clone()), ctx)
    }

    #[tokio::test]
    async fn test_cash_checkout_settles() {
        let (api, orchestrator, ctx) = setup();
        let mut events = ctx.events.subscribe();

        let outcome = orchestrator
            .checkout(PaymentMethod::Cash, None)
            .await
            .unwrap();

        let CheckoutOutcome::Settled { receipt, navigation } = &outcome else {
            panic!("expected settled, got {outcome:?}");
        };
        assert_eq!(receipt.total.dong(), 50_000);
        assert_eq!(receipt.method, PaymentMethod::Cash);
        assert_eq!(
            *navigation,
            Navigation::InvoiceDetail {
                invoice_id: receipt.invoice_id,
                after: Duration::from_secs(3),
            }
        );
        assert!(outcome.warning().is_none());

        // Cash never reaches the payment endpoint
        assert_eq!(api.calls(), vec!["validate", "checkout"]);
        assert!(ctx.store.is_empty());
        assert_eq!(
            events.try_recv().unwrap(),
            PosEvent::InvoiceCreated {
                invoice_id: receipt.invoice_id
            }
        );
        assert_eq!(orchestrator.phase(), CheckoutPhase::Idle);
        assert!(!orchestrator.processing());
    }

    #[tokio::test]
    async fn test_card_payment_uses_invoice_total() {
        let (api, orchestrator, _ctx) = setup();

        let outcome = orchestrator
            .checkout(PaymentMethod::Visa, Some(card()))
            .await
            .unwrap();
        assert!(matches!(outcome, CheckoutOutcome::Settled { .. }));

        let payments = api.payment_requests();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount.dong(), 50_000);
        assert_eq!(payments[0].payment_method, CheckoutPaymentMethod::Card);
        assert_eq!(payments[0].card_brand.as_deref(), Some("VISA"));
        assert!(payments[0].card_details.is_some());

        let checkout = &api.checkout_requests()[0];
        assert_eq!(checkout.payment_method, CheckoutPaymentMethod::Card);
        assert_eq!(checkout.branch_id, Some(BRANCH_ID));
    }

    #[tokio::test]
    async fn test_preconditions_stop_before_network() {
        let api = Arc::new(FakePosApi::default());
        let orchestrator = CheckoutOrchestrator::new(fake_context(api.clone()));

        let err = orchestrator
            .checkout(PaymentMethod::Cash, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Precondition(ValidationError::EmptyCart)
        ));
        assert!(api.calls().is_empty());
        assert!(!orchestrator.processing());
        assert_eq!(orchestrator.phase(), CheckoutPhase::Idle);
    }

    #[tokio::test]
    async fn test_card_without_details_is_a_precondition_error() {
        let (api, orchestrator, _ctx) = setup();
        let err = orchestrator
            .checkout(PaymentMethod::Master, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Precondition(_)));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_server_rejection_joins_reasons() {
        let (api, orchestrator, ctx) = setup();
        api.reject(&["Sản phẩm hết hàng", "Khuyến mãi đã hết hạn"]);

        let err = orchestrator
            .checkout(PaymentMethod::Cash, None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Sản phẩm hết hàng; Khuyến mãi đã hết hạn");
        assert_eq!(api.calls(), vec!["validate"]);
        assert!(!ctx.store.is_empty());
        assert!(!orchestrator.processing());
    }

    #[tokio::test]
    async fn test_creation_failure_keeps_cart() {
        let (api, orchestrator, ctx) = setup();
        api.fail_creation(500);
        let revision = ctx.store.revision();

        let err = orchestrator
            .checkout(PaymentMethod::Cash, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Api(_)));
        assert_eq!(err.user_message(), "Không thể tạo hóa đơn");
        assert_eq!(ctx.store.summary().total_quantity, 2);
        assert_eq!(ctx.store.revision(), revision);
        assert!(!orchestrator.processing());
    }

    #[tokio::test]
    async fn test_payment_failure_is_partial_settlement() {
        let (api, orchestrator, ctx) = setup();
        api.script_payment(PaymentScript::Decline("Thẻ bị từ chối".to_string()));

        let outcome = orchestrator
            .checkout(PaymentMethod::Jcb, Some(card()))
            .await
            .unwrap();

        let CheckoutOutcome::PartiallySettled { receipt, .. } = &outcome else {
            panic!("expected partial settlement, got {outcome:?}");
        };
        assert!(outcome.warning().unwrap().contains("Thẻ bị từ chối"));
        assert_eq!(*outcome.navigation(), Navigation::TableSelection);
        // Not rolled back
        assert_eq!(
            api.invoice(receipt.invoice_id).unwrap().status,
            InvoiceStatus::Completed
        );
        assert!(ctx.store.is_empty());
        assert_eq!(orchestrator.phase(), CheckoutPhase::Idle);
    }

    #[tokio::test]
    async fn test_payment_call_error_is_partial_settlement() {
        let (api, orchestrator, _ctx) = setup();
        api.script_payment(PaymentScript::Fail(502));

        let outcome = orchestrator
            .checkout(PaymentMethod::Visa, Some(card()))
            .await
            .unwrap();
        assert!(matches!(outcome, CheckoutOutcome::PartiallySettled { .. }));
        assert!(outcome.warning().unwrap().contains("Cổng thanh toán lỗi"));
    }

    #[tokio::test]
    async fn test_vnpay_redirect() {
        let (api, orchestrator, ctx) = setup();
        api.script_payment(PaymentScript::Gateway(
            "https://sandbox.vnpayment.vn/pay?token=abc".to_string(),
        ));

        let outcome = orchestrator
            .checkout(PaymentMethod::VnPay, None)
            .await
            .unwrap();

        let CheckoutOutcome::Redirect { invoice_id, url, navigation } = &outcome else {
            panic!("expected redirect, got {outcome:?}");
        };
        assert_eq!(url, "https://sandbox.vnpayment.vn/pay?token=abc");
        assert_eq!(*navigation, Navigation::Gateway { url: url.clone() });
        assert_eq!(api.invoice(*invoice_id).unwrap().status, InvoiceStatus::Pending);
        assert_eq!(api.calls(), vec!["validate", "hold", "process-payment"]);

        let payment = &api.payment_requests()[0];
        assert_eq!(payment.payment_method, CheckoutPaymentMethod::VnPay);
        assert_eq!(
            payment.return_url.as_deref(),
            Some("http://localhost:8080/api/payments/vnpay-return")
        );
        assert!(ctx.store.is_empty());
    }

    #[tokio::test]
    async fn test_vnpay_without_url_leaves_invoice_pending() {
        // Scenario E
        let (api, orchestrator, ctx) = setup();
        let mut events = ctx.events.subscribe();

        let outcome = orchestrator
            .checkout(PaymentMethod::VnPay, None)
            .await
            .unwrap();

        let CheckoutOutcome::HeldForLater { invoice_id, .. } = &outcome else {
            panic!("expected held for later, got {outcome:?}");
        };
        assert_eq!(api.invoice(*invoice_id).unwrap().status, InvoiceStatus::Pending);
        assert!(ctx.store.is_empty());
        assert_eq!(*outcome.navigation(), Navigation::TableSelection);
        assert!(outcome.warning().is_some());
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
        assert_eq!(orchestrator.phase(), CheckoutPhase::Idle);
    }

    #[tokio::test]
    async fn test_vnpay_while_resuming_updates_the_held_bill() {
        let (api, orchestrator, ctx) = setup();
        api.script_payment(PaymentScript::Gateway("https://pay.vn/x".to_string()));
        let held = hold_current(&api, &ctx, "bàn 2").await;

        let outcome = orchestrator
            .checkout(PaymentMethod::VnPay, None)
            .await
            .unwrap();
        assert_eq!(outcome.invoice_id(), held.id);
        assert_eq!(api.count("hold"), 1);
        assert_eq!(api.count(&format!("update-pending:{}", held.id)), 1);
    }

    #[tokio::test]
    async fn test_resumed_cart_completes_the_held_bill() {
        let (api, orchestrator, ctx) = setup();
        let held = hold_current(&api, &ctx, "bàn 5").await;
        ctx.store.update_quantity(1, 3);

        let outcome = orchestrator
            .checkout(PaymentMethod::BankTransfer, None)
            .await
            .unwrap();

        assert_eq!(outcome.invoice_id(), held.id);
        assert_eq!(api.count("checkout"), 0);
        assert_eq!(api.count(&format!("complete:{}:CHUYEN_KHOAN", held.id)), 1);
        let invoice = api.invoice(held.id).unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Completed);
        assert_eq!(invoice.total.dong(), 75_000);
        assert_eq!(ctx.store.current_invoice_id(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bank_transfer_is_verified_later() {
        let (api, orchestrator, ctx) = setup();
        api.set_verified(true);
        let mut events = ctx.events.subscribe();

        let outcome = orchestrator
            .checkout(PaymentMethod::BankTransfer, None)
            .await
            .unwrap();
        let invoice_id = outcome.invoice_id();
        assert_eq!(
            events.recv().await.unwrap(),
            PosEvent::InvoiceCreated { invoice_id }
        );
        assert_eq!(api.count("verify:"), 0);

        // Paused clock auto-advances through the 10 s delay
        assert_eq!(
            events.recv().await.unwrap(),
            PosEvent::PaymentVerified {
                transaction_id: format!("TX{invoice_id}"),
                success: true,
            }
        );
        assert_eq!(api.count("verify:"), 1);
    }

    #[tokio::test]
    async fn test_concurrent_operation_is_busy() {
        let (api, orchestrator, ctx) = setup();
        let _held = ctx.gate.try_enter().unwrap();

        let err = orchestrator
            .checkout(PaymentMethod::Cash, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Busy));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_each_attempt_gets_a_fresh_key() {
        let (api, orchestrator, ctx) = setup();
        api.reject(&["Hết hàng"]);
        let _ = orchestrator.checkout(PaymentMethod::Cash, None).await;
        let _ = orchestrator.checkout(PaymentMethod::Cash, None).await;

        let requests = api.checkout_requests();
        assert_eq!(requests.len(), 2);
        assert_ne!(requests[0].idempotency_key, requests[1].idempotency_key);
        assert!(!ctx.store.is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_payment_announces_expiry() {
        let (api, orchestrator, ctx) = setup();
        api.script_payment(PaymentScript::Unauthorized);
        let mut events = ctx.events.subscribe();

        let outcome = orchestrator
            .checkout(PaymentMethod::Visa, Some(card()))
            .await
            .unwrap();
        assert!(matches!(outcome, CheckoutOutcome::PartiallySettled { .. }));
        assert_eq!(events.try_recv().unwrap(), PosEvent::SessionExpired);
    }
}
