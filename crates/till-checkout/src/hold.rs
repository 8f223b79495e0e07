//! # Hold / Resume Workflow
//!
//! Parks an unfinished order on the server as a PENDING invoice and brings it
//! back later.
//!
//! ```text
//!                  hold (note required)
//!   None ─────────────────────────────────► Held(PENDING)
//!                                             │
//!        ┌──────────────┬─────────────────────┼──────────────────┐
//!        ▼              ▼                     ▼                  ▼
//!   AutoSyncing      Resumed              Completed          Cancelled
//!   (autosync.rs,    cart replaced from   complete?phuong…   confirm, then
//!    update_held)    server, link set     cart cleared       cart cleared
//! ```
//!
//! The cart's `current_invoice_id` is the link: set by hold and resume,
//! cleared by complete, cancel and checkout. A cart holds at most one bill.

use till_api::ApiResult;
use till_core::validation::{validate_hold, validate_hold_note};
use till_core::{Cart, EntityId, Invoice, PaymentMethod};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{CheckoutError, CheckoutResult};
use crate::events::PosEvent;
use crate::prompt::Prompter;
use crate::session::SessionContext;

const HOLD_NOTE_PROMPT: &str = "Ghi chú cho hóa đơn tạm giữ (ví dụ: Bàn 5, khách quay lại lúc 8h):";

/// Pushes the cart's current contents to its held invoice.
///
/// Shared by the manual update and the background sync; neither carries a
/// version token, so the later write wins.
pub(crate) async fn push_held(ctx: &SessionContext, invoice_id: EntityId) -> ApiResult<Invoice> {
    let request = ctx
        .store
        .with_cart(|cart| cart.to_hold_request(&ctx.operator, None, Uuid::new_v4()));
    debug!(invoice_id, items = request.items.len(), "Updating held invoice");
    ctx.api.update_pending(invoice_id, &request).await
}

#[derive(Clone)]
pub struct HoldWorkflow {
    ctx: SessionContext,
}

impl HoldWorkflow {
    pub fn new(ctx: SessionContext) -> Self {
        HoldWorkflow { ctx }
    }

    fn held_invoice_id(&self) -> CheckoutResult<EntityId> {
        self.ctx
            .store
            .current_invoice_id()
            .ok_or(CheckoutError::NoHeldInvoice)
    }

    /// Parks the cart as a PENDING invoice.
    ///
    /// Returns `Ok(None)` when the operator dismisses the note dialog.
    pub async fn hold(&self, prompter: &dyn Prompter) -> CheckoutResult<Option<Invoice>> {
        let _guard = self.ctx.enter()?;
        self.ctx
            .store
            .with_cart(|cart| validate_hold(cart, &self.ctx.operator))?;

        let Some(raw_note) = prompter.prompt_text(HOLD_NOTE_PROMPT).await else {
            debug!("Hold dismissed");
            return Ok(None);
        };
        let note = validate_hold_note(&raw_note)?;

        // The cart may have been edited while the dialog was open
        let cart = self.ctx.store.snapshot();
        validate_hold(&cart, &self.ctx.operator)?;
        let request = cart.to_hold_request(&self.ctx.operator, Some(note), Uuid::new_v4());
        let invoice = self
            .ctx
            .api
            .hold(&request)
            .await
            .map_err(|e| self.ctx.api_error(e))?;

        self.ctx.store.set_current_invoice_id(Some(invoice.id));
        info!(invoice_id = invoice.id, code = %invoice.code, "Bill held");
        Ok(Some(invoice))
    }

    /// Pushes the cart to its held invoice now instead of waiting for the
    /// background sync.
    pub async fn update_held(&self) -> CheckoutResult<Invoice> {
        let _guard = self.ctx.enter()?;
        let invoice_id = self.held_invoice_id()?;
        push_held(&self.ctx, invoice_id)
            .await
            .map_err(|e| self.ctx.api_error(e))
    }

    /// Loads a held invoice into the cart, replacing what is there.
    pub async fn resume(&self, invoice_id: EntityId) -> CheckoutResult<Invoice> {
        let invoice = self
            .ctx
            .api
            .resume(invoice_id)
            .await
            .map_err(|e| self.ctx.api_error(e))?;

        let cart = Cart::from_invoice(&invoice, self.ctx.store.tax_rate())?;
        let lines = cart.item_count();
        self.ctx.store.replace(cart);

        info!(invoice_id, code = %invoice.code, lines, "Held bill resumed");
        Ok(invoice)
    }

    /// Finalizes the held invoice with `method`.
    ///
    /// The latest cart contents are pushed first so the completed invoice
    /// matches what the operator sees.
    pub async fn complete(&self, method: PaymentMethod) -> CheckoutResult<Invoice> {
        let _guard = self.ctx.enter()?;
        let invoice_id = self.held_invoice_id()?;

        if !self.ctx.store.is_empty() {
            push_held(&self.ctx, invoice_id)
                .await
                .map_err(|e| self.ctx.api_error(e))?;
        }

        let hold_method = method.to_hold_completion();
        let invoice = self
            .ctx
            .api
            .complete_pending(invoice_id, hold_method)
            .await
            .map_err(|e| self.ctx.api_error(e))?;

        self.ctx.store.clear();
        self.ctx
            .events
            .publish(PosEvent::InvoiceCreated { invoice_id });
        info!(
            invoice_id,
            method = hold_method.as_code(),
            total = %invoice.total,
            "Held bill completed"
        );
        Ok(invoice)
    }

    /// Discards the held invoice after confirmation.
    ///
    /// Returns `Ok(false)` when the operator declines.
    pub async fn cancel(&self, prompter: &dyn Prompter) -> CheckoutResult<bool> {
        let _guard = self.ctx.enter()?;
        let invoice_id = self.held_invoice_id()?;

        let question = format!("Hủy hóa đơn tạm giữ #{invoice_id}? Thao tác này không thể hoàn tác.");
        if !prompter.confirm(&question).await {
            debug!(invoice_id, "Cancel declined");
            return Ok(false);
        }

        self.ctx
            .api
            .cancel_pending(invoice_id)
            .await
            .map_err(|e| self.ctx.api_error(e))?;

        self.ctx.store.clear();
        info!(invoice_id, "Held bill cancelled");
        Ok(true)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ChangeOrigin;
    use crate::test_support::{fake_context, FakePosApi, ScriptedPrompter};
    use std::sync::Arc;
    use till_core::{
        CoreError, Customer, DiscountType, InvoiceStatus, Money, OrderType, Product,
        ValidationError,
    };

    fn coffee() -> Product {
        Product::new(1, "Cà phê sữa", Money::from_dong(25_000))
    }

    fn tea() -> Product {
        Product::new(2, "Trà đào", Money::from_dong(35_000))
    }

    fn customer() -> Customer {
        Customer {
            id: 9,
            name: "Trần Thị B".to_string(),
            phone: Some("0901234567".to_string()),
            points: 120,
        }
    }

    fn setup() -> (Arc<FakePosApi>, HoldWorkflow, SessionContext) {
        let api = Arc::new(FakePosApi::default());
        api.add_product(coffee());
        api.add_product(tea());
        api.add_customer(customer());
        api.set_promotions(vec![FakePosApi::promotion(
            5,
            "GIAM10",
            DiscountType::Percentage,
            10.0,
        )]);
        let ctx = fake_context(api.clone());
        (api, HoldWorkflow::new(ctx.clone()), ctx)
    }

    async fn hold_one(workflow: &HoldWorkflow, ctx: &SessionContext) -> Invoice {
        ctx.store.add_item(coffee(), 1);
        workflow
            .hold(&ScriptedPrompter::answering(Some("Bàn 1")))
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_hold_then_resume_round_trips() {
        // Scenario D
        let (api, workflow, ctx) = setup();
        ctx.store.add_item(coffee(), 2);
        ctx.store.add_item(tea(), 1);
        ctx.store.set_note(2, Some("ít đá"));
        ctx.store.set_customer(Some(customer()));
        ctx.store
            .set_promotion(Some(FakePosApi::promotion(5, "GIAM10", DiscountType::Percentage, 10.0)));
        ctx.store.set_selected_table(Some("B04".to_string()));
        ctx.store.set_order_type(OrderType::Takeaway);
        let held_cart = ctx.store.snapshot();

        let prompter = ScriptedPrompter::answering(Some("  Bàn 4, chờ khách  "));
        let invoice = workflow.hold(&prompter).await.unwrap().unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Pending);
        assert_eq!(invoice.note.as_deref(), Some("Bàn 4, chờ khách"));
        assert_eq!(ctx.store.current_invoice_id(), Some(invoice.id));
        assert_eq!(prompter.asked().len(), 1);

        // Operator serves someone else, then comes back
        ctx.store.clear();
        let mut changes = ctx.store.subscribe();
        workflow.resume(invoice.id).await.unwrap();
        assert_eq!(changes.borrow_and_update().origin, ChangeOrigin::Server);

        let resumed = ctx.store.snapshot();
        assert_eq!(resumed.items(), held_cart.items());
        assert_eq!(resumed.customer(), held_cart.customer());
        assert_eq!(resumed.promotion(), held_cart.promotion());
        assert_eq!(resumed.discount(), held_cart.discount());
        assert_eq!(resumed.selected_table(), Some("B04"));
        assert_eq!(resumed.order_type(), OrderType::Takeaway);
        assert_eq!(resumed.current_invoice_id(), Some(invoice.id));
        assert_eq!(api.count("resume:"), 1);
    }

    /// Answers the note dialog after the operator added one more item.
    struct EditingPrompter {
        store: crate::store::CartStore,
    }

    #[async_trait::async_trait]
    impl Prompter for EditingPrompter {
        async fn confirm(&self, _message: &str) -> bool {
            false
        }

        async fn prompt_text(&self, _message: &str) -> Option<String> {
            self.store.add_item(tea(), 1);
            Some("Bàn 2".to_string())
        }
    }

    #[tokio::test]
    async fn test_hold_sends_cart_as_it_is_after_the_note() {
        let (api, workflow, ctx) = setup();
        ctx.store.add_item(coffee(), 1);

        let prompter = EditingPrompter {
            store: ctx.store.clone(),
        };
        workflow.hold(&prompter).await.unwrap().unwrap();

        let requests = api.hold_requests();
        assert_eq!(requests.len(), 1);
        let products: Vec<_> = requests[0].items.iter().map(|i| i.product_id).collect();
        assert_eq!(products, vec![coffee().id, tea().id]);
    }

    #[tokio::test]
    async fn test_hold_dismissed_sends_nothing() {
        let (api, workflow, ctx) = setup();
        ctx.store.add_item(coffee(), 1);

        let result = workflow
            .hold(&ScriptedPrompter::answering(None))
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(api.calls().is_empty());
        assert_eq!(ctx.store.current_invoice_id(), None);
        assert!(!ctx.gate.is_busy());
    }

    #[tokio::test]
    async fn test_hold_requires_a_note() {
        let (api, workflow, ctx) = setup();
        ctx.store.add_item(coffee(), 1);

        let err = workflow
            .hold(&ScriptedPrompter::answering(Some("   ")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Precondition(ValidationError::Required { .. })
        ));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_second_hold_is_refused_before_prompting() {
        let (api, workflow, ctx) = setup();
        let invoice = hold_one(&workflow, &ctx).await;

        let prompter = ScriptedPrompter::answering(Some("lần hai"));
        let err = workflow.hold(&prompter).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Precondition(ValidationError::AlreadyHeld(id)) if id == invoice.id
        ));
        assert!(prompter.asked().is_empty());
        assert_eq!(api.count("hold"), 1);
    }

    #[tokio::test]
    async fn test_empty_cart_cannot_be_held() {
        let (_api, workflow, _ctx) = setup();
        let err = workflow
            .hold(&ScriptedPrompter::answering(Some("x")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Precondition(ValidationError::EmptyCart)
        ));
    }

    #[tokio::test]
    async fn test_update_held_pushes_current_cart() {
        let (api, workflow, ctx) = setup();
        let invoice = hold_one(&workflow, &ctx).await;
        ctx.store.add_item(tea(), 2);

        let updated = workflow.update_held().await.unwrap();
        assert_eq!(updated.id, invoice.id);
        assert_eq!(updated.subtotal.dong(), 95_000);
        // Note from the original hold survives updates without one
        assert_eq!(updated.note.as_deref(), Some("Bàn 1"));
        assert!(api.hold_requests().last().unwrap().note.is_none());
    }

    #[tokio::test]
    async fn test_update_without_held_bill() {
        let (_api, workflow, ctx) = setup();
        ctx.store.add_item(coffee(), 1);
        let err = workflow.update_held().await.unwrap_err();
        assert!(matches!(err, CheckoutError::NoHeldInvoice));
    }

    #[tokio::test]
    async fn test_complete_clears_cart_and_announces() {
        let (api, workflow, ctx) = setup();
        let invoice = hold_one(&workflow, &ctx).await;
        let mut events = ctx.events.subscribe();

        let completed = workflow.complete(PaymentMethod::Master).await.unwrap();
        assert_eq!(completed.status, InvoiceStatus::Completed);
        assert_eq!(api.count(&format!("complete:{}:THE", invoice.id)), 1);
        assert!(ctx.store.is_empty());
        assert_eq!(ctx.store.current_invoice_id(), None);
        assert_eq!(
            events.try_recv().unwrap(),
            PosEvent::InvoiceCreated {
                invoice_id: invoice.id
            }
        );
    }

    #[tokio::test]
    async fn test_complete_without_held_bill() {
        let (api, workflow, _ctx) = setup();
        let err = workflow.complete(PaymentMethod::Cash).await.unwrap_err();
        assert!(matches!(err, CheckoutError::NoHeldInvoice));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_requires_confirmation() {
        let (api, workflow, ctx) = setup();
        let invoice = hold_one(&workflow, &ctx).await;

        let declined = workflow
            .cancel(&ScriptedPrompter::confirming(false))
            .await
            .unwrap();
        assert!(!declined);
        assert_eq!(api.count("cancel:"), 0);
        assert_eq!(ctx.store.current_invoice_id(), Some(invoice.id));

        let prompter = ScriptedPrompter::confirming(true);
        assert!(workflow.cancel(&prompter).await.unwrap());
        assert!(prompter.asked()[0].contains(&invoice.id.to_string()));
        assert_eq!(api.invoice(invoice.id).unwrap().status, InvoiceStatus::Cancelled);
        assert!(ctx.store.is_empty());
        assert_eq!(ctx.store.current_invoice_id(), None);
    }

    #[tokio::test]
    async fn test_resume_refuses_settled_invoice() {
        let (api, workflow, ctx) = setup();
        let invoice = hold_one(&workflow, &ctx).await;
        workflow.complete(PaymentMethod::Cash).await.unwrap();
        ctx.store.add_item(tea(), 1);

        let err = workflow.resume(invoice.id).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Core(CoreError::InvoiceNotPending { .. })
        ));
        // Cart untouched
        assert_eq!(ctx.store.with_cart(|c| c.find_item(2).map(|i| i.quantity)), Some(1));
        assert_eq!(api.count("resume:"), 1);
    }

    #[tokio::test]
    async fn test_hold_failure_leaves_cart_unlinked() {
        let (api, workflow, ctx) = setup();
        api.fail_creation(503);
        ctx.store.add_item(coffee(), 1);

        let err = workflow
            .hold(&ScriptedPrompter::answering(Some("Bàn 2")))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Api(_)));
        assert_eq!(ctx.store.current_invoice_id(), None);
        assert!(!ctx.store.is_empty());
    }
}
