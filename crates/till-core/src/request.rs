//! # Request Projections
//!
//! What the cart looks like on the wire when it is validated, checked out or
//! held. Prices are captured at build time; the server re-prices and its
//! invoice is authoritative.
//!
//! ```text
//! Cart ──to_checkout_request()──► CheckoutRequest ─► /pos/checkout/validate
//!   │                                              └► /pos/checkout
//!   └───to_hold_request()───────► HoldBillRequest ─► /pos/checkout/hold
//!                                                  └► /pos/invoices/{id}/update-pending
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cart::{Cart, CartItem};
use crate::money::Money;
use crate::payment::CheckoutPaymentMethod;
use crate::types::{EntityId, OrderType};

// =============================================================================
// Operator
// =============================================================================

/// The logged-in employee ringing up the sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operator {
    pub employee_id: EntityId,
    /// Employees without a branch cannot sell.
    pub branch_id: Option<EntityId>,
}

// =============================================================================
// Line Projection
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    pub product_id: EntityId,
    pub quantity: i64,
    pub unit_price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl From<&CartItem> for CheckoutItem {
    fn from(item: &CartItem) -> Self {
        CheckoutItem {
            product_id: item.product.id,
            quantity: item.quantity,
            unit_price: item.product.price,
            note: item.note.clone(),
        }
    }
}

// =============================================================================
// Checkout Request
// =============================================================================

/// Body of `POST /pos/checkout/validate` and `POST /pos/checkout`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItem>,
    pub customer_id: Option<EntityId>,
    pub promotion_id: Option<EntityId>,
    pub promotion_code: Option<String>,
    pub discount: Money,
    pub table: Option<String>,
    pub order_type: OrderType,
    pub employee_id: EntityId,
    pub branch_id: Option<EntityId>,
    pub payment_method: CheckoutPaymentMethod,
    /// One key per checkout attempt; the server drops duplicates.
    pub idempotency_key: Uuid,
}

// =============================================================================
// Hold Request
// =============================================================================

/// Body of `POST /pos/checkout/hold` and `PUT /pos/invoices/{id}/update-pending`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldBillRequest {
    pub items: Vec<CheckoutItem>,
    pub customer_id: Option<EntityId>,
    pub promotion_id: Option<EntityId>,
    pub promotion_code: Option<String>,
    pub discount: Money,
    pub table: Option<String>,
    pub order_type: OrderType,
    pub employee_id: EntityId,
    pub branch_id: Option<EntityId>,
    /// Operator note; required on hold, omitted by background updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub idempotency_key: Uuid,
}

impl Cart {
    fn checkout_items(&self) -> Vec<CheckoutItem> {
        self.items().iter().map(CheckoutItem::from).collect()
    }

    /// Snapshot for checkout. Call once per attempt and reuse the result for
    /// validate and create so both see the same prices and key.
    pub fn to_checkout_request(
        &self,
        operator: &Operator,
        payment_method: CheckoutPaymentMethod,
        idempotency_key: Uuid,
    ) -> CheckoutRequest {
        CheckoutRequest {
            items: self.checkout_items(),
            customer_id: self.customer().map(|c| c.id),
            promotion_id: self.promotion().map(|p| p.id),
            promotion_code: self.promotion().map(|p| p.code.clone()),
            discount: self.discount(),
            table: self.selected_table().map(String::from),
            order_type: self.order_type(),
            employee_id: operator.employee_id,
            branch_id: operator.branch_id,
            payment_method,
            idempotency_key,
        }
    }

    /// Snapshot for holding or updating a held bill.
    pub fn to_hold_request(
        &self,
        operator: &Operator,
        note: Option<String>,
        idempotency_key: Uuid,
    ) -> HoldBillRequest {
        HoldBillRequest {
            items: self.checkout_items(),
            customer_id: self.customer().map(|c| c.id),
            promotion_id: self.promotion().map(|p| p.id),
            promotion_code: self.promotion().map(|p| p.code.clone()),
            discount: self.discount(),
            table: self.selected_table().map(String::from),
            order_type: self.order_type(),
            employee_id: operator.employee_id,
            branch_id: operator.branch_id,
            note,
            idempotency_key,
        }
    }
}

// =============================================================================
// Card Details
// =============================================================================

/// Card fields collected for Visa / Mastercard / JCB payments.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDetails {
    pub card_number: String,
    pub card_holder: String,
    /// `MM/YY`.
    pub expiry: String,
    pub cvv: String,
}

impl CardDetails {
    /// Last four digits, for receipts and logs.
    pub fn last_four(&self) -> &str {
        let digits = self.card_number.trim();
        let start = digits.len().saturating_sub(4);
        digits.get(start..).unwrap_or("")
    }
}

// Card data never reaches logs in full.
impl std::fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardDetails")
            .field("card_number", &format_args!("****{}", self.last_four()))
            .field("card_holder", &self.card_holder)
            .field("expiry", &self.expiry)
            .field("cvv", &"***")
            .finish()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
