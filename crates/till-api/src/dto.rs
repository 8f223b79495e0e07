//! Wire types that only exist at the HTTP boundary.
//!
//! Domain payloads (invoices, promotions, checkout/hold requests) live in
//! `till-core`; these are the validation and payment exchanges around them.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use till_core::{CardDetails, CheckoutPaymentMethod, EntityId, Money};

use crate::envelope::error_list;

// =============================================================================
// Validation
// =============================================================================

/// Answer of `POST /pos/checkout/validate`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    #[serde(alias = "isValid", alias = "hopLe")]
    pub valid: bool,

    /// Reasons given by the server, in its order.
    #[serde(
        default,
        alias = "messages",
        alias = "loi",
        deserialize_with = "messages"
    )]
    pub errors: Vec<String>,
}

impl ValidationResponse {
    pub fn accepted() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn rejected(errors: Vec<String>) -> Self {
        Self {
            valid: false,
            errors,
        }
    }
}

fn messages<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(error_list(&value))
}

// =============================================================================
// Payments
// =============================================================================

/// Body of `POST /pos/payments/process`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub invoice_id: EntityId,
    /// Always the invoice's server-computed total.
    pub amount: Money,
    pub payment_method: CheckoutPaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_details: Option<CardDetails>,
    /// Where a redirect gateway sends the customer back to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
}

/// Answer of `POST /pos/payments/process`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default, alias = "maGiaoDich")]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub payment_url: Option<String>,
    #[serde(default)]
    pub redirect_url: Option<String>,
    #[serde(default, alias = "trangThai")]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

fn default_true() -> bool {
    true
}

impl PaymentResponse {
    /// Gateway URL to send the customer to, whichever key carried it.
    pub fn gateway_url(&self) -> Option<&str> {
        [self.payment_url.as_deref(), self.redirect_url.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|url| !url.is_empty())
    }
}

/// Answer of `GET /pos/payments/verify/{transactionId}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerification {
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(alias = "verified", alias = "thanhCong")]
    pub success: bool,
    #[serde(default, alias = "trangThai")]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validation_response_shapes() {
        let ok: ValidationResponse = serde_json::from_value(json!({ "valid": true })).unwrap();
        assert_eq!(ok, ValidationResponse::accepted());

        let rejected: ValidationResponse = serde_json::from_value(json!({
            "isValid": false,
            "errors": ["Trà đào chỉ còn 1", { "message": "Khuyến mãi đã hết lượt" }]
        }))
        .unwrap();
        assert!(!rejected.valid);
        assert_eq!(rejected.errors.len(), 2);
        assert_eq!(rejected.errors[1], "Khuyến mãi đã hết lượt");
    }

    #[test]
    fn test_gateway_url_prefers_payment_url() {
        let resp: PaymentResponse = serde_json::from_value(json!({
            "transactionId": "TX1",
            "paymentUrl": "https://sandbox.vnpayment.vn/pay?x=1",
            "redirectUrl": "https://other"
        }))
        .unwrap();
        assert!(resp.success);
        assert_eq!(resp.gateway_url(), Some("https://sandbox.vnpayment.vn/pay?x=1"));

        let resp: PaymentResponse =
            serde_json::from_value(json!({ "redirectUrl": "https://gw" })).unwrap();
        assert_eq!(resp.gateway_url(), Some("https://gw"));

        let resp: PaymentResponse = serde_json::from_value(json!({ "paymentUrl": " " })).unwrap();
        assert_eq!(resp.gateway_url(), None);
    }

    #[test]
    fn test_payment_request_wire_names() {
        let req = PaymentRequest {
            invoice_id: 10,
            amount: Money::from_dong(45_000),
            payment_method: CheckoutPaymentMethod::BankTransfer,
            card_brand: None,
            card_details: None,
            return_url: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["invoiceId"], 10);
        assert_eq!(json["amount"], 45_000);
        assert_eq!(json["paymentMethod"], "BANK_TRANSFER");
        assert!(json.get("cardDetails").is_none());
    }
}
