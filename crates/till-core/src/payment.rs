//! # Payment Method Vocabularies
//!
//! Three closed enums, each owned by a different integration point, with
//! explicit mapping functions between them.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PaymentMethod (register UI)                                            │
//! │  CASH  VISA  MASTER  JCB  BANK_TRANSFER  VNPAY                          │
//! │    │     └─────┼─────┘         │           │                            │
//! │    ▼           ▼               ▼           ▼                            │
//! │  CheckoutPaymentMethod (POST /pos/checkout)                             │
//! │  CASH        CARD         BANK_TRANSFER  VNPAY   (+ MOMO ZALOPAY OTHER) │
//! │                                                                         │
//! │  HoldPaymentMethod (POST /pos/invoices/{id}/complete)                   │
//! │  TIEN_MAT    THE          CHUYEN_KHOAN   VNPAY                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! They are deliberately not unified: the UI distinguishes card brands, the
//! checkout API does not, and the hold-completion endpoint speaks its own
//! localized codes.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Register (display) vocabulary
// =============================================================================

/// Payment methods as the operator picks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Visa,
    Master,
    Jcb,
    BankTransfer,
    #[serde(rename = "VNPAY")]
    VnPay,
}

impl PaymentMethod {
    /// Every method, in the order the payment dialog lists them.
    pub const ALL: [PaymentMethod; 6] = [
        PaymentMethod::Cash,
        PaymentMethod::Visa,
        PaymentMethod::Master,
        PaymentMethod::Jcb,
        PaymentMethod::BankTransfer,
        PaymentMethod::VnPay,
    ];

    /// Card brands need card details before checkout.
    pub fn is_card(&self) -> bool {
        matches!(
            self,
            PaymentMethod::Visa | PaymentMethod::Master | PaymentMethod::Jcb
        )
    }

    /// Methods that settle through an external redirect.
    pub fn is_redirect_gateway(&self) -> bool {
        matches!(self, PaymentMethod::VnPay)
    }

    /// Everything except cash goes through the payment-processing endpoint.
    pub fn requires_processing(&self) -> bool {
        !matches!(self, PaymentMethod::Cash)
    }

    /// Maps to the checkout API's vocabulary.
    pub fn to_checkout(self) -> CheckoutPaymentMethod {
        match self {
            PaymentMethod::Cash => CheckoutPaymentMethod::Cash,
            PaymentMethod::Visa | PaymentMethod::Master | PaymentMethod::Jcb => {
                CheckoutPaymentMethod::Card
            }
            PaymentMethod::BankTransfer => CheckoutPaymentMethod::BankTransfer,
            PaymentMethod::VnPay => CheckoutPaymentMethod::VnPay,
        }
    }

    /// Maps to the hold-completion endpoint's vocabulary.
    pub fn to_hold_completion(self) -> HoldPaymentMethod {
        match self {
            PaymentMethod::Cash => HoldPaymentMethod::TienMat,
            PaymentMethod::Visa | PaymentMethod::Master | PaymentMethod::Jcb => {
                HoldPaymentMethod::The
            }
            PaymentMethod::BankTransfer => HoldPaymentMethod::ChuyenKhoan,
            PaymentMethod::VnPay => HoldPaymentMethod::VnPay,
        }
    }

    /// Card brand sent alongside card details, if any.
    pub fn card_brand(&self) -> Option<&'static str> {
        match self {
            PaymentMethod::Visa => Some("VISA"),
            PaymentMethod::Master => Some("MASTER"),
            PaymentMethod::Jcb => Some("JCB"),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Visa => "Visa",
            PaymentMethod::Master => "Mastercard",
            PaymentMethod::Jcb => "JCB",
            PaymentMethod::BankTransfer => "Bank transfer",
            PaymentMethod::VnPay => "VNPay",
        };
        f.write_str(label)
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace(['-', ' '], "_").as_str() {
            "CASH" => Ok(PaymentMethod::Cash),
            "VISA" => Ok(PaymentMethod::Visa),
            "MASTER" | "MASTERCARD" => Ok(PaymentMethod::Master),
            "JCB" => Ok(PaymentMethod::Jcb),
            "BANK_TRANSFER" | "TRANSFER" => Ok(PaymentMethod::BankTransfer),
            "VNPAY" => Ok(PaymentMethod::VnPay),
            _ => Err(format!("Unknown payment method: {}", s)),
        }
    }
}

// =============================================================================
// Checkout API vocabulary
// =============================================================================

/// Payment methods accepted by `POST /pos/checkout` and `/pos/payments/process`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckoutPaymentMethod {
    Cash,
    Card,
    Momo,
    #[serde(rename = "ZALOPAY")]
    ZaloPay,
    BankTransfer,
    #[serde(rename = "VNPAY")]
    VnPay,
    Other,
}

impl CheckoutPaymentMethod {
    /// Maps back to the register vocabulary.
    ///
    /// `CARD` loses its brand and is shown as Visa; e-wallets and `OTHER`
    /// have no register form.
    pub fn to_display(self) -> Option<PaymentMethod> {
        match self {
            CheckoutPaymentMethod::Cash => Some(PaymentMethod::Cash),
            CheckoutPaymentMethod::Card => Some(PaymentMethod::Visa),
            CheckoutPaymentMethod::BankTransfer => Some(PaymentMethod::BankTransfer),
            CheckoutPaymentMethod::VnPay => Some(PaymentMethod::VnPay),
            CheckoutPaymentMethod::Momo
            | CheckoutPaymentMethod::ZaloPay
            | CheckoutPaymentMethod::Other => None,
        }
    }

    /// Wire code, as used in query strings and logs.
    pub fn as_code(&self) -> &'static str {
        match self {
            CheckoutPaymentMethod::Cash => "CASH",
            CheckoutPaymentMethod::Card => "CARD",
            CheckoutPaymentMethod::Momo => "MOMO",
            CheckoutPaymentMethod::ZaloPay => "ZALOPAY",
            CheckoutPaymentMethod::BankTransfer => "BANK_TRANSFER",
            CheckoutPaymentMethod::VnPay => "VNPAY",
            CheckoutPaymentMethod::Other => "OTHER",
        }
    }
}

impl From<PaymentMethod> for CheckoutPaymentMethod {
    fn from(method: PaymentMethod) -> Self {
        method.to_checkout()
    }
}

// =============================================================================
// Hold-completion vocabulary
// =============================================================================

/// Localized codes taken by `POST /pos/invoices/{id}/complete?phuongThucThanhToan=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HoldPaymentMethod {
    #[serde(rename = "TIEN_MAT")]
    TienMat,
    #[serde(rename = "THE")]
    The,
    #[serde(rename = "CHUYEN_KHOAN")]
    ChuyenKhoan,
    #[serde(rename = "VNPAY")]
    VnPay,
}

impl HoldPaymentMethod {
    /// Value of the `phuongThucThanhToan` query parameter.
    pub fn as_code(&self) -> &'static str {
        match self {
            HoldPaymentMethod::TienMat => "TIEN_MAT",
            HoldPaymentMethod::The => "THE",
            HoldPaymentMethod::ChuyenKhoan => "CHUYEN_KHOAN",
            HoldPaymentMethod::VnPay => "VNPAY",
        }
    }

    /// Maps to the checkout API's vocabulary.
    pub fn to_checkout(self) -> CheckoutPaymentMethod {
        match self {
            HoldPaymentMethod::TienMat => CheckoutPaymentMethod::Cash,
            HoldPaymentMethod::The => CheckoutPaymentMethod::Card,
            HoldPaymentMethod::ChuyenKhoan => CheckoutPaymentMethod::BankTransfer,
            HoldPaymentMethod::VnPay => CheckoutPaymentMethod::VnPay,
        }
    }
}

impl From<PaymentMethod> for HoldPaymentMethod {
    fn from(method: PaymentMethod) -> Self {
        method.to_hold_completion()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
