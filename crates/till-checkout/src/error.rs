//! # Checkout Error Types
//!
//! What the register shell sees when a checkout, hold or resume fails.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Category        Variant                  Network?   State touched?     │
//! │  ────────        ───────                  ────────   ──────────────     │
//! │  Precondition    Precondition / Busy /    no         no                 │
//! │                  NoHeldInvoice                                          │
//! │  Validation      Rejected                 validate   no                 │
//! │  Creation        Api                      create     no (cart kept)     │
//! │  Settlement      (not an error: CheckoutOutcome::PartiallySettled /     │
//! │                   HeldForLater carry the warning)                       │
//! │  Background      (logged by AutoSync, never returned)                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;
use till_api::error::GENERIC_ERROR_MESSAGE;
use till_api::ApiError;
use till_core::{CoreError, PromotionError, ValidationError};

use crate::checkout::Navigation;

/// Result type alias for checkout operations.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Checked locally before any request.
    #[error("{0}")]
    Precondition(#[from] ValidationError),

    /// Another checkout / hold / complete / cancel is still running.
    #[error("Another operation is in progress")]
    Busy,

    /// Complete or cancel was asked for with no held bill in the cart.
    #[error("No held invoice in the cart")]
    NoHeldInvoice,

    /// The server's pre-flight check said no. Reasons are in server order.
    #[error("{}", .0.join("; "))]
    Rejected(Vec<String>),

    /// Promotion could not be applied.
    #[error(transparent)]
    Promotion(#[from] PromotionError),

    /// Domain rule failure (e.g. resuming an invoice that is no longer pending).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A background task's control channel is gone.
    #[error("Channel closed: {0}")]
    ChannelClosed(String),
}

impl CheckoutError {
    /// Text for the operator's notification.
    pub fn user_message(&self) -> String {
        match self {
            CheckoutError::Api(e) => e.user_message(),
            CheckoutError::Rejected(reasons) if reasons.is_empty() => {
                GENERIC_ERROR_MESSAGE.to_string()
            }
            CheckoutError::Busy => "Đang xử lý, vui lòng đợi".to_string(),
            other => other.to_string(),
        }
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, CheckoutError::Api(e) if e.is_auth_error())
    }

    /// Where the shell should go after showing the error, if anywhere.
    pub fn navigation(&self) -> Option<Navigation> {
        self.is_auth_error().then_some(Navigation::Login)
    }
}

/// Configuration load / save failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid URL for {field}: {reason}")]
    InvalidUrl { field: String, reason: String },

    #[error("Failed to load config: {0}")]
    Load(String),

    #[error("Failed to save config: {0}")]
    Save(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Load(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Load(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::Save(err.to_string())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_joins_reasons() {
        let err = CheckoutError::Rejected(vec![
            "Trà đào chỉ còn 1".to_string(),
            "Khuyến mãi đã hết lượt".to_string(),
        ]);
        assert_eq!(err.to_string(), "Trà đào chỉ còn 1; Khuyến mãi đã hết lượt");
        assert_eq!(err.user_message(), err.to_string());
        assert_eq!(CheckoutError::Rejected(vec![]).user_message(), GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn test_auth_errors_route_to_login() {
        let err = CheckoutError::from(ApiError::Unauthorized);
        assert!(err.is_auth_error());
        assert_eq!(err.navigation(), Some(Navigation::Login));
        assert_eq!(CheckoutError::Busy.navigation(), None);
    }

    #[test]
    fn test_precondition_message() {
        let err = CheckoutError::from(ValidationError::EmptyCart);
        assert_eq!(err.user_message(), "Cart is empty");
    }
}
