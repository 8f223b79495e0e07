//! # Error Types
//!
//! Domain-specific error types for till-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  till-core errors (this file)                                           │
//! │  ├── CoreError        - General domain errors                           │
//! │  ├── ValidationError  - Input / precondition failures                   │
//! │  └── PromotionError   - Operator picked a promotion that cannot apply   │
//! │                                                                         │
//! │  till-api errors (separate crate)                                       │
//! │  └── ApiError         - HTTP, auth and envelope failures                │
//! │                                                                         │
//! │  till-checkout errors (separate crate)                                  │
//! │  └── CheckoutError    - What the register shell sees                    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ─┐                                   │
//! │                           ApiError ─┴─► CheckoutError → operator        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::EntityId;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The product is not a line of the cart.
    #[error("Product {0} is not in the cart")]
    ItemNotInCart(EntityId),

    /// An invoice was expected to be a held (pending) bill.
    ///
    /// ## When This Occurs
    /// - Resuming an invoice that was completed at another register
    /// - Resuming an invoice that was cancelled in the meantime
    #[error("Invoice {invoice_id} is {status}, only pending invoices can be resumed")]
    InvoiceNotPending { invoice_id: EntityId, status: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Promotion error (wraps PromotionError).
    #[error(transparent)]
    Promotion(#[from] PromotionError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any network call is made.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Invalid format (e.g. card number with letters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Nothing to sell.
    #[error("Cart is empty")]
    EmptyCart,

    /// The logged-in operator is not attached to a branch.
    #[error("Operator has no branch assigned")]
    MissingBranch,

    /// A bill is already held; it must be completed or cancelled first.
    #[error("Invoice {0} is already held for this cart")]
    AlreadyHeld(EntityId),
}

// =============================================================================
// Promotion Error
// =============================================================================

/// Rejections of an operator's promotion choice.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PromotionError {
    /// Inactive, expired, used up, or the minimum purchase is not met.
    #[error("Promotion {code} is not applicable to this order")]
    NotEligible { code: String },

    /// The promotion would take nothing off this order.
    #[error("Promotion {code} gives no discount on this order")]
    NoBenefit { code: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
