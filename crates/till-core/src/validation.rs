//! # Validation Module
//!
//! Preconditions checked before the register talks to the backend.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE (no network)                                      │
//! │  ├── Cart not empty, operator has a branch                              │
//! │  ├── Card fields complete for card payments                             │
//! │  └── Hold note present                                                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: POST /pos/checkout/validate                                   │
//! │  └── Stock, prices, promotion usage (server rules)                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Invoice creation                                              │
//! │  └── Server is authoritative for totals and points                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failure here never mutates any state.

use crate::cart::Cart;
use crate::error::ValidationError;
use crate::payment::PaymentMethod;
use crate::request::{CardDetails, Operator};
use crate::types::EntityId;
use crate::MAX_NOTE_LENGTH;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Checkout / Hold Preconditions
// =============================================================================

/// Returns the operator's branch, or `MissingBranch`.
pub fn require_branch(operator: &Operator) -> ValidationResult<EntityId> {
    operator.branch_id.ok_or(ValidationError::MissingBranch)
}

/// Checks everything checkout needs before any request is built.
///
/// ## Rules
/// - Cart must have at least one line
/// - Operator must belong to a branch
/// - Card brands need complete card details
pub fn validate_checkout(
    cart: &Cart,
    operator: &Operator,
    method: PaymentMethod,
    card: Option<&CardDetails>,
) -> ValidationResult<()> {
    if cart.is_empty() {
        return Err(ValidationError::EmptyCart);
    }
    require_branch(operator)?;

    if method.is_card() {
        let card = card.ok_or_else(|| ValidationError::Required {
            field: "card details".to_string(),
        })?;
        validate_card_details(card)?;
    }

    Ok(())
}

/// Checks that a fresh bill can be held.
pub fn validate_hold(cart: &Cart, operator: &Operator) -> ValidationResult<()> {
    if let Some(invoice_id) = cart.current_invoice_id() {
        return Err(ValidationError::AlreadyHeld(invoice_id));
    }
    if cart.is_empty() {
        return Err(ValidationError::EmptyCart);
    }
    require_branch(operator)?;
    Ok(())
}

/// Validates the operator's hold note.
///
/// ## Returns
/// The trimmed note.
pub fn validate_hold_note(note: &str) -> ValidationResult<String> {
    let note = note.trim();

    if note.is_empty() {
        return Err(ValidationError::Required {
            field: "note".to_string(),
        });
    }

    if note.chars().count() > MAX_NOTE_LENGTH {
        return Err(ValidationError::TooLong {
            field: "note".to_string(),
            max: MAX_NOTE_LENGTH,
        });
    }

    Ok(note.to_string())
}

// =============================================================================
// Card Validators
// =============================================================================

/// Validates card fields for Visa / Mastercard / JCB.
///
/// ## Rules
/// - Number: 12 to 19 digits (spaces allowed)
/// - Holder: not blank
/// - Expiry: `MM/YY` with month 01-12
/// - CVV: 3 or 4 digits
pub fn validate_card_details(card: &CardDetails) -> ValidationResult<()> {
    let number: String = card.card_number.chars().filter(|c| !c.is_whitespace()).collect();
    if number.is_empty() {
        return Err(required("cardNumber"));
    }
    if !number.chars().all(|c| c.is_ascii_digit()) || !(12..=19).contains(&number.len()) {
        return Err(invalid("cardNumber", "must be 12 to 19 digits"));
    }

    if card.card_holder.trim().is_empty() {
        return Err(required("cardHolder"));
    }

    validate_expiry(card.expiry.trim())?;

    let cvv = card.cvv.trim();
    if cvv.is_empty() {
        return Err(required("cvv"));
    }
    if !cvv.chars().all(|c| c.is_ascii_digit()) || !(3..=4).contains(&cvv.len()) {
        return Err(invalid("cvv", "must be 3 or 4 digits"));
    }

    Ok(())
}

fn validate_expiry(expiry: &str) -> ValidationResult<()> {
    if expiry.is_empty() {
        return Err(required("expiry"));
    }

    let (month, year) = expiry
        .split_once('/')
        .ok_or_else(|| invalid("expiry", "must be MM/YY"))?;

    let month_ok = month.len() == 2
        && month
            .parse::<u8>()
            .map_or(false, |m| (1..=12).contains(&m));
    let year_ok = year.len() == 2 && year.chars().all(|c| c.is_ascii_digit());

    if month_ok && year_ok {
        Ok(())
    } else {
        Err(invalid("expiry", "must be MM/YY"))
    }
}

fn required(field: &str) -> ValidationError {
    ValidationError::Required {
        field: field.to_string(),
    }
}

fn invalid(field: &str, reason: &str) -> ValidationError {
    ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
