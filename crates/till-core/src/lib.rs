//! # till-core: Pure Business Logic for Till POS
//!
//! Cart math, promotion evaluation, payment vocabularies and request
//! projections, with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                 Register shell (apps/terminal)                  │    │
//! │  │   add / qty / promo / customer / pay / hold / resume / cancel   │    │
//! │  └─────────────────────────────┬───────────────────────────────────┘    │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │     till-checkout: CartStore, orchestrator, hold workflow       │    │
//! │  └──────────────┬──────────────────────────────┬───────────────────┘    │
//! │                 │                              │                        │
//! │  ┌──────────────▼──────────────────┐  ┌────────▼────────────────────┐   │
//! │  │   ★ till-core (THIS CRATE) ★    │  │  till-api (REST client)     │   │
//! │  │                                 │  │  reqwest + envelopes + JWT  │   │
//! │  │  money  cart  promotion         │  └─────────────────────────────┘   │
//! │  │  payment  request  validation   │                                    │
//! │  │                                 │                                    │
//! │  │  NO I/O • NO CLOCK • PURE       │                                    │
//! │  └─────────────────────────────────┘                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Customer, Invoice, TaxRate)
//! - [`money`] - Money type with integer arithmetic in đồng
//! - [`cart`] - The cart and its mutation API
//! - [`promotion`] - Promotion model and evaluator
//! - [`payment`] - The three payment-method vocabularies
//! - [`request`] - Checkout / hold request projections
//! - [`validation`] - Preconditions checked before any network call
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use till_core::{Cart, Money, Product};
//!
//! let mut cart = Cart::default();
//! cart.add_item(Product::new(1, "Cà phê sữa", Money::from_dong(25_000)), 2);
//!
//! assert_eq!(cart.subtotal().dong(), 50_000);
//! assert_eq!(cart.total().dong(), 50_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod payment;
pub mod promotion;
pub mod request;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartItem, CartTotals};
pub use error::{CoreError, CoreResult, PromotionError, ValidationError};
pub use money::Money;
pub use payment::{CheckoutPaymentMethod, HoldPaymentMethod, PaymentMethod};
pub use promotion::{DiscountType, Promotion, PromotionStatus};
pub use request::{CardDetails, CheckoutItem, CheckoutRequest, HoldBillRequest, Operator};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default display VAT: 10%.
pub const DEFAULT_TAX_RATE_BPS: u32 = 1000;

/// Maximum length of a hold note.
pub const MAX_NOTE_LENGTH: usize = 500;
