//! # till-checkout: Checkout Orchestration for Till POS
//!
//! The stateful half of the register. Everything here runs on Tokio and talks
//! to the backend only through [`till_api::PosApi`].
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              Session                                    │
//! │                                                                         │
//! │  ┌──────────────┐   edits    ┌──────────────────────────────────────┐   │
//! │  │ Shell        │──────────► │ CartStore  (Arc<Mutex<Cart>> + watch)│   │
//! │  └──────┬───────┘            └──────┬──────────────────┬────────────┘   │
//! │         │ pay / hold / resume       │ snapshot          │ changes       │
//! │         ▼                           ▼                   ▼               │
//! │  ┌────────────────────┐   ┌────────────────────┐  ┌─────────────────┐   │
//! │  │ CheckoutOrchestr.  │   │ HoldWorkflow       │  │ AutoSync        │   │
//! │  │ validate → create  │   │ hold / resume /    │  │ debounced       │   │
//! │  │ → pay / redirect   │   │ complete / cancel  │  │ update-pending  │   │
//! │  └─────────┬──────────┘   └─────────┬──────────┘  └────────┬────────┘   │
//! │            └───────── ProcessingGate (one per session) ────┘            │
//! │                                 │                                       │
//! │                         Arc<dyn PosApi>          EventBus ──► views     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`store`] - Shared cart with a change stream
//! - [`checkout`] - One checkout attempt, phases and outcomes
//! - [`hold`] - Hold / resume / complete / cancel of PENDING invoices
//! - [`autosync`] - Background sync of a held cart
//! - [`session`] - Wiring, processing gate, promotion lookup
//! - [`events`] - Process-wide notifications
//! - [`prompt`] - Operator dialog abstraction
//! - [`config`] - TOML + environment configuration
//! - [`error`] - Checkout and config errors

// =============================================================================
// Module Declarations
// =============================================================================

pub mod autosync;
pub mod checkout;
pub mod config;
pub mod error;
pub mod events;
pub mod hold;
pub mod prompt;
pub mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

// =============================================================================
// Re-exports
// =============================================================================

pub use autosync::{AutoSync, AutoSyncHandle};
pub use checkout::{
    CheckoutOrchestrator, CheckoutOutcome, CheckoutPhase, CheckoutReceipt, Navigation,
};
pub use config::TillConfig;
pub use error::{CheckoutError, CheckoutResult, ConfigError};
pub use events::{EventBus, PosEvent};
pub use hold::HoldWorkflow;
pub use prompt::Prompter;
pub use session::{ProcessingGate, Session, SessionContext};
pub use store::{CartChange, CartStore, ChangeOrigin};
