//! # Operator Session
//!
//! Wires one register session together: the cart store, the backend client,
//! the event bus, the shared processing gate, and the background auto-sync.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Session                                       │
//! │                                                                         │
//! │   SessionContext (cloned into every component)                          │
//! │   ├── CartStore        the one cart                                     │
//! │   ├── Arc<dyn PosApi>  backend                                          │
//! │   ├── EventBus         invoice-created / payment-verified / expired     │
//! │   ├── ProcessingGate   one AtomicBool for checkout, hold, complete,     │
//! │   │                    cancel                                           │
//! │   ├── Arc<TillConfig>                                                   │
//! │   └── Operator                                                          │
//! │                                                                         │
//! │   CheckoutOrchestrator   HoldWorkflow   AutoSyncHandle                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Local;
use till_api::{ApiError, PosApi};
use till_core::promotion::available_promotions;
use till_core::validation::require_branch;
use till_core::{Operator, Promotion};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::autosync::{AutoSync, AutoSyncHandle};
use crate::checkout::CheckoutOrchestrator;
use crate::config::TillConfig;
use crate::error::{CheckoutError, CheckoutResult};
use crate::events::{EventBus, PosEvent};
use crate::hold::HoldWorkflow;
use crate::store::CartStore;

// =============================================================================
// Processing Gate
// =============================================================================

/// Mutual exclusion across every submitting entry point of a session.
///
/// The flag is what the shell shows as "processing"; it is cleared when the
/// guard drops, on every return path.
#[derive(Debug, Clone, Default)]
pub struct ProcessingGate {
    busy: Arc<AtomicBool>,
}

impl ProcessingGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the gate, or `None` if another operation holds it.
    pub fn try_enter(&self) -> Option<ProcessingGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ProcessingGuard {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the gate on drop.
#[derive(Debug)]
pub struct ProcessingGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

// =============================================================================
// Session Context
// =============================================================================

/// Everything a workflow needs, cheap to clone.
#[derive(Clone)]
pub struct SessionContext {
    pub store: CartStore,
    pub api: Arc<dyn PosApi>,
    pub events: EventBus,
    pub gate: ProcessingGate,
    pub config: Arc<TillConfig>,
    pub operator: Operator,
}

impl SessionContext {
    pub fn new(api: Arc<dyn PosApi>, config: Arc<TillConfig>) -> Self {
        SessionContext {
            store: CartStore::new(config.tax_rate()),
            api,
            events: EventBus::new(),
            gate: ProcessingGate::new(),
            operator: config.operator(),
            config,
        }
    }

    /// Converts a backend failure, announcing an expired session on the way.
    pub(crate) fn api_error(&self, err: ApiError) -> CheckoutError {
        self.note_auth_failure(&err);
        err.into()
    }

    pub(crate) fn note_auth_failure(&self, err: &ApiError) {
        if err.is_auth_error() {
            self.events.publish(PosEvent::SessionExpired);
        }
    }

    /// Claims the processing gate or fails with `Busy`.
    pub(crate) fn enter(&self) -> CheckoutResult<ProcessingGuard> {
        self.gate.try_enter().ok_or(CheckoutError::Busy)
    }
}

// =============================================================================
// Session
// =============================================================================

/// One operator's register session.
pub struct Session {
    ctx: SessionContext,
    checkout: CheckoutOrchestrator,
    hold: HoldWorkflow,
    autosync: Option<(AutoSyncHandle, JoinHandle<()>)>,
}

impl Session {
    /// Builds a session without background auto-sync.
    pub fn new(api: Arc<dyn PosApi>, config: Arc<TillConfig>) -> Self {
        let ctx = SessionContext::new(api, config);
        Session {
            checkout: CheckoutOrchestrator::new(ctx.clone()),
            hold: HoldWorkflow::new(ctx.clone()),
            ctx,
            autosync: None,
        }
    }

    /// Builds a session and spawns the auto-sync task on the current runtime.
    pub fn start(api: Arc<dyn PosApi>, config: Arc<TillConfig>) -> Self {
        let mut session = Self::new(api, config);
        let (autosync, handle) = AutoSync::new(session.ctx.clone());
        let task = tokio::spawn(autosync.run());
        session.autosync = Some((handle, task));
        info!(
            employee_id = session.ctx.operator.employee_id,
            branch_id = ?session.ctx.operator.branch_id,
            "Register session started"
        );
        session
    }

    pub fn store(&self) -> &CartStore {
        &self.ctx.store
    }

    pub fn events(&self) -> &EventBus {
        &self.ctx.events
    }

    pub fn checkout(&self) -> &CheckoutOrchestrator {
        &self.checkout
    }

    pub fn hold(&self) -> &HoldWorkflow {
        &self.hold
    }

    pub fn operator(&self) -> &Operator {
        &self.ctx.operator
    }

    pub fn config(&self) -> &TillConfig {
        &self.ctx.config
    }

    /// Mirrors the shell's "processing" flag.
    pub fn processing(&self) -> bool {
        self.ctx.gate.is_busy()
    }

    /// Promotions the operator may pick for the current cart.
    ///
    /// Fetches the branch's active list and filters it against the current
    /// subtotal; `search` narrows by code, case-insensitively.
    pub async fn available_promotions(&self, search: Option<&str>) -> CheckoutResult<Vec<Promotion>> {
        let branch_id = require_branch(&self.ctx.operator)?;
        let all = self
            .ctx
            .api
            .active_promotions(branch_id)
            .await
            .map_err(|e| self.ctx.api_error(e))?;

        let subtotal = self.ctx.store.with_cart(|cart| cart.subtotal());
        let now = Local::now().naive_local();
        let available: Vec<Promotion> = available_promotions(&all, subtotal, search, now)
            .into_iter()
            .cloned()
            .collect();

        debug!(
            branch_id,
            fetched = all.len(),
            available = available.len(),
            "Promotions filtered"
        );
        Ok(available)
    }

    /// Stops the auto-sync task and waits for it to finish.
    pub async fn shutdown(mut self) {
        if let Some((handle, task)) = self.autosync.take() {
            if let Err(e) = handle.shutdown().await {
                warn!(error = %e, "Auto-sync already stopped");
            }
            if let Err(e) = task.await {
                warn!(error = %e, "Auto-sync task ended abnormally");
            }
        }
        info!("Register session closed");
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
