//! # Held Bill Auto-Sync
//!
//! Keeps a held invoice mirroring the live cart while the operator edits a
//! resumed order.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CartStore::subscribe() ──► changed()                                   │
//! │                               │                                         │
//! │        origin == Server ──────┼──► disarm (resume must not echo back)   │
//! │        no held invoice  ──────┤                                         │
//! │                               │ Local edit on a held cart               │
//! │                               ▼                                         │
//! │                  deadline = now + debounce  (every edit re-arms)        │
//! │                               │                                         │
//! │                     sleep_until(deadline)                               │
//! │                               │                                         │
//! │          gate busy? ──yes──► re-arm                                     │
//! │                               │ no                                      │
//! │                               ▼                                         │
//! │          PUT /pos/invoices/{id}/update-pending                          │
//! │          failure ──► warn! (never shown to the operator)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Races
//! A manual update or a hold on another register may write the same invoice.
//! There is no version token, so whichever write lands last wins.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{CheckoutError, CheckoutResult};
use crate::hold::push_held;
use crate::session::SessionContext;
use crate::store::{CartChange, ChangeOrigin};

/// Background task pushing held-cart edits after a quiet period.
pub struct AutoSync {
    ctx: SessionContext,
    changes: watch::Receiver<CartChange>,
    debounce: Duration,
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for stopping the auto-sync task.
#[derive(Clone)]
pub struct AutoSyncHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl AutoSyncHandle {
    /// Asks the task to stop.
    pub async fn shutdown(&self) -> CheckoutResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| CheckoutError::ChannelClosed("Auto-sync shutdown channel closed".into()))
    }
}

impl AutoSync {
    /// Creates the task and its handle. Subscribes immediately, so edits made
    /// before the task is first polled are not missed.
    pub fn new(ctx: SessionContext) -> (Self, AutoSyncHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let autosync = AutoSync {
            changes: ctx.store.subscribe(),
            debounce: ctx.config.autosync_debounce(),
            ctx,
            shutdown_rx,
        };
        (autosync, AutoSyncHandle { shutdown_tx })
    }

    /// Runs until shut down. Spawn this.
    pub async fn run(mut self) {
        info!(debounce_ms = self.debounce.as_millis() as u64, "Auto-sync starting");
        let mut deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                changed = self.changes.changed() => {
                    if changed.is_err() {
                        debug!("Cart store dropped");
                        break;
                    }
                    let change = *self.changes.borrow_and_update();
                    deadline = self.schedule(change);
                }

                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    deadline = self.sync().await;
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Auto-sync shutting down");
                    break;
                }
            }
        }

        info!("Auto-sync stopped");
    }

    /// Deadline after `change`, or `None` when nothing should be pushed.
    fn schedule(&self, change: CartChange) -> Option<Instant> {
        if change.origin == ChangeOrigin::Server {
            debug!(revision = change.revision, "Server-side cart change, sync disarmed");
            return None;
        }
        self.ctx.store.current_invoice_id()?;
        Some(Instant::now() + self.debounce)
    }

    /// Pushes the held cart. Returns a new deadline when it had to back off.
    async fn sync(&self) -> Option<Instant> {
        let invoice_id = self.ctx.store.current_invoice_id()?;
        if self.ctx.store.is_empty() {
            debug!(invoice_id, "Held cart is empty, not syncing");
            return None;
        }
        if self.ctx.gate.is_busy() {
            debug!(invoice_id, "Another operation is running, sync postponed");
            return Some(Instant::now() + self.debounce);
        }

        match push_held(&self.ctx, invoice_id).await {
            Ok(invoice) => debug!(invoice_id, total = %invoice.total, "Held invoice synced"),
            Err(e) => {
                self.ctx.note_auth_failure(&e);
                warn!(invoice_id, error = %e, "Background sync of held invoice failed");
            }
        }
        None
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
