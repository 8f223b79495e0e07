//! # Event Bus
//!
//! Process-wide notifications for views that are not part of the checkout
//! flow itself (invoice list, dashboard, login screen).
//!
//! ```text
//! CheckoutOrchestrator ──InvoiceCreated──┐
//! HoldWorkflow ─────────InvoiceCreated───┤
//! transfer verify task ─PaymentVerified──┼──► broadcast ──► subscribers
//! any 401 / expired token ─SessionExpired┘
//! ```

use serde::Serialize;
use till_core::EntityId;
use tokio::sync::broadcast;
use tracing::debug;

const DEFAULT_CAPACITY: usize = 64;

/// Something other views may want to react to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PosEvent {
    /// An invoice was created or finalized; invoice lists should refresh.
    #[serde(rename_all = "camelCase")]
    InvoiceCreated { invoice_id: EntityId },

    /// Result of the delayed bank-transfer check.
    #[serde(rename_all = "camelCase")]
    PaymentVerified { transaction_id: String, success: bool },

    /// The session token is gone; the shell should show the login screen.
    SessionExpired,
}

/// Cloneable publisher; every clone feeds the same subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PosEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PosEvent> {
        self.tx.subscribe()
    }

    /// Publishes an event. Having no subscribers is not an error.
    pub fn publish(&self, event: PosEvent) {
        debug!(?event, "Publishing event");
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(PosEvent::InvoiceCreated { invoice_id: 9 });
        assert_eq!(rx.recv().await.unwrap(), PosEvent::InvoiceCreated { invoice_id: 9 });
    }

    #[test]
    fn test_publish_without_subscribers() {
        EventBus::new().publish(PosEvent::SessionExpired);
    }

    #[test]
    fn test_event_wire_name() {
        let json = serde_json::to_value(PosEvent::InvoiceCreated { invoice_id: 3 }).unwrap();
        assert_eq!(json["type"], "invoice-created");
        assert_eq!(json["invoiceId"], 3);
    }
}
