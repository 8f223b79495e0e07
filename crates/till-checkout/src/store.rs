//! # Cart Store
//!
//! The one cart of an operator session, shared by the shell, the checkout
//! orchestrator, the hold workflow and the auto-sync task.
//!
//! ## Thread Safety
//! The cart lives in an `Arc<Mutex<Cart>>`. The lock is taken for the length
//! of one mutation or one snapshot and is never held across an `.await`.
//!
//! ## Change Stream
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  mutation ──► cart changed? ──no──► (nothing published)                 │
//! │                    │ yes                                                │
//! │                    ▼                                                    │
//! │  watch::Sender<CartChange> { revision += 1, origin }                    │
//! │                    │                                                    │
//! │        ┌───────────┴────────────┐                                       │
//! │        ▼                        ▼                                       │
//! │   AutoSync task            shell redraw                                 │
//! │   (Local → debounce,                                                    │
//! │    Server → cancel)                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `Server` marks changes that came from the backend (resume), so they are
//! not echoed straight back as an update.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDateTime;
use tokio::sync::watch;
use till_core::promotion::select_promotion;
use till_core::{
    Cart, CartTotals, Customer, EntityId, Money, OrderType, Product, Promotion, PromotionError,
    TaxRate,
};

/// Who caused a cart change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// The operator edited the cart.
    Local,
    /// The cart was replaced from server data.
    Server,
}

/// Notification published after every cart change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartChange {
    /// Monotonic, starts at 0 for the initial empty cart.
    pub revision: u64,
    pub origin: ChangeOrigin,
}

/// Shared handle to the session cart. Clones share the same cart.
#[derive(Debug, Clone)]
pub struct CartStore {
    cart: Arc<Mutex<Cart>>,
    changes: Arc<watch::Sender<CartChange>>,
}

impl CartStore {
    /// Creates an empty cart displaying tax at `tax_rate`.
    pub fn new(tax_rate: TaxRate) -> Self {
        let (changes, _) = watch::channel(CartChange {
            revision: 0,
            origin: ChangeOrigin::Server,
        });
        CartStore {
            cart: Arc::new(Mutex::new(Cart::new(tax_rate))),
            changes: Arc::new(changes),
        }
    }

    /// Subscribes to change notifications.
    pub fn subscribe(&self) -> watch::Receiver<CartChange> {
        self.changes.subscribe()
    }

    /// Latest revision number.
    pub fn revision(&self) -> u64 {
        self.changes.borrow().revision
    }

    fn lock(&self) -> MutexGuard<'_, Cart> {
        // Cart mutations cannot panic halfway; a poisoned lock still holds a valid cart
        self.cart.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, origin: ChangeOrigin) {
        self.changes.send_modify(|change| {
            change.revision += 1;
            change.origin = origin;
        });
    }

    /// Runs `f` against the cart and publishes a local change if it says so.
    fn mutate<R>(&self, f: impl FnOnce(&mut Cart) -> (R, bool)) -> R {
        let (result, changed) = {
            let mut cart = self.lock();
            f(&mut cart)
        };
        if changed {
            self.publish(ChangeOrigin::Local);
        }
        result
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Executes a function with read access to the cart.
    pub fn with_cart<R>(&self, f: impl FnOnce(&Cart) -> R) -> R {
        let cart = self.lock();
        f(&cart)
    }

    /// A copy of the cart as it is now.
    pub fn snapshot(&self) -> Cart {
        self.lock().clone()
    }

    pub fn summary(&self) -> CartTotals {
        self.with_cart(Cart::summary)
    }

    pub fn current_invoice_id(&self) -> Option<EntityId> {
        self.with_cart(Cart::current_invoice_id)
    }

    pub fn tax_rate(&self) -> TaxRate {
        self.with_cart(Cart::tax_rate)
    }

    pub fn is_empty(&self) -> bool {
        self.with_cart(Cart::is_empty)
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    pub fn add_item(&self, product: Product, quantity: i64) {
        self.mutate(|cart| {
            let changed = quantity > 0;
            cart.add_item(product, quantity);
            ((), changed)
        })
    }

    pub fn remove_item(&self, product_id: EntityId) -> bool {
        self.mutate(|cart| {
            let removed = cart.remove_item(product_id);
            (removed, removed)
        })
    }

    pub fn update_quantity(&self, product_id: EntityId, quantity: i64) -> bool {
        self.mutate(|cart| {
            let changed = cart.update_quantity(product_id, quantity);
            (changed, changed)
        })
    }

    pub fn set_note(&self, product_id: EntityId, note: Option<&str>) -> bool {
        self.mutate(|cart| {
            let changed = cart.set_note(product_id, note);
            (changed, changed)
        })
    }

    pub fn set_customer(&self, customer: Option<Customer>) {
        self.mutate(|cart| {
            cart.set_customer(customer);
            ((), true)
        })
    }

    /// Attaches or detaches a promotion without eligibility checks.
    pub fn set_promotion(&self, promotion: Option<Promotion>) {
        self.mutate(|cart| {
            cart.set_promotion(promotion);
            ((), true)
        })
    }

    /// Operator picked a promotion: checks it against the current subtotal
    /// and attaches it. A rejected promotion leaves the cart unchanged.
    pub fn apply_promotion(
        &self,
        promotion: Promotion,
        now: NaiveDateTime,
    ) -> Result<Money, PromotionError> {
        self.mutate(|cart| match select_promotion(&promotion, cart.subtotal(), now) {
            Ok(discount) => {
                cart.set_promotion(Some(promotion));
                (Ok(discount), true)
            }
            Err(e) => (Err(e), false),
        })
    }

    pub fn set_selected_table(&self, table: Option<String>) {
        self.mutate(|cart| {
            cart.set_selected_table(table);
            ((), true)
        })
    }

    pub fn set_order_type(&self, order_type: OrderType) {
        self.mutate(|cart| {
            let changed = cart.order_type() != order_type;
            cart.set_order_type(order_type);
            ((), changed)
        })
    }

    /// Links the cart to a held invoice. Not published: linking is the
    /// result of a server write, not an edit to mirror.
    pub fn set_current_invoice_id(&self, invoice_id: Option<EntityId>) {
        self.lock().set_current_invoice_id(invoice_id);
    }

    /// Resets the cart after payment, cancel or gateway redirect.
    pub fn clear(&self) {
        self.lock().clear();
        self.publish(ChangeOrigin::Server);
    }

    /// Replaces the cart wholesale with one built from server data.
    pub fn replace(&self, cart: Cart) {
        *self.lock() = cart;
        self.publish(ChangeOrigin::Server);
    }
}

impl Default for CartStore {
    fn default() -> Self {
        Self::new(TaxRate::default())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
