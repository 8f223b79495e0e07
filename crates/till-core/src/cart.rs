//! # Cart
//!
//! The in-progress sale: lines, attached customer and promotion, table and
//! order type, and the link to a held invoice when one is being edited.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Operator Action          Method                  Cart Change           │
//! │  ───────────────          ──────                  ───────────           │
//! │                                                                         │
//! │  Tap product ────────────► add_item() ──────────► qty += n or push      │
//! │  Change quantity ────────► update_quantity() ───► qty = n (≤0 removes)  │
//! │  Remove line ────────────► remove_item() ───────► items.retain(..)      │
//! │  Pick promotion ─────────► set_promotion() ─────► discount recomputed   │
//! │  Pay / cancel hold ──────► clear() ─────────────► every field reset     │
//! │                                                                         │
//! │  Every change to items or promotion recomputes `discount`, so           │
//! │  total() == subtotal() - discount always holds.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Fresh vs Resumed
//! `current_invoice_id` is `None` for a fresh sale and `Some(id)` while a held
//! bill is being edited. [`Cart::clear`] always drops the link.
//!
//! Mutations never fail: stock limits are checked by callers via
//! [`Product::can_sell`] before adding.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::promotion::{calculate_discount, Promotion};
use crate::types::{Customer, EntityId, Invoice, OrderType, Product, TaxRate};

// =============================================================================
// Cart Item
// =============================================================================

/// A line in the cart.
///
/// `product` is a snapshot: the unit price is frozen when the line is added,
/// even if the catalog price changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product: Product,

    /// Always at least 1 while the line exists.
    pub quantity: i64,

    /// Free text for the kitchen or the receipt ("ít đá", "no sugar").
    pub note: Option<String>,
}

impl CartItem {
    /// Creates a line from a product snapshot.
    pub fn new(product: Product, quantity: i64) -> Self {
        CartItem {
            product,
            quantity,
            note: None,
        }
    }

    /// Product id of this line.
    #[inline]
    pub fn product_id(&self) -> EntityId {
        self.product.id
    }

    /// Unit price × quantity.
    pub fn line_total(&self) -> Money {
        self.product.price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The shopping cart of one operator session.
///
/// ## Invariants
/// - Items are unique by product id (adding the same product raises quantity)
/// - Every quantity is > 0 (setting 0 removes the line)
/// - `discount == calculate_discount(promotion, subtotal())`, or 0 without
///   a promotion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    items: Vec<CartItem>,
    customer: Option<Customer>,
    promotion: Option<Promotion>,
    discount: Money,
    selected_table: Option<String>,
    order_type: OrderType,
    current_invoice_id: Option<EntityId>,
    tax_rate: TaxRate,
}

impl Default for Cart {
    fn default() -> Self {
        Cart::new(TaxRate::default())
    }
}

impl Cart {
    /// Creates an empty cart that displays tax at `tax_rate`.
    pub fn new(tax_rate: TaxRate) -> Self {
        Cart {
            items: Vec::new(),
            customer: None,
            promotion: None,
            discount: Money::zero(),
            selected_table: None,
            order_type: OrderType::default(),
            current_invoice_id: None,
            tax_rate,
        }
    }

    /// Rebuilds a cart from a held invoice returned by the resume endpoint.
    ///
    /// Lines, customer, promotion, table and order type come from the server
    /// snapshot; the discount is recomputed locally from the promotion.
    pub fn from_invoice(invoice: &Invoice, tax_rate: TaxRate) -> CoreResult<Self> {
        if !invoice.is_pending() {
            return Err(CoreError::InvoiceNotPending {
                invoice_id: invoice.id,
                status: invoice.status.to_string(),
            });
        }

        let mut cart = Cart::new(tax_rate);
        for line in invoice.lines.iter().filter(|l| l.quantity > 0) {
            let product = Product {
                id: line.product_id,
                name: line.product_name.clone(),
                price: line.unit_price,
                stock: None,
                image_url: line.image_url.clone(),
            };
            cart.add_item(product, line.quantity);
            if let Some(note) = line.note.as_deref() {
                cart.set_note(line.product_id, Some(note));
            }
        }

        cart.customer = invoice.customer.clone();
        cart.selected_table = invoice.table.clone();
        cart.order_type = invoice.order_type.unwrap_or_default();
        cart.current_invoice_id = Some(invoice.id);
        cart.set_promotion(invoice.promotion.clone());
        Ok(cart)
    }

    // -------------------------------------------------------------------------
    // Item mutations
    // -------------------------------------------------------------------------

    /// Adds a product, or raises the quantity of its existing line.
    ///
    /// A non-positive quantity is ignored.
    pub fn add_item(&mut self, product: Product, quantity: i64) {
        if quantity <= 0 {
            return;
        }

        if let Some(item) = self.items.iter_mut().find(|i| i.product.id == product.id) {
            item.quantity = item.quantity.saturating_add(quantity);
        } else {
            self.items.push(CartItem::new(product, quantity));
        }
        self.recompute_discount();
    }

    /// Removes a line entirely. Returns whether a line was removed.
    pub fn remove_item(&mut self, product_id: EntityId) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.product.id != product_id);
        let removed = self.items.len() != before;
        if removed {
            self.recompute_discount();
        }
        removed
    }

    /// Sets a line's quantity. Zero or less removes the line.
    ///
    /// Returns whether the cart changed.
    pub fn update_quantity(&mut self, product_id: EntityId, quantity: i64) -> bool {
        if quantity <= 0 {
            return self.remove_item(product_id);
        }

        match self.items.iter_mut().find(|i| i.product.id == product_id) {
            Some(item) if item.quantity != quantity => {
                item.quantity = quantity;
                self.recompute_discount();
                true
            }
            _ => false,
        }
    }

    /// Sets or clears the note on a line. Blank notes clear it.
    pub fn set_note(&mut self, product_id: EntityId, note: Option<&str>) -> bool {
        let note = note.map(str::trim).filter(|n| !n.is_empty()).map(String::from);
        match self.items.iter_mut().find(|i| i.product.id == product_id) {
            Some(item) => {
                item.note = note;
                true
            }
            None => false,
        }
    }

    // -------------------------------------------------------------------------
    // Order-level setters
    // -------------------------------------------------------------------------

    pub fn set_customer(&mut self, customer: Option<Customer>) {
        self.customer = customer;
    }

    /// Attaches or detaches a promotion and recomputes the discount.
    ///
    /// Eligibility is not checked here; the selection dialog runs
    /// [`crate::promotion::select_promotion`] first.
    pub fn set_promotion(&mut self, promotion: Option<Promotion>) {
        self.promotion = promotion;
        self.recompute_discount();
    }

    pub fn set_selected_table(&mut self, table: Option<String>) {
        self.selected_table = table;
    }

    pub fn set_order_type(&mut self, order_type: OrderType) {
        self.order_type = order_type;
    }

    /// Links the cart to a held invoice, or unlinks it.
    pub fn set_current_invoice_id(&mut self, invoice_id: Option<EntityId>) {
        self.current_invoice_id = invoice_id;
    }

    /// Resets every field to its initial value. The tax rate is configuration
    /// and survives.
    pub fn clear(&mut self) {
        *self = Cart::new(self.tax_rate);
    }

    fn recompute_discount(&mut self) {
        let subtotal = self.subtotal();
        self.discount = self
            .promotion
            .as_ref()
            .map_or(Money::zero(), |p| calculate_discount(p, subtotal));
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn customer(&self) -> Option<&Customer> {
        self.customer.as_ref()
    }

    pub fn promotion(&self) -> Option<&Promotion> {
        self.promotion.as_ref()
    }

    pub fn discount(&self) -> Money {
        self.discount
    }

    pub fn selected_table(&self) -> Option<&str> {
        self.selected_table.as_deref()
    }

    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    pub fn current_invoice_id(&self) -> Option<EntityId> {
        self.current_invoice_id
    }

    pub fn tax_rate(&self) -> TaxRate {
        self.tax_rate
    }

    pub fn find_item(&self, product_id: EntityId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product.id == product_id)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Sum of all quantities.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().fold(0i64, |n, i| n.saturating_add(i.quantity))
    }

    /// Σ unit price × quantity.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Tax shown on the payment summary. Informational only; it is not
    /// added to [`Cart::total`].
    pub fn tax(&self) -> Money {
        self.subtotal().calculate_tax(self.tax_rate)
    }

    /// Amount to pay: subtotal minus discount, never below zero.
    pub fn total(&self) -> Money {
        self.subtotal().saturating_sub(self.discount)
    }

    pub fn summary(&self) -> CartTotals {
        CartTotals::from(self)
    }
}

// =============================================================================
// Totals Snapshot
// =============================================================================

/// Cart totals for the payment summary panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub item_count: usize,
    pub total_quantity: i64,
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
}

impl From<&Cart> for CartTotals {
    fn from(cart: &Cart) -> Self {
        CartTotals {
            item_count: cart.item_count(),
            total_quantity: cart.total_quantity(),
            subtotal: cart.subtotal(),
            discount: cart.discount(),
            tax: cart.tax(),
            total: cart.total(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
