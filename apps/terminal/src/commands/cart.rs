//! # Cart Commands
//!
//! Edits of the session cart, plus the promotion picker.
//!
//! ```text
//! add / qty / rm / note / customer / table / type ──► CartStore (Local change)
//!                                                        │
//!                                     held bill? ──► AutoSync pushes it
//!
//! promos [search] ──► GET /pos/promotions/branch/{id}/active ──► filter
//! promo <code>    ──► eligibility + non-zero discount ──► attach
//! ```

use std::fmt::Write;

use chrono::Local;
use till_checkout::{CheckoutResult, Session};
use till_core::promotion::calculate_discount;
use till_core::{Cart, CoreError, Promotion, PromotionError};

use super::Command;
use crate::Shell;

pub async fn execute(shell: &mut Shell, command: Command) -> CheckoutResult<()> {
    let store = shell.session.store();
    match command {
        Command::Show => {}
        Command::Add { product, quantity } => {
            println!("+ {} x{}", product.name, quantity);
            store.add_item(product, quantity);
        }
        Command::Quantity { product_id, quantity } => {
            if store.with_cart(|cart| cart.find_item(product_id).is_none()) {
                return Err(CoreError::ItemNotInCart(product_id).into());
            }
            store.update_quantity(product_id, quantity);
        }
        Command::Remove { product_id } => {
            if !store.remove_item(product_id) {
                return Err(CoreError::ItemNotInCart(product_id).into());
            }
        }
        Command::Note { product_id, note } => {
            if !store.set_note(product_id, note.as_deref()) {
                return Err(CoreError::ItemNotInCart(product_id).into());
            }
        }
        Command::Customer(customer) => store.set_customer(customer),
        Command::Table(table) => store.set_selected_table(table),
        Command::OrderType(order_type) => store.set_order_type(order_type),
        Command::Promotions { search } => {
            shell.promotions = shell.session.available_promotions(search.as_deref()).await?;
            let subtotal = store.with_cart(Cart::subtotal);
            print!("{}", render_promotions(&shell.promotions, subtotal));
            return Ok(());
        }
        Command::Promotion(None) => store.set_promotion(None),
        Command::Promotion(Some(code)) => {
            let promotion = find_promotion(shell, &code).await?;
            let discount = shell
                .session
                .store()
                .apply_promotion(promotion, Local::now().naive_local())?;
            println!("Đã áp dụng {code}: -{discount}");
        }
        _ => return Ok(()),
    }

    print!("{}", shell.session.store().with_cart(render_cart));
    Ok(())
}

/// Looks `code` up in the last listing, refreshing it once if needed.
async fn find_promotion(shell: &mut Shell, code: &str) -> CheckoutResult<Promotion> {
    let matches = |p: &&Promotion| p.code.eq_ignore_ascii_case(code);
    if let Some(found) = shell.promotions.iter().find(matches) {
        return Ok(found.clone());
    }

    shell.promotions = available(&shell.session).await?;
    shell
        .promotions
        .iter()
        .find(matches)
        .cloned()
        .ok_or_else(|| {
            PromotionError::NotEligible {
                code: code.to_string(),
            }
            .into()
        })
}

async fn available(session: &Session) -> CheckoutResult<Vec<Promotion>> {
    session.available_promotions(None).await
}

// =============================================================================
// Rendering
// =============================================================================

/// The cart panel.
pub fn render_cart(cart: &Cart) -> String {
    let mut out = String::new();
    let totals = cart.summary();

    if let Some(invoice_id) = cart.current_invoice_id() {
        let _ = writeln!(out, "── Hóa đơn tạm giữ #{invoice_id} ──");
    }
    if cart.is_empty() {
        let _ = writeln!(out, "(giỏ hàng trống)");
        return out;
    }

    for item in cart.items() {
        let _ = writeln!(
            out,
            "  [{}] {:<24} x{:<3} {:>14}",
            item.product.id,
            item.product.name,
            item.quantity,
            item.line_total().to_string()
        );
        if let Some(note) = &item.note {
            let _ = writeln!(out, "        ↳ {note}");
        }
    }

    let _ = writeln!(out, "  Tạm tính   {:>14}", totals.subtotal.to_string());
    if let Some(promotion) = cart.promotion() {
        let _ = writeln!(
            out,
            "  KM {:<7} {:>14}",
            promotion.code,
            format!("-{}", totals.discount)
        );
    }
    let _ = writeln!(
        out,
        "  VAT {:>4}%  {:>14}",
        cart.tax_rate().percentage(),
        totals.tax.to_string()
    );
    let _ = writeln!(out, "  TỔNG       {:>14}", totals.total.to_string());

    let customer = cart.customer().map_or("khách lẻ", |c| c.name.as_str());
    let table = cart.selected_table().unwrap_or("-");
    let _ = writeln!(
        out,
        "  Khách: {customer} · Bàn: {table} · {}",
        cart.order_type()
    );
    out
}

/// The promotion picker listing, with what each would take off.
pub fn render_promotions(promotions: &[Promotion], subtotal: till_core::Money) -> String {
    if promotions.is_empty() {
        return "(không có khuyến mãi phù hợp)\n".to_string();
    }
    let mut out = String::new();
    for promotion in promotions {
        let _ = writeln!(
            out,
            "  {:<10} {:<28} -{}",
            promotion.code,
            promotion.name,
            calculate_discount(promotion, subtotal)
        );
    }
    out
}
