//! # Pay Command
//!
//! Collects card fields when needed, runs the checkout and renders the
//! outcome the way the payment dialog would.

use std::fmt::Write;

use till_checkout::{CheckoutOutcome, CheckoutResult, Navigation, Prompter};
use till_core::{CardDetails, PaymentMethod};

use crate::Shell;

pub async fn pay(shell: &mut Shell, method: PaymentMethod) -> CheckoutResult<()> {
    let card = if method.is_card() {
        match read_card(&shell.prompter).await {
            Some(card) => Some(card),
            None => {
                println!("Đã hủy thanh toán");
                return Ok(());
            }
        }
    } else {
        None
    };

    let outcome = shell.session.checkout().checkout(method, card).await?;
    print!("{}", render_outcome(&outcome));

    if let Navigation::InvoiceDetail { invoice_id, after } = outcome.navigation() {
        tokio::time::sleep(*after).await;
        println!("→ Chi tiết hóa đơn #{invoice_id}");
    }
    Ok(())
}

async fn read_card(prompter: &dyn Prompter) -> Option<CardDetails> {
    Some(CardDetails {
        card_number: prompter.prompt_text("Số thẻ:").await?,
        card_holder: prompter.prompt_text("Chủ thẻ:").await?,
        expiry: prompter.prompt_text("Hết hạn (MM/YY):").await?,
        cvv: prompter.prompt_text("CVV:").await?,
    })
}

pub fn render_outcome(outcome: &CheckoutOutcome) -> String {
    let mut out = String::new();
    match outcome {
        CheckoutOutcome::Settled { receipt, .. } => {
            let _ = writeln!(out, "✓ Thanh toán thành công");
            let _ = writeln!(out, "  Hóa đơn     {}", receipt.code);
            let _ = writeln!(out, "  Tổng        {}", receipt.total);
            let _ = writeln!(out, "  Phương thức {}", receipt.method);
            if receipt.points_earned > 0 {
                let _ = writeln!(out, "  Điểm tích   +{}", receipt.points_earned);
            }
            if let Some(tx) = &receipt.transaction_id {
                let _ = writeln!(out, "  Mã GD       {tx}");
            }
        }
        CheckoutOutcome::PartiallySettled { warning, .. }
        | CheckoutOutcome::HeldForLater { warning, .. } => {
            let _ = writeln!(out, "⚠ {warning}");
        }
        CheckoutOutcome::Redirect { invoice_id, url, .. } => {
            let _ = writeln!(out, "Hóa đơn #{invoice_id} chờ thanh toán VNPay");
            let _ = writeln!(out, "Mở liên kết: {url}");
        }
    }

    if *outcome.navigation() == Navigation::TableSelection {
        let _ = writeln!(out, "→ Quay lại sơ đồ bàn");
    }
    out
}
