//! Held-bill commands: hold, sync, resume, complete, cancel.

use till_checkout::CheckoutResult;

use super::cart::render_cart;
use super::Command;
use crate::Shell;

pub async fn execute(shell: &mut Shell, command: Command) -> CheckoutResult<()> {
    let workflow = shell.session.hold();
    match command {
        Command::Hold => match workflow.hold(&shell.prompter).await? {
            Some(invoice) => println!("✓ Đã tạm giữ {} (#{})", invoice.code, invoice.id),
            None => println!("Đã hủy"),
        },
        Command::Sync => {
            let invoice = workflow.update_held().await?;
            println!("✓ Đã cập nhật {} · {}", invoice.code, invoice.total);
        }
        Command::Resume(invoice_id) => {
            let invoice = workflow.resume(invoice_id).await?;
            println!("✓ Tiếp tục {}", invoice.code);
            if let Some(note) = &invoice.note {
                println!("  Ghi chú: {note}");
            }
            print!("{}", shell.session.store().with_cart(render_cart));
        }
        Command::Complete(method) => {
            let invoice = workflow.complete(method).await?;
            println!(
                "✓ Hoàn tất {} · {} · {}",
                invoice.code, invoice.total, method
            );
        }
        Command::Cancel => {
            if workflow.cancel(&shell.prompter).await? {
                println!("✓ Đã hủy hóa đơn tạm giữ");
            } else {
                println!("Giữ nguyên hóa đơn");
            }
        }
        _ => {}
    }
    Ok(())
}
