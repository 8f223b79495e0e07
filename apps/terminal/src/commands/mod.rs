//! # Register Commands
//!
//! One line of operator input becomes one [`Command`].
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs       ◄─── You are here (parsing, dispatch)
//! ├── cart.rs      ◄─── show / add / qty / rm / note / customer / table /
//! │                     type / promos / promo
//! ├── checkout.rs  ◄─── pay
//! └── hold.rs      ◄─── hold / sync / resume / complete / cancel
//! ```
//!
//! ## Examples
//! ```text
//! add 1 25000 Cà phê sữa x2
//! promos giam
//! promo GIAM10
//! pay visa
//! hold
//! resume 1042
//! ```

pub mod cart;
pub mod checkout;
pub mod hold;

use std::str::FromStr;

use thiserror::Error;
use till_checkout::CheckoutError;
use till_core::{Customer, EntityId, Money, OrderType, PaymentMethod, Product};

use crate::Shell;

pub const HELP: &str = "\
Giỏ hàng:
  show                              xem giỏ hàng
  add <id> <giá> <tên...> [xN]      thêm sản phẩm
  qty <id> <n>                      đổi số lượng (0 = xóa)
  rm <id>                           xóa dòng
  note <id> [ghi chú...]            ghi chú cho dòng (trống = xóa)
  customer <id> <tên...> | none     khách hàng
  table <bàn> | none                bàn
  type dine-in|takeaway|delivery    loại đơn
  promos [mã]                       khuyến mãi áp dụng được
  promo <mã> | none                 chọn khuyến mãi
Thanh toán:
  pay cash|visa|master|jcb|transfer|vnpay
Hóa đơn tạm giữ:
  hold | sync | resume <id> | complete <phương thức> | cancel
Khác:
  help | quit";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Lệnh không hợp lệ: {0} (gõ 'help')")]
    Unknown(String),

    #[error("Thiếu {what} cho lệnh '{command}'")]
    Missing { command: &'static str, what: &'static str },

    #[error("{what} không hợp lệ: {value}")]
    Invalid { what: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Show,
    Add { product: Product, quantity: i64 },
    Quantity { product_id: EntityId, quantity: i64 },
    Remove { product_id: EntityId },
    Note { product_id: EntityId, note: Option<String> },
    Customer(Option<Customer>),
    Table(Option<String>),
    OrderType(OrderType),
    Promotions { search: Option<String> },
    Promotion(Option<String>),
    Pay(PaymentMethod),
    Hold,
    Sync,
    Resume(EntityId),
    Complete(PaymentMethod),
    Cancel,
    Help,
    Quit,
}

/// What the loop does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

// =============================================================================
// Parsing
// =============================================================================

fn id(command: &'static str, raw: Option<&str>) -> Result<EntityId, ParseError> {
    let raw = raw.ok_or(ParseError::Missing { command, what: "id" })?;
    raw.parse().map_err(|_| ParseError::Invalid {
        what: "id",
        value: raw.to_string(),
    })
}

fn quantity(raw: &str) -> Result<i64, ParseError> {
    raw.parse().map_err(|_| ParseError::Invalid {
        what: "số lượng",
        value: raw.to_string(),
    })
}

/// `25000`, `25.000` and `25,000` all mean 25 000 đồng.
fn price(raw: &str) -> Result<Money, ParseError> {
    let digits: String = raw.chars().filter(|c| *c != '.' && *c != ',').collect();
    digits
        .parse::<i64>()
        .ok()
        .filter(|p| *p >= 0)
        .map(Money::from_dong)
        .ok_or_else(|| ParseError::Invalid {
            what: "giá",
            value: raw.to_string(),
        })
}

fn method(command: &'static str, raw: Option<&str>) -> Result<PaymentMethod, ParseError> {
    let raw = raw.ok_or(ParseError::Missing {
        command,
        what: "phương thức thanh toán",
    })?;
    PaymentMethod::from_str(raw).map_err(|_| ParseError::Invalid {
        what: "phương thức thanh toán",
        value: raw.to_string(),
    })
}

fn rest(words: &[&str]) -> Option<String> {
    let text = words.join(" ");
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn optional_rest(words: &[&str]) -> Option<String> {
    rest(words).filter(|t| !t.eq_ignore_ascii_case("none"))
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>, ParseError> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&head, args)) = words.split_first() else {
        return Ok(None);
    };

    let command = match head.to_lowercase().as_str() {
        "show" | "ls" => Command::Show,
        "add" => {
            let product_id = id("add", args.first().copied())?;
            let unit_price = price(args.get(1).ok_or(ParseError::Missing {
                command: "add",
                what: "giá",
            })?)?;

            let mut name_words = args.get(2..).unwrap_or_default().to_vec();
            let mut qty = 1;
            if let Some(last) = name_words.last() {
                if let Some(n) = last.strip_prefix('x').filter(|n| !n.is_empty()) {
                    if n.chars().all(|c| c.is_ascii_digit()) {
                        qty = quantity(n)?;
                        name_words.pop();
                    }
                }
            }
            let name = rest(&name_words).ok_or(ParseError::Missing {
                command: "add",
                what: "tên sản phẩm",
            })?;
            Command::Add {
                product: Product::new(product_id, name, unit_price),
                quantity: qty,
            }
        }
        "qty" => Command::Quantity {
            product_id: id("qty", args.first().copied())?,
            quantity: quantity(args.get(1).ok_or(ParseError::Missing {
                command: "qty",
                what: "số lượng",
            })?)?,
        },
        "rm" | "remove" => Command::Remove {
            product_id: id("rm", args.first().copied())?,
        },
        "note" => Command::Note {
            product_id: id("note", args.first().copied())?,
            note: rest(args.get(1..).unwrap_or_default()),
        },
        "customer" => match args.first() {
            Some(word) if word.eq_ignore_ascii_case("none") => Command::Customer(None),
            first => {
                let customer_id = id("customer", first.copied())?;
                let name = rest(args.get(1..).unwrap_or_default()).ok_or(ParseError::Missing {
                    command: "customer",
                    what: "tên khách hàng",
                })?;
                Command::Customer(Some(Customer {
                    id: customer_id,
                    name,
                    phone: None,
                    points: 0,
                }))
            }
        },
        "table" => Command::Table(optional_rest(args)),
        "type" => {
            let raw = rest(args).ok_or(ParseError::Missing {
                command: "type",
                what: "loại đơn",
            })?;
            Command::OrderType(OrderType::from_str(&raw).map_err(|_| ParseError::Invalid {
                what: "loại đơn",
                value: raw.clone(),
            })?)
        }
        "promos" => Command::Promotions { search: rest(args) },
        "promo" => {
            if args.is_empty() {
                return Err(ParseError::Missing {
                    command: "promo",
                    what: "mã khuyến mãi",
                });
            }
            Command::Promotion(optional_rest(args))
        }
        "pay" => Command::Pay(method("pay", args.first().copied())?),
        "hold" => Command::Hold,
        "sync" => Command::Sync,
        "resume" => Command::Resume(id("resume", args.first().copied())?),
        "complete" => Command::Complete(method("complete", args.first().copied())?),
        "cancel" => Command::Cancel,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(ParseError::Unknown(other.to_string())),
    };

    Ok(Some(command))
}

// =============================================================================
// Dispatch
// =============================================================================

/// Runs one command. Domain failures are reported to the operator here;
/// only console I/O errors propagate.
pub async fn execute(shell: &mut Shell, command: Command) -> anyhow::Result<Flow> {
    let result = match command {
        Command::Quit => return Ok(Flow::Quit),
        Command::Help => {
            println!("{HELP}");
            Ok(())
        }
        Command::Show
        | Command::Add { .. }
        | Command::Quantity { .. }
        | Command::Remove { .. }
        | Command::Note { .. }
        | Command::Customer(_)
        | Command::Table(_)
        | Command::OrderType(_)
        | Command::Promotions { .. }
        | Command::Promotion(_) => cart::execute(shell, command).await,
        Command::Pay(method) => checkout::pay(shell, method).await,
        Command::Hold
        | Command::Sync
        | Command::Resume(_)
        | Command::Complete(_)
        | Command::Cancel => hold::execute(shell, command).await,
    };

    if let Err(e) = result {
        report(&e);
    }
    Ok(Flow::Continue)
}

fn report(err: &CheckoutError) {
    println!("✗ {}", err.user_message());
    if err.navigation().is_some() {
        println!("  Vui lòng đăng nhập lại rồi khởi động lại máy tính tiền.");
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
