//! # Till Register Shell
//!
//! A line-oriented front end for one register. Everything that matters
//! (cart rules, checkout, held bills, auto-sync) lives in the library crates;
//! this crate reads commands, forwards them and prints what came back.
//!
//! ## Module Organization
//! ```text
//! till_terminal/
//! ├── lib.rs          ◄─── You are here (startup & command loop)
//! ├── console.rs      ◄─── Shared stdin reader + Prompter impl
//! └── commands/
//!     ├── mod.rs      ◄─── Parsing and dispatch
//!     ├── cart.rs     ◄─── Cart edits, promotion picker, cart panel
//!     ├── checkout.rs ◄─── pay
//!     └── hold.rs     ◄─── hold / sync / resume / complete / cancel
//! ```

pub mod commands;
pub mod console;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use till_api::{HttpPosApi, TokenStore};
use till_checkout::{PosEvent, Session, TillConfig};
use till_core::Promotion;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use commands::Flow;
use console::{Console, ConsolePrompter};

/// Command line arguments.
#[derive(Debug, Parser)]
#[command(about = env!("CARGO_PKG_DESCRIPTION"), version)]
pub struct Args {
    #[arg(long, help = "Path to till.toml (defaults to the platform config dir)")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Bearer token to store before starting")]
    pub token: Option<String>,
}

/// What the command handlers work against.
pub struct Shell {
    pub session: Session,
    pub prompter: ConsolePrompter,
    /// Last promotion listing, so `promo <code>` can pick from it.
    pub promotions: Vec<Promotion>,
}

/// Runs the register until `quit` or end of input.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  1. Initialize tracing (stderr, RUST_LOG overrides)                     │
/// │  2. Load till.toml + TILL_* environment overrides                       │
/// │  3. Load the persisted token, store --token if given                    │
/// │  4. Build the HTTP client and start the Session (auto-sync task)        │
/// │  5. Print InvoiceCreated / PaymentVerified / SessionExpired events      │
/// │  6. Read, parse, execute until quit                                     │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run(args: Args) -> anyhow::Result<()> {
    init_tracing();

    let config = TillConfig::load(args.config).context("Failed to load register config")?;
    info!(
        base_url = %config.api.base_url,
        branch_id = ?config.operator.branch_id,
        "Starting Till register"
    );

    let tokens = match config.token_path() {
        Some(path) => TokenStore::load(path).context("Failed to load session token")?,
        None => TokenStore::in_memory(None),
    };
    if let Some(token) = args.token {
        tokens.set(token).await.context("Failed to store session token")?;
    }
    if !tokens.is_authenticated().await {
        println!("⚠ Chưa đăng nhập: dùng --token hoặc đăng nhập trên ứng dụng chính.");
    }

    let api = HttpPosApi::new(config.client_options(), tokens).context("Failed to build API client")?;
    let session = Session::start(Arc::new(api), Arc::new(config));
    let listener = spawn_event_listener(&session);

    let console = Console::stdin();
    let mut shell = Shell {
        session,
        prompter: ConsolePrompter::new(console.clone()),
        promotions: Vec::new(),
    };

    println!("Gõ 'help' để xem danh sách lệnh.");
    while let Some(line) = console.ask("till>").await? {
        let command = match commands::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("✗ {e}");
                continue;
            }
        };
        if commands::execute(&mut shell, command).await? == Flow::Quit {
            break;
        }
    }

    listener.abort();
    shell.session.shutdown().await;
    info!("Till register stopped");
    Ok(())
}

fn spawn_event_listener(session: &Session) -> JoinHandle<()> {
    let mut events = session.events().subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(PosEvent::InvoiceCreated { invoice_id }) => {
                    println!("\n• Hóa đơn #{invoice_id} đã được ghi nhận");
                }
                Ok(PosEvent::PaymentVerified {
                    transaction_id,
                    success,
                }) => {
                    if success {
                        println!("\n• Đã xác nhận chuyển khoản {transaction_id}");
                    } else {
                        println!("\n⚠ Chưa nhận được chuyển khoản {transaction_id}");
                    }
                }
                Ok(PosEvent::SessionExpired) => {
                    println!("\n⚠ Phiên đăng nhập đã hết hạn");
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event listener lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Initializes the tracing subscriber.
///
/// Logs go to stderr so they do not interleave with the prompt.
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=till=trace` - Trace the till crates only
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,till=debug,reqwest=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
