//! # Till Register Entry Point
//!
//! ```text
//! till --config ./till.toml --token eyJ...
//!   │
//!   └──► till_terminal::run ──► Session ──► PosApi (REST)
//! ```
//!
//! The actual setup is in lib.rs so the command layer stays testable.

use clap::Parser;
use till_terminal::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    till_terminal::run(args).await
}
