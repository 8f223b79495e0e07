//! # Console I/O
//!
//! One stdin reader shared by the command loop and the dialogs, so a hold
//! note or a cancel confirmation is read from the same line stream as the
//! commands.

use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use till_checkout::Prompter;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing::warn;

#[derive(Clone)]
pub struct Console {
    lines: Arc<Mutex<Lines<BufReader<Stdin>>>>,
}

impl Console {
    pub fn stdin() -> Self {
        Console {
            lines: Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()).lines())),
        }
    }

    /// Prints `prompt` and reads one line. `None` at end of input.
    pub async fn ask(&self, prompt: &str) -> std::io::Result<Option<String>> {
        let mut stdout = std::io::stdout();
        write!(stdout, "{prompt} ")?;
        stdout.flush()?;
        self.lines.lock().await.next_line().await
    }
}

/// Accepts English and Vietnamese yes.
pub fn is_yes(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes" | "c" | "co" | "có" | "ok"
    )
}

/// Dialogs on the terminal. End of input dismisses.
pub struct ConsolePrompter {
    console: Console,
}

impl ConsolePrompter {
    pub fn new(console: Console) -> Self {
        ConsolePrompter { console }
    }
}

#[async_trait]
impl Prompter for ConsolePrompter {
    async fn confirm(&self, message: &str) -> bool {
        match self.console.ask(&format!("{message} [y/N]")).await {
            Ok(Some(answer)) => is_yes(&answer),
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "Could not read confirmation");
                false
            }
        }
    }

    async fn prompt_text(&self, message: &str) -> Option<String> {
        match self.console.ask(message).await {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Could not read input");
                None
            }
        }
    }
}
