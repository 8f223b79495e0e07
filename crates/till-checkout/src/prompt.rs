//! Operator confirmation and text-input dialogs.
//!
//! Destructive or note-taking actions ask through this trait instead of a
//! concrete UI, so the workflows run the same under a terminal, a GUI, or a
//! scripted test.

use async_trait::async_trait;

#[async_trait]
pub trait Prompter: Send + Sync {
    /// Yes/no question. `false` when the operator declines or dismisses.
    async fn confirm(&self, message: &str) -> bool;

    /// Free-text question. `None` when the operator dismisses the dialog.
    async fn prompt_text(&self, message: &str) -> Option<String>;
}
