//! Keyboard shortcuts for the run dialog.
//!
//! A pure resolver: any UI shell reports the key and the dialog state, and
//! gets back what the key should do.

use crate::models::{ExecutionStatus, Outcome};

/// Dialog state relevant to shortcut handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortcutContext {
    pub dialog_focused: bool,
    pub execution_status: ExecutionStatus,
    pub action_pending: bool,
    /// Focus is inside a text input or textarea.
    pub typing: bool,
    /// The reason field already has non-blank content.
    pub reason_present: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    Finalize(Outcome),
    /// The outcome needs a reason and none is filled in: prompt for one.
    RequestReason(Outcome),
}

pub fn resolve(key: char, ctx: &ShortcutContext) -> Option<ShortcutAction> {
    if !ctx.dialog_focused
        || ctx.typing
        || ctx.action_pending
        || ctx.execution_status != ExecutionStatus::InProgress
    {
        return None;
    }

    let outcome = match key.to_ascii_lowercase() {
        'p' => Outcome::Passed,
        'f' => Outcome::Failed,
        'b' => Outcome::Blocked,
        's' => Outcome::Skipped,
        _ => return None,
    };

    if outcome.requires_reason() && !ctx.reason_present {
        Some(ShortcutAction::RequestReason(outcome))
    } else {
        Some(ShortcutAction::Finalize(outcome))
    }
}
