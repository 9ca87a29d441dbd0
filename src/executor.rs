//! Result execution module - runs the action a user picked on a result item

use crate::core::item::{Action, ActionKind};
use crate::error::QalcResult;
use crate::platform::SystemActions;

/// Run `action` against the system
pub fn execute(action: &Action, system: &dyn SystemActions) -> QalcResult<()> {
    tracing::debug!("Executing action {} ({})", action.id, action.title);
    match &action.kind {
        ActionKind::CopyToClipboard { text } => system.set_clipboard_text(text),
        ActionKind::OpenUrl { url } => system.open_url(url),
    }
}
