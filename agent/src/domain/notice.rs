//! Notice text rendering — pure string building.

use outpost_common::{CompletionNotice, NotificationPayload};

/// Appended when the changelog was cut.
pub const TRUNCATION_MARKER: &str = "…";

/// Callback identifier carried by the "Update now" button.
pub const UPDATE_NOW_CALLBACK: &str = "update_now";

/// Optional button attached to a notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractiveAction {
    pub label: String,
    pub callback: String,
}

impl InteractiveAction {
    #[must_use]
    pub fn update_now() -> Self {
        Self {
            label: "Update now".to_string(),
            callback: UPDATE_NOW_CALLBACK.to_string(),
        }
    }
}

/// Cuts `text` to at most `budget` characters (not bytes), so multi-byte
/// characters are never split. The marker is appended exactly when `text`
/// is longer than `budget`, whitespace included.
#[must_use]
pub fn truncate_changelog(text: &str, budget: usize) -> String {
    match text.char_indices().nth(budget) {
        None => text.to_string(),
        Some((cut, _)) => {
            let mut out = text[..cut].trim_end().to_string();
            out.push_str(TRUNCATION_MARKER);
            out
        }
    }
}

/// Builds the payload for one subscriber.
#[must_use]
pub fn notification_payload(
    chat_ref: outpost_common::ChatRef,
    old_version: &str,
    new_version: &str,
    changelog: &str,
    budget: usize,
) -> NotificationPayload {
    NotificationPayload {
        chat_ref,
        old_version: old_version.to_string(),
        new_version: new_version.to_string(),
        truncated_changelog: truncate_changelog(changelog, budget),
    }
}

#[must_use]
pub fn render_update_available(payload: &NotificationPayload) -> String {
    let mut text = format!(
        "A new version is available: {} → {}",
        payload.old_version, payload.new_version
    );
    let changelog = payload.truncated_changelog.trim();
    if !changelog.is_empty() {
        text.push_str("\n\nWhat's new:\n");
        text.push_str(changelog);
    }
    text
}

#[must_use]
pub fn render_update_started(old_version: &str, new_version: &str) -> String {
    format!("Updating {old_version} → {new_version}. The agent will restart shortly.")
}

#[must_use]
pub fn render_update_complete(notice: &CompletionNotice) -> String {
    format!(
        "Update complete: {} → {}.",
        notice.old_version, notice.new_version
    )
}

/// Sent when the agent restarts on a different version than the notice expected.
#[must_use]
pub fn render_update_not_applied(notice: &CompletionNotice, running: &str) -> String {
    format!(
        "The update to {} did not complete; still running {running}. See the update log for details.",
        notice.new_version
    )
}

#[must_use]
pub fn render_update_failed(reason: &str) -> String {
    format!("Update failed. {reason}")
}
