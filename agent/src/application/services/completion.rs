//! Application service — deliver the pending "update complete" notice once
//! the restarted agent comes up.

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::application::ports::{MessageSender, NoticeStore, UpdateLock};
use crate::domain::notice::{render_update_complete, render_update_not_applied};

/// What happened to the pending marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    NothingPending,
    /// Apply script still running; marker left for the next start.
    StillApplying,
    ReportedComplete,
    ReportedNotApplied,
}

/// Delivers and clears a pending completion marker.
///
/// The marker is cleared after one delivery attempt whatever its result:
/// the notice is informational and must not be sent twice.
///
/// # Errors
///
/// Returns an error only when the marker exists but cannot be read.
pub async fn deliver_pending_completion(
    notices: &dyn NoticeStore,
    sender: &dyn MessageSender,
    lock: &dyn UpdateLock,
    running_version: &str,
) -> Result<CompletionOutcome> {
    let Some(notice) = notices.load()? else {
        return Ok(CompletionOutcome::NothingPending);
    };

    let outcome = if notice.new_version == running_version {
        CompletionOutcome::ReportedComplete
    } else if lock.is_in_progress() {
        debug!(target_version = %notice.new_version, "apply script still running");
        return Ok(CompletionOutcome::StillApplying);
    } else {
        CompletionOutcome::ReportedNotApplied
    };

    let text = match outcome {
        CompletionOutcome::ReportedComplete => render_update_complete(&notice),
        _ => render_update_not_applied(&notice, running_version),
    };
    match sender.deliver(notice.chat_ref, &text, None).await {
        Ok(()) => info!(chat_ref = notice.chat_ref, ?outcome, "completion notice delivered"),
        Err(e) => warn!(chat_ref = notice.chat_ref, error = %e, "completion notice not delivered"),
    }
    notices.clear();
    Ok(outcome)
}
