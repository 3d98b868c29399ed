//! Delivery of the pending "update complete" marker on startup.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use outpost_agent::application::ports::UpdateLock;
use outpost_agent::application::services::completion::{
    CompletionOutcome, deliver_pending_completion,
};
use outpost_agent::domain::DeliveryError;
use outpost_common::CompletionNotice;

use crate::mocks::{Journal, MemoryLock, MemoryNotices, RecordingSender};

fn notice() -> CompletionNotice {
    CompletionNotice {
        chat_ref: 11,
        old_version: "v1.0.0".to_string(),
        new_version: "v1.1.0".to_string(),
    }
}

#[tokio::test]
async fn test_nothing_pending_sends_nothing() {
    let notices = MemoryNotices::default();
    let sender = RecordingSender::default();
    let lock = MemoryLock::new(Journal::default());

    let outcome = deliver_pending_completion(&notices, &sender, &lock, "v1.1.0")
        .await
        .unwrap();

    assert_eq!(outcome, CompletionOutcome::NothingPending);
    assert!(sender.sent().is_empty());
}

#[tokio::test]
async fn test_matching_version_reports_complete_once() {
    let notices = MemoryNotices::holding(notice());
    let sender = RecordingSender::default();
    let lock = MemoryLock::new(Journal::default());

    let outcome = deliver_pending_completion(&notices, &sender, &lock, "v1.1.0")
        .await
        .unwrap();

    assert_eq!(outcome, CompletionOutcome::ReportedComplete);
    let sent = sender.sent_to(11);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].text, "Update complete: v1.0.0 → v1.1.0.");
    assert!(notices.current().is_none());

    let again = deliver_pending_completion(&notices, &sender, &lock, "v1.1.0")
        .await
        .unwrap();
    assert_eq!(again, CompletionOutcome::NothingPending);
    assert_eq!(sender.sent().len(), 1);
}

#[tokio::test]
async fn test_old_version_after_script_exit_reports_not_applied() {
    let notices = MemoryNotices::holding(notice());
    let sender = RecordingSender::default();
    let lock = MemoryLock::new(Journal::default());

    let outcome = deliver_pending_completion(&notices, &sender, &lock, "v1.0.0")
        .await
        .unwrap();

    assert_eq!(outcome, CompletionOutcome::ReportedNotApplied);
    assert!(sender.sent()[0].text.contains("did not complete"));
    assert!(notices.current().is_none());
}

#[tokio::test]
async fn test_old_version_while_script_runs_keeps_marker() {
    let notices = MemoryNotices::holding(notice());
    let sender = RecordingSender::default();
    let lock = MemoryLock::held_by_other(Journal::default());
    assert!(lock.is_in_progress());

    let outcome = deliver_pending_completion(&notices, &sender, &lock, "v1.0.0")
        .await
        .unwrap();

    assert_eq!(outcome, CompletionOutcome::StillApplying);
    assert!(sender.sent().is_empty());
    assert_eq!(notices.current(), Some(notice()));
}

#[tokio::test]
async fn test_failed_delivery_still_clears_marker() {
    let notices = MemoryNotices::holding(notice());
    let sender = RecordingSender::default();
    sender.fail_for(11, DeliveryError::Other("HTTP 502".to_string()));
    let lock = MemoryLock::new(Journal::default());

    deliver_pending_completion(&notices, &sender, &lock, "v1.1.0")
        .await
        .unwrap();

    assert!(notices.current().is_none());
}
