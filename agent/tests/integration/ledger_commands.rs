//! `seen` and `subscribers` against a temporary state directory.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn outpost(state: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("outpost"));
    cmd.env("NO_COLOR", "1")
        .env("RUST_LOG", "off")
        .env("OUTPOST_STATE_DIR", state.path());
    cmd
}

#[test]
fn test_seen_then_subscribers_json() {
    let state = TempDir::new().expect("tempdir");

    outpost(&state)
        .args(["seen", "Alice", "--chat", "-100200"])
        .assert()
        .success();
    outpost(&state)
        .args(["seen", "bob", "--chat", "7"])
        .assert()
        .success();

    let output = outpost(&state)
        .args(["subscribers", "--json"])
        .output()
        .expect("run outpost");
    assert!(output.status.success());
    let ledger: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("ledger JSON");
    assert_eq!(ledger["subscribers"]["alice"]["chat_ref"], -100_200);
    assert_eq!(ledger["subscribers"]["alice"]["active"], true);
    assert_eq!(ledger["subscribers"]["bob"]["chat_ref"], 7);
    assert!(state.path().join("subscribers.json").exists());
}

#[test]
fn test_subscribers_empty_ledger() {
    let state = TempDir::new().expect("tempdir");
    outpost(&state)
        .arg("subscribers")
        .assert()
        .success()
        .stdout(predicate::str::contains("No subscribers yet."));
}

#[test]
fn test_seen_rejects_blank_identity() {
    let state = TempDir::new().expect("tempdir");
    outpost(&state)
        .args(["seen", "  ", "--chat", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("identity must not be empty"));
}
