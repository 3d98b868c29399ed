//! CLI surface: help, version and configuration errors.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;

fn outpost() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("outpost"));
    cmd.env("NO_COLOR", "1").env("RUST_LOG", "off");
    cmd
}

#[test]
fn test_cli_no_args_shows_help() {
    outpost()
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Self-updating background agent"));
}

#[test]
fn test_cli_help_lists_commands() {
    outpost()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("update"))
        .stdout(predicate::str::contains("subscribers"));
}

#[test]
fn test_version_command_shows_version() {
    outpost()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("outpost "));
}

#[test]
fn test_version_command_json() {
    let output = outpost()
        .args(["version", "--json"])
        .output()
        .expect("run outpost");
    assert!(output.status.success());
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("version output is JSON");
    assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
    assert!(value["build"].is_string());
}

#[test]
fn test_update_requires_chat() {
    outpost()
        .arg("update")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--chat"));
}

#[test]
fn test_invalid_config_is_reported() {
    outpost()
        .arg("subscribers")
        .env("OUTPOST_RELEASE_REPO", "nonsense")
        .assert()
        .failure()
        .stderr(predicate::str::contains("owner/name"));
}

#[test]
fn test_run_without_token_fails_fast() {
    let dir = tempfile::TempDir::new().expect("tempdir");
    outpost()
        .arg("run")
        .env("OUTPOST_STATE_DIR", dir.path())
        .env_remove("OUTPOST_TELEGRAM_TOKEN")
        .assert()
        .failure()
        .stderr(predicate::str::contains("OUTPOST_TELEGRAM_TOKEN"));
}
