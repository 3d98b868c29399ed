//! `outpost subscribers` — list ledger records.

use anyhow::{Context, Result};

use crate::app::App;

/// # Errors
///
/// Returns an error if the ledger cannot be read.
pub fn run(app: &App) -> Result<()> {
    let snapshot = app.ledger()?.snapshot();

    if app.json {
        let text = serde_json::to_string_pretty(&snapshot).context("serializing ledger")?;
        println!("{text}");
        return Ok(());
    }

    let out = &app.output;
    if snapshot.subscribers.is_empty() {
        out.info("No subscribers yet.");
        return Ok(());
    }
    out.header(&format!("{} subscriber(s)", snapshot.subscribers.len()));
    for (identity, record) in &snapshot.subscribers {
        let state = if record.active { "active" } else { "inactive" };
        println!("  {identity:<24} chat {:<14} {state}", record.chat_ref);
        let notified: Vec<&str> = record.notified_versions.iter().map(String::as_str).collect();
        out.detail(&format!(
            "last seen {}; notified: {}",
            record.last_seen.format("%Y-%m-%d %H:%M UTC"),
            if notified.is_empty() {
                "-".to_string()
            } else {
                notified.join(", ")
            }
        ));
    }
    Ok(())
}
