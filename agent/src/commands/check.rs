//! `outpost check` — one-shot comparison of the running version and the
//! latest release. Read-only: takes no lock and notifies nobody.

use anyhow::{Context, Result};
use serde_json::json;

use crate::app::App;
use crate::application::ports::UpdateLock;
use crate::domain::should_update;

/// # Errors
///
/// Returns an error if the release feed cannot be read.
pub async fn run(app: &App) -> Result<()> {
    let current = app.config.current_version.as_str();
    let release = app
        .feed()
        .fetch_latest()
        .await
        .context("fetching latest release")?;

    let comparison = should_update(current, &release.tag);
    let update_available = matches!(comparison, Ok(true));
    let lock = app.lock();
    let in_progress = lock.is_in_progress();
    let owner = in_progress.then(|| lock.owner()).flatten();

    if app.json {
        println!(
            "{}",
            json!({
                "current": current,
                "latest": release.tag,
                "update_available": update_available,
                "comparable": comparison.is_ok(),
                "update_in_progress": in_progress,
                "update_owner_pid": owner,
            })
        );
        return Ok(());
    }

    let out = &app.output;
    match comparison {
        Ok(true) => out.info(&format!("Update available: {current} → {}", release.tag)),
        Ok(false) => out.success(&format!("Up to date ({current})")),
        Err(e) => out.warn(&format!(
            "Cannot compare {current} with {}: {e}",
            release.tag
        )),
    }
    if in_progress {
        match owner {
            Some(pid) => out.warn(&format!("An update is in progress (pid {pid}).")),
            None => out.warn("An update is in progress."),
        }
    }
    Ok(())
}
