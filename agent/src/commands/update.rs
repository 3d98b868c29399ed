//! `outpost update` — external trigger for an immediate update.
//!
//! Goes through the same detached path as the in-agent "Update now" action
//! and stays alive until the background task has launched the apply script
//! or failed. When a Telegram token is configured the requesting chat is
//! told about the start and about any failure.

use anyhow::Result;
use clap::Args;
use outpost_common::ChatRef;
use serde_json::json;
use tracing::warn;

use crate::app::App;
use crate::application::services::update::UpdateOutcome;
use crate::domain::notice::render_update_failed;

#[derive(Args)]
pub struct UpdateArgs {
    /// Conversation handle that requested the update
    #[arg(long = "chat", allow_negative_numbers = true)]
    pub chat_ref: ChatRef,
}

/// # Errors
///
/// Returns the orchestrator's error, whose message is human-readable.
pub async fn run(app: &App, args: &UpdateArgs) -> Result<()> {
    let orchestrator = app.orchestrator();
    let sender = app.sender();

    let triggered = match orchestrator.trigger(args.chat_ref, sender.clone()).await {
        Ok(triggered) => triggered,
        Err(e) => {
            // Background failures are reported by the orchestrator itself.
            if let Some(sender) = &sender {
                let text = render_update_failed(&e.to_string());
                if let Err(err) = sender.deliver(args.chat_ref, &text, None).await {
                    warn!(chat_ref = args.chat_ref, error = %err, "could not notify requesting chat");
                }
            }
            return Err(e.into());
        }
    };

    if !app.json {
        if let UpdateOutcome::Started { from, to } = &triggered.outcome {
            app.output.info(&format!("Downloading {to} (running {from})"));
        }
    }

    let outcome = triggered.finished().await?;
    if app.json {
        println!("{}", outcome_json(&outcome));
        return Ok(());
    }
    match outcome {
        UpdateOutcome::NoUpdateNeeded { current, latest } => {
            app.output
                .success(&format!("No update needed (running {current}, latest {latest})"));
        }
        UpdateOutcome::Launched { from, to } | UpdateOutcome::Started { from, to } => {
            app.output.success(&format!("Updating {from} → {to}"));
            app.output
                .detail(&format!("progress: {}", app.config.update_log_path().display()));
        }
    }
    Ok(())
}

fn outcome_json(outcome: &UpdateOutcome) -> serde_json::Value {
    match outcome {
        UpdateOutcome::NoUpdateNeeded { current, latest } => json!({
            "status": "up_to_date",
            "current": current,
            "latest": latest,
        }),
        UpdateOutcome::Launched { from, to } | UpdateOutcome::Started { from, to } => json!({
            "status": "launched",
            "from": from,
            "to": to,
        }),
    }
}
