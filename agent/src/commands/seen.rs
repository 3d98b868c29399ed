//! `outpost seen` — record that a subscriber interacted with the agent.

use anyhow::{Context, Result};
use clap::Args;
use outpost_common::ChatRef;

use crate::app::App;
use crate::application::ports::SubscriberStore as _;

#[derive(Args)]
pub struct SeenArgs {
    /// Subscriber identity (case-insensitive)
    pub identity: String,

    /// Conversation handle notices are sent to
    #[arg(long = "chat", allow_negative_numbers = true)]
    pub chat_ref: ChatRef,
}

/// # Errors
///
/// Returns an error if the identity is blank or the ledger cannot be written.
pub fn run(app: &App, args: &SeenArgs) -> Result<()> {
    if args.identity.trim().is_empty() {
        anyhow::bail!("identity must not be empty");
    }
    app.ledger()?
        .record_interaction(&args.identity, args.chat_ref)
        .context("recording interaction")?;
    app.output
        .success(&format!("Recorded {} (chat {})", args.identity.trim(), args.chat_ref));
    Ok(())
}
