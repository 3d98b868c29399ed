//! `outpost run` — the long-running agent.
//!
//! Startup delivers any pending completion notice, then the background
//! checker runs until SIGINT or SIGTERM cancels it.

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::app::App;
use crate::application::services::completion::deliver_pending_completion;

/// # Errors
///
/// Returns an error if no sender is configured or the ledger is unreadable.
pub async fn run(app: &App) -> Result<()> {
    let sender = app.require_sender()?;
    let version = app.config.current_version.as_str();
    info!(version, "outpost agent starting");

    let notices = app.notices();
    let lock = app.lock();
    if let Err(e) =
        deliver_pending_completion(notices.as_ref(), sender.as_ref(), lock.as_ref(), version).await
    {
        warn!(error = %e, "pending completion notice not processed");
    }

    let checker = app.checker(sender)?;
    let cancel = CancellationToken::new();
    let watcher = tokio::spawn(cancel_on_shutdown_signal(cancel.clone()));

    checker.run(cancel.clone()).await;
    if !cancel.is_cancelled() {
        // Development builds return immediately; stay up until told to stop.
        cancel.cancelled().await;
    }
    watcher.abort();
    info!("outpost agent stopped");
    Ok(())
}

async fn cancel_on_shutdown_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("interrupt received"),
                    _ = term.recv() => info!("termination requested"),
                }
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    cancel.cancel();
}
