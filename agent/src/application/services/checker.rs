//! Application service — periodic release check and subscriber fan-out.
//!
//! One tick: fetch latest → compare → for each active subscriber:
//! authorize → dedupe → deliver → record. Errors are logged and end the
//! tick; the loop itself never stops until cancelled.

use std::sync::Arc;
use std::time::Duration;

use outpost_common::{DEV_VERSION, Release};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::ports::{Authorizer, MessageSender, ReleaseFeed, SubscriberStore};
use crate::domain::notice::{notification_payload, render_update_available};
use crate::domain::{ActiveSubscriber, DeliveryError, InteractiveAction, should_update};

/// Static knobs for the checker.
#[derive(Debug, Clone)]
pub struct CheckerSettings {
    pub current_version: String,
    pub interval: Duration,
    pub changelog_chars: usize,
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Running a development build; checks are disabled.
    DevBuild,
    /// Feed unavailable or versions not comparable.
    Skipped,
    UpToDate { latest: String },
    Notified(FanOutReport),
    Cancelled(FanOutReport),
}

/// Per-subscriber tallies for one fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanOutReport {
    pub version: String,
    pub sent: usize,
    pub already_notified: usize,
    pub unauthorized: usize,
    pub deactivated: usize,
    pub failed: usize,
}

pub struct BackgroundChecker {
    settings: CheckerSettings,
    feed: Arc<dyn ReleaseFeed>,
    store: Arc<dyn SubscriberStore>,
    sender: Arc<dyn MessageSender>,
    authorizer: Arc<dyn Authorizer>,
}

impl BackgroundChecker {
    #[must_use]
    pub fn new(
        settings: CheckerSettings,
        feed: Arc<dyn ReleaseFeed>,
        store: Arc<dyn SubscriberStore>,
        sender: Arc<dyn MessageSender>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        Self {
            settings,
            feed,
            store,
            sender,
            authorizer,
        }
    }

    /// Ticks immediately, then every interval, until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        if self.settings.current_version == DEV_VERSION {
            info!("development build, background update checks disabled");
            return;
        }
        let mut interval = tokio::time::interval(self.settings.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(every = ?self.settings.interval, "background update checker started");

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let outcome = self.tick(&cancel).await;
                    debug!(?outcome, "update check finished");
                }
            }
        }
        info!("background update checker stopped");
    }

    /// One check-and-notify pass.
    pub async fn tick(&self, cancel: &CancellationToken) -> TickOutcome {
        let current = &self.settings.current_version;
        if current == DEV_VERSION {
            return TickOutcome::DevBuild;
        }

        let release = match self.feed.fetch_latest().await {
            Ok(release) => release,
            Err(e) => {
                warn!(error = %e, "update check: cannot fetch latest release");
                return TickOutcome::Skipped;
            }
        };

        match should_update(current, &release.tag) {
            Ok(true) => {}
            Ok(false) => {
                debug!(current = %current, latest = %release.tag, "up to date");
                return TickOutcome::UpToDate {
                    latest: release.tag,
                };
            }
            Err(e) => {
                warn!(current = %current, latest = %release.tag, error = %e,
                    "update check: versions not comparable");
                return TickOutcome::Skipped;
            }
        }

        let mut report = FanOutReport {
            version: release.tag.clone(),
            ..FanOutReport::default()
        };
        for subscriber in self.store.active_subscribers() {
            if cancel.is_cancelled() {
                info!(version = %release.tag, "fan-out interrupted by shutdown");
                return TickOutcome::Cancelled(report);
            }
            self.notify_one(&subscriber, &release, &mut report).await;
        }

        info!(
            version = %report.version,
            sent = report.sent,
            deactivated = report.deactivated,
            failed = report.failed,
            "update notices dispatched"
        );
        TickOutcome::Notified(report)
    }

    async fn notify_one(
        &self,
        subscriber: &ActiveSubscriber,
        release: &Release,
        report: &mut FanOutReport,
    ) {
        let identity = subscriber.identity.as_str();

        if !self.authorizer.is_authorized(identity) {
            debug!(identity, "skipping subscriber no longer authorized");
            report.unauthorized += 1;
            return;
        }
        if self.store.is_notified(identity, &release.tag) {
            report.already_notified += 1;
            return;
        }

        let payload = notification_payload(
            subscriber.chat_ref,
            &self.settings.current_version,
            &release.tag,
            &release.body,
            self.settings.changelog_chars,
        );
        let text = render_update_available(&payload);
        let action = InteractiveAction::update_now();

        match self
            .sender
            .deliver(subscriber.chat_ref, &text, Some(&action))
            .await
        {
            Ok(()) => {
                report.sent += 1;
                if let Err(e) = self.store.mark_notified(identity, &release.tag) {
                    warn!(identity, error = %e, "notice sent but not recorded");
                }
            }
            Err(DeliveryError::Unreachable(reason)) => {
                report.deactivated += 1;
                info!(identity, %reason, "subscriber unreachable, deactivating");
                if let Err(e) = self.store.set_inactive(identity) {
                    warn!(identity, error = %e, "cannot deactivate subscriber");
                }
            }
            Err(e @ DeliveryError::Other(_)) => {
                report.failed += 1;
                warn!(identity, error = %e, "notice delivery failed, will retry next check");
            }
        }
    }
}
