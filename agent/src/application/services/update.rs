//! Application service — self-update orchestration.
//!
//! Sequence: check lock → fetch → validate → compare → lock → download →
//! compose and launch. Nothing is mutated before the lock is taken; every
//! failure after it releases the lock and purges staging. A successful
//! launch deliberately leaves the lock held: the apply script owns it.

use std::fmt;
use std::sync::Arc;

use outpost_common::{ChatRef, CompletionNotice, Release};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::ports::{
    ArtifactStager, MessageSender, NoticeStore, ReleaseFeed, ScriptLauncher, UpdateLock,
};
use crate::domain::notice::{render_update_failed, render_update_started};
use crate::domain::{EmbeddableVersion, UpdateError, should_update};

// ── Public types ──────────────────────────────────────────────────────────────

/// Where an update attempt currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStage {
    Idle,
    CheckLock,
    FetchRelease,
    ValidateVersions,
    CompareVersions,
    UpToDate,
    Locking,
    Downloading,
    ComposingAndLaunching,
    LaunchedDetached,
    Failed,
}

impl fmt::Display for UpdateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::CheckLock => "check_lock",
            Self::FetchRelease => "fetch_release",
            Self::ValidateVersions => "validate_versions",
            Self::CompareVersions => "compare_versions",
            Self::UpToDate => "up_to_date",
            Self::Locking => "locking",
            Self::Downloading => "downloading",
            Self::ComposingAndLaunching => "composing_and_launching",
            Self::LaunchedDetached => "launched_detached",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Successful end states of an update attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Latest release is not newer, or one side is not a comparable version.
    NoUpdateNeeded { current: String, latest: String },
    /// Apply script is running; the agent will be replaced shortly.
    Launched { from: String, to: String },
    /// Lock held and download running on a background task.
    Started { from: String, to: String },
}

/// Result of [`UpdateOrchestrator::trigger`]: the immediate outcome plus the
/// background download-and-launch task, if one was started.
///
/// Dropping it leaves the task running; once the apply script may be
/// spawned the attempt is not cancellable.
#[derive(Debug)]
#[must_use]
pub struct Triggered {
    pub outcome: UpdateOutcome,
    background: Option<JoinHandle<Result<(), UpdateError>>>,
}

impl Triggered {
    /// Waits for the background task. A [`UpdateOutcome::Started`] attempt
    /// that launched its apply script resolves to [`UpdateOutcome::Launched`].
    ///
    /// # Errors
    ///
    /// Returns the background failure, already cleaned up and reported.
    pub async fn finished(self) -> Result<UpdateOutcome, UpdateError> {
        let Self {
            outcome,
            background,
        } = self;
        if let Some(task) = background {
            task.await
                .map_err(|e| UpdateError::Aborted(e.to_string()))??;
        }
        Ok(match outcome {
            UpdateOutcome::Started { from, to } => UpdateOutcome::Launched { from, to },
            other => other,
        })
    }
}

/// Collaborators the orchestrator drives.
pub struct UpdatePorts {
    pub feed: Arc<dyn ReleaseFeed>,
    pub lock: Arc<dyn UpdateLock>,
    pub stager: Arc<dyn ArtifactStager>,
    pub launcher: Arc<dyn ScriptLauncher>,
    pub notices: Arc<dyn NoticeStore>,
}

/// State carried from the locked phase into the download/launch phase.
#[derive(Debug, Clone)]
struct UpdatePlan {
    chat_ref: ChatRef,
    from: String,
    release: Release,
}

enum Prepared {
    UpToDate { current: String, latest: String },
    Locked(UpdatePlan),
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

pub struct UpdateOrchestrator {
    current_version: String,
    ports: UpdatePorts,
}

impl UpdateOrchestrator {
    #[must_use]
    pub fn new(current_version: impl Into<String>, ports: UpdatePorts) -> Self {
        Self {
            current_version: current_version.into(),
            ports,
        }
    }

    #[must_use]
    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    /// Runs the whole sequence and returns once the apply script is launched.
    ///
    /// # Errors
    ///
    /// Returns the [`UpdateError`] of the first failing stage. Failures after
    /// the lock was taken have already been cleaned up.
    pub async fn execute(
        self: &Arc<Self>,
        chat_ref: ChatRef,
    ) -> Result<UpdateOutcome, UpdateError> {
        self.trigger(chat_ref, None).await?.finished().await
    }

    /// Runs the pre-lock stages inline, then hands download and launch to a
    /// spawned task so the caller stays responsive.
    ///
    /// With a `sender`, `chat_ref` is told that the update started, and
    /// failures in the spawned task (panics included) are reported to it on a
    /// best-effort basis. Either way they are cleaned up.
    ///
    /// # Errors
    ///
    /// Returns errors from the stages that run before the task is spawned.
    pub async fn trigger(
        self: &Arc<Self>,
        chat_ref: ChatRef,
        sender: Option<Arc<dyn MessageSender>>,
    ) -> Result<Triggered, UpdateError> {
        let plan = match self.prepare(chat_ref).await? {
            Prepared::UpToDate { current, latest } => {
                return Ok(Triggered {
                    outcome: UpdateOutcome::NoUpdateNeeded { current, latest },
                    background: None,
                });
            }
            Prepared::Locked(plan) => plan,
        };

        if let Some(sender) = &sender {
            let text = render_update_started(&plan.from, &plan.release.tag);
            if let Err(e) = sender.deliver(chat_ref, &text, None).await {
                warn!(chat_ref, error = %e, "could not announce update start");
            }
        }
        let outcome = UpdateOutcome::Started {
            from: plan.from.clone(),
            to: plan.release.tag.clone(),
        };
        let this = Arc::clone(self);
        let background = tokio::spawn(async move { this.run_detached(plan, sender).await });
        Ok(Triggered {
            outcome,
            background: Some(background),
        })
    }

    async fn prepare(&self, chat_ref: ChatRef) -> Result<Prepared, UpdateError> {
        enter(UpdateStage::CheckLock);
        if self.ports.lock.is_in_progress() {
            return Err(fail(UpdateError::AlreadyInProgress));
        }

        enter(UpdateStage::FetchRelease);
        let release = self.ports.feed.fetch_latest().await.map_err(|e| fail(e.into()))?;

        enter(UpdateStage::ValidateVersions);
        EmbeddableVersion::new(&self.current_version).map_err(|e| fail(e.into()))?;
        EmbeddableVersion::new(&release.tag).map_err(|e| fail(e.into()))?;

        enter(UpdateStage::CompareVersions);
        match should_update(&self.current_version, &release.tag) {
            Ok(true) => {}
            Ok(false) => {
                enter(UpdateStage::UpToDate);
                return Ok(Prepared::UpToDate {
                    current: self.current_version.clone(),
                    latest: release.tag,
                });
            }
            Err(e) => {
                info!(current = %self.current_version, latest = %release.tag, error = %e,
                    "versions not comparable, skipping update");
                enter(UpdateStage::UpToDate);
                return Ok(Prepared::UpToDate {
                    current: self.current_version.clone(),
                    latest: release.tag,
                });
            }
        }

        enter(UpdateStage::Locking);
        self.ports
            .lock
            .create_lock()
            .map_err(|e| fail(UpdateError::LockFailed(e)))?;

        Ok(Prepared::Locked(UpdatePlan {
            chat_ref,
            from: self.current_version.clone(),
            release,
        }))
    }

    async fn stage_and_launch(&self, plan: &UpdatePlan) -> Result<(), UpdateError> {
        enter(UpdateStage::Downloading);
        match self.ports.stager.stage(&plan.release).await {
            Ok(staged) => debug!(
                binary = %staged.binary.display(),
                files = staged.files.len(),
                "artifacts staged"
            ),
            Err(e) => {
                self.cleanup();
                return Err(fail(e.into()));
            }
        }

        enter(UpdateStage::ComposingAndLaunching);
        let notice = CompletionNotice {
            chat_ref: plan.chat_ref,
            old_version: plan.from.clone(),
            new_version: plan.release.tag.clone(),
        };
        if let Err(e) = self.ports.notices.save(&notice) {
            warn!(error = %e, "cannot record completion notice; update proceeds without it");
        }
        if let Err(e) =
            self.ports
                .launcher
                .compose_and_launch(plan.chat_ref, &plan.from, &plan.release.tag)
        {
            self.cleanup();
            return Err(fail(e.into()));
        }

        enter(UpdateStage::LaunchedDetached);
        info!(from = %plan.from, to = %plan.release.tag, "apply script launched; lock handed over");
        Ok(())
    }

    async fn run_detached(
        self: Arc<Self>,
        plan: UpdatePlan,
        sender: Option<Arc<dyn MessageSender>>,
    ) -> Result<(), UpdateError> {
        let chat_ref = plan.chat_ref;
        let worker = Arc::clone(&self);
        let joined = tokio::spawn(async move { worker.stage_and_launch(&plan).await }).await;

        let error = match joined {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => e,
            Err(join_error) => {
                self.cleanup();
                let detail = if join_error.is_panic() {
                    "internal error".to_string()
                } else {
                    join_error.to_string()
                };
                fail(UpdateError::Aborted(detail))
            }
        };

        if let Some(sender) = sender {
            let text = render_update_failed(&error.to_string());
            if let Err(e) = sender.deliver(chat_ref, &text, None).await {
                warn!(chat_ref, error = %e, "could not report update failure");
            }
        }
        Err(error)
    }

    /// Compensation for failures after the lock was taken.
    fn cleanup(&self) {
        self.ports.stager.clear();
        self.ports.notices.clear();
        self.ports.lock.remove_lock();
        debug!("update lock released and staging purged");
    }
}

fn enter(stage: UpdateStage) {
    debug!(%stage, "update stage");
}

fn fail(error: UpdateError) -> UpdateError {
    warn!(stage = %UpdateStage::Failed, error = %error, "update attempt failed");
    error
}
