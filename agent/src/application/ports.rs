//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and `outpost_common` — never
//! from `crate::infra` or `crate::commands`.
//!
//! Ports used from the spawned update task are `Send + Sync` and async ones
//! go through `async_trait` so they can sit behind `Arc<dyn _>`.

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use outpost_common::{ChatRef, CompletionNotice, Release};

use crate::domain::{
    ActiveSubscriber, DeliveryError, DownloadError, FetchError, InteractiveAction, LaunchError,
    LockError,
};

// ── External collaborators ────────────────────────────────────────────────────

/// Source of the latest published release.
#[async_trait]
pub trait ReleaseFeed: Send + Sync {
    /// Fetches the newest release. Implementations bound the call with their
    /// own timeout.
    async fn fetch_latest(&self) -> Result<Release, FetchError>;
}

/// Delivers notices to subscribers.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// # Errors
    ///
    /// [`DeliveryError::Unreachable`] when the recipient is gone for good,
    /// [`DeliveryError::Other`] for anything worth retrying.
    async fn deliver(
        &self,
        chat_ref: ChatRef,
        text: &str,
        action: Option<&InteractiveAction>,
    ) -> Result<(), DeliveryError>;
}

/// Live authorization check. Must not cache.
pub trait Authorizer: Send + Sync {
    fn is_authorized(&self, identity: &str) -> bool;
}

/// A command to run fully detached from the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachedCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Combined stdout/stderr is appended here.
    pub log_path: PathBuf,
}

/// Starts processes that outlive the caller.
pub trait ProcessSpawner: Send + Sync {
    /// Spawns without waiting. Returns the child pid.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::Spawn`] if the process cannot be started.
    fn spawn_detached(&self, command: &DetachedCommand) -> Result<u32, LaunchError>;
}

/// Whether a process id currently names a live process.
pub trait LivenessCheck: Send + Sync {
    fn is_alive(&self, pid: u32) -> bool;
}

// ── Update machinery ──────────────────────────────────────────────────────────

/// Cross-process "an update is running" marker.
pub trait UpdateLock: Send + Sync {
    /// Exclusively creates the lock for the current process.
    ///
    /// # Errors
    ///
    /// [`LockError::AlreadyLocked`] if a record exists, [`LockError::Io`] otherwise.
    fn create_lock(&self) -> Result<(), LockError>;

    /// `true` only for a readable record naming a live process. Stale
    /// records are removed as a side effect.
    fn is_in_progress(&self) -> bool;

    /// Best-effort removal.
    fn remove_lock(&self);
}

/// Files placed in the staging area by a successful download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedArtifacts {
    pub binary: PathBuf,
    pub files: Vec<PathBuf>,
}

/// Downloads release artifacts into the staging area.
#[async_trait]
pub trait ArtifactStager: Send + Sync {
    /// Resets the staging area and fetches the manifest plus one binary.
    async fn stage(&self, release: &Release) -> Result<StagedArtifacts, DownloadError>;

    /// Best-effort purge of the staging area.
    fn clear(&self);
}

/// Writes the apply script and launches it detached.
pub trait ScriptLauncher: Send + Sync {
    /// # Errors
    ///
    /// [`LaunchError::InvalidVersionString`] before anything is written when
    /// either version fails the embedding gate.
    fn compose_and_launch(
        &self,
        chat_ref: ChatRef,
        old_version: &str,
        new_version: &str,
    ) -> Result<(), LaunchError>;
}

/// Pending "update complete" marker.
pub trait NoticeStore: Send + Sync {
    fn save(&self, notice: &CompletionNotice) -> Result<()>;
    fn load(&self) -> Result<Option<CompletionNotice>>;
    /// Best-effort removal.
    fn clear(&self);
}

// ── Subscriber ledger ─────────────────────────────────────────────────────────

/// Durable subscriber bookkeeping. Mutators persist before returning.
pub trait SubscriberStore: Send + Sync {
    fn record_interaction(&self, identity: &str, chat_ref: ChatRef) -> Result<()>;
    fn active_subscribers(&self) -> Vec<ActiveSubscriber>;
    /// No-op for unknown identities.
    fn mark_notified(&self, identity: &str, version: &str) -> Result<()>;
    fn is_notified(&self, identity: &str, version: &str) -> bool;
    /// No-op for unknown identities.
    fn set_inactive(&self, identity: &str) -> Result<()>;
}
