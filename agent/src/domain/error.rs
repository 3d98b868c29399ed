//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, or `tokio`. The `Display` text of each variant is
//! the message handed back to whoever triggered the operation.

use std::path::PathBuf;

use thiserror::Error;

// ── Version errors ────────────────────────────────────────────────────────────

/// A string that is not a `[v]MAJOR.MINOR.PATCH` release version.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("version string is empty")]
    Empty,

    #[error("version {0:?} contains whitespace")]
    Whitespace(String),

    #[error("version {0:?} is a pre-release")]
    PreRelease(String),

    #[error("version {0:?} is not MAJOR.MINOR.PATCH")]
    Malformed(String),
}

/// A version string that must not be interpolated into the apply script.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("version {0:?} contains characters that are not allowed")]
    UnsafeVersion(String),
}

// ── Lock errors ───────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LockError {
    #[error("an update lock already exists at {0}")]
    AlreadyLocked(PathBuf),

    #[error("cannot write update lock {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ── Release feed errors ───────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("release feed unreachable: {0}")]
    Unreachable(String),

    #[error("release feed answered HTTP {0}")]
    Status(u16),

    #[error("release feed returned an unreadable payload: {0}")]
    Malformed(String),
}

// ── Download errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("download of {url} failed with HTTP {status}")]
    Http { url: String, status: u16 },

    #[error("download of {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{name} exceeds the {limit}-byte download limit")]
    OversizedArtifact { name: String, limit: u64 },

    #[error("architecture '{0}' has no release build")]
    UnsupportedArchitecture(String),

    #[error("release has no binary for '{0}'")]
    AssetNotFound(String),

    #[error("staging I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ── Launch errors ─────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("refusing to write apply script: {0}")]
    InvalidVersionString(#[from] ValidationError),

    #[error("cannot write apply script {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot start apply script: {0}")]
    Spawn(String),
}

// ── Delivery errors ───────────────────────────────────────────────────────────

/// Outcome of a failed notice delivery, as classified by the sender.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The recipient blocked us or no longer exists. Retrying is pointless.
    #[error("recipient unreachable: {0}")]
    Unreachable(String),

    /// Anything else; worth retrying later.
    #[error("delivery failed: {0}")]
    Other(String),
}

// ── Orchestrator errors ───────────────────────────────────────────────────────

/// Why an update attempt did not reach the detached apply step.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("An update is already in progress.")]
    AlreadyInProgress,

    #[error("Could not check for updates: {0}")]
    Fetch(#[from] FetchError),

    #[error("Refusing to update: {0}")]
    InvalidVersion(#[from] ValidationError),

    #[error("Could not acquire the update lock: {0}")]
    LockFailed(#[source] LockError),

    #[error("Downloading the update failed: {0}")]
    Download(#[from] DownloadError),

    #[error("Launching the update failed: {0}")]
    Launch(#[from] LaunchError),

    #[error("The update task stopped unexpectedly: {0}")]
    Aborted(String),
}
