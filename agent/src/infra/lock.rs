//! File-backed update lock.
//!
//! The record holds the decimal pid of its owner. It is created with
//! `O_EXCL` semantics, so two agents racing for it cannot both win. A record
//! is live only while that pid names a running process; anything else is
//! stale and is removed on the next check.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::ports::{LivenessCheck, UpdateLock};
use crate::domain::LockError;
use crate::infra::fs::remove_if_exists;

pub struct FsUpdateLock {
    path: PathBuf,
    liveness: Arc<dyn LivenessCheck>,
}

impl FsUpdateLock {
    #[must_use]
    pub fn new(path: PathBuf, liveness: Arc<dyn LivenessCheck>) -> Self {
        Self { path, liveness }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pid recorded in the lock, if the record is readable and well-formed.
    #[must_use]
    pub fn owner(&self) -> Option<u32> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        parse_pid(&content)
    }

    fn discard_stale(&self, reason: &str) {
        info!(path = %self.path.display(), reason, "removing stale update lock");
        if let Err(e) = remove_if_exists(&self.path) {
            warn!(path = %self.path.display(), error = %e, "cannot remove stale update lock");
        }
    }
}

impl UpdateLock for FsUpdateLock {
    fn create_lock(&self) -> Result<(), LockError> {
        let io_err = |source| LockError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut file = match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(LockError::AlreadyLocked(self.path.clone()));
            }
            Err(e) => return Err(io_err(e)),
        };

        if let Err(e) = writeln!(file, "{}", std::process::id()).and_then(|()| file.sync_all()) {
            drop(file);
            let _ = remove_if_exists(&self.path);
            return Err(io_err(e));
        }
        debug!(path = %self.path.display(), "update lock acquired");
        Ok(())
    }

    fn is_in_progress(&self) -> bool {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return false,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "update lock unreadable");
                return false;
            }
        };

        let Some(pid) = parse_pid(&content) else {
            self.discard_stale("malformed record");
            return false;
        };
        if self.liveness.is_alive(pid) {
            return true;
        }
        self.discard_stale("owner exited");
        false
    }

    fn remove_lock(&self) {
        if let Err(e) = remove_if_exists(&self.path) {
            warn!(path = %self.path.display(), error = %e, "cannot remove update lock");
        }
    }
}

/// A positive decimal pid, surrounding whitespace allowed.
fn parse_pid(content: &str) -> Option<u32> {
    content.trim().parse::<u32>().ok().filter(|pid| *pid > 0)
}
