//! JSON-file subscriber ledger — implements `SubscriberStore`.
//!
//! The file is the source of truth: `outpost seen` and `outpost run` are
//! separate processes sharing it. Every mutation re-reads the file under an
//! exclusive advisory lock (`<ledger>.lock`), applies the change and rewrites
//! it atomically. Reads reload the file and fall back to the last good copy
//! when it cannot be read.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use anyhow::{Context, Result};
use chrono::Utc;
use fs2::FileExt;
use outpost_common::{ChatRef, LedgerFile};
use tracing::{debug, warn};

use crate::application::ports::SubscriberStore;
use crate::domain::{ActiveSubscriber, Ledger};
use crate::infra::fs::atomic_write;

pub struct JsonLedgerStore {
    path: PathBuf,
    /// Last snapshot read from or written to disk.
    state: RwLock<Ledger>,
}

impl JsonLedgerStore {
    /// Loads the ledger at `path`; a missing file is an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: PathBuf) -> Result<Self> {
        let ledger = load_ledger(&path)?;
        debug!(path = %path.display(), subscribers = ledger.len(), "ledger loaded");
        Ok(Self {
            path,
            state: RwLock::new(ledger),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Point-in-time copy of every record.
    #[must_use]
    pub fn snapshot(&self) -> LedgerFile {
        self.current().as_file().clone()
    }

    /// Reloads from disk, keeping the cached copy if the file is unusable.
    fn current(&self) -> RwLockReadGuard<'_, Ledger> {
        match load_ledger(&self.path) {
            Ok(fresh) => *self.state.write().unwrap_or_else(PoisonError::into_inner) = fresh,
            Err(e) => warn!(path = %self.path.display(), "ledger reload failed, using cached copy: {e:#}"),
        }
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read-modify-write under both the in-process and the file lock. The
    /// file is rewritten only if `change` reports a change.
    fn update(&self, change: impl FnOnce(&mut Ledger) -> bool) -> Result<()> {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let lock = self.lock_file()?;
        lock.lock_exclusive()
            .with_context(|| format!("locking ledger {}", self.path.display()))?;

        let mut next = load_ledger(&self.path)?;
        if change(&mut next) {
            let content =
                serde_json::to_vec_pretty(next.as_file()).context("serializing ledger")?;
            atomic_write(&self.path, &content, 0o600)?;
        }
        *guard = next;
        // Closing the handle releases the advisory lock.
        drop(lock);
        Ok(())
    }

    fn lock_file(&self) -> Result<File> {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        let lock_path = PathBuf::from(name);
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .with_context(|| format!("opening {}", lock_path.display()))
    }
}

fn load_ledger(path: &Path) -> Result<Ledger> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let file: LedgerFile = serde_json::from_str(&content)
                .with_context(|| format!("parsing ledger {}", path.display()))?;
            Ok(Ledger::from_file(file))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Ledger::default()),
        Err(e) => Err(e).with_context(|| format!("reading ledger {}", path.display())),
    }
}

impl SubscriberStore for JsonLedgerStore {
    fn record_interaction(&self, identity: &str, chat_ref: ChatRef) -> Result<()> {
        let now = Utc::now();
        self.update(|ledger| {
            ledger.record_interaction(identity, chat_ref, now);
            true
        })
    }

    fn active_subscribers(&self) -> Vec<ActiveSubscriber> {
        self.current().active_subscribers()
    }

    fn mark_notified(&self, identity: &str, version: &str) -> Result<()> {
        self.update(|ledger| ledger.mark_notified(identity, version))
    }

    fn is_notified(&self, identity: &str, version: &str) -> bool {
        self.current().is_notified(identity, version)
    }

    fn set_inactive(&self, identity: &str) -> Result<()> {
        self.update(|ledger| ledger.set_inactive(identity))
    }
}
