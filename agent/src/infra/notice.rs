//! File-backed completion marker — implements `NoticeStore`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use outpost_common::CompletionNotice;
use tracing::warn;

use crate::application::ports::NoticeStore;
use crate::infra::fs::{atomic_write, remove_if_exists};

pub struct FileNoticeStore {
    path: PathBuf,
}

impl FileNoticeStore {
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }
}

impl NoticeStore for FileNoticeStore {
    fn save(&self, notice: &CompletionNotice) -> Result<()> {
        let content = serde_json::to_vec_pretty(notice).context("serializing completion notice")?;
        atomic_write(&self.path, &content, 0o600)
    }

    fn load(&self) -> Result<Option<CompletionNotice>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("reading completion notice {}", self.path.display()));
            }
        };
        match serde_json::from_str(&content) {
            Ok(notice) => Ok(Some(notice)),
            Err(e) => {
                // A torn or foreign marker is worthless; drop it rather than fail every start.
                warn!(path = %self.path.display(), error = %e, "discarding unreadable completion notice");
                self.clear();
                Ok(None)
            }
        }
    }

    fn clear(&self) {
        if let Err(e) = remove_if_exists(&self.path) {
            warn!(path = %self.path.display(), error = %e, "cannot remove completion notice");
        }
    }
}
