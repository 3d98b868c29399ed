//! Allowlist-file authorizer — implements `Authorizer`.
//!
//! One identity per line, `#` starts a comment, matching is
//! case-insensitive. The file is re-read on every call so revocations take
//! effect without a restart.

use std::path::PathBuf;

use tracing::warn;

use crate::application::ports::Authorizer;
use crate::domain::normalize_identity;

pub struct AllowlistAuthorizer {
    path: PathBuf,
}

impl AllowlistAuthorizer {
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Authorizer for AllowlistAuthorizer {
    fn is_authorized(&self, identity: &str) -> bool {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "allowlist unreadable, denying");
                return false;
            }
        };
        let wanted = normalize_identity(identity);
        !wanted.is_empty() && allowlist_entries(&content).any(|entry| entry == wanted)
    }
}

fn allowlist_entries(content: &str) -> impl Iterator<Item = String> + '_ {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default())
        .map(normalize_identity)
        .filter(|entry| !entry.is_empty())
}
