use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Version tag of builds that were not produced by the release pipeline.
pub const DEV_VERSION: &str = "dev";

/// Version baked in at compile time by the release workflow
/// (`OUTPOST_BUILD_VERSION=v1.4.2 cargo build --release`).
pub const BUILD_VERSION: &str = match option_env!("OUTPOST_BUILD_VERSION") {
    Some(v) => v,
    None => DEV_VERSION,
};

/// Default cap on a single downloaded artifact: 50 MiB.
pub const DEFAULT_MAX_ARTIFACT_BYTES: u64 = 50 * 1024 * 1024;

/// Agent configuration.
///
/// Every field has a default so an empty environment yields a working
/// configuration. The agent loads it from `OUTPOST_*` variables, e.g.
/// `OUTPOST_STATE_DIR`, `OUTPOST_RELEASE_REPO`, `OUTPOST_AUX_FILES=a,b`.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Root for all durable state (lock, staging, ledger, logs).
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    #[serde(default)]
    pub lock_file: Option<PathBuf>,
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,
    #[serde(default)]
    pub script_file: Option<PathBuf>,
    #[serde(default)]
    pub update_log: Option<PathBuf>,
    #[serde(default)]
    pub ledger_file: Option<PathBuf>,
    #[serde(default)]
    pub notice_file: Option<PathBuf>,
    #[serde(default)]
    pub allowlist_file: Option<PathBuf>,

    /// Where the apply script installs staged files.
    #[serde(default = "default_install_dir")]
    pub install_dir: PathBuf,

    /// systemd unit stopped and restarted by the apply script.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// GitHub repository publishing releases, as `owner/name`.
    #[serde(default = "default_release_repo")]
    pub release_repo: String,

    #[serde(default = "default_github_api_base")]
    pub github_api_base: String,

    /// Base URL for auxiliary manifest files, fetched as `{base}/{repo}/{tag}/{file}`.
    #[serde(default = "default_raw_base_url")]
    pub raw_base_url: String,

    /// Installed name of the agent binary.
    #[serde(default = "default_binary_name")]
    pub binary_name: String,

    /// Auxiliary files staged alongside the binary.
    #[serde(default = "default_aux_files")]
    pub aux_files: Vec<String>,

    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,

    #[serde(default = "default_feed_timeout_secs")]
    pub feed_timeout_secs: u64,

    /// Per-file download timeout.
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    /// Bound on one Bot API call, response body included.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,

    #[serde(default = "default_max_artifact_bytes")]
    pub max_artifact_bytes: u64,

    /// Changelog budget in characters (not bytes).
    #[serde(default = "default_changelog_chars")]
    pub changelog_chars: usize,

    #[serde(default)]
    pub telegram_token: Option<String>,

    #[serde(default = "default_telegram_api_base")]
    pub telegram_api_base: String,

    /// Optional command prefix for the detached launch, e.g.
    /// `systemd-run,--scope,--quiet` so the apply script leaves the unit's cgroup.
    #[serde(default)]
    pub launch_wrapper: Vec<String>,

    #[serde(default = "default_current_version")]
    pub current_version: String,
}

/// Configuration rejected at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("release repository must look like 'owner/name' (got '{0}')")]
    InvalidRepo(String),

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("binary name '{0}' must be a plain file name")]
    InvalidBinaryName(String),

    #[error("auxiliary file '{0}' must be a relative path without '..'")]
    InvalidAuxFile(String),
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::with_state_dir(default_state_dir())
    }
}

impl AgentConfig {
    /// Fully defaulted configuration rooted at `dir`.
    #[must_use]
    pub fn with_state_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: dir.into(),
            lock_file: None,
            staging_dir: None,
            script_file: None,
            update_log: None,
            ledger_file: None,
            notice_file: None,
            allowlist_file: None,
            install_dir: default_install_dir(),
            service_name: default_service_name(),
            release_repo: default_release_repo(),
            github_api_base: default_github_api_base(),
            raw_base_url: default_raw_base_url(),
            binary_name: default_binary_name(),
            aux_files: default_aux_files(),
            check_interval_secs: default_check_interval_secs(),
            feed_timeout_secs: default_feed_timeout_secs(),
            download_timeout_secs: default_download_timeout_secs(),
            send_timeout_secs: default_send_timeout_secs(),
            max_artifact_bytes: default_max_artifact_bytes(),
            changelog_chars: default_changelog_chars(),
            telegram_token: None,
            telegram_api_base: default_telegram_api_base(),
            launch_wrapper: Vec::new(),
            current_version: default_current_version(),
        }
    }

    /// Checks values that serde defaults cannot guard.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut parts = self.release_repo.split('/');
        let valid_repo = matches!(
            (parts.next(), parts.next(), parts.next()),
            (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty()
        );
        if !valid_repo {
            return Err(ConfigError::InvalidRepo(self.release_repo.clone()));
        }
        for (field, value) in [
            ("check_interval_secs", self.check_interval_secs),
            ("feed_timeout_secs", self.feed_timeout_secs),
            ("download_timeout_secs", self.download_timeout_secs),
            ("send_timeout_secs", self.send_timeout_secs),
            ("max_artifact_bytes", self.max_artifact_bytes),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero { field });
            }
        }
        if self.changelog_chars == 0 {
            return Err(ConfigError::Zero {
                field: "changelog_chars",
            });
        }
        if !is_plain_file_name(&self.binary_name) {
            return Err(ConfigError::InvalidBinaryName(self.binary_name.clone()));
        }
        for file in &self.aux_files {
            let path = Path::new(file);
            let escapes = path
                .components()
                .any(|c| !matches!(c, std::path::Component::Normal(_)));
            if file.is_empty() || escapes {
                return Err(ConfigError::InvalidAuxFile(file.clone()));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.resolve(self.lock_file.as_ref(), "update.lock")
    }

    #[must_use]
    pub fn staging_path(&self) -> PathBuf {
        self.resolve(self.staging_dir.as_ref(), "staging")
    }

    #[must_use]
    pub fn script_path(&self) -> PathBuf {
        self.resolve(self.script_file.as_ref(), "apply-update.sh")
    }

    #[must_use]
    pub fn update_log_path(&self) -> PathBuf {
        self.resolve(self.update_log.as_ref(), "update.log")
    }

    #[must_use]
    pub fn ledger_path(&self) -> PathBuf {
        self.resolve(self.ledger_file.as_ref(), "subscribers.json")
    }

    #[must_use]
    pub fn notice_path(&self) -> PathBuf {
        self.resolve(self.notice_file.as_ref(), "update-complete.json")
    }

    #[must_use]
    pub fn allowlist_path(&self) -> PathBuf {
        self.resolve(self.allowlist_file.as_ref(), "allowed_users.txt")
    }

    #[must_use]
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    #[must_use]
    pub fn feed_timeout(&self) -> Duration {
        Duration::from_secs(self.feed_timeout_secs)
    }

    #[must_use]
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    #[must_use]
    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }

    /// Wrapper command with empty entries dropped (`OUTPOST_LAUNCH_WRAPPER=""`).
    #[must_use]
    pub fn launch_wrapper(&self) -> Vec<String> {
        self.launch_wrapper
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    fn resolve(&self, explicit: Option<&PathBuf>, default_name: &str) -> PathBuf {
        explicit
            .cloned()
            .unwrap_or_else(|| self.state_dir.join(default_name))
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("/var/lib/outpost")
}

fn default_install_dir() -> PathBuf {
    PathBuf::from("/opt/outpost")
}

fn default_service_name() -> String {
    "outpost".to_string()
}

fn default_release_repo() -> String {
    "outpost-dev/outpost".to_string()
}

fn default_github_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_raw_base_url() -> String {
    "https://raw.githubusercontent.com".to_string()
}

fn default_binary_name() -> String {
    "outpost".to_string()
}

fn default_aux_files() -> Vec<String> {
    vec![
        "deploy/outpost.service".to_string(),
        "deploy/install.sh".to_string(),
        "README.md".to_string(),
    ]
}

fn default_check_interval_secs() -> u64 {
    3600
}

fn default_feed_timeout_secs() -> u64 {
    10
}

fn default_download_timeout_secs() -> u64 {
    120
}

fn default_send_timeout_secs() -> u64 {
    15
}

fn default_max_artifact_bytes() -> u64 {
    DEFAULT_MAX_ARTIFACT_BYTES
}

fn default_changelog_chars() -> usize {
    800
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_current_version() -> String {
    BUILD_VERSION.to_string()
}
