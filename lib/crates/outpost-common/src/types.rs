use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Conversation handle a notice is delivered to (a Telegram chat id).
pub type ChatRef = i64;

/// A downloadable file attached to a release.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReleaseAsset {
    pub name: String,
    pub url: String,
}

/// Snapshot of the latest published release. Fetched per call, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Release {
    pub tag: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
    /// Free-form release notes.
    #[serde(default)]
    pub body: String,
}

/// Ledger entry for one subscriber, keyed by normalized identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscriberRecord {
    pub chat_ref: ChatRef,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub active: bool,
    /// Release tags this subscriber was told about. Only ever grows.
    #[serde(default)]
    pub notified_versions: BTreeSet<String>,
}

/// On-disk ledger document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerFile {
    #[serde(default)]
    pub subscribers: BTreeMap<String, SubscriberRecord>,
}

/// Marker left for the restarted agent so it can confirm the update to
/// whoever triggered it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionNotice {
    pub chat_ref: ChatRef,
    pub old_version: String,
    pub new_version: String,
}

/// "Update available" notice for one subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPayload {
    pub chat_ref: ChatRef,
    pub old_version: String,
    pub new_version: String,
    /// Changelog already cut to the configured character budget.
    pub truncated_changelog: String,
}
