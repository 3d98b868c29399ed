//! Subscriber ledger state transitions — pure, no I/O.
//!
//! Persistence and locking live in `crate::infra::ledger`; this module only
//! decides what the next snapshot looks like.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use chrono::{DateTime, Utc};
use outpost_common::{ChatRef, LedgerFile, SubscriberRecord};

/// Canonical form used for every lookup and as the storage key.
#[must_use]
pub fn normalize_identity(identity: &str) -> String {
    identity.trim().to_lowercase()
}

/// A subscriber eligible for notices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSubscriber {
    /// Normalized identity.
    pub identity: String,
    pub chat_ref: ChatRef,
}

/// In-memory ledger. Every mutator reports whether the snapshot changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    file: LedgerFile,
}

impl Ledger {
    #[must_use]
    pub fn from_file(file: LedgerFile) -> Self {
        // Older snapshots may carry keys written before normalization; keys
        // that collide are merged rather than dropped.
        let mut subscribers = BTreeMap::new();
        for (identity, record) in file.subscribers {
            match subscribers.entry(normalize_identity(&identity)) {
                Entry::Vacant(slot) => {
                    slot.insert(record);
                }
                Entry::Occupied(mut slot) => {
                    merge_records(slot.get_mut(), record);
                }
            }
        }
        Self {
            file: LedgerFile { subscribers },
        }
    }

    #[must_use]
    pub fn as_file(&self) -> &LedgerFile {
        &self.file
    }

    #[must_use]
    pub fn get(&self, identity: &str) -> Option<&SubscriberRecord> {
        self.file.subscribers.get(&normalize_identity(identity))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.file.subscribers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.file.subscribers.is_empty()
    }

    /// Upserts a subscriber on contact. Always (re)activates.
    pub fn record_interaction(&mut self, identity: &str, chat_ref: ChatRef, now: DateTime<Utc>) {
        self.file
            .subscribers
            .entry(normalize_identity(identity))
            .and_modify(|record| {
                record.chat_ref = chat_ref;
                record.last_seen = now;
                record.active = true;
            })
            .or_insert_with(|| SubscriberRecord {
                chat_ref,
                first_seen: now,
                last_seen: now,
                active: true,
                notified_versions: std::collections::BTreeSet::new(),
            });
    }

    #[must_use]
    pub fn active_subscribers(&self) -> Vec<ActiveSubscriber> {
        self.file
            .subscribers
            .iter()
            .filter(|(_, record)| record.active)
            .map(|(identity, record)| ActiveSubscriber {
                identity: identity.clone(),
                chat_ref: record.chat_ref,
            })
            .collect()
    }

    /// Records that `identity` was told about `version`. Unknown identities
    /// are ignored.
    pub fn mark_notified(&mut self, identity: &str, version: &str) -> bool {
        self.file
            .subscribers
            .get_mut(&normalize_identity(identity))
            .is_some_and(|record| record.notified_versions.insert(version.to_string()))
    }

    #[must_use]
    pub fn is_notified(&self, identity: &str, version: &str) -> bool {
        self.get(identity)
            .is_some_and(|record| record.notified_versions.contains(version))
    }

    /// Deactivates a subscriber. Unknown identities are ignored.
    pub fn set_inactive(&mut self, identity: &str) -> bool {
        match self.file.subscribers.get_mut(&normalize_identity(identity)) {
            Some(record) if record.active => {
                record.active = false;
                true
            }
            _ => false,
        }
    }
}

/// Folds `other` into `into`: the most recent contact wins for chat and
/// active flag, first contact is the earliest, notified tags are unioned.
fn merge_records(into: &mut SubscriberRecord, other: SubscriberRecord) {
    if other.last_seen > into.last_seen {
        into.chat_ref = other.chat_ref;
        into.active = other.active;
        into.last_seen = other.last_seen;
    }
    into.first_seen = into.first_seen.min(other.first_seen);
    into.notified_versions.extend(other.notified_versions);
}
