//! Release version model and the embedding-safety gate.
//!
//! Two separate checks live here:
//!
//! - [`Version::parse`] answers "is this a release we can order?" and only
//!   accepts `[v]MAJOR.MINOR.PATCH`.
//! - [`is_safe_for_embedding`] answers "can this string be pasted into a
//!   shell script?" and accepts anything made of `[A-Za-z0-9.v-]`, including
//!   pre-release looking tags. It says nothing about semantic validity.

use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::error::{ValidationError, VersionError};

/// Exactly three numeric components with an optional leading `v`.
static RELEASE_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^v?([0-9]+)\.([0-9]+)\.([0-9]+)$").expect("valid regex")
});

/// Characters allowed when a version is interpolated into the apply script.
static EMBEDDABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z0-9.v-]{1,50}$").expect("valid regex")
});

/// Maximum length accepted by [`is_safe_for_embedding`].
pub const MAX_EMBEDDED_LEN: usize = 50;

/// A parsed release version. Immutable once parsed.
#[derive(Debug, Clone)]
pub struct Version {
    inner: semver::Version,
    raw: String,
}

impl Version {
    /// Parses `[v]MAJOR.MINOR.PATCH`.
    ///
    /// # Errors
    ///
    /// Fails on empty input, whitespace, a pre-release dash, or anything that
    /// is not exactly three numeric components.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        if s.is_empty() {
            return Err(VersionError::Empty);
        }
        if s.chars().any(char::is_whitespace) {
            return Err(VersionError::Whitespace(s.to_string()));
        }
        if s.contains('-') {
            return Err(VersionError::PreRelease(s.to_string()));
        }
        let caps = RELEASE_VERSION_RE
            .captures(s)
            .ok_or_else(|| VersionError::Malformed(s.to_string()))?;
        let component = |i: usize| -> Result<u64, VersionError> {
            caps[i]
                .parse::<u64>()
                .map_err(|_| VersionError::Malformed(s.to_string()))
        };
        Ok(Self {
            inner: semver::Version::new(component(1)?, component(2)?, component(3)?),
            raw: s.to_string(),
        })
    }

    #[must_use]
    pub fn major(&self) -> u64 {
        self.inner.major
    }

    #[must_use]
    pub fn minor(&self) -> u64 {
        self.inner.minor
    }

    #[must_use]
    pub fn patch(&self) -> u64 {
        self.inner.patch
    }

    /// The string this version was parsed from, prefix included.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Orders by `(major, minor, patch)`. `v1.2.3` and `1.2.3` compare equal.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        self.inner.cmp(&other.inner)
    }

    #[must_use]
    pub fn is_older_than(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Less
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Returns whether `latest_raw` is strictly newer than `current_raw`.
///
/// # Errors
///
/// Propagates the parse failure of either side, so a development build
/// (`dev`) can skip the check instead of reading it as "no update".
pub fn should_update(current_raw: &str, latest_raw: &str) -> Result<bool, VersionError> {
    let current = Version::parse(current_raw)?;
    let latest = Version::parse(latest_raw)?;
    Ok(current.is_older_than(&latest))
}

/// Injection guard for script interpolation: `[A-Za-z0-9.v-]{1,50}`.
#[must_use]
pub fn is_safe_for_embedding(s: &str) -> bool {
    EMBEDDABLE_RE.is_match(s)
}

/// A version string proven safe to interpolate into the apply script.
///
/// The only constructor runs [`is_safe_for_embedding`], so holding one is
/// the proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddableVersion(String);

impl EmbeddableVersion {
    /// # Errors
    ///
    /// Returns [`ValidationError::UnsafeVersion`] when the string contains
    /// anything outside `[A-Za-z0-9.v-]` or is not 1–50 characters long.
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        if is_safe_for_embedding(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(ValidationError::UnsafeVersion(s.to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmbeddableVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
