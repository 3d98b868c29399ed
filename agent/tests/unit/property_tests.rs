//! Property-based tests for the version model, the embedding gate and
//! rendering invariants.
//!
//! Uses `proptest` to verify invariants across many random inputs.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::cmp::Ordering;

use outpost_agent::domain::notice::{TRUNCATION_MARKER, truncate_changelog};
use outpost_agent::domain::script::{ScriptLayout, ScriptParams, render_apply_script};
use outpost_agent::domain::{EmbeddableVersion, Version, is_safe_for_embedding, should_update};
use proptest::prelude::*;

// ============================================================================
// Version ordering
// ============================================================================

proptest! {
    /// Prefixed and bare spellings parse to the same version.
    #[test]
    fn prop_prefix_is_ignored(major in 0u64..10_000, minor in 0u64..10_000, patch in 0u64..10_000) {
        let bare = Version::parse(&format!("{major}.{minor}.{patch}")).unwrap();
        let prefixed = Version::parse(&format!("v{major}.{minor}.{patch}")).unwrap();
        prop_assert_eq!(bare.compare(&prefixed), Ordering::Equal);
    }

    /// Comparison is numeric per component, never lexicographic.
    #[test]
    fn prop_ordering_matches_tuple_ordering(
        a in (0u64..200, 0u64..200, 0u64..200),
        b in (0u64..200, 0u64..200, 0u64..200),
    ) {
        let va = Version::parse(&format!("v{}.{}.{}", a.0, a.1, a.2)).unwrap();
        let vb = Version::parse(&format!("{}.{}.{}", b.0, b.1, b.2)).unwrap();
        prop_assert_eq!(va.compare(&vb), a.cmp(&b));
        prop_assert_eq!(va.is_older_than(&vb), a < b);
    }

    /// An update is offered exactly when latest is strictly newer.
    #[test]
    fn prop_should_update_only_when_strictly_newer(
        a in (0u64..50, 0u64..50, 0u64..50),
        b in (0u64..50, 0u64..50, 0u64..50),
    ) {
        let current = format!("v{}.{}.{}", a.0, a.1, a.2);
        let latest = format!("v{}.{}.{}", b.0, b.1, b.2);
        prop_assert_eq!(should_update(&current, &latest).unwrap(), a < b);
    }

    /// Anything with a pre-release suffix is not a comparable release.
    #[test]
    fn prop_prerelease_never_parses(major in 0u64..100, suffix in "[a-z]{1,5}(\\.[0-9]{1,2})?") {
        let tag = format!("v{major}.0.0-{suffix}");
        prop_assert!(Version::parse(&tag).is_err());
        prop_assert!(should_update("v0.0.1", &tag).is_err());
    }
}

// ============================================================================
// Embedding gate
// ============================================================================

proptest! {
    /// Every string over the allowed alphabet up to the length cap passes.
    #[test]
    fn prop_allowed_alphabet_is_embeddable(s in "[A-Za-z0-9.v-]{1,50}") {
        prop_assert!(is_safe_for_embedding(&s));
        prop_assert!(EmbeddableVersion::new(&s).is_ok());
    }

    /// One shell metacharacter anywhere is enough to reject.
    #[test]
    fn prop_metacharacters_are_rejected(
        prefix in "[A-Za-z0-9.]{0,20}",
        bad in prop::sample::select(vec![';', '$', '`', '|', '&', '"', '\'', ' ', '\n', '(', ')', '<', '>', '\\', '*', '/']),
        suffix in "[A-Za-z0-9.]{0,20}",
    ) {
        let s = format!("{prefix}{bad}{suffix}");
        prop_assert!(!is_safe_for_embedding(&s), "accepted {s:?}");
    }

    /// Length is capped at 50 characters.
    #[test]
    fn prop_overlong_is_rejected(s in "[a-z0-9]{51,80}") {
        prop_assert!(!is_safe_for_embedding(&s));
    }

    /// A rendered script never contains raw metacharacters from version
    /// input, because such input cannot be turned into parameters at all.
    #[test]
    fn prop_unsafe_versions_never_render(tag in ".{0,60}") {
        let layout = ScriptLayout {
            staging_dir: "/var/lib/outpost/staging".into(),
            install_dir: "/opt/outpost".into(),
            binary_name: "outpost".to_string(),
            service_name: "outpost".to_string(),
            lock_path: "/var/lib/outpost/update.lock".into(),
        };
        match ScriptParams::new(1, "v1.0.0", &tag, layout) {
            Ok(params) => {
                prop_assert!(is_safe_for_embedding(&tag));
                let script = render_apply_script(&params);
                let expected = format!("NEW_VERSION=\"{tag}\"");
                prop_assert!(script.contains(&expected));
            }
            Err(_) => prop_assert!(!is_safe_for_embedding(&tag)),
        }
    }
}

// ============================================================================
// Changelog truncation
// ============================================================================

proptest! {
    /// Output never exceeds the budget plus the marker, and is always valid
    /// UTF-8 cut at a character boundary.
    #[test]
    fn prop_truncation_respects_budget(text in "\\PC{0,300}", budget in 0usize..200) {
        let out = truncate_changelog(&text, budget);
        let marker_chars = TRUNCATION_MARKER.chars().count();
        prop_assert!(out.chars().count() <= budget + marker_chars);
        if text.chars().count() <= budget {
            prop_assert_eq!(out, text);
        } else {
            prop_assert!(out.ends_with(TRUNCATION_MARKER));
        }
    }
}
