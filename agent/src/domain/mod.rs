//! Domain layer — pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod error;
pub mod ledger;
pub mod notice;
pub mod release;
pub mod script;
pub mod version;

pub use error::{
    DeliveryError, DownloadError, FetchError, LaunchError, LockError, UpdateError,
    ValidationError, VersionError,
};
pub use ledger::{ActiveSubscriber, Ledger, normalize_identity};
pub use notice::InteractiveAction;
pub use version::{EmbeddableVersion, Version, is_safe_for_embedding, should_update};
