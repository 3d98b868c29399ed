//! Application layer — use-case orchestration over port traits.
//!
//! Imports from `crate::domain` and `outpost_common` only. All I/O is routed
//! through the traits in [`ports`].

pub mod ports;
pub mod services;
