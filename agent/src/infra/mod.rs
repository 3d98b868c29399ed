//! Infrastructure layer — concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: HTTP, filesystem state,
//! process spawning and liveness checks.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` are forbidden.

pub mod authorizer;
pub mod config;
pub mod feed;
pub mod fs;
pub mod ledger;
pub mod lock;
pub mod notice;
pub mod process;
pub mod script;
pub mod stager;
pub mod telegram;
