//! Command implementations

pub mod check;
pub mod run;
pub mod seen;
pub mod subscribers;
pub mod update;
pub mod version;
