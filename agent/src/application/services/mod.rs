//! Application services — one module per use-case.

pub mod checker;
pub mod completion;
pub mod update;
