pub mod config;
pub mod types;

pub use config::{AgentConfig, BUILD_VERSION, ConfigError, DEV_VERSION};
pub use types::*;
