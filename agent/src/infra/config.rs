//! Environment-backed configuration loading.

use anyhow::{Context, Result};
use outpost_common::AgentConfig;

/// Prefix of every configuration variable.
pub const ENV_PREFIX: &str = "OUTPOST_";

/// Loads [`AgentConfig`] from the process environment and validates it.
///
/// # Errors
///
/// Returns an error if a variable cannot be parsed or the result is invalid.
pub fn load_config() -> Result<AgentConfig> {
    load_config_from(std::env::vars())
}

/// Same as [`load_config`] over an explicit set of variables.
///
/// # Errors
///
/// Returns an error if a variable cannot be parsed or the result is invalid.
pub fn load_config_from<I>(vars: I) -> Result<AgentConfig>
where
    I: IntoIterator<Item = (String, String)>,
{
    let config: AgentConfig = envy::prefixed(ENV_PREFIX)
        .from_iter(vars)
        .context("reading OUTPOST_* configuration")?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}
