//! Subcommand handlers.

pub mod config_cmd;
pub mod entries;
pub mod local_ip;

use std::path::Path;

use igdwatch_config::{Config, load_config_from};

use crate::error::CliError;

/// Load the config at `path` (defaults + file + environment).
pub fn load(path: &Path) -> Result<Config, CliError> {
    load_config_from(path).map_err(|e| CliError::config(path, e))
}

/// Load and validate the config at `path`.
pub fn load_valid(path: &Path) -> Result<Config, CliError> {
    let cfg = load(path)?;
    cfg.validate().map_err(|e| CliError::config(path, e))?;
    Ok(cfg)
}
