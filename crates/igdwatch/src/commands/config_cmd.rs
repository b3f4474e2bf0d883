//! Config subcommand handlers.

use std::path::Path;

use igdwatch_config::ConfigError;

use crate::cli::{ConfigArgs, ConfigCommand};
use crate::error::CliError;

pub fn handle(args: ConfigArgs, path: &Path) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            println!("{}", path.display());
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = super::load(path)?;
            let rendered = toml::to_string_pretty(&cfg)
                .map_err(|e| CliError::config(path, ConfigError::Serialization(e)))?;
            print!("{rendered}");
            Ok(())
        }

        ConfigCommand::Check => {
            let cfg = super::load_valid(path)?;
            let noun = if cfg.entries.len() == 1 { "entry" } else { "entries" };
            println!("configuration OK: {} {noun}", cfg.entries.len());
            Ok(())
        }
    }
}
