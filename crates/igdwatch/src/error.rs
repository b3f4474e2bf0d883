//! CLI error types with miette diagnostics.

use miette::Diagnostic;
use thiserror::Error;

use igdwatch_config::ConfigError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(
        code(igdwatch::validation),
        help("Fix the value in {path} or the matching IGDWATCH_* variable.")
    )]
    Validation {
        field: String,
        reason: String,
        path: String,
    },

    #[error("Could not load configuration from {path}")]
    #[diagnostic(code(igdwatch::config))]
    Config {
        path: String,
        #[source]
        source: ConfigError,
    },

    // ── Network ──────────────────────────────────────────────────────

    #[error("Could not determine a local source address")]
    #[diagnostic(
        code(igdwatch::no_local_ip),
        help("Set local_ip in the config file to choose the address explicitly.")
    )]
    NoLocalIp,

    // ── IO / Serialization ────────────────────────────────────────────

    #[error("Could not render JSON: {0}")]
    #[diagnostic(code(igdwatch::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation { .. } => exit_code::USAGE,
            Self::NoLocalIp => exit_code::NOT_FOUND,
            _ => exit_code::GENERAL,
        }
    }

    /// Wrap a config error, keeping validation failures distinguishable.
    pub fn config(path: &std::path::Path, err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation {
                field,
                reason,
                path: path.display().to_string(),
            },
            source => Self::Config {
                path: path.display().to_string(),
                source,
            },
        }
    }
}
