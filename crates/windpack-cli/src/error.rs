//! Error types for the windpack CLI.
//!
//! Library failures arrive as [`ConfigError`] and are wrapped unchanged;
//! [`cli_error_to_miette`] turns the final error into a report at the top of
//! `main`.

mod miette;

use std::path::PathBuf;

use thiserror::Error;
use windpack_config::ConfigError;

pub use self::miette::cli_error_to_miette;

/// Top-level CLI error.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Project root not found: {0}\n\nHint: Pass an existing directory with --root")]
    RootNotFound(PathBuf),

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize configuration: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Hint shown under the error, if the user can act on it.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            CliError::Config(err) => err.hint(),
            _ => None,
        }
    }
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;
