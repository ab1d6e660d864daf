//! Error types for configuration loading, merging and validation.

use std::path::PathBuf;

use thiserror::Error;

use crate::merge::MergeError;
use crate::schema::ValidationErrors;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    // Locating
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    // Compilation
    #[error("could not resolve \"{specifier}\" imported from {}", .importer.display())]
    Resolution { specifier: String, importer: PathBuf },

    #[error("failed to compile config: {0}")]
    Compile(String),

    // Loading
    #[error(
        "{} is a CommonJS module, which windpack cannot load.\n\
         Rename it to windpack.config.mjs / windpack.config.mts, \
         or add \"type\": \"module\" to the nearest package.json",
        .path.display()
    )]
    UnsupportedFormat { path: PathBuf },

    #[error("error while evaluating {}: {message}", .path.display())]
    Evaluation { path: PathBuf, message: String },

    #[error("{} must export a configuration object as default, found {found}", .path.display())]
    NotAValue { path: PathBuf, found: String },

    #[error("{message}")]
    Call { message: String },

    #[error("config runtime error: {0}")]
    Runtime(String),

    // Composition and validation
    #[error("plugin \"{plugin}\" failed: {source}")]
    Plugin {
        plugin: String,
        #[source]
        source: Box<ConfigError>,
    },

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    // Plumbing
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    /// Actionable hint for errors the user can fix in their project.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ConfigError::Resolution { .. } => {
                Some("Install the missing package or fix the import path")
            }
            ConfigError::UnsupportedFormat { .. } => {
                Some("Use an .mjs/.mts extension or set \"type\": \"module\" in package.json")
            }
            ConfigError::NotAValue { .. } => {
                Some("Use `export default defineConfig({ ... })` with a plain object")
            }
            ConfigError::Runtime(_) => {
                Some("Make sure Node.js is installed, or point WINDPACK_NODE at the binary")
            }
            _ => None,
        }
    }
}
