//! Windpack CLI.
//!
//! Command-line front end for [`windpack_config`]: resolves a project's
//! executable configuration, prints it, checks it, or keeps re-resolving it
//! while the config file changes.
//!
//! - [`cli`] - clap argument definitions
//! - [`commands`] - one module per subcommand
//! - [`error`] - CLI error type and miette conversion
//! - [`logger`] - tracing subscriber setup
//! - [`ui`] - status messages on stderr

pub mod cli;
pub mod commands;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, Result};
