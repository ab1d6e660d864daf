//! Command-line interface definition.
//!
//! - `windpack config` - resolve and print the configuration as JSON
//! - `windpack check` - resolve and report whether the configuration is valid
//! - `windpack watch` - re-resolve whenever the config file changes

mod commands;

use clap::Parser;

pub use commands::{CheckArgs, Command, ConfigArgs, ResolveArgs, WatchArgs};

/// Windpack - executable configuration for windpack projects
#[derive(Parser, Debug)]
#[command(
    name = "windpack",
    version,
    about = "Resolve windpack configuration files",
    long_about = "Finds windpack.config.{ts,js,mjs,...}, compiles it with third-party imports\n\
                  left external, runs it, merges every plugin's config hook and validates\n\
                  the result."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}
