use std::path::PathBuf;

use clap::{Args, Subcommand};
use windpack_config::{Mode, ResolveOptions};

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve the configuration and print it as JSON
    Config(ConfigArgs),

    /// Resolve the configuration and report whether it is valid
    Check(CheckArgs),

    /// Resolve the configuration again every time the config file changes
    Watch(WatchArgs),
}

/// Arguments shared by every command that resolves a configuration.
#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Build mode handed to plugins (development or production)
    ///
    /// Also overrides any `mode` set in the config file.
    #[arg(short, long, env = "WINDPACK_MODE")]
    pub mode: Option<Mode>,

    /// Config file to use instead of searching for windpack.config.*
    ///
    /// Relative to the project root.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Project root
    #[arg(short, long, default_value = ".", value_name = "DIR")]
    pub root: PathBuf,
}

impl ResolveArgs {
    pub fn to_options(&self) -> ResolveOptions {
        let mut options = ResolveOptions::new(&self.root);
        if let Some(config) = &self.config {
            options = options.config_file(config);
        }
        if let Some(mode) = self.mode {
            options = options.mode(mode);
        }
        options
    }
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub resolve: ResolveArgs,

    /// Print compact JSON on a single line
    #[arg(long)]
    pub compact: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    #[command(flatten)]
    pub resolve: ResolveArgs,
}

#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    #[command(flatten)]
    pub resolve: ResolveArgs,

    /// Milliseconds to wait for more changes before resolving again
    #[arg(long, default_value_t = 100, value_name = "MS")]
    pub debounce: u64,
}
