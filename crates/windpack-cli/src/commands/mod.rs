//! Command implementations.

pub mod check;
pub mod config;
pub mod watch;

use std::sync::Arc;

use windpack_config::{ModuleHost, NodeHost, ResolvedConfig, RolldownCompiler, resolve_config};

use crate::cli::ResolveArgs;
use crate::error::{CliError, Result};
use crate::ui;

pub use check::execute as check_execute;
pub use config::execute as config_execute;
pub use watch::execute as watch_execute;

/// Run one resolution for `args` on `host`.
///
/// A missing config file is reported as a warning and yields `None`.
pub(crate) async fn resolve(
    args: &ResolveArgs,
    host: Arc<dyn ModuleHost>,
) -> Result<Option<ResolvedConfig>> {
    if !args.root.is_dir() {
        return Err(CliError::RootNotFound(args.root.clone()));
    }

    let resolved = resolve_config(&args.to_options(), &RolldownCompiler, host).await?;
    if resolved.is_none() {
        ui::warning(&format!(
            "No windpack.config file found in {}",
            args.root.display()
        ));
    }
    Ok(resolved)
}

/// Host shared by every resolution of one CLI run.
pub(crate) fn default_host() -> Arc<dyn ModuleHost> {
    Arc::new(NodeHost::new())
}

/// One-line summary of a successful resolution.
pub(crate) fn summary(resolved: &ResolvedConfig) -> String {
    let config = resolved.config.config();
    let names = config.plugin_names();
    let plugins = if names.is_empty() {
        ui::plural(0, "plugin")
    } else {
        format!("{}: {}", ui::plural(names.len(), "plugin"), names.join(", "))
    };

    format!(
        "{} ({}, {})",
        resolved.candidate.path.display(),
        resolved.mode,
        plugins
    )
}

fn log_externals(resolved: &ResolvedConfig) {
    for external in &resolved.externals {
        tracing::debug!("external {} -> {}", external.specifier, external.resolved);
    }
}
