//! Miette report conversion for CLI errors.

use miette::Report;
use windpack_config::ConfigError;

use crate::error::CliError;

/// Convert CliError to miette Report
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Config(ConfigError::Validation(errors)) => {
            let count = errors.len();
            let fields: String = errors.iter().map(|e| format!("\n  - {e}")).collect();
            miette::miette!(
                help = "Fix the fields listed above in your windpack config",
                "Invalid windpack config ({} {}):{}",
                count,
                if count == 1 { "error" } else { "errors" },
                fields
            )
        }
        CliError::Config(ConfigError::Plugin { plugin, source }) => match source.hint() {
            Some(hint) => miette::miette!(help = hint, "Plugin \"{}\" failed: {}", plugin, source),
            None => miette::miette!(
                help = "The error was raised by the plugin's config hook",
                "Plugin \"{}\" failed: {}",
                plugin,
                source
            ),
        },
        other => match other.hint() {
            Some(hint) => miette::miette!(help = hint, "{}", other),
            None => miette::miette!("{}", other),
        },
    }
}
