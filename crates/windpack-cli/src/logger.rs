//! Logging setup for the windpack CLI.
//!
//! Library crates only emit `tracing` events; this module installs the
//! subscriber that prints them.
//!
//! ```rust,no_run
//! use windpack_cli::logger::init_logger;
//!
//! init_logger(false, false, false);
//! tracing::info!("resolving config");
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const VERBOSE_FILTER: &str = "windpack=debug,windpack_config=debug,windpack_cli=debug";
const QUIET_FILTER: &str = "windpack=error,windpack_config=error,windpack_cli=error";
const DEFAULT_FILTER: &str = "windpack=info,windpack_config=info,windpack_cli=info";

/// Initialize the tracing subscriber.
///
/// The filter is chosen in this order:
/// 1. `--verbose`: debug for windpack crates
/// 2. `--quiet`: errors only
/// 3. `RUST_LOG`
/// 4. info for windpack crates
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let filter = select_filter(verbose, quiet);

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color && crate::ui::should_use_color())
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

fn select_filter(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The global subscriber can only be installed once per process, so these
    // only exercise filter construction.

    #[test]
    fn verbose_filter_enables_debug() {
        let filter = select_filter(true, false);
        assert!(filter.to_string().contains("windpack_config=debug"));
    }

    #[test]
    fn quiet_filter_is_errors_only() {
        let filter = select_filter(false, true);
        assert!(filter.to_string().contains("windpack_config=error"));
        assert!(!filter.to_string().contains("info"));
    }
}
