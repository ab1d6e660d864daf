//! `windpack config`: print the resolved configuration.

use crate::cli::ConfigArgs;
use crate::error::Result;
use crate::ui;

use super::{default_host, log_externals, resolve, summary};

pub async fn execute(args: ConfigArgs) -> Result<()> {
    let Some(resolved) = resolve(&args.resolve, default_host()).await? else {
        return Ok(());
    };
    log_externals(&resolved);

    let value = resolved.config.value();
    let json = if args.compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{json}");

    ui::success(&summary(&resolved));
    Ok(())
}
