//! `windpack check`: resolve and report, without printing the config.

use crate::cli::CheckArgs;
use crate::error::Result;
use crate::ui;

use super::{default_host, log_externals, resolve, summary};

pub async fn execute(args: CheckArgs) -> Result<()> {
    let Some(resolved) = resolve(&args.resolve, default_host()).await? else {
        return Ok(());
    };
    log_externals(&resolved);

    ui::success(&format!("Config is valid: {}", summary(&resolved)));
    ui::info(&format!(
        "Dev server: {}",
        resolved.config.config().dev_server_url()
    ));
    Ok(())
}
