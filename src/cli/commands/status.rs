//! Implementation of the `optima status` command.

use anyhow::{Context, Result};

use super::{load_config, CommandContext};
use crate::cli::output::{output, SessionReport};
use crate::cli::types::ConfigArg;

/// Print the status of a configuration's job.
pub async fn execute(args: ConfigArg, ctx: &CommandContext) -> Result<i32> {
    let controller = ctx.controller()?;
    let config = load_config(&controller, &args.config)?;
    let record = controller
        .status(config.identity())
        .await
        .context("Failed to read the job status")?;

    let report = SessionReport::status(config.config_path(), config.identity(), record);
    output(&report, ctx.json);
    Ok(report.exit_code)
}
