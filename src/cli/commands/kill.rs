//! Implementation of the `optima kill` command.

use anyhow::Result;

use super::{execute_session, CommandContext};
use crate::application::Intent;
use crate::cli::types::ConfigArg;

/// Stop the job of a configuration.
pub async fn execute(args: ConfigArg, ctx: &CommandContext) -> Result<i32> {
    execute_session("kill", Intent::Kill, &args.config, ctx).await
}
