//! Implementation of the `optima monitor` command.

use anyhow::Result;

use super::{execute_session, CommandContext};
use crate::application::Intent;
use crate::cli::types::MonitorArgs;

/// Attach to the job of a configuration.
pub async fn execute(args: MonitorArgs, ctx: &CommandContext) -> Result<i32> {
    let intent = Intent::Monitor {
        show_all_jobs: args.show_all_jobs,
    };
    execute_session("monitor", intent, &args.config, ctx).await
}
