//! Implementation of the `optima run` command.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use super::{execute_session, CommandContext};
use crate::application::Intent;
use crate::cli::output::{banner, output, CommandOutput};
use crate::cli::types::RunArgs;

/// Printed for the removed `--kill` flag.
#[derive(Debug, Serialize)]
pub struct KillFlagRemoved {
    pub removed_option: &'static str,
    pub replacement: String,
}

impl KillFlagRemoved {
    /// Notice for `config`.
    pub fn new(config: &Path) -> Self {
        Self {
            removed_option: "--kill",
            replacement: format!("optima kill {}", config.display()),
        }
    }
}

impl CommandOutput for KillFlagRemoved {
    fn to_human(&self) -> String {
        banner(&format!(
            "The `optima run --kill` option has been removed.\n\
             To kill the running optimization use command:\n  `{}`",
            self.replacement
        ))
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Launch or follow the job of a configuration.
pub async fn execute(args: RunArgs, ctx: &CommandContext) -> Result<i32> {
    if args.kill {
        output(&KillFlagRemoved::new(&args.config), ctx.json);
        return Ok(0);
    }

    let intent = Intent::Run {
        new_run: args.new_run,
        show_all_jobs: args.show_all_jobs,
    };
    execute_session("run", intent, &args.config, ctx).await
}
