//! CLI command implementations.

pub mod kill;
pub mod lint;
pub mod monitor;
pub mod run;
pub mod server;
pub mod status;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use crate::adapters::{DetachedProcessSpawner, FileStatusStore, NixProcessControl};
use crate::application::{Intent, SessionController};
use crate::cli::output::{output, ConsoleReporter, SessionReport};
use crate::domain::cancellation::CancellationToken;
use crate::domain::errors::SessionError;
use crate::domain::models::{OptimizationConfig, Settings};
use crate::infrastructure::config::load_job_config;

/// State shared by the interactive commands of one invocation.
pub struct CommandContext {
    pub settings: Settings,
    pub json: bool,
    /// Flipped on Ctrl-C; stops waiting or following, never the job.
    pub cancel: CancellationToken,
}

impl CommandContext {
    /// Context for `settings`, printing JSON when `json` is set.
    pub fn new(settings: Settings, json: bool) -> Self {
        Self {
            settings,
            json,
            cancel: CancellationToken::new(),
        }
    }

    /// Session controller wired to the host's processes and status files.
    pub fn controller(&self) -> Result<SessionController> {
        let spawner = DetachedProcessSpawner::current_exe()
            .context("Failed to locate the optima executable")?;
        Ok(SessionController::new(
            Arc::new(FileStatusStore::new()),
            Arc::new(NixProcessControl::new()),
            Arc::new(spawner),
            self.settings.clone(),
        ))
    }
}

/// Load the job configuration; violations surface as a validation error.
pub fn load_config(controller: &SessionController, path: &Path) -> Result<OptimizationConfig> {
    load_job_config(controller.validator(), path)
        .map_err(|errors| anyhow::Error::new(SessionError::Validation(errors)))
}

/// Run one session intent and print its report. Returns the exit code.
async fn execute_session(
    command: &'static str,
    intent: Intent,
    config_path: &Path,
    ctx: &CommandContext,
) -> Result<i32> {
    let controller = ctx.controller()?;
    let config = load_config(&controller, config_path)?;

    let outcome = {
        let reporter = ConsoleReporter::new(ctx.json);
        controller
            .execute(intent, &config, &reporter, &ctx.cancel)
            .await?
    };

    let report = SessionReport::new(command, config.config_path(), config.identity(), outcome);
    output(&report, ctx.json);
    Ok(report.exit_code)
}
