//! Implementation of the hidden `optima server` command: the body of a
//! detached job process.
//!
//! The launcher spawns this command with stdin piped, records `starting`,
//! then writes the launch payload and closes the pipe. Until the payload
//! arrives the process does nothing observable.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

use crate::adapters::{CommandEngine, FileStatusStore};
use crate::application::{listen_for_termination, JobRunner};
use crate::domain::cancellation::CancellationToken;
use crate::domain::models::{JobStatus, LaunchPayload, Settings};
use crate::infrastructure::logging::{LogConfig, LoggerImpl};

/// Body of the detached job process: read the payload from stdin and run it.
pub async fn execute(settings: Settings) -> Result<i32> {
    // Handlers go in before anything else so an early kill is not lost.
    let cancel = CancellationToken::new();
    listen_for_termination(cancel.clone()).context("Failed to install signal handlers")?;

    let mut input = Vec::new();
    tokio::io::stdin()
        .read_to_end(&mut input)
        .await
        .context("Failed to read the launch payload")?;
    let payload: LaunchPayload =
        serde_json::from_slice(&input).context("Launch payload is not valid JSON")?;

    let _logger = match LogConfig::for_job(&settings.logging, payload.identity.log_dir())
        .and_then(|config| LoggerImpl::init(&config))
    {
        Ok(logger) => Some(logger),
        Err(e) => {
            eprintln!("Failed to initialize job logging: {e:#}");
            None
        }
    };
    info!(
        pid = std::process::id(),
        run_id = %payload.run_id,
        identity = %payload.identity,
        config = %payload.config_path.display(),
        "Job process started"
    );

    let engine = CommandEngine::new().with_working_dir(payload.identity.output_dir());
    let runner = JobRunner::new(Arc::new(FileStatusStore::new()), Arc::new(engine));
    let status = runner.run(&payload, cancel).await?;

    if status == JobStatus::Failed {
        warn!(run_id = %payload.run_id, "Job finished with status failed");
        return Ok(1);
    }
    info!(run_id = %payload.run_id, status = %status, "Job process exiting");
    Ok(0)
}
