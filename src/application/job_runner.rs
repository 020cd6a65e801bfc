//! Job runner - the body of the detached job process.
//!
//! Owns the status record from the moment it receives its payload: it moves
//! `starting` to `running` when the engine reports readiness and records the
//! terminal status when the engine finishes, fails or is cancelled.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};

use crate::adapters::event_log::EventLog;
use crate::domain::cancellation::CancellationToken;
use crate::domain::models::{
    EngineEvent, EngineOutcome, EventKind, JobEvent, JobStatus, LaunchPayload,
};
use crate::domain::ports::{OptimizerEngine, StatusStore};

/// Message recorded when a job is stopped on request.
pub const STOPPED_MESSAGE: &str = "Optimization stopped by user";

const EVENT_BUFFER: usize = 256;

/// Turn SIGTERM and SIGINT into cancellation of `cancel`.
///
/// Must be called from within the runtime. The handler never touches the
/// status record; the runner records `stopped` once the engine has wound down.
pub fn listen_for_termination(cancel: CancellationToken) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    tokio::spawn(async move {
        tokio::select! {
            _ = terminate.recv() => info!("Received SIGTERM"),
            _ = interrupt.recv() => info!("Received SIGINT"),
        }
        cancel.cancel();
    });
    Ok(())
}

/// Runs an optimizer engine on behalf of a launch and records the outcome.
pub struct JobRunner {
    store: Arc<dyn StatusStore>,
    engine: Arc<dyn OptimizerEngine>,
}

impl JobRunner {
    /// Runner writing to `store` and driving `engine`.
    pub fn new(store: Arc<dyn StatusStore>, engine: Arc<dyn OptimizerEngine>) -> Self {
        Self { store, engine }
    }

    /// Run the job described by `payload` and return its final status.
    ///
    /// A payload whose run no longer owns the status record is ignored.
    #[instrument(skip_all, fields(identity = %payload.identity, run_id = %payload.run_id))]
    pub async fn run(&self, payload: &LaunchPayload, cancel: CancellationToken) -> Result<JobStatus> {
        let identity = &payload.identity;
        let record = self
            .store
            .read(identity)
            .await
            .context("Failed to read status record")?;
        if record.run_id != Some(payload.run_id) || record.status != JobStatus::Starting {
            warn!(
                status = %record.status,
                "Status record does not belong to this launch, exiting"
            );
            return Ok(record.status);
        }

        let events = EventLog::new(identity);
        if let Err(e) = events.reset().await {
            warn!(error = %e, "Failed to clear previous job events");
        }

        if cancel.is_cancelled() {
            return self.finish(payload, JobStatus::Stopped, STOPPED_MESSAGE).await;
        }

        info!(
            engine = self.engine.name(),
            config = %payload.config_path.display(),
            "Starting optimization"
        );
        for step in &payload.engine.simulation.forward_model {
            info!(job = %step.name, "Forward model job");
        }

        let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
        let engine_run = self.engine.run(&payload.engine, tx, cancel.clone());
        tokio::pin!(engine_run);

        let mut running = false;
        let outcome = loop {
            tokio::select! {
                result = &mut engine_run => break result,
                Some(event) = rx.recv() => {
                    self.handle_event(payload, &events, event, &mut running).await?;
                }
            }
        };
        while let Ok(event) = rx.try_recv() {
            self.handle_event(payload, &events, event, &mut running).await?;
        }

        match outcome {
            Ok(EngineOutcome::Completed { message }) => {
                if !running {
                    self.transition(payload, JobStatus::Running, None).await?;
                }
                let message = message.unwrap_or_else(|| "Optimization completed".to_string());
                self.finish(payload, JobStatus::Completed, &message).await
            }
            Ok(EngineOutcome::Cancelled) => {
                self.finish(payload, JobStatus::Stopped, STOPPED_MESSAGE).await
            }
            Err(e) => {
                error!(error = %e, "Optimizer engine failed");
                self.finish(payload, JobStatus::Failed, &e.to_string()).await
            }
        }
    }

    async fn handle_event(
        &self,
        payload: &LaunchPayload,
        events: &EventLog,
        event: EngineEvent,
        running: &mut bool,
    ) -> Result<()> {
        match event {
            EngineEvent::Ready => {
                if !*running {
                    self.transition(payload, JobStatus::Running, None).await?;
                    *running = true;
                    info!("Optimization running");
                }
            }
            EngineEvent::Progress(event) => {
                if event.kind == EventKind::ForwardModel {
                    info!(job = ?event.job, "{}", event.message);
                }
                if let Err(e) = events.append(&event).await {
                    warn!(error = %e, "Failed to record job event");
                }
            }
        }
        Ok(())
    }

    async fn transition(
        &self,
        payload: &LaunchPayload,
        to: JobStatus,
        message: Option<String>,
    ) -> Result<()> {
        self.store
            .transition_run(&payload.identity, payload.run_id, to, message)
            .await
            .with_context(|| format!("Failed to record status {to}"))?;
        Ok(())
    }

    async fn finish(
        &self,
        payload: &LaunchPayload,
        status: JobStatus,
        message: &str,
    ) -> Result<JobStatus> {
        let event = JobEvent::new(EventKind::Finished, format!("{status}: {message}"));
        if let Err(e) = EventLog::new(&payload.identity).append(&event).await {
            warn!(error = %e, "Failed to record final job event");
        }

        self.transition(payload, status, Some(message.to_string()))
            .await?;
        info!(status = %status, message, "Job finished");
        Ok(status)
    }
}
