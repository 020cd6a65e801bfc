//! Monitor - follows a job's progress without ever changing its status.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::adapters::event_log::EventLogReader;
use crate::application::liveness::{effective_record, is_stale};
use crate::domain::cancellation::CancellationToken;
use crate::domain::errors::StatusStoreError;
use crate::domain::models::{EventKind, JobEvent, JobIdentity, JobStatus, StatusRecord};
use crate::domain::ports::{ProcessControl, SessionReporter, StatusStore};
use crate::services::forward_model_registry::ForwardModelRegistry;

/// How an attachment ended.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorOutcome {
    /// The job reached a terminal status (possibly by going stale)
    Terminal(StatusRecord),
    /// The operator detached; the job keeps running
    Detached(StatusRecord),
    /// There is no job to follow
    NotRunning(StatusRecord),
}

/// Follows a job's status and events.
pub struct Monitor {
    store: Arc<dyn StatusStore>,
    process: Arc<dyn ProcessControl>,
    registry: ForwardModelRegistry,
    poll_interval: Duration,
    show_all_jobs: bool,
}

impl Monitor {
    /// Monitor polling every `poll_interval`.
    pub fn new(
        store: Arc<dyn StatusStore>,
        process: Arc<dyn ProcessControl>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            store,
            process,
            registry: ForwardModelRegistry::with_builtins(),
            poll_interval,
            show_all_jobs: false,
        }
    }

    /// Also show forward model events of built-in helper jobs.
    #[must_use]
    pub fn show_all_jobs(mut self, show: bool) -> Self {
        self.show_all_jobs = show;
        self
    }

    fn is_visible(&self, event: &JobEvent) -> bool {
        if self.show_all_jobs || event.kind != EventKind::ForwardModel {
            return true;
        }
        !event
            .job
            .as_deref()
            .is_some_and(|job| self.registry.is_builtin(job))
    }

    async fn forward_events(&self, reader: &mut EventLogReader, reporter: &dyn SessionReporter) {
        match reader.read_new().await {
            Ok(events) => events
                .iter()
                .filter(|event| self.is_visible(event))
                .for_each(|event| reporter.event(event)),
            Err(e) => warn!(error = %e, "Failed to read job events"),
        }
    }

    /// Follow the job until it is terminal or `cancel` fires.
    pub async fn attach(
        &self,
        identity: &JobIdentity,
        reporter: &dyn SessionReporter,
        cancel: &CancellationToken,
    ) -> Result<MonitorOutcome, StatusStoreError> {
        let mut reader = EventLogReader::new(identity);
        let mut last_status: Option<JobStatus> = None;

        loop {
            self.forward_events(&mut reader, reporter).await;

            let record = self.store.read(identity).await?;
            if last_status != Some(record.status) {
                last_status = Some(record.status);
                reporter.status_changed(&record);
            }

            match record.status {
                JobStatus::NeverRun => return Ok(MonitorOutcome::NotRunning(record)),
                status if status.is_terminal() => {
                    // Pick up whatever the job logged before finishing.
                    self.forward_events(&mut reader, reporter).await;
                    return Ok(MonitorOutcome::Terminal(record));
                }
                _ if is_stale(&record, self.process.as_ref()) => {
                    self.forward_events(&mut reader, reporter).await;
                    let record = self.store.read(identity).await?;
                    let view = effective_record(record, self.process.as_ref());
                    if last_status != Some(view.status) {
                        reporter.status_changed(&view);
                    }
                    return Ok(MonitorOutcome::Terminal(view));
                }
                _ => {}
            }

            debug!(status = %record.status, "Job still active");
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(MonitorOutcome::Detached(record)),
                () = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}
