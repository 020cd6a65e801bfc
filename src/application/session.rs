//! Session controller - decides what a `run`, `monitor` or `kill` does for a
//! job, given its current status record.
//!
//! | status            | run                 | run --new-run      | monitor       | kill                 |
//! |-------------------|---------------------|--------------------|---------------|----------------------|
//! | never run         | launch, wait, follow| launch, wait, follow| nothing runs | nothing to kill      |
//! | starting/running  | already running     | rejected           | follow        | signal, await stop   |
//! | terminal          | prior result        | launch, wait, follow| prior result | nothing to kill      |
//!
//! A stale record (active, but its process is gone) counts as failed.

use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, instrument};

use crate::application::launcher::ServerLauncher;
use crate::application::liveness::{effective_record, is_stale};
use crate::application::monitor::{Monitor, MonitorOutcome};
use crate::application::readiness::{Readiness, ReadinessWaiter};
use crate::domain::cancellation::CancellationToken;
use crate::domain::errors::{ProcessError, SessionError, SessionResult, StatusStoreError};
use crate::domain::models::{JobIdentity, JobStatus, OptimizationConfig, Settings, StatusRecord};
use crate::domain::ports::{JobSpawner, ProcessControl, SessionReporter, StatusStore};
use crate::services::translator::build_engine_request;
use crate::services::validation::ConfigValidator;

/// What the operator asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Run { new_run: bool, show_all_jobs: bool },
    Monitor { show_all_jobs: bool },
    Kill,
}

/// How a session ended, when it did not end in an error.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// A followed job reached a terminal status
    Finished(StatusRecord),
    /// `run` without `--new-run` found an active job
    AlreadyRunning(StatusRecord),
    /// The job had already finished before this invocation
    PriorResult(StatusRecord),
    /// `monitor` found no job
    NothingRunning,
    /// `kill` found no active job
    NothingToKill(StatusRecord),
    /// `kill` observed the job acknowledge with `stopped`
    Stopped(StatusRecord),
    /// The operator interrupted waiting or monitoring; the job is untouched
    Detached(StatusRecord),
}

impl SessionOutcome {
    /// The status record the outcome carries, if any.
    pub fn record(&self) -> Option<&StatusRecord> {
        match self {
            Self::NothingRunning => None,
            Self::Finished(r)
            | Self::AlreadyRunning(r)
            | Self::PriorResult(r)
            | Self::NothingToKill(r)
            | Self::Stopped(r)
            | Self::Detached(r) => Some(r),
        }
    }

    /// Process exit code: non-zero only when a reported job failed.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Finished(r) | Self::PriorResult(r) if r.status == JobStatus::Failed => 1,
            _ => 0,
        }
    }
}

/// Decides what `run`, `monitor` and `kill` do for a configuration.
pub struct SessionController {
    store: Arc<dyn StatusStore>,
    process: Arc<dyn ProcessControl>,
    launcher: ServerLauncher,
    validator: ConfigValidator,
    settings: Settings,
}

impl SessionController {
    /// Controller over the given store, process control and spawner.
    pub fn new(
        store: Arc<dyn StatusStore>,
        process: Arc<dyn ProcessControl>,
        spawner: Arc<dyn JobSpawner>,
        settings: Settings,
    ) -> Self {
        Self {
            launcher: ServerLauncher::new(store.clone(), spawner),
            store,
            process,
            validator: ConfigValidator::new(),
            settings,
        }
    }

    /// Use `validator` for configuration files.
    #[must_use]
    pub fn with_validator(mut self, validator: ConfigValidator) -> Self {
        self.validator = validator;
        self
    }

    /// The validator used for configuration files.
    pub fn validator(&self) -> &ConfigValidator {
        &self.validator
    }

    /// The job's status as readers should see it.
    pub async fn status(&self, identity: &JobIdentity) -> Result<StatusRecord, StatusStoreError> {
        let record = self.store.read(identity).await?;
        Ok(effective_record(record, self.process.as_ref()))
    }

    /// Carry out `intent` for `config`.
    pub async fn execute(
        &self,
        intent: Intent,
        config: &OptimizationConfig,
        reporter: &dyn SessionReporter,
        cancel: &CancellationToken,
    ) -> SessionResult<SessionOutcome> {
        match intent {
            Intent::Run {
                new_run,
                show_all_jobs,
            } => self.run(config, new_run, show_all_jobs, reporter, cancel).await,
            Intent::Monitor { show_all_jobs } => {
                self.monitor(config, show_all_jobs, reporter, cancel).await
            }
            Intent::Kill => self.kill(config, reporter, cancel).await,
        }
    }

    /// Launch the job, or report the one already there, and follow it.
    #[instrument(skip_all, fields(identity = %config.identity(), new_run))]
    pub async fn run(
        &self,
        config: &OptimizationConfig,
        new_run: bool,
        show_all_jobs: bool,
        reporter: &dyn SessionReporter,
        cancel: &CancellationToken,
    ) -> SessionResult<SessionOutcome> {
        let record = self.status(config.identity()).await?;

        match record.status {
            JobStatus::NeverRun => {}
            JobStatus::Starting | JobStatus::Running if new_run => {
                return Err(SessionError::AlreadyRunning {
                    config_path: config.config_path().to_path_buf(),
                });
            }
            JobStatus::Starting | JobStatus::Running => {
                return Ok(SessionOutcome::AlreadyRunning(record));
            }
            _ if new_run => {}
            _ => return Ok(SessionOutcome::PriorResult(record)),
        }

        self.launch_and_follow(config, show_all_jobs, reporter, cancel)
            .await
    }

    async fn launch_and_follow(
        &self,
        config: &OptimizationConfig,
        show_all_jobs: bool,
        reporter: &dyn SessionReporter,
        cancel: &CancellationToken,
    ) -> SessionResult<SessionOutcome> {
        reporter.launching(config.identity());
        let registry = self.validator.registry_for(config);
        let request = build_engine_request(config, &registry);
        let handle = self.launcher.start(config, request).await?;
        if let Some(ref rolled) = handle.rolled_from {
            reporter.notice(&format!(
                "Previous output moved to {}",
                rolled.display()
            ));
        }

        reporter.waiting();
        let waiter = ReadinessWaiter::new(
            self.store.clone(),
            self.process.clone(),
            self.settings.poll_interval(),
        );
        let timeout = self.settings.readiness_timeout();
        match waiter.wait_until_ready(&handle, timeout, cancel).await? {
            Readiness::Ready(record) => reporter.ready(&record),
            Readiness::Failed(record) => return Err(engine_failure(&record)),
            Readiness::TimedOut { waited } => {
                return Err(SessionError::Timeout {
                    waited,
                    config_path: config.config_path().to_path_buf(),
                });
            }
            Readiness::Interrupted(record) => return Ok(SessionOutcome::Detached(record)),
        }

        let monitor = Monitor::new(
            self.store.clone(),
            self.process.clone(),
            self.settings.poll_interval(),
        )
        .show_all_jobs(show_all_jobs);

        match monitor.attach(&handle.identity, reporter, cancel).await? {
            MonitorOutcome::Terminal(record) if record.status == JobStatus::Failed => {
                Err(engine_failure(&record))
            }
            MonitorOutcome::Terminal(record) | MonitorOutcome::NotRunning(record) => {
                Ok(SessionOutcome::Finished(record))
            }
            MonitorOutcome::Detached(record) => Ok(SessionOutcome::Detached(record)),
        }
    }

    /// Follow an active job until it ends or the operator detaches.
    #[instrument(skip_all, fields(identity = %config.identity()))]
    pub async fn monitor(
        &self,
        config: &OptimizationConfig,
        show_all_jobs: bool,
        reporter: &dyn SessionReporter,
        cancel: &CancellationToken,
    ) -> SessionResult<SessionOutcome> {
        let record = self.status(config.identity()).await?;
        match record.status {
            JobStatus::NeverRun => return Ok(SessionOutcome::NothingRunning),
            status if status.is_terminal() => return Ok(SessionOutcome::PriorResult(record)),
            _ => {}
        }

        let monitor = Monitor::new(
            self.store.clone(),
            self.process.clone(),
            self.settings.poll_interval(),
        )
        .show_all_jobs(show_all_jobs);

        Ok(
            match monitor.attach(config.identity(), reporter, cancel).await? {
                MonitorOutcome::Terminal(record) => SessionOutcome::Finished(record),
                MonitorOutcome::Detached(record) => SessionOutcome::Detached(record),
                MonitorOutcome::NotRunning(_) => SessionOutcome::NothingRunning,
            },
        )
    }

    /// Signal the job process and wait, bounded, for it to record `stopped`.
    /// The record itself is only ever written by the job.
    #[instrument(skip_all, fields(identity = %config.identity()))]
    pub async fn kill(
        &self,
        config: &OptimizationConfig,
        reporter: &dyn SessionReporter,
        cancel: &CancellationToken,
    ) -> SessionResult<SessionOutcome> {
        let identity = config.identity();
        let record = self.store.read(identity).await?;
        let pid = match record.pid {
            Some(pid) if record.is_active() && !is_stale(&record, self.process.as_ref()) => pid,
            _ => {
                return Ok(SessionOutcome::NothingToKill(effective_record(
                    record,
                    self.process.as_ref(),
                )));
            }
        };

        match self.process.terminate(pid) {
            Ok(()) => {}
            Err(ProcessError::NotFound(_)) => {
                let record = self.status(identity).await?;
                return Ok(SessionOutcome::NothingToKill(record));
            }
            Err(e) => return Err(e.into()),
        }
        info!(pid, "Waiting for job to stop");
        reporter.notice(&format!("Sent termination signal to job process {pid}"));

        let timeout = self.settings.kill_timeout();
        let started = Instant::now();
        let deadline = started + timeout;
        loop {
            let record = self.status(identity).await?;
            if record.status == JobStatus::Stopped {
                return Ok(SessionOutcome::Stopped(record));
            }
            if record.is_terminal() {
                return Ok(SessionOutcome::Finished(record));
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(SessionError::KillTimeout {
                    pid,
                    waited: now - started,
                });
            }
            let nap = self.settings.poll_interval().min(deadline - now);
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(SessionOutcome::Detached(record)),
                () = tokio::time::sleep(nap) => {}
            }
        }
    }
}

fn engine_failure(record: &StatusRecord) -> SessionError {
    SessionError::Engine {
        message: record
            .message
            .clone()
            .unwrap_or_else(|| "Optimization failed".to_string()),
    }
}
