//! Final report of a `run`, `monitor`, `kill` or `status` invocation.

use serde::Serialize;
use std::path::{Path, PathBuf};

use super::{banner, format_status_table, CommandOutput};
use crate::application::SessionOutcome;
use crate::domain::models::{JobIdentity, JobStatus, StatusRecord};

/// Printable summary of a session command.
#[derive(Debug, Serialize)]
pub struct SessionReport {
    pub command: &'static str,
    pub config: PathBuf,
    pub output_dir: PathBuf,
    pub outcome: &'static str,
    pub record: Option<StatusRecord>,
    pub exit_code: i32,
    #[serde(skip)]
    identity: JobIdentity,
    #[serde(skip)]
    kind: SessionOutcome,
    #[serde(skip)]
    use_colors: bool,
}

impl SessionReport {
    /// Report for `outcome` of `command` on the job at `identity`.
    pub fn new(
        command: &'static str,
        config_path: &Path,
        identity: &JobIdentity,
        outcome: SessionOutcome,
    ) -> Self {
        Self {
            command,
            config: config_path.to_path_buf(),
            output_dir: identity.output_dir().to_path_buf(),
            outcome: outcome_name(&outcome),
            record: outcome.record().cloned(),
            exit_code: outcome.exit_code(),
            identity: identity.clone(),
            kind: outcome,
            use_colors: console::colors_enabled(),
        }
    }

    /// Report for `status`, which never fails on the job's outcome.
    pub fn status(config_path: &Path, identity: &JobIdentity, record: StatusRecord) -> Self {
        let mut report = Self::new("status", config_path, identity, SessionOutcome::PriorResult(record));
        report.outcome = "status";
        report.exit_code = 0;
        report
    }

    fn table(&self, record: &StatusRecord) -> String {
        format_status_table(&self.identity, record, self.use_colors)
    }
}

fn outcome_name(outcome: &SessionOutcome) -> &'static str {
    match outcome {
        SessionOutcome::Finished(_) => "finished",
        SessionOutcome::AlreadyRunning(_) => "already_running",
        SessionOutcome::PriorResult(_) => "prior_result",
        SessionOutcome::NothingRunning => "nothing_running",
        SessionOutcome::NothingToKill(_) => "nothing_to_kill",
        SessionOutcome::Stopped(_) => "stopped",
        SessionOutcome::Detached(_) => "detached",
    }
}

/// Hint shown when `run` finds the job already running.
pub fn already_running_message(config: &Path) -> String {
    format!(
        "An optimization is currently running.\n\
         To monitor the running optimization use command:\n  `optima monitor {0}`\n\
         To kill the running optimization use command:\n  `optima kill {0}`",
        config.display()
    )
}

impl CommandOutput for SessionReport {
    fn to_human(&self) -> String {
        let config = self.config.display();
        match self.kind {
            SessionOutcome::Finished(ref record) => {
                let headline = match record.status {
                    JobStatus::Completed => "Optimization completed.",
                    JobStatus::Stopped => "Optimization was stopped.",
                    _ => "Optimization failed.",
                };
                format!("{headline}\n{}", self.table(record))
            }
            SessionOutcome::AlreadyRunning(_) => banner(&already_running_message(&self.config)),
            SessionOutcome::PriorResult(ref record) if self.command == "status" => self.table(record),
            SessionOutcome::PriorResult(ref record) => {
                let hint = match record.status {
                    JobStatus::Failed => format!(
                        "The previous optimization failed.\n\
                         To start a new run use command:\n  `optima run {config} --new-run`"
                    ),
                    _ => format!(
                        "The optimization has already been run.\n\
                         To start a new run use command:\n  `optima run {config} --new-run`"
                    ),
                };
                format!("{}\n{}", self.table(record), banner(&hint))
            }
            SessionOutcome::NothingRunning => format!(
                "No optimization has been run for {config}.\n\
                 To start one use command:\n  `optima run {config}`"
            ),
            SessionOutcome::NothingToKill(ref record) => match record.status {
                JobStatus::NeverRun => "There is no running optimization to kill.".to_string(),
                status => format!(
                    "There is no running optimization to kill (last status: {status})."
                ),
            },
            SessionOutcome::Stopped(ref record) => {
                format!("The optimization was stopped.\n{}", self.table(record))
            }
            SessionOutcome::Detached(ref record) => format!(
                "Stopped following the optimization; it is still {}.\n\
                 To monitor it again use command:\n  `optima monitor {config}`\n\
                 To kill it use command:\n  `optima kill {config}`",
                record.status
            ),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
