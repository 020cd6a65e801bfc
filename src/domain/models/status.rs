//! Job lifecycle status model.
//!
//! A job moves forward only: `never_run -> starting -> running -> {completed,
//! failed, stopped}`. `starting` may also end directly in `failed` or
//! `stopped`. Terminal states have no outgoing transitions; a new run for the
//! same job starts from a fresh record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::StatusStoreError;

/// Lifecycle status of an optimization job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// No run has been recorded for this job
    NeverRun,
    /// The launcher is spinning up the detached job process
    Starting,
    /// The optimizer engine is actively iterating
    Running,
    /// The optimization finished successfully
    Completed,
    /// The optimization failed; the record carries a message
    Failed,
    /// The job was killed on user request
    Stopped,
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::NeverRun
    }
}

impl JobStatus {
    /// Name used in status files and output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NeverRun => "never_run",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
        }
    }

    /// Parse a status name; `complete` is accepted for `completed`.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "never_run" => Some(Self::NeverRun),
            "starting" => Some(Self::Starting),
            "running" => Some(Self::Running),
            "completed" | "complete" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "stopped" => Some(Self::Stopped),
            _ => None,
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Stopped)
    }

    /// A job process is (supposed to be) alive in these states.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }

    /// Valid transitions from this status.
    pub fn valid_transitions(&self) -> Vec<JobStatus> {
        match self {
            Self::NeverRun => vec![Self::Starting],
            Self::Starting => vec![Self::Running, Self::Failed, Self::Stopped],
            Self::Running => vec![Self::Completed, Self::Failed, Self::Stopped],
            Self::Completed | Self::Failed | Self::Stopped => vec![],
        }
    }

    /// Whether the lifecycle allows moving to `new_status`.
    pub fn can_transition_to(&self, new_status: Self) -> bool {
        self.valid_transitions().contains(&new_status)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted record of a job's lifecycle state.
///
/// This is the single source of truth shared by the launching CLI, the
/// detached job process and any later `monitor`/`kill` invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub status: JobStatus,
    /// Human-readable detail, present on failure and completion
    #[serde(default)]
    pub message: Option<String>,
    /// Identifies the launch this record belongs to
    #[serde(default)]
    pub run_id: Option<Uuid>,
    /// Process id of the detached job process
    #[serde(default)]
    pub pid: Option<u32>,
    /// Start time of that process as reported by the OS, used to tell it
    /// apart from a later process reusing the pid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_start: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for StatusRecord {
    fn default() -> Self {
        Self::never_run()
    }
}

impl StatusRecord {
    /// The record reported for a job with nothing persisted yet.
    pub fn never_run() -> Self {
        let now = Utc::now();
        Self {
            status: JobStatus::NeverRun,
            message: None,
            run_id: None,
            pid: None,
            process_start: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A fresh `starting` record for a new launch.
    pub fn starting(run_id: Uuid, pid: u32) -> Self {
        let now = Utc::now();
        Self {
            status: JobStatus::Starting,
            message: None,
            run_id: Some(run_id),
            pid: Some(pid),
            process_start: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record the OS start time of the job process.
    #[must_use]
    pub fn with_process_start(mut self, process_start: Option<u64>) -> Self {
        self.process_start = process_start;
        self
    }

    /// Whether the job has finished, one way or another.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether a job process is supposed to be alive.
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Whether a fresh record may replace this one.
    pub fn can_be_replaced(&self) -> bool {
        self.status == JobStatus::NeverRun || self.status.is_terminal()
    }

    /// Whether the lifecycle allows moving to `new_status`.
    pub fn can_transition_to(&self, new_status: JobStatus) -> bool {
        self.status.can_transition_to(new_status)
    }

    /// Transition to a new status, keeping run id and pid.
    pub fn transition_to(
        &mut self,
        new_status: JobStatus,
        message: Option<String>,
    ) -> Result<(), StatusStoreError> {
        if !self.can_transition_to(new_status) {
            return Err(StatusStoreError::InvalidTransition {
                from: self.status,
                to: new_status,
            });
        }

        self.status = new_status;
        if message.is_some() {
            self.message = message;
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let mut record = StatusRecord::never_run();
        assert!(record.can_transition_to(JobStatus::Starting));

        let mut record_started = StatusRecord::starting(Uuid::new_v4(), 42);
        record_started.transition_to(JobStatus::Running, None).unwrap();
        record_started
            .transition_to(JobStatus::Completed, Some("Maximum number of batches reached".into()))
            .unwrap();
        assert_eq!(record_started.status, JobStatus::Completed);
        assert_eq!(
            record_started.message.as_deref(),
            Some("Maximum number of batches reached")
        );

        record.status = JobStatus::Starting;
        assert!(record.can_transition_to(JobStatus::Failed));
    }

    #[test]
    fn test_running_only_reachable_from_starting() {
        for status in [
            JobStatus::NeverRun,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Stopped,
        ] {
            assert!(!status.can_transition_to(JobStatus::Running), "{status} -> running");
        }
        assert!(JobStatus::Starting.can_transition_to(JobStatus::Running));
    }

    #[test]
    fn test_terminal_states_have_no_exit() {
        for status in [JobStatus::Completed, JobStatus::Failed, JobStatus::Stopped] {
            assert!(status.is_terminal());
            assert!(status.valid_transitions().is_empty());
        }
    }

    #[test]
    fn test_invalid_transition_keeps_record() {
        let mut record = StatusRecord::never_run();
        let err = record.transition_to(JobStatus::Running, None).unwrap_err();
        assert!(matches!(
            err,
            StatusStoreError::InvalidTransition {
                from: JobStatus::NeverRun,
                to: JobStatus::Running
            }
        ));
        assert_eq!(record.status, JobStatus::NeverRun);
    }

    #[test]
    fn test_replaceable_only_when_idle_or_terminal() {
        let mut record = StatusRecord::never_run();
        assert!(record.can_be_replaced());
        record.status = JobStatus::Running;
        assert!(!record.can_be_replaced());
        record.status = JobStatus::Starting;
        assert!(!record.can_be_replaced());
        record.status = JobStatus::Failed;
        assert!(record.can_be_replaced());
    }

    #[test]
    fn test_status_round_trips_through_str() {
        assert_eq!(JobStatus::from_str("never_run"), Some(JobStatus::NeverRun));
        assert_eq!(JobStatus::from_str("COMPLETED"), Some(JobStatus::Completed));
        assert_eq!(JobStatus::from_str("bogus"), None);
        assert_eq!(
            serde_json::to_string(&JobStatus::NeverRun).unwrap(),
            "\"never_run\""
        );
    }
}
