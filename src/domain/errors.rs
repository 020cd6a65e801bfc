//! Domain errors for the Optima job orchestrator.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use super::models::JobStatus;

/// A single configuration violation, always tied to the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    /// Violation of `field`.
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Every violation found in one validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", format_violations(.0))]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    /// Violations in the order found.
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    /// Number of violations.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no violations.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if any violation's reason contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.0.iter().any(|e| e.reason.contains(needle))
    }
}

fn format_violations(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Errors reading or writing the persisted status record.
#[derive(Debug, Error)]
pub enum StatusStoreError {
    #[error("I/O error on status record {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Status record {path} is unreadable: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("Cannot start a fresh run while the job is {0}")]
    NotReplaceable(JobStatus),

    #[error("Status record belongs to another run")]
    RunMismatch,
}

/// The detached job process could not be started.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Failed to spawn job process: {0}")]
    Spawn(String),

    #[error("Failed to hand the job its configuration: {0}")]
    Handoff(String),

    #[error("Failed to prepare output directory {path}: {reason}")]
    OutputDir { path: PathBuf, reason: String },

    #[error("Failed to record job start: {0}")]
    Store(#[from] StatusStoreError),
}

/// The optimizer or simulation engine reported failure.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to start optimizer engine `{program}`: {reason}")]
    Spawn { program: String, reason: String },

    #[error("{0}")]
    Failed(String),

    #[error("Optimizer engine I/O error: {0}")]
    Io(String),
}

/// Errors probing or signalling a job process.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("No such process: {0}")]
    NotFound(u32),

    #[error("Failed to signal process {pid}: {reason}")]
    Signal { pid: u32, reason: String },
}

/// Errors surfaced by the session controller.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Configuration is invalid:\n{0}")]
    Validation(ValidationErrors),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error(
        "No response from the optimization job after {}s; it may still be starting. \
         Monitor it with `optima monitor {}`",
        .waited.as_secs(),
        .config_path.display()
    )]
    Timeout {
        waited: Duration,
        config_path: PathBuf,
    },

    #[error("{message}")]
    Engine { message: String },

    #[error(
        "An optimization is already running. Kill it first with `optima kill {}`",
        .config_path.display()
    )]
    AlreadyRunning { config_path: PathBuf },

    #[error(
        "Job process {pid} did not stop within {}s; it may still be shutting down",
        .waited.as_secs()
    )]
    KillTimeout { pid: u32, waited: Duration },

    #[error(transparent)]
    Store(#[from] StatusStoreError),

    #[error(transparent)]
    Process(#[from] ProcessError),
}

impl SessionError {
    /// Process exit code: 2 for invalid configuration, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            _ => 1,
        }
    }
}

impl From<ValidationErrors> for SessionError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

/// Result of a session operation.
pub type SessionResult<T> = Result<T, SessionError>;
