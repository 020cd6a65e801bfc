//! Engine-facing input contract and event types.
//!
//! Everything here is derived from a validated [`OptimizationConfig`] and
//! regenerated on every launch; none of it is persisted by this crate.
//!
//! [`OptimizationConfig`]: super::optimization::OptimizationConfig

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use super::identity::JobIdentity;

/// Normalized configuration consumed by the optimizer engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEngineConfig {
    pub algorithm: String,
    pub max_batch_num: Option<u32>,
    pub max_iterations: Option<u32>,
    pub variables: Variables,
    pub objective_functions: ObjectiveFunctions,
    pub realizations: Vec<u32>,
    pub cvar: Option<CvarParameters>,
}

/// Control variables, index-aligned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variables {
    pub names: Vec<String>,
    pub initial_values: Vec<f64>,
    pub lower_bounds: Vec<f64>,
    pub upper_bounds: Vec<f64>,
}

/// Objective functions, index-aligned with the configured objective order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveFunctions {
    pub names: Vec<String>,
    /// Weights summing to 1
    pub weights: Vec<f64>,
    pub scales: Vec<f64>,
}

/// Risk measure in the engine's native shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CvarParameters {
    /// Mean over the `count` worst realizations
    Count { count: u32 },
    /// Mean over the worst `fraction` of realizations
    Percentile { fraction: f64 },
}

/// One resolved forward model step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardModelStep {
    pub name: String,
    pub executable: PathBuf,
    pub args: Vec<String>,
}

/// Job specification consumed by the simulation/ensemble engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationSpec {
    pub forward_model: Vec<ForwardModelStep>,
    pub realizations: Vec<u32>,
    /// Template with `<BATCH>` and `<REAL>` placeholders
    pub runpath: PathBuf,
}

/// Everything the external engine needs for one optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineRequest {
    /// Engine command line; the first element is the program
    pub command: Vec<String>,
    pub optimizer: NormalizedEngineConfig,
    pub simulation: SimulationSpec,
}

/// Handed from the launcher to the detached job process over its stdin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchPayload {
    pub run_id: Uuid,
    pub identity: JobIdentity,
    pub config_path: PathBuf,
    pub engine: EngineRequest,
}

/// Signals emitted by a running optimizer engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The engine is up and iterating
    Ready,
    /// Progress worth showing to a monitor
    Progress(JobEvent),
}

/// Outcome of an engine run that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOutcome {
    Completed { message: Option<String> },
    Cancelled,
}

/// Category of a job event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A new optimizer batch started or finished
    Batch,
    /// Objective values were reported
    Objective,
    /// A forward model job changed state
    ForwardModel,
    /// The engine reported it is done
    Finished,
    /// Free-form engine output
    Log,
}

impl EventKind {
    /// Name used in logs and JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Batch => "batch",
            Self::Objective => "objective",
            Self::ForwardModel => "forward_model",
            Self::Finished => "finished",
            Self::Log => "log",
        }
    }
}

/// Entry of the job-event log tailed by monitors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    /// Forward model job name, for `forward_model` events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<String>,
    pub message: String,
}

impl JobEvent {
    /// Event stamped with the current time.
    pub fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            job: None,
            message: message.into(),
        }
    }

    /// Attach the forward model job name.
    pub fn with_job(mut self, job: impl Into<String>) -> Self {
        self.job = Some(job.into());
        self
    }
}
