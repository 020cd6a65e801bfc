//! Optimization job configuration model.
//!
//! [`RawOptimizationConfig`] is the structural shape of a job configuration
//! file. It only becomes an [`OptimizationConfig`] after passing validation
//! (see `application::validation`), and is immutable from then on.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::identity::JobIdentity;

/// Default optimizer algorithm passed to the engine.
pub const DEFAULT_ALGORITHM: &str = "optpp_q_newton";

/// Structural form of a job configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawOptimizationConfig {
    /// Output directory, relative to the configuration file
    pub output_dir: String,

    pub optimizer: OptimizerSpec,

    pub controls: Vec<ControlSpec>,

    pub objective_functions: Vec<ObjectiveSpec>,

    /// Conditional Value at Risk section
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cvar: Option<CvarSpec>,

    /// Realization indices evaluated by the simulation engine
    pub realizations: Vec<u32>,

    /// Forward model steps, each `"<job name> <args...>"`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forward_model: Vec<String>,

    /// User-registered forward model jobs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub install_jobs: Vec<InstallJobSpec>,
}

/// External optimizer engine section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptimizerSpec {
    /// Engine command line; the first element is the program
    pub command: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_batch_num: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,
}

impl OptimizerSpec {
    /// Optimizer algorithm name.
    pub fn algorithm(&self) -> &str {
        self.algorithm.as_deref().unwrap_or(DEFAULT_ALGORITHM)
    }
}

/// One control variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlSpec {
    pub name: String,
    pub initial_guess: f64,
    pub min: f64,
    pub max: f64,
}

/// One named objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectiveSpec {
    pub name: String,

    /// Relative weight, must be > 0. Given for all objectives or none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,

    /// Scale applied to the objective value. Must be nonzero; a negative
    /// value flips the sign.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalization: Option<f64>,
}

/// CVaR section as written; exactly one field must be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CvarSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_realizations: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentile: Option<f64>,
}

/// A forward model job registered by the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstallJobSpec {
    pub name: String,
    pub executable: PathBuf,
}

/// Validated CVaR selection of the worst-performing realizations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CvarSelection {
    /// Absolute number of realizations
    NumberOfRealizations(u32),
    /// Fractional cutoff in `[0, 1]`
    Percentile(f64),
}

/// Validated, immutable job configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationConfig {
    config_path: PathBuf,
    identity: JobIdentity,
    optimizer: OptimizerSpec,
    controls: Vec<ControlSpec>,
    objectives: Vec<ObjectiveSpec>,
    cvar: Option<CvarSelection>,
    realizations: Vec<u32>,
    forward_model: Vec<String>,
    install_jobs: Vec<InstallJobSpec>,
}

impl OptimizationConfig {
    /// Assemble a validated configuration. Only the validator calls this.
    pub(crate) fn from_validated(
        raw: RawOptimizationConfig,
        config_path: &Path,
        cvar: Option<CvarSelection>,
    ) -> Self {
        let base_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let base_dir = if base_dir.as_os_str().is_empty() {
            std::env::current_dir().unwrap_or_default()
        } else if base_dir.is_relative() {
            std::env::current_dir().unwrap_or_default().join(base_dir)
        } else {
            base_dir
        };

        Self {
            config_path: config_path.to_path_buf(),
            identity: JobIdentity::from_output_dir(&raw.output_dir, base_dir),
            optimizer: raw.optimizer,
            controls: raw.controls,
            objectives: raw.objective_functions,
            cvar,
            realizations: raw.realizations,
            forward_model: raw.forward_model,
            install_jobs: raw.install_jobs,
        }
    }

    /// Path the configuration was read from.
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Job identity derived from the output directory.
    pub fn identity(&self) -> &JobIdentity {
        &self.identity
    }

    /// Optimizer section.
    pub fn optimizer(&self) -> &OptimizerSpec {
        &self.optimizer
    }

    /// Controls, in declaration order.
    pub fn controls(&self) -> &[ControlSpec] {
        &self.controls
    }

    /// Objective functions, in declaration order.
    pub fn objectives(&self) -> &[ObjectiveSpec] {
        &self.objectives
    }

    /// CVaR selection, if configured.
    pub fn cvar(&self) -> Option<CvarSelection> {
        self.cvar
    }

    /// Realizations to evaluate.
    pub fn realizations(&self) -> &[u32] {
        &self.realizations
    }

    /// Forward model steps as written.
    pub fn forward_model(&self) -> &[String] {
        &self.forward_model
    }

    /// Jobs installed by this configuration.
    pub fn install_jobs(&self) -> &[InstallJobSpec] {
        &self.install_jobs
    }
}
