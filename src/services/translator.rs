//! Translation of a validated configuration into the engine input contract.
//!
//! Every function here is pure and infallible for validated input.

use std::path::PathBuf;

use crate::domain::models::{
    CvarParameters, CvarSelection, EngineRequest, ForwardModelStep, NormalizedEngineConfig,
    ObjectiveFunctions, OptimizationConfig, SimulationSpec, Variables,
};
use crate::services::forward_model_registry::{parse_step, ForwardModelRegistry};

/// Neutral objective scale used when no normalization is configured.
pub const DEFAULT_SCALE: f64 = 1.0;

/// Optimizer-facing configuration.
pub fn translate(config: &OptimizationConfig) -> NormalizedEngineConfig {
    let optimizer = config.optimizer();
    NormalizedEngineConfig {
        algorithm: optimizer.algorithm().to_string(),
        max_batch_num: optimizer.max_batch_num,
        max_iterations: optimizer.max_iterations,
        variables: translate_controls(config),
        objective_functions: translate_objectives(config),
        realizations: config.realizations().to_vec(),
        cvar: config.cvar().map(translate_cvar),
    }
}

fn translate_controls(config: &OptimizationConfig) -> Variables {
    let controls = config.controls();
    Variables {
        names: controls.iter().map(|c| c.name.clone()).collect(),
        initial_values: controls.iter().map(|c| c.initial_guess).collect(),
        lower_bounds: controls.iter().map(|c| c.min).collect(),
        upper_bounds: controls.iter().map(|c| c.max).collect(),
    }
}

/// Weights divided by their sum. Weights whose sum overflows are first
/// scaled down by the largest one.
fn normalize(weights: &[f64]) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    if total.is_finite() {
        return weights.iter().map(|w| w / total).collect();
    }
    let largest = weights.iter().copied().fold(0.0, f64::max);
    let scaled: Vec<f64> = weights.iter().map(|w| w / largest).collect();
    let total: f64 = scaled.iter().sum();
    scaled.iter().map(|w| w / total).collect()
}

fn translate_objectives(config: &OptimizationConfig) -> ObjectiveFunctions {
    let objectives = config.objectives();
    let declared: Option<Vec<f64>> = objectives.iter().map(|o| o.weight).collect();

    let weights = match declared {
        Some(weights) => normalize(&weights),
        None => {
            let share = 1.0 / objectives.len() as f64;
            vec![share; objectives.len()]
        }
    };

    ObjectiveFunctions {
        names: objectives.iter().map(|o| o.name.clone()).collect(),
        weights,
        scales: objectives
            .iter()
            .map(|o| o.normalization.unwrap_or(DEFAULT_SCALE))
            .collect(),
    }
}

const fn translate_cvar(selection: CvarSelection) -> CvarParameters {
    match selection {
        CvarSelection::NumberOfRealizations(count) => CvarParameters::Count { count },
        CvarSelection::Percentile(fraction) => CvarParameters::Percentile { fraction },
    }
}

/// Simulation-engine-facing job specification.
pub fn translate_simulation(
    config: &OptimizationConfig,
    registry: &ForwardModelRegistry,
) -> SimulationSpec {
    let forward_model = config
        .forward_model()
        .iter()
        .filter_map(|step| parse_step(step))
        .map(|(name, args)| ForwardModelStep {
            name: name.to_string(),
            executable: registry
                .resolve(name)
                .map_or_else(|| PathBuf::from(name), |job| job.executable),
            args,
        })
        .collect();

    SimulationSpec {
        forward_model,
        realizations: config.realizations().to_vec(),
        runpath: config
            .identity()
            .output_dir()
            .join("simulation_folder")
            .join("batch_<BATCH>")
            .join("realization_<REAL>"),
    }
}

/// The full request handed to the external engine.
pub fn build_engine_request(
    config: &OptimizationConfig,
    registry: &ForwardModelRegistry,
) -> EngineRequest {
    EngineRequest {
        command: config.optimizer().command.clone(),
        optimizer: translate(config),
        simulation: translate_simulation(config, registry),
    }
}
