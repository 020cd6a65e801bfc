//! Job configuration validation.
//!
//! Validation runs in two stages. The structural stage (required fields,
//! types, unknown fields) fails fast with a single error. Cross-field checks
//! only run on structurally valid input and report every violation found.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::domain::errors::{ValidationError, ValidationErrors};
use crate::domain::models::{
    CvarSelection, CvarSpec, OptimizationConfig, RawOptimizationConfig,
};
use crate::domain::ports::ForwardModelProvider;
use crate::services::forward_model_registry::{
    parse_step, BuiltinJobs, ForwardModelRegistry, InstalledJobs,
};

const CVAR_EXCLUSIVE: &str = "Invalid CVaR section; specify only one of the following: \
                              number_of_realizations, percentile";
const WEIGHT_ALL_OR_NONE: &str =
    "weight must be given either for all of the objectives or for none of them";

/// Validate a raw configuration value.
pub fn validate(
    raw: &serde_yaml::Value,
    config_path: &Path,
) -> Result<OptimizationConfig, ValidationErrors> {
    ConfigValidator::new().validate(raw, config_path)
}

/// Validate configuration text, as read from a file.
pub fn validate_str(text: &str, config_path: &Path) -> Result<OptimizationConfig, ValidationErrors> {
    ConfigValidator::new().validate_str(text, config_path)
}

/// Validator holding the forward model providers known before a
/// configuration adds its own `install_jobs`.
#[derive(Clone)]
pub struct ConfigValidator {
    providers: Vec<Arc<dyn ForwardModelProvider>>,
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigValidator {
    /// Validator that knows only the built-in jobs.
    pub fn new() -> Self {
        Self {
            providers: vec![Arc::new(BuiltinJobs)],
        }
    }

    /// Also accept jobs from `provider`.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn ForwardModelProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Registry for a configuration: the validator's providers plus its
    /// installed jobs.
    pub fn registry_for(&self, config: &OptimizationConfig) -> ForwardModelRegistry {
        ForwardModelRegistry::new(self.providers.clone())
            .with_provider(Arc::new(InstalledJobs::from_specs(config.install_jobs())))
    }

    /// Validate a parsed config, collecting every violation.
    pub fn validate(
        &self,
        raw: &serde_yaml::Value,
        config_path: &Path,
    ) -> Result<OptimizationConfig, ValidationErrors> {
        // Going through text keeps field paths in structural errors.
        let text = serde_yaml::to_string(raw)
            .map_err(|e| ValidationErrors(vec![ValidationError::new("config", e.to_string())]))?;
        self.validate_str(&text, config_path)
    }

    /// Parse and validate YAML text read from `config_path`.
    pub fn validate_str(
        &self,
        text: &str,
        config_path: &Path,
    ) -> Result<OptimizationConfig, ValidationErrors> {
        let raw: RawOptimizationConfig =
            serde_yaml::from_str(text).map_err(|e| ValidationErrors(vec![structural_error(&e)]))?;

        let mut errors = Vec::new();
        let cvar = check_cvar(&raw, &mut errors);
        check_output_dir(&raw, &mut errors);
        check_optimizer(&raw, &mut errors);
        check_controls(&raw, &mut errors);
        check_objectives(&raw, &mut errors);
        check_realizations(&raw, &mut errors);
        self.check_forward_model(&raw, &mut errors);

        if errors.is_empty() {
            debug!(config = %config_path.display(), "configuration is valid");
            Ok(OptimizationConfig::from_validated(raw, config_path, cvar))
        } else {
            debug!(
                config = %config_path.display(),
                violations = errors.len(),
                "configuration is invalid"
            );
            Err(ValidationErrors(errors))
        }
    }

    fn check_forward_model(&self, raw: &RawOptimizationConfig, errors: &mut Vec<ValidationError>) {
        let mut seen = HashSet::new();
        for (i, job) in raw.install_jobs.iter().enumerate() {
            if job.name.trim().is_empty() {
                errors.push(ValidationError::new(
                    format!("install_jobs[{i}].name"),
                    "job name cannot be empty",
                ));
            } else if !seen.insert(job.name.as_str()) {
                errors.push(ValidationError::new(
                    format!("install_jobs[{i}].name"),
                    format!("duplicate job name `{}`", job.name),
                ));
            }
        }

        let registry = ForwardModelRegistry::new(self.providers.clone())
            .with_provider(Arc::new(InstalledJobs::from_specs(&raw.install_jobs)));

        for (i, step) in raw.forward_model.iter().enumerate() {
            match parse_step(step) {
                None => errors.push(ValidationError::new(
                    format!("forward_model[{i}]"),
                    "forward model step cannot be empty",
                )),
                Some((name, _)) if registry.resolve(name).is_none() => {
                    errors.push(ValidationError::new(
                        format!("forward_model[{i}]"),
                        format!("unknown forward model job `{name}`"),
                    ));
                }
                Some(_) => {}
            }
        }
    }
}

/// Turn a serde error into a field-tagged violation.
///
/// serde_yaml prefixes nested errors with the field path
/// (`objective_functions[2]: missing field ...`).
fn structural_error(err: &serde_yaml::Error) -> ValidationError {
    let message = err.to_string();
    match message.split_once(": ") {
        Some((path, reason)) if !path.is_empty() && !path.contains(' ') => {
            ValidationError::new(path, reason)
        }
        _ => ValidationError::new("config", message),
    }
}

/// The exclusive-or check gates every other CVaR check.
fn check_cvar(raw: &RawOptimizationConfig, errors: &mut Vec<ValidationError>) -> Option<CvarSelection> {
    let CvarSpec {
        number_of_realizations,
        percentile,
    } = raw.cvar.as_ref()?;

    match (number_of_realizations, percentile) {
        (Some(count), None) => {
            let available = raw.realizations.len();
            if *count == 0 || (available > 0 && *count as usize > available) {
                errors.push(ValidationError::new(
                    "cvar.number_of_realizations",
                    format!("must be between 1 and the number of realizations ({available}), got {count}"),
                ));
            }
            Some(CvarSelection::NumberOfRealizations(*count))
        }
        (None, Some(p)) => {
            if !(0.0..=1.0).contains(p) {
                errors.push(ValidationError::new(
                    "cvar.percentile",
                    format!("must be between 0 and 1, got {p}"),
                ));
            }
            Some(CvarSelection::Percentile(*p))
        }
        _ => {
            errors.push(ValidationError::new("cvar", CVAR_EXCLUSIVE));
            None
        }
    }
}

fn check_output_dir(raw: &RawOptimizationConfig, errors: &mut Vec<ValidationError>) {
    if raw.output_dir.trim().is_empty() {
        errors.push(ValidationError::new("output_dir", "output directory cannot be empty"));
    }
}

fn check_optimizer(raw: &RawOptimizationConfig, errors: &mut Vec<ValidationError>) {
    let optimizer = &raw.optimizer;
    if optimizer.command.first().map_or(true, |p| p.trim().is_empty()) {
        errors.push(ValidationError::new(
            "optimizer.command",
            "optimizer engine command cannot be empty",
        ));
    }
    if optimizer.max_batch_num == Some(0) {
        errors.push(ValidationError::new("optimizer.max_batch_num", "must be greater than 0"));
    }
    if optimizer.max_iterations == Some(0) {
        errors.push(ValidationError::new("optimizer.max_iterations", "must be greater than 0"));
    }
}

fn check_controls(raw: &RawOptimizationConfig, errors: &mut Vec<ValidationError>) {
    if raw.controls.is_empty() {
        errors.push(ValidationError::new("controls", "at least one control is required"));
    }

    let mut seen = HashSet::new();
    for (i, control) in raw.controls.iter().enumerate() {
        if control.name.trim().is_empty() {
            errors.push(ValidationError::new(
                format!("controls[{i}].name"),
                "control name cannot be empty",
            ));
        } else if !seen.insert(control.name.as_str()) {
            errors.push(ValidationError::new(
                format!("controls[{i}].name"),
                format!("duplicate control name `{}`", control.name),
            ));
        }

        if control.min >= control.max {
            errors.push(ValidationError::new(
                format!("controls[{i}]"),
                format!("min ({}) must be less than max ({})", control.min, control.max),
            ));
        } else if !(control.min..=control.max).contains(&control.initial_guess) {
            errors.push(ValidationError::new(
                format!("controls[{i}].initial_guess"),
                format!(
                    "initial guess {} is outside [{}, {}]",
                    control.initial_guess, control.min, control.max
                ),
            ));
        }
    }
}

fn check_objectives(raw: &RawOptimizationConfig, errors: &mut Vec<ValidationError>) {
    let objectives = &raw.objective_functions;
    if objectives.is_empty() {
        errors.push(ValidationError::new(
            "objective_functions",
            "at least one objective function is required",
        ));
        return;
    }

    let weighted = objectives.iter().filter(|o| o.weight.is_some()).count();
    if weighted != 0 && weighted != objectives.len() {
        errors.push(ValidationError::new("objective_functions", WEIGHT_ALL_OR_NONE));
    }

    let mut seen = HashSet::new();
    for (i, objective) in objectives.iter().enumerate() {
        if objective.name.trim().is_empty() {
            errors.push(ValidationError::new(
                format!("objective_functions[{i}].name"),
                "objective name cannot be empty",
            ));
        } else if !seen.insert(objective.name.as_str()) {
            errors.push(ValidationError::new(
                format!("objective_functions[{i}].name"),
                format!("duplicate objective name `{}`", objective.name),
            ));
        }

        if let Some(weight) = objective.weight {
            if !(weight > 0.0 && weight.is_finite()) {
                errors.push(ValidationError::new(
                    format!("objective_functions[{i}].weight"),
                    format!("weight must be greater than 0, got {weight}"),
                ));
            }
        }

        if let Some(normalization) = objective.normalization {
            if normalization == 0.0 {
                errors.push(ValidationError::new(
                    format!("objective_functions[{i}].normalization"),
                    "normalization value cannot be zero",
                ));
            } else if !normalization.is_finite() {
                errors.push(ValidationError::new(
                    format!("objective_functions[{i}].normalization"),
                    format!("normalization must be finite, got {normalization}"),
                ));
            }
        }
    }
}

fn check_realizations(raw: &RawOptimizationConfig, errors: &mut Vec<ValidationError>) {
    if raw.realizations.is_empty() {
        errors.push(ValidationError::new("realizations", "at least one realization is required"));
    }
    let mut seen = HashSet::new();
    for (i, realization) in raw.realizations.iter().enumerate() {
        if !seen.insert(realization) {
            errors.push(ValidationError::new(
                format!("realizations[{i}]"),
                format!("duplicate realization {realization}"),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Value;

    const BASE: &str = r#"
output_dir: everest_output
optimizer:
  command: ["optimizer-engine"]
controls:
  - name: rate
    initial_guess: 0.5
    min: 0.0
    max: 1.0
objective_functions:
  - name: npv
  - name: rf
realizations: [0, 1, 2]
forward_model:
  - copy_file in.txt out.txt
"#;

    fn base() -> Value {
        serde_yaml::from_str(BASE).unwrap()
    }

    fn path() -> &'static Path {
        Path::new("/work/case/config.yml")
    }

    fn objective(value: &mut Value, i: usize) -> &mut Value {
        &mut value["objective_functions"][i]
    }

    #[test]
    fn test_base_config_is_valid() {
        let config = validate(&base(), path()).unwrap();
        assert_eq!(config.objectives().len(), 2);
        assert_eq!(config.identity().output_dir(), Path::new("/work/case/everest_output"));
        assert!(config.cvar().is_none());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let mut value = base();
        value["bogus"] = Value::from(1);
        let errors = validate(&value, path()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.contains("unknown field"), "{errors}");
    }

    #[test]
    fn test_missing_nested_field_reports_path() {
        let text = BASE.replace("  - name: rf\n", "  - weight: 1.0\n");
        let errors = validate_str(&text, path()).unwrap_err();
        assert_eq!(errors.len(), 1);
        let error = errors.iter().next().unwrap();
        assert!(error.field.starts_with("objective_functions"), "{error}");
        assert!(error.reason.contains("missing field `name`"), "{error}");
    }

    #[test]
    fn test_partial_weights_rejected() {
        let mut value = base();
        objective(&mut value, 0)["weight"] = Value::from(1.0);
        let errors = validate(&value, path()).unwrap_err();
        assert!(errors.contains(WEIGHT_ALL_OR_NONE));

        objective(&mut value, 1)["weight"] = Value::from(3);
        assert!(validate(&value, path()).is_ok());
    }

    #[test]
    fn test_zero_normalization_rejected_negative_allowed() {
        let mut value = base();
        objective(&mut value, 0)["normalization"] = Value::from(0);
        assert!(validate(&value, path())
            .unwrap_err()
            .contains("normalization value cannot be zero"));

        objective(&mut value, 0)["normalization"] = Value::from(-125);
        assert!(validate(&value, path()).is_ok());
    }

    #[test]
    fn test_all_violations_are_reported() {
        let mut value = base();
        objective(&mut value, 0)["weight"] = Value::from(-0.3);
        objective(&mut value, 1)["weight"] = Value::from(0);
        objective(&mut value, 1)["normalization"] = Value::from(0);
        value["realizations"] = serde_yaml::from_str("[0, 0]").unwrap();

        let errors = validate(&value, path()).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "objective_functions[0].weight",
                "objective_functions[1].weight",
                "objective_functions[1].normalization",
                "realizations[1]",
            ]
        );
    }

    #[test]
    fn test_cvar_exclusive_or() {
        let mut value = base();
        value["cvar"] = serde_yaml::from_str("{number_of_realizations: 1, percentile: 0.5}").unwrap();
        assert!(validate(&value, path()).unwrap_err().contains("only one of"));

        value["cvar"] = serde_yaml::from_str("{}").unwrap();
        assert!(validate(&value, path()).unwrap_err().contains("only one of"));

        value["cvar"] = serde_yaml::from_str("{percentile: 0.5}").unwrap();
        let config = validate(&value, path()).unwrap();
        assert_eq!(config.cvar(), Some(CvarSelection::Percentile(0.5)));

        value["cvar"] = serde_yaml::from_str("{number_of_realizations: 2}").unwrap();
        let config = validate(&value, path()).unwrap();
        assert_eq!(config.cvar(), Some(CvarSelection::NumberOfRealizations(2)));
    }

    #[test]
    fn test_cvar_field_checks_only_after_exclusivity() {
        let mut value = base();
        value["cvar"] =
            serde_yaml::from_str("{number_of_realizations: 0, percentile: 7.0}").unwrap();
        let errors = validate(&value, path()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.iter().next().unwrap().field, "cvar");

        value["cvar"] = serde_yaml::from_str("{percentile: 1.5}").unwrap();
        let errors = validate(&value, path()).unwrap_err();
        assert_eq!(errors.iter().next().unwrap().field, "cvar.percentile");

        value["cvar"] = serde_yaml::from_str("{number_of_realizations: 4}").unwrap();
        let errors = validate(&value, path()).unwrap_err();
        assert_eq!(errors.iter().next().unwrap().field, "cvar.number_of_realizations");
    }

    #[test]
    fn test_control_bounds() {
        let mut value = base();
        value["controls"][0]["initial_guess"] = Value::from(2.0);
        assert!(validate(&value, path()).unwrap_err().contains("outside"));

        value["controls"][0]["min"] = Value::from(3.0);
        assert!(validate(&value, path()).unwrap_err().contains("must be less than max"));
    }

    #[test]
    fn test_unknown_forward_model_job() {
        let mut value = base();
        value["forward_model"] = serde_yaml::from_str(r#"["simulator --fast"]"#).unwrap();
        assert!(validate(&value, path())
            .unwrap_err()
            .contains("unknown forward model job `simulator`"));

        value["install_jobs"] =
            serde_yaml::from_str(r#"[{name: simulator, executable: /opt/sim}]"#).unwrap();
        assert!(validate(&value, path()).is_ok());
    }

    #[test]
    fn test_empty_engine_command() {
        let mut value = base();
        value["optimizer"]["command"] = serde_yaml::from_str("[]").unwrap();
        assert!(validate(&value, path())
            .unwrap_err()
            .contains("optimizer engine command cannot be empty"));
    }
}
