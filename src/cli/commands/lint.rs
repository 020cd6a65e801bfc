//! Implementation of the `optima lint` command.

use anyhow::Result;
use console::style;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::cli::output::{output, CommandOutput};
use crate::cli::types::ConfigArg;
use crate::domain::errors::ValidationError;
use crate::infrastructure::config::{absolute_config_path, load_job_config};
use crate::services::ConfigValidator;

/// One problem found in a configuration.
#[derive(Debug, Serialize)]
pub struct Violation {
    pub field: String,
    pub reason: String,
}

impl From<&ValidationError> for Violation {
    fn from(error: &ValidationError) -> Self {
        Self {
            field: error.field.clone(),
            reason: error.reason.clone(),
        }
    }
}

/// Result of `optima lint`.
#[derive(Debug, Serialize)]
pub struct LintOutput {
    pub config: PathBuf,
    pub valid: bool,
    pub violations: Vec<Violation>,
}

impl LintOutput {
    /// 0 when valid, 2 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.valid {
            0
        } else {
            2
        }
    }
}

impl CommandOutput for LintOutput {
    fn to_human(&self) -> String {
        if self.valid {
            return format!("{} {} is valid", style("✓").green(), self.config.display());
        }

        let mut lines = vec![format!(
            "{} {} has {} problem(s):",
            style("✗").red(),
            self.config.display(),
            self.violations.len()
        )];
        for violation in &self.violations {
            lines.push(format!(
                "  - {}: {}",
                style(&violation.field).bold(),
                violation.reason
            ));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Validate the configuration at `path`.
pub fn lint(validator: &ConfigValidator, path: &Path) -> LintOutput {
    let violations = match load_job_config(validator, path) {
        Ok(_) => Vec::new(),
        Err(errors) => errors.iter().map(Violation::from).collect(),
    };
    LintOutput {
        config: absolute_config_path(path),
        valid: violations.is_empty(),
        violations,
    }
}

/// Validate a configuration and report every violation.
pub async fn execute(args: ConfigArg, json_mode: bool) -> Result<i32> {
    let report = lint(&ConfigValidator::new(), &args.config);
    output(&report, json_mode);
    Ok(report.exit_code())
}
