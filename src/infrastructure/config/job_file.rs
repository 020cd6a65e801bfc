//! Loading job configuration files from disk.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::domain::errors::{ValidationError, ValidationErrors};
use crate::domain::models::OptimizationConfig;
use crate::services::validation::ConfigValidator;

/// Make `path` absolute without touching the filesystem.
pub fn absolute_config_path(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Read and validate a job configuration file.
///
/// An unreadable file is reported the same way as an invalid one.
pub fn load_job_config(
    validator: &ConfigValidator,
    path: &Path,
) -> Result<OptimizationConfig, ValidationErrors> {
    let path = absolute_config_path(path);
    let text = std::fs::read_to_string(&path).map_err(|e| {
        ValidationErrors(vec![ValidationError::new(
            path.display().to_string(),
            format!("cannot read configuration file: {e}"),
        )])
    })?;

    debug!(config = %path.display(), "Loaded job configuration");
    validator.validate_str(&text, &path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
output_dir: everest_output
optimizer:
  command: ["engine"]
controls:
  - {name: x, initial_guess: 0.5, min: 0.0, max: 1.0}
objective_functions:
  - {name: npv}
realizations: [0]
"#;

    #[test]
    fn test_output_dir_is_relative_to_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("case.yml");
        std::fs::write(&path, CONFIG).unwrap();

        let config = load_job_config(&ConfigValidator::new(), &path).unwrap();
        assert_eq!(
            config.identity().output_dir(),
            dir.path().join("everest_output")
        );
        assert_eq!(config.config_path(), path);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let errors = load_job_config(&ConfigValidator::new(), &dir.path().join("nope.yml"))
            .unwrap_err();
        assert!(errors.contains("cannot read configuration file"));
    }
}
