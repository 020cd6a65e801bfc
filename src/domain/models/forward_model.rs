//! Forward model job descriptors.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A forward model job the simulation engine can run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub name: String,
    pub executable: PathBuf,
    /// Shipped with the tool rather than installed by the configuration
    pub builtin: bool,
}

impl JobDescriptor {
    /// Descriptor of a built-in job.
    pub fn builtin(name: &str) -> Self {
        Self {
            name: name.to_string(),
            executable: PathBuf::from(format!("_{name}")),
            builtin: true,
        }
    }

    /// Descriptor of a job installed from `executable`.
    pub fn installed(name: impl Into<String>, executable: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            executable: executable.into(),
            builtin: false,
        }
    }
}
