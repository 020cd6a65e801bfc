//! Job identity derived from the configuration's output directory.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Name of the per-job bookkeeping directory inside the output directory.
pub const SESSION_DIR: &str = ".optima";

/// Identifies "the job for this configuration".
///
/// Two configurations that declare the same output directory refer to the
/// same job, so at most one of them can have a live job at a time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobIdentity {
    output_dir: PathBuf,
}

impl JobIdentity {
    /// Build an identity from an output directory.
    ///
    /// Relative paths are resolved against `base_dir` (the directory holding
    /// the configuration file) and lexically normalized, so the result does
    /// not depend on the caller's working directory or on the directory
    /// existing yet.
    pub fn from_output_dir(output_dir: impl AsRef<Path>, base_dir: impl AsRef<Path>) -> Self {
        let output_dir = output_dir.as_ref();
        let joined = if output_dir.is_absolute() {
            output_dir.to_path_buf()
        } else {
            base_dir.as_ref().join(output_dir)
        };
        Self {
            output_dir: normalize(&joined),
        }
    }

    /// Absolute output directory.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `<output_dir>/.optima`, holding status, events and logs.
    pub fn session_dir(&self) -> PathBuf {
        self.output_dir.join(SESSION_DIR)
    }

    /// Location of the persisted status record.
    pub fn status_path(&self) -> PathBuf {
        self.session_dir().join("status.json")
    }

    /// Location of the job-event log written by the job process.
    pub fn events_path(&self) -> PathBuf {
        self.session_dir().join("events.jsonl")
    }

    /// Directory of the job process logs.
    pub fn log_dir(&self) -> PathBuf {
        self.session_dir().join("logs")
    }
}

impl std::fmt::Display for JobIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.output_dir.display())
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_dir_resolves_against_config_dir() {
        let identity = JobIdentity::from_output_dir("everest_output", "/work/case");
        assert_eq!(identity.output_dir(), Path::new("/work/case/everest_output"));
        assert_eq!(
            identity.status_path(),
            PathBuf::from("/work/case/everest_output/.optima/status.json")
        );
    }

    #[test]
    fn test_equivalent_paths_share_identity() {
        let a = JobIdentity::from_output_dir("./out/../out", "/work/case");
        let b = JobIdentity::from_output_dir("/work/case/out", "/elsewhere");
        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_dirs_are_distinct_jobs() {
        let a = JobIdentity::from_output_dir("out_a", "/work");
        let b = JobIdentity::from_output_dir("out_b", "/work");
        assert_ne!(a, b);
    }
}
