//! Configuration management infrastructure
//!
//! - Tool settings: hierarchical figment merging of defaults, project YAML
//!   files and `OPTIMA_*` environment variables, then validation
//! - Job configuration files: read from disk and validated

pub mod job_file;
pub mod loader;

pub use job_file::{absolute_config_path, load_job_config};
pub use loader::{ConfigLoader, SettingsError};
