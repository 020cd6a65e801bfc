//! Optima - detached optimization job orchestration
//!
//! Optima validates an optimization configuration, launches the optimization
//! as a process that outlives the invoking command, and lets later
//! invocations monitor or stop it. Every process involved coordinates through
//! one status record stored beside the job's output.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, errors and the ports adapters implement
//! - **Service Layer** (`services`): Validation, forward-model registry and translation
//! - **Application Layer** (`application`): Launch, readiness, monitoring and session decisions
//! - **Adapters** (`adapters`): Status file, event log, process control, engine runner
//! - **Infrastructure Layer** (`infrastructure`): Settings and logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use optima::services::validate_str;
//!
//! let yaml = std::fs::read_to_string("config.yml").unwrap();
//! let config = validate_str(&yaml, Path::new("/case/config.yml")).unwrap();
//! println!("results go to {}", config.identity());
//! ```

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{Intent, SessionController, SessionOutcome};
pub use domain::errors::{
    EngineError, LaunchError, SessionError, StatusStoreError, ValidationError, ValidationErrors,
};
pub use domain::models::{
    JobIdentity, JobStatus, LoggingConfig, OptimizationConfig, Settings, StatusRecord,
};
pub use domain::ports::{OptimizerEngine, StatusStore};
pub use infrastructure::config::{ConfigLoader, SettingsError};
pub use services::{translate, ConfigValidator};
