//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the interfaces that adapters must implement:
//! - StatusStore: persisted job status records
//! - JobSpawner / ProcessControl: detached job processes
//! - OptimizerEngine: the external optimizer backend
//! - ForwardModelProvider: sources of forward model jobs
//! - SessionReporter: operator-facing output

pub mod forward_models;
pub mod optimizer_engine;
pub mod process;
pub mod reporter;
pub mod status_store;

pub use forward_models::ForwardModelProvider;
pub use optimizer_engine::OptimizerEngine;
pub use process::{JobSpawner, ParkedJob, ProcessControl};
pub use reporter::{NullReporter, SessionReporter};
pub use status_store::StatusStore;
