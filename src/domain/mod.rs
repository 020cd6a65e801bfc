//! Domain layer for Optima
//!
//! Core models (job configuration, status record, engine contract), errors
//! and the port traits implemented by adapters.

pub mod cancellation;
pub mod errors;
pub mod models;
pub mod ports;

pub use cancellation::CancellationToken;
pub use errors::{
    EngineError, LaunchError, ProcessError, SessionError, SessionResult, StatusStoreError,
    ValidationError, ValidationErrors,
};
