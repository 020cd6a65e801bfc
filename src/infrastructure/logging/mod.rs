//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - stderr output for CLI invocations
//! - JSON log files with rotation for the detached job process

pub mod config;
pub mod logger;

pub use config::{LogConfig, LogFormat, RotationPolicy, JOB_LOG_FILE};
pub use logger::LoggerImpl;
