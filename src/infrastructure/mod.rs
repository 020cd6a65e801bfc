//! Infrastructure layer: settings, job configuration files and logging.

pub mod config;
pub mod logging;
