//! Optimizer engine implementations.

pub mod command;

pub use command::CommandEngine;
