//! Adapters implementing the domain ports against the local host.

pub mod engines;
pub mod event_log;
pub mod output_dir;
pub mod process;
pub mod status_file;

pub use engines::CommandEngine;
pub use event_log::{EventLog, EventLogReader};
pub use output_dir::{prepare_output_dir, roll_output_dir};
pub use process::{DetachedProcessSpawner, NixProcessControl};
pub use status_file::FileStatusStore;
