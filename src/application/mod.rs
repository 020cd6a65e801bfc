//! Application layer: the job lifecycle protocol between the launching CLI,
//! the detached job process and later monitor or kill invocations.

pub mod job_runner;
pub mod launcher;
pub mod liveness;
pub mod monitor;
pub mod readiness;
pub mod session;

pub use job_runner::{listen_for_termination, JobRunner, STOPPED_MESSAGE};
pub use launcher::{LaunchHandle, ServerLauncher};
pub use liveness::{effective_record, is_stale, stale_message};
pub use monitor::{Monitor, MonitorOutcome};
pub use readiness::{Readiness, ReadinessWaiter};
pub use session::{Intent, SessionController, SessionOutcome};
