//! Process ports - spawning and signalling detached job processes.

use crate::domain::errors::{LaunchError, ProcessError};
use crate::domain::models::{JobIdentity, LaunchPayload};

/// Liveness probing and termination of job processes by pid.
pub trait ProcessControl: Send + Sync {
    /// Check whether the process exists and has not exited.
    fn is_alive(&self, pid: u32) -> bool;

    /// Ask the process to shut down gracefully.
    fn terminate(&self, pid: u32) -> Result<(), ProcessError>;

    /// OS start time of `pid`, where the platform reports one.
    fn start_time(&self, _pid: u32) -> Option<u64> {
        None
    }
}

/// Starts detached job processes.
pub trait JobSpawner: Send + Sync {
    /// Start a job process that outlives the caller.
    ///
    /// The process stays parked, doing nothing, until [`ParkedJob::release`]
    /// hands it its payload, so the caller can persist the pid first.
    fn spawn(&self, identity: &JobIdentity) -> Result<Box<dyn ParkedJob>, LaunchError>;
}

/// A spawned job process waiting for its payload.
pub trait ParkedJob: Send {
    /// Process id of the parked process.
    fn pid(&self) -> u32;

    /// OS start time of the parked process, where the platform reports one.
    fn start_time(&self) -> Option<u64> {
        None
    }

    /// Hand over the payload and let the process run.
    fn release(self: Box<Self>, payload: &LaunchPayload) -> Result<(), LaunchError>;

    /// Kill the process without ever releasing it.
    fn abort(self: Box<Self>);
}
