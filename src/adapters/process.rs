//! Process adapters - detached job processes and pid-based control.

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use std::ffi::OsString;
use std::io::Write;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use tracing::{debug, info, warn};

use crate::domain::errors::{LaunchError, ProcessError};
use crate::domain::models::{JobIdentity, LaunchPayload};
use crate::domain::ports::{JobSpawner, ParkedJob, ProcessControl};

/// Liveness and termination through POSIX signals.
#[derive(Debug, Clone, Copy, Default)]
pub struct NixProcessControl;

impl NixProcessControl {
    /// Control over processes of the current host.
    pub const fn new() -> Self {
        Self
    }
}

/// Start time of `pid` in clock ticks since boot, from `/proc/<pid>/stat`.
#[cfg(target_os = "linux")]
fn process_start_time(pid: u32) -> Option<u64> {
    let stat = std::fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
    // The command name may itself contain ')'. Field 22 is the 20th after it.
    let (_, rest) = stat.rsplit_once(')')?;
    rest.split_whitespace().nth(19)?.parse().ok()
}

#[cfg(not(target_os = "linux"))]
fn process_start_time(_pid: u32) -> Option<u64> {
    None
}

fn to_pid(pid: u32) -> Option<Pid> {
    // pid 0 would address our own process group
    i32::try_from(pid).ok().filter(|raw| *raw > 0).map(Pid::from_raw)
}

impl ProcessControl for NixProcessControl {
    fn is_alive(&self, pid: u32) -> bool {
        let Some(pid) = to_pid(pid) else {
            return false;
        };

        // If it is our own child, reap it: a zombie still answers signal 0.
        match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::Exited(..) | WaitStatus::Signaled(..)) => return false,
            Ok(_) => return true,
            Err(_) => {}
        }

        match kill(pid, None) {
            Ok(()) | Err(Errno::EPERM) => true,
            Err(_) => false,
        }
    }

    fn terminate(&self, pid: u32) -> Result<(), ProcessError> {
        let target = to_pid(pid).ok_or(ProcessError::NotFound(pid))?;
        match kill(target, Signal::SIGTERM) {
            Ok(()) => {
                info!(pid, "Sent SIGTERM to job process");
                Ok(())
            }
            Err(Errno::ESRCH) => Err(ProcessError::NotFound(pid)),
            Err(e) => Err(ProcessError::Signal {
                pid,
                reason: e.to_string(),
            }),
        }
    }

    fn start_time(&self, pid: u32) -> Option<u64> {
        to_pid(pid).and_then(|_| process_start_time(pid))
    }
}

/// Spawns the job process as `<program> <args...>` in its own process group,
/// so terminal interrupts aimed at the launching CLI never reach it. The job
/// inherits the caller's working directory and environment.
#[derive(Debug, Clone)]
pub struct DetachedProcessSpawner {
    program: PathBuf,
    args: Vec<OsString>,
}

impl DetachedProcessSpawner {
    /// Spawner running `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Re-invoke the running executable's hidden `server` subcommand.
    pub fn current_exe() -> Result<Self, LaunchError> {
        let exe = std::env::current_exe()
            .map_err(|e| LaunchError::Spawn(format!("cannot locate current executable: {e}")))?;
        Ok(Self::new(exe).arg("server"))
    }

    /// Append an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl JobSpawner for DetachedProcessSpawner {
    fn spawn(&self, identity: &JobIdentity) -> Result<Box<dyn ParkedJob>, LaunchError> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .process_group(0)
            .spawn()
            .map_err(|e| LaunchError::Spawn(format!("{}: {e}", self.program.display())))?;

        debug!(
            pid = child.id(),
            program = %self.program.display(),
            identity = %identity,
            "Spawned parked job process"
        );
        Ok(Box::new(ParkedProcess { child }))
    }
}

/// A spawned job process blocked on reading its payload from stdin.
struct ParkedProcess {
    child: Child,
}

impl ParkedJob for ParkedProcess {
    fn pid(&self) -> u32 {
        self.child.id()
    }

    fn start_time(&self) -> Option<u64> {
        process_start_time(self.child.id())
    }

    fn release(self: Box<Self>, payload: &LaunchPayload) -> Result<(), LaunchError> {
        let mut child = self.child;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| LaunchError::Handoff("job process stdin is not piped".to_string()))?;

        serde_json::to_writer(&mut stdin, payload)
            .map_err(|e| LaunchError::Handoff(e.to_string()))?;
        stdin
            .flush()
            .map_err(|e| LaunchError::Handoff(e.to_string()))?;
        // Dropping stdin closes the pipe; dropping the child neither waits nor kills.
        drop(stdin);
        debug!(pid = child.id(), "Released job process");
        Ok(())
    }

    fn abort(self: Box<Self>) {
        let mut child = self.child;
        let pid = child.id();
        if let Err(e) = child.kill() {
            warn!(pid, error = %e, "Failed to kill parked job process");
        }
        let _ = child.wait();
    }
}
