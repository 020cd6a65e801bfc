//! Common test utilities for integration tests
//!
//! Provides an in-process stand-in for detached job processes, scripted
//! engines, a recording reporter and configuration fixtures.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

use optima::adapters::FileStatusStore;
use optima::application::{JobRunner, SessionController};
use optima::domain::cancellation::CancellationToken;
use optima::domain::errors::{EngineError, LaunchError, ProcessError};
use optima::domain::models::{
    EngineEvent, EngineOutcome, EngineRequest, JobEvent, JobIdentity, LaunchPayload, Settings,
    StatusRecord,
};
use optima::domain::ports::{
    JobSpawner, OptimizerEngine, ParkedJob, ProcessControl, SessionReporter, StatusStore,
};
use optima::OptimizationConfig;

pub const CONFIG: &str = r#"
output_dir: everest_output
optimizer:
  command: ["fake-optimizer"]
controls:
  - name: well_rate
    initial_guess: 0.5
    min: 0.0
    max: 1.0
objective_functions:
  - name: npv
realizations: [0, 1]
"#;

/// Create a temporary directory for test isolation
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Write `contents` as `config.yml` in `dir` and return its path.
pub fn write_config(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("config.yml");
    std::fs::write(&path, contents).expect("Failed to write config");
    path
}

pub fn load_config(dir: &Path) -> OptimizationConfig {
    let text = std::fs::read_to_string(dir.join("config.yml")).expect("Failed to read config");
    optima::services::validate_str(&text, &dir.join("config.yml")).expect("config should be valid")
}

/// Settings with short intervals so tests finish quickly.
pub fn fast_settings() -> Settings {
    Settings {
        readiness_timeout_secs: 5,
        poll_interval_ms: 20,
        kill_timeout_secs: 5,
        ..Settings::default()
    }
}

/// Wait for a condition to be true with timeout
///
/// Polls the predicate every 20ms until it returns true or timeout is reached.
pub async fn wait_for<F>(mut predicate: F, timeout_ms: u64) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = Duration::from_millis(timeout_ms);

    while start.elapsed() < timeout {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    false
}

/// How a [`ScriptedEngine`] ends its run.
#[derive(Debug, Clone)]
pub enum Ending {
    Complete(Option<String>),
    Fail(String),
    /// Keep running until cancelled
    RunUntilCancelled,
}

/// Engine that emits ready, a fixed list of progress events, then ends as
/// scripted. Always honors cancellation.
pub struct ScriptedEngine {
    events: Vec<JobEvent>,
    ending: Ending,
    requests: Mutex<Vec<EngineRequest>>,
}

impl ScriptedEngine {
    pub fn new(ending: Ending) -> Self {
        Self {
            events: Vec::new(),
            ending,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_events(mut self, events: Vec<JobEvent>) -> Self {
        self.events = events;
        self
    }

    pub fn requests(&self) -> Vec<EngineRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl OptimizerEngine for ScriptedEngine {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn run(
        &self,
        request: &EngineRequest,
        events: mpsc::Sender<EngineEvent>,
        cancel: CancellationToken,
    ) -> Result<EngineOutcome, EngineError> {
        self.requests.lock().unwrap().push(request.clone());
        let _ = events.send(EngineEvent::Ready).await;
        for event in &self.events {
            let _ = events.send(EngineEvent::Progress(event.clone())).await;
        }

        match self.ending {
            Ending::Complete(ref message) => Ok(EngineOutcome::Completed {
                message: message.clone(),
            }),
            Ending::Fail(ref message) => Err(EngineError::Failed(message.clone())),
            Ending::RunUntilCancelled => {
                cancel.cancelled().await;
                Ok(EngineOutcome::Cancelled)
            }
        }
    }
}

/// What a parked in-process job does when handed its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnRelease {
    /// Run the job runner with the cluster's engine
    Run,
    /// Die without ever touching the status record
    Crash,
}

struct Slot {
    alive: bool,
    cancel: CancellationToken,
}

/// Stand-in for the operating system: "spawns" job processes as tokio tasks
/// running the real [`JobRunner`], and answers liveness and signal requests
/// for the pids it handed out.
pub struct InProcessJobs {
    store: Arc<dyn StatusStore>,
    engine: Arc<dyn OptimizerEngine>,
    on_release: OnRelease,
    next_pid: AtomicU32,
    slots: Arc<Mutex<HashMap<u32, Slot>>>,
    spawned: AtomicU32,
}

impl InProcessJobs {
    pub fn new(engine: Arc<dyn OptimizerEngine>) -> Arc<Self> {
        Self::with_behavior(engine, OnRelease::Run)
    }

    pub fn with_behavior(engine: Arc<dyn OptimizerEngine>, on_release: OnRelease) -> Arc<Self> {
        Arc::new(Self {
            store: Arc::new(FileStatusStore::new()),
            engine,
            on_release,
            next_pid: AtomicU32::new(40_000),
            slots: Arc::new(Mutex::new(HashMap::new())),
            spawned: AtomicU32::new(0),
        })
    }

    pub fn spawn_count(&self) -> u32 {
        self.spawned.load(Ordering::SeqCst)
    }

    /// Mark a pid as gone, as if the process had been killed externally.
    pub fn vanish(&self, pid: u32) {
        if let Some(slot) = self.slots.lock().unwrap().get_mut(&pid) {
            slot.alive = false;
        }
    }

    pub fn controller(self: &Arc<Self>, settings: Settings) -> SessionController {
        SessionController::new(
            self.store.clone(),
            self.clone() as Arc<dyn ProcessControl>,
            self.clone() as Arc<dyn JobSpawner>,
            settings,
        )
    }
}

impl ProcessControl for InProcessJobs {
    fn is_alive(&self, pid: u32) -> bool {
        self.slots
            .lock()
            .unwrap()
            .get(&pid)
            .is_some_and(|slot| slot.alive)
    }

    fn terminate(&self, pid: u32) -> Result<(), ProcessError> {
        match self.slots.lock().unwrap().get(&pid) {
            Some(slot) if slot.alive => {
                slot.cancel.cancel();
                Ok(())
            }
            _ => Err(ProcessError::NotFound(pid)),
        }
    }

    /// Each in-process job "started" at its own pid.
    fn start_time(&self, pid: u32) -> Option<u64> {
        self.slots
            .lock()
            .unwrap()
            .contains_key(&pid)
            .then_some(u64::from(pid))
    }
}

impl JobSpawner for InProcessJobs {
    fn spawn(&self, _identity: &JobIdentity) -> Result<Box<dyn ParkedJob>, LaunchError> {
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        self.spawned.fetch_add(1, Ordering::SeqCst);
        let cancel = CancellationToken::new();
        self.slots.lock().unwrap().insert(
            pid,
            Slot {
                alive: true,
                cancel: cancel.clone(),
            },
        );
        Ok(Box::new(InProcessJob {
            pid,
            cancel,
            on_release: self.on_release,
            store: self.store.clone(),
            engine: self.engine.clone(),
            slots: self.slots.clone(),
        }))
    }
}

struct InProcessJob {
    pid: u32,
    cancel: CancellationToken,
    on_release: OnRelease,
    store: Arc<dyn StatusStore>,
    engine: Arc<dyn OptimizerEngine>,
    slots: Arc<Mutex<HashMap<u32, Slot>>>,
}

impl InProcessJob {
    fn exit(slots: &Mutex<HashMap<u32, Slot>>, pid: u32) {
        if let Some(slot) = slots.lock().unwrap().get_mut(&pid) {
            slot.alive = false;
        }
    }
}

impl ParkedJob for InProcessJob {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn start_time(&self) -> Option<u64> {
        Some(u64::from(self.pid))
    }

    fn release(self: Box<Self>, payload: &LaunchPayload) -> Result<(), LaunchError> {
        if self.on_release == OnRelease::Crash {
            Self::exit(&self.slots, self.pid);
            return Ok(());
        }

        let payload = payload.clone();
        tokio::spawn(async move {
            let runner = JobRunner::new(self.store.clone(), self.engine.clone());
            let _ = runner.run(&payload, self.cancel.clone()).await;
            Self::exit(&self.slots, self.pid);
        });
        Ok(())
    }

    fn abort(self: Box<Self>) {
        Self::exit(&self.slots, self.pid);
    }
}

/// Reporter that records every callback.
#[derive(Default)]
pub struct RecordingReporter {
    pub statuses: Mutex<Vec<StatusRecord>>,
    pub events: Mutex<Vec<JobEvent>>,
    pub notices: Mutex<Vec<String>>,
    pub ready: Mutex<bool>,
}

impl RecordingReporter {
    pub fn event_messages(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.message.clone())
            .collect()
    }
}

impl SessionReporter for RecordingReporter {
    fn ready(&self, _record: &StatusRecord) {
        *self.ready.lock().unwrap() = true;
    }

    fn status_changed(&self, record: &StatusRecord) {
        self.statuses.lock().unwrap().push(record.clone());
    }

    fn event(&self, event: &JobEvent) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn notice(&self, message: &str) {
        self.notices.lock().unwrap().push(message.to_string());
    }
}
