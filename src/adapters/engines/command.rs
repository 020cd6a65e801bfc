//! Optimizer engine backed by an external command.
//!
//! The engine program receives the [`EngineRequest`] as one JSON document on
//! stdin and reports progress as JSON lines on stdout:
//!
//! ```text
//! {"event":"ready"}
//! {"event":"batch","batch":0}
//! {"event":"objective","batch":0,"values":{"npv":1.5}}
//! {"event":"forward_model","job":"copy_file","realization":2,"status":"success"}
//! {"event":"log","message":"..."}
//! {"event":"finished","message":"Optimization converged"}
//! ```
//!
//! Lines that are not engine messages are kept as log events. A non-zero exit
//! is a failure whose diagnostic is the tail of the engine's stderr.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::domain::cancellation::CancellationToken;
use crate::domain::errors::EngineError;
use crate::domain::models::{EngineEvent, EngineOutcome, EngineRequest, EventKind, JobEvent};
use crate::domain::ports::OptimizerEngine;

/// Default number of stderr lines kept for failure diagnostics.
pub const DEFAULT_STDERR_TAIL: usize = 20;

/// How long to wait for the stderr reader once the engine has exited.
const STDERR_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum EngineMessage {
    Ready,
    Batch {
        batch: u32,
        #[serde(default)]
        status: Option<String>,
    },
    Objective {
        #[serde(default)]
        batch: Option<u32>,
        values: BTreeMap<String, f64>,
    },
    ForwardModel {
        job: String,
        #[serde(default)]
        realization: Option<u32>,
        status: String,
    },
    Finished {
        #[serde(default)]
        message: Option<String>,
    },
    Log {
        message: String,
    },
}

/// What one stdout line means to the runner.
#[derive(Debug, PartialEq)]
enum Parsed {
    Ready,
    Event(JobEvent),
    Finished(JobEvent, Option<String>),
}

fn parse_line(line: &str) -> Parsed {
    let Ok(message) = serde_json::from_str::<EngineMessage>(line) else {
        return Parsed::Event(JobEvent::new(EventKind::Log, line));
    };

    match message {
        EngineMessage::Ready => Parsed::Ready,
        EngineMessage::Batch { batch, status } => Parsed::Event(JobEvent::new(
            EventKind::Batch,
            format!("Batch {batch} {}", status.as_deref().unwrap_or("started")),
        )),
        EngineMessage::Objective { batch, values } => {
            let values = values
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join(", ");
            let message = match batch {
                Some(batch) => format!("Batch {batch}: {values}"),
                None => values,
            };
            Parsed::Event(JobEvent::new(EventKind::Objective, message))
        }
        EngineMessage::ForwardModel {
            job,
            realization,
            status,
        } => {
            let message = match realization {
                Some(real) => format!("realization {real}: {job} {status}"),
                None => format!("{job} {status}"),
            };
            Parsed::Event(JobEvent::new(EventKind::ForwardModel, message).with_job(job))
        }
        EngineMessage::Finished { message } => {
            let text = message
                .clone()
                .unwrap_or_else(|| "Optimization finished".to_string());
            Parsed::Finished(JobEvent::new(EventKind::Finished, text), message)
        }
        EngineMessage::Log { message } => Parsed::Event(JobEvent::new(EventKind::Log, message)),
    }
}

/// Runs `optimizer.command` from the request as a child process.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    working_dir: Option<PathBuf>,
    stderr_tail: usize,
}

impl CommandEngine {
    /// Engine running in the current directory.
    pub fn new() -> Self {
        Self {
            working_dir: None,
            stderr_tail: DEFAULT_STDERR_TAIL,
        }
    }

    /// Run the engine in `dir`.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Keep the last `lines` lines of stderr for failure messages.
    #[must_use]
    pub fn with_stderr_tail(mut self, lines: usize) -> Self {
        self.stderr_tail = lines.max(1);
        self
    }

    fn build_command(&self, request: &EngineRequest) -> Result<Command, EngineError> {
        let (program, args) = request.command.split_first().ok_or_else(|| EngineError::Spawn {
            program: String::new(),
            reason: "engine command is empty".to_string(),
        })?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }
        Ok(cmd)
    }
}

impl Default for CommandEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Engine output is not required to be UTF-8; invalid bytes are replaced.
fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\r')
        .to_string()
}

async fn collect_tail<R: AsyncRead + Unpin>(reader: R, keep: usize) -> Vec<String> {
    let mut tail = VecDeque::with_capacity(keep);
    let mut lines = BufReader::new(reader).split(b'\n');
    while let Ok(Some(bytes)) = lines.next_segment().await {
        if tail.len() == keep {
            tail.pop_front();
        }
        tail.push_back(decode_line(&bytes));
    }
    tail.into_iter().collect()
}

fn failure_message(status: ExitStatus, tail: &[String]) -> String {
    let tail: Vec<&str> = tail
        .iter()
        .map(|l| l.trim_end())
        .filter(|l| !l.is_empty())
        .collect();
    if tail.is_empty() {
        format!("Optimizer engine exited with {status}")
    } else {
        format!("Optimizer engine exited with {status}:\n{}", tail.join("\n"))
    }
}

async fn stop(child: &mut Child) {
    if let Err(e) = child.kill().await {
        warn!(error = %e, "Failed to kill optimizer engine");
    }
}

#[async_trait]
impl OptimizerEngine for CommandEngine {
    fn name(&self) -> &'static str {
        "command"
    }

    async fn run(
        &self,
        request: &EngineRequest,
        events: mpsc::Sender<EngineEvent>,
        cancel: CancellationToken,
    ) -> Result<EngineOutcome, EngineError> {
        let mut cmd = self.build_command(request)?;
        let program = request.command.first().cloned().unwrap_or_default();

        let mut child = cmd.spawn().map_err(|e| EngineError::Spawn {
            program: program.clone(),
            reason: e.to_string(),
        })?;
        info!(program = %program, pid = ?child.id(), "Optimizer engine started");

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Io("Failed to get engine stdin handle".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Io("Failed to get engine stdout handle".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::Io("Failed to get engine stderr handle".to_string()))?;

        let payload = serde_json::to_vec(request).map_err(|e| EngineError::Io(e.to_string()))?;
        if let Err(e) = stdin.write_all(&payload).await {
            // An engine that exits without reading is judged by its exit status.
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                stop(&mut child).await;
                return Err(EngineError::Io(format!("Failed to write engine request: {e}")));
            }
        }
        drop(stdin);

        let stderr_task = tokio::spawn(collect_tail(stderr, self.stderr_tail));
        let mut lines = BufReader::new(stdout).split(b'\n');
        let mut ready = false;
        let mut finished_message = None;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!("Cancellation requested, stopping optimizer engine");
                    stop(&mut child).await;
                    stderr_task.abort();
                    return Ok(EngineOutcome::Cancelled);
                }
                segment = lines.next_segment() => {
                    let Some(bytes) = segment.map_err(|e| EngineError::Io(e.to_string()))? else {
                        break;
                    };
                    let line = decode_line(&bytes);
                    if line.trim().is_empty() {
                        continue;
                    }

                    let parsed = parse_line(&line);
                    if !ready {
                        ready = true;
                        let _ = events.send(EngineEvent::Ready).await;
                    }
                    match parsed {
                        Parsed::Ready => {}
                        Parsed::Event(event) => {
                            let _ = events.send(EngineEvent::Progress(event)).await;
                        }
                        Parsed::Finished(event, message) => {
                            finished_message = message;
                            let _ = events.send(EngineEvent::Progress(event)).await;
                        }
                    }
                }
            }
        }

        let status = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                stop(&mut child).await;
                stderr_task.abort();
                return Ok(EngineOutcome::Cancelled);
            }
            status = child.wait() => status.map_err(|e| EngineError::Io(e.to_string()))?,
        };

        let tail = match tokio::time::timeout(STDERR_DRAIN_TIMEOUT, stderr_task).await {
            Ok(Ok(tail)) => tail,
            _ => Vec::new(),
        };
        debug!(%status, stderr_lines = tail.len(), "Optimizer engine exited");

        if status.success() {
            Ok(EngineOutcome::Completed {
                message: finished_message,
            })
        } else {
            Err(EngineError::Failed(failure_message(status, &tail)))
        }
    }
}
