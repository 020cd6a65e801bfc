//! Readiness waiter - polls until a freshly launched job is up.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::application::launcher::LaunchHandle;
use crate::domain::cancellation::CancellationToken;
use crate::domain::errors::StatusStoreError;
use crate::domain::models::{JobStatus, StatusRecord};
use crate::domain::ports::{ProcessControl, StatusStore};

/// Result of waiting for readiness.
#[derive(Debug, Clone, PartialEq)]
pub enum Readiness {
    /// The job is running, or already finished without failing
    Ready(StatusRecord),
    /// The job failed before becoming ready
    Failed(StatusRecord),
    /// No readiness signal within the budget
    TimedOut { waited: Duration },
    /// The operator interrupted the wait; the job is left alone
    Interrupted(StatusRecord),
}

/// Waits for a freshly launched job to report readiness.
pub struct ReadinessWaiter {
    store: Arc<dyn StatusStore>,
    process: Arc<dyn ProcessControl>,
    poll_interval: Duration,
}

impl ReadinessWaiter {
    /// Waiter polling every `poll_interval`.
    pub fn new(
        store: Arc<dyn StatusStore>,
        process: Arc<dyn ProcessControl>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            store,
            process,
            poll_interval,
        }
    }

    /// Poll the status record and the job process until the job is ready,
    /// has failed, `timeout` elapses, or `cancel` fires.
    ///
    /// If the launched process dies while the record still says `starting`,
    /// the launcher's side owns the record and marks it failed.
    pub async fn wait_until_ready(
        &self,
        handle: &LaunchHandle,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Readiness, StatusStoreError> {
        let started = Instant::now();
        let deadline = started + timeout;

        loop {
            let record = self.store.read(&handle.identity).await?;
            match record.status {
                JobStatus::Running | JobStatus::Completed | JobStatus::Stopped => {
                    return Ok(Readiness::Ready(record));
                }
                JobStatus::Failed => return Ok(Readiness::Failed(record)),
                JobStatus::Starting | JobStatus::NeverRun => {
                    if !self.process.is_alive(handle.pid) {
                        // It may have written a final status right before exiting.
                        let record = self.store.read(&handle.identity).await?;
                        let message = format!(
                            "job process {} exited before reporting readiness; see {}",
                            handle.pid,
                            handle.identity.log_dir().display()
                        );
                        match record.status {
                            JobStatus::Starting => {
                                warn!(pid = handle.pid, "Job process exited before reporting readiness");
                                let record = self
                                    .store
                                    .transition_run(
                                        &handle.identity,
                                        handle.run_id,
                                        JobStatus::Failed,
                                        Some(message),
                                    )
                                    .await?;
                                return Ok(Readiness::Failed(record));
                            }
                            JobStatus::NeverRun => {
                                // The record vanished; report without writing.
                                let mut lost = record;
                                lost.status = JobStatus::Failed;
                                lost.message = Some(message);
                                return Ok(Readiness::Failed(lost));
                            }
                            _ => continue,
                        }
                    }
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(Readiness::TimedOut {
                    waited: now - started,
                });
            }
            debug!(status = %record.status, "Waiting for job readiness");

            let nap = self.poll_interval.min(deadline - now);
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(Readiness::Interrupted(record)),
                () = tokio::time::sleep(nap) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::FileStatusStore;
    use crate::domain::errors::ProcessError;
    use crate::domain::models::JobIdentity;
    use tempfile::TempDir;
    use uuid::Uuid;

    struct Alive(bool);

    impl ProcessControl for Alive {
        fn is_alive(&self, _pid: u32) -> bool {
            self.0
        }

        fn terminate(&self, pid: u32) -> Result<(), ProcessError> {
            Err(ProcessError::NotFound(pid))
        }
    }

    async fn started(dir: &TempDir) -> (Arc<FileStatusStore>, LaunchHandle) {
        let store = Arc::new(FileStatusStore::new());
        let identity = JobIdentity::from_output_dir("out", dir.path());
        let run_id = Uuid::new_v4();
        store.begin_run(&identity, run_id, 4242).await.unwrap();
        let handle = LaunchHandle {
            run_id,
            pid: 4242,
            identity,
            rolled_from: None,
        };
        (store, handle)
    }

    fn waiter(store: Arc<FileStatusStore>, alive: bool) -> ReadinessWaiter {
        ReadinessWaiter::new(store, Arc::new(Alive(alive)), Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_running_record_is_ready() {
        let dir = TempDir::new().unwrap();
        let (store, handle) = started(&dir).await;
        store
            .transition(&handle.identity, JobStatus::Running, None)
            .await
            .unwrap();

        let readiness = waiter(store, true)
            .wait_until_ready(&handle, Duration::from_secs(1), &CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(readiness, Readiness::Ready(ref r) if r.status == JobStatus::Running));
    }

    #[tokio::test]
    async fn test_dead_process_while_starting_is_recorded_as_failed() {
        let dir = TempDir::new().unwrap();
        let (store, handle) = started(&dir).await;

        let readiness = waiter(store.clone(), false)
            .wait_until_ready(&handle, Duration::from_secs(1), &CancellationToken::new())
            .await
            .unwrap();

        let Readiness::Failed(record) = readiness else {
            panic!("expected failure, got {readiness:?}");
        };
        assert!(record
            .message
            .as_deref()
            .unwrap()
            .contains("job process 4242 exited before reporting readiness"));
        let persisted = store.read(&handle.identity).await.unwrap();
        assert_eq!(persisted.status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_times_out_while_still_starting() {
        let dir = TempDir::new().unwrap();
        let (store, handle) = started(&dir).await;

        let readiness = waiter(store.clone(), true)
            .wait_until_ready(&handle, Duration::from_millis(50), &CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(readiness, Readiness::TimedOut { .. }));
        // A timeout is not a failure of the job.
        let persisted = store.read(&handle.identity).await.unwrap();
        assert_eq!(persisted.status, JobStatus::Starting);
    }

    #[tokio::test]
    async fn test_interrupt_leaves_record_alone() {
        let dir = TempDir::new().unwrap();
        let (store, handle) = started(&dir).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let readiness = waiter(store.clone(), true)
            .wait_until_ready(&handle, Duration::from_secs(5), &cancel)
            .await
            .unwrap();

        assert!(matches!(readiness, Readiness::Interrupted(ref r) if r.status == JobStatus::Starting));
    }
}
