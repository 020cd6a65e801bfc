//! Server launcher - starts the detached job process.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::output_dir::prepare_output_dir;
use crate::domain::errors::LaunchError;
use crate::domain::models::{
    EngineRequest, JobIdentity, JobStatus, LaunchPayload, OptimizationConfig, StatusRecord,
};
use crate::domain::ports::{JobSpawner, StatusStore};

/// A launched job, as seen by the process that launched it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchHandle {
    pub run_id: Uuid,
    pub pid: u32,
    pub identity: JobIdentity,
    /// Where a previous run's output directory was moved, if anywhere
    pub rolled_from: Option<PathBuf>,
}

/// Starts jobs as detached processes and records them as `starting`.
///
/// The caller is responsible for checking that no job is active for the
/// identity; the store still refuses to replace an active record.
pub struct ServerLauncher {
    store: Arc<dyn StatusStore>,
    spawner: Arc<dyn JobSpawner>,
}

impl ServerLauncher {
    /// Launcher recording into `store` and spawning through `spawner`.
    pub fn new(store: Arc<dyn StatusStore>, spawner: Arc<dyn JobSpawner>) -> Self {
        Self { store, spawner }
    }

    /// Launch a job for `config` that will run `engine`.
    #[instrument(skip_all, fields(identity = %config.identity()))]
    pub async fn start(
        &self,
        config: &OptimizationConfig,
        engine: EngineRequest,
    ) -> Result<LaunchHandle, LaunchError> {
        let identity = config.identity().clone();
        let run_id = Uuid::new_v4();

        let rolled_from = match prepare_output_dir(identity.output_dir()).await {
            Ok(rolled) => rolled,
            Err(e) => {
                self.record_failure(&identity, run_id, &e).await;
                return Err(e);
            }
        };

        let parked = match self.spawner.spawn(&identity) {
            Ok(parked) => parked,
            Err(e) => {
                self.record_failure(&identity, run_id, &e).await;
                return Err(e);
            }
        };
        let pid = parked.pid();
        let record = StatusRecord::starting(run_id, pid).with_process_start(parked.start_time());

        // The job only proceeds once it has its payload, so this write
        // always lands before anything the job writes.
        if let Err(e) = self.store.start_run(&identity, record).await {
            warn!(pid, error = %e, "Could not record job start, aborting job process");
            parked.abort();
            return Err(e.into());
        }

        let payload = LaunchPayload {
            run_id,
            identity: identity.clone(),
            config_path: config.config_path().to_path_buf(),
            engine,
        };
        if let Err(e) = parked.release(&payload) {
            let message = e.to_string();
            if let Err(store_err) = self
                .store
                .transition_run(&identity, run_id, JobStatus::Failed, Some(message))
                .await
            {
                error!(error = %store_err, "Failed to record launch failure");
            }
            return Err(e);
        }

        info!(pid, %run_id, "Job process launched");
        Ok(LaunchHandle {
            run_id,
            pid,
            identity,
            rolled_from,
        })
    }

    /// Persist a launch that failed before any process owned the record.
    async fn record_failure(&self, identity: &JobIdentity, run_id: Uuid, cause: &LaunchError) {
        let mut record = StatusRecord::never_run();
        record.run_id = Some(run_id);
        let transitioned = record
            .transition_to(JobStatus::Starting, None)
            .and_then(|()| record.transition_to(JobStatus::Failed, Some(cause.to_string())));

        let result = match transitioned {
            Ok(()) => self.store.write(identity, &record).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            error!(error = %e, "Failed to record launch failure");
        }
    }
}
