//! Status store port - persisted lifecycle record per job.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::StatusStoreError;
use crate::domain::models::{JobIdentity, JobStatus, StatusRecord};

/// Persisted status records, addressed by job identity.
///
/// Implementations must replace records atomically: a reader sees either the
/// previous record or the new one, never a partial write.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Read the current record; a job with nothing persisted is `never_run`.
    async fn read(&self, identity: &JobIdentity) -> Result<StatusRecord, StatusStoreError>;

    /// Replace the record.
    async fn write(
        &self,
        identity: &JobIdentity,
        record: &StatusRecord,
    ) -> Result<(), StatusStoreError>;

    /// Move the job forward through the lifecycle.
    async fn transition(
        &self,
        identity: &JobIdentity,
        to: JobStatus,
        message: Option<String>,
    ) -> Result<StatusRecord, StatusStoreError> {
        let mut record = self.read(identity).await?;
        record.transition_to(to, message)?;
        self.write(identity, &record).await?;
        Ok(record)
    }

    /// Like [`transition`](Self::transition), but only if the record still
    /// belongs to `run_id`.
    async fn transition_run(
        &self,
        identity: &JobIdentity,
        run_id: Uuid,
        to: JobStatus,
        message: Option<String>,
    ) -> Result<StatusRecord, StatusStoreError> {
        let mut record = self.read(identity).await?;
        if record.run_id != Some(run_id) {
            return Err(StatusStoreError::RunMismatch);
        }
        record.transition_to(to, message)?;
        self.write(identity, &record).await?;
        Ok(record)
    }

    /// Create a fresh `starting` record for a new launch.
    ///
    /// Refused unless the current record is `never_run` or terminal.
    async fn begin_run(
        &self,
        identity: &JobIdentity,
        run_id: Uuid,
        pid: u32,
    ) -> Result<StatusRecord, StatusStoreError> {
        self.start_run(identity, StatusRecord::starting(run_id, pid))
            .await
    }

    /// Replace a finished or absent record with the `starting` record of a
    /// new launch.
    async fn start_run(
        &self,
        identity: &JobIdentity,
        record: StatusRecord,
    ) -> Result<StatusRecord, StatusStoreError> {
        let current = self.read(identity).await?;
        if !current.can_be_replaced() {
            return Err(StatusStoreError::NotReplaceable(current.status));
        }
        self.write(identity, &record).await?;
        Ok(record)
    }
}
