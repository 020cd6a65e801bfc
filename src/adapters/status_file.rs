//! File-backed status store.
//!
//! Each job's record lives at `<output_dir>/.optima/status.json`. Writes go to
//! a uniquely named temp file in the same directory, are synced, then renamed
//! over the record, so readers never observe a torn record.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::errors::StatusStoreError;
use crate::domain::models::{JobIdentity, StatusRecord};
use crate::domain::ports::StatusStore;

/// Status store keeping one JSON file per job.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileStatusStore;

impl FileStatusStore {
    /// Store keeping the record in `<output_dir>/.optima/status.json`.
    pub const fn new() -> Self {
        Self
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StatusStoreError {
    StatusStoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl StatusStore for FileStatusStore {
    async fn read(&self, identity: &JobIdentity) -> Result<StatusRecord, StatusStoreError> {
        let path = identity.status_path();
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| StatusStoreError::Corrupt {
                    path: path.clone(),
                    reason: e.to_string(),
                })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(StatusRecord::never_run()),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    #[instrument(skip(self, record), fields(identity = %identity, status = %record.status))]
    async fn write(
        &self,
        identity: &JobIdentity,
        record: &StatusRecord,
    ) -> Result<(), StatusStoreError> {
        let dir = identity.session_dir();
        let path = identity.status_path();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error(&dir, e))?;

        let bytes = serde_json::to_vec_pretty(record).map_err(|e| StatusStoreError::Corrupt {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        let tmp = dir.join(format!(".status.json.{}", Uuid::new_v4().simple()));
        let result = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(&bytes).await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp, &path).await
        }
        .await;

        if let Err(e) = result {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_error(&path, e));
        }

        debug!("status record written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::JobStatus;
    use tempfile::TempDir;

    fn identity(dir: &TempDir) -> JobIdentity {
        JobIdentity::from_output_dir("output", dir.path())
    }

    #[tokio::test]
    async fn test_missing_record_reads_as_never_run() {
        let dir = TempDir::new().unwrap();
        let record = FileStatusStore::new().read(&identity(&dir)).await.unwrap();
        assert_eq!(record.status, JobStatus::NeverRun);
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let store = FileStatusStore::new();
        let identity = identity(&dir);
        let run_id = Uuid::new_v4();

        store.begin_run(&identity, run_id, 4242).await.unwrap();
        store
            .transition_run(&identity, run_id, JobStatus::Running, None)
            .await
            .unwrap();

        let record = store.read(&identity).await.unwrap();
        assert_eq!(record.status, JobStatus::Running);
        assert_eq!(record.pid, Some(4242));
        assert_eq!(record.run_id, Some(run_id));
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = FileStatusStore::new();
        let identity = identity(&dir);

        for _ in 0..3 {
            store.write(&identity, &StatusRecord::never_run()).await.unwrap();
        }

        let entries: Vec<_> = std::fs::read_dir(identity.session_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(entries, vec!["status.json".to_string()]);
    }

    #[tokio::test]
    async fn test_begin_run_refused_while_active() {
        let dir = TempDir::new().unwrap();
        let store = FileStatusStore::new();
        let identity = identity(&dir);

        store.begin_run(&identity, Uuid::new_v4(), 1).await.unwrap();
        let err = store.begin_run(&identity, Uuid::new_v4(), 2).await.unwrap_err();
        assert!(matches!(err, StatusStoreError::NotReplaceable(JobStatus::Starting)));
        assert_eq!(store.read(&identity).await.unwrap().pid, Some(1));
    }

    #[tokio::test]
    async fn test_transition_run_rejects_foreign_run() {
        let dir = TempDir::new().unwrap();
        let store = FileStatusStore::new();
        let identity = identity(&dir);

        store.begin_run(&identity, Uuid::new_v4(), 1).await.unwrap();
        let err = store
            .transition_run(&identity, Uuid::new_v4(), JobStatus::Running, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StatusStoreError::RunMismatch));
    }

    #[tokio::test]
    async fn test_corrupt_record_is_reported() {
        let dir = TempDir::new().unwrap();
        let identity = identity(&dir);
        std::fs::create_dir_all(identity.session_dir()).unwrap();
        std::fs::write(identity.status_path(), b"{not json").unwrap();

        let err = FileStatusStore::new().read(&identity).await.unwrap_err();
        assert!(matches!(err, StatusStoreError::Corrupt { .. }));
    }
}
