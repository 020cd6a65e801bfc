//! Append-only job event log.
//!
//! The job process appends one JSON object per line to
//! `<output_dir>/.optima/events.jsonl`. Monitors tail it by byte offset and
//! only consume complete lines, so a line being written is picked up on the
//! next poll.

use anyhow::{Context, Result};
use std::io::SeekFrom;
use std::path::PathBuf;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::warn;

use crate::domain::models::{JobEvent, JobIdentity};

/// Writer side, owned by the job process.
#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    /// Log of the job at `identity`.
    pub fn new(identity: &JobIdentity) -> Self {
        Self {
            path: identity.events_path(),
        }
    }

    /// Remove events of a previous run.
    pub async fn reset(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to clear job event log"),
        }
    }

    /// Append one event as a JSON line.
    pub async fn append(&self, event: &JobEvent) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create session directory")?;
        }

        let mut line = serde_json::to_vec(event).context("Failed to serialize job event")?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .context("Failed to open job event log")?;
        file.write_all(&line)
            .await
            .context("Failed to append job event")?;
        file.flush().await.context("Failed to flush job event log")?;
        Ok(())
    }
}

/// Reader side, used by monitors.
#[derive(Debug, Clone)]
pub struct EventLogReader {
    path: PathBuf,
    offset: u64,
}

impl EventLogReader {
    /// Reader starting at the beginning of the log.
    pub fn new(identity: &JobIdentity) -> Self {
        Self {
            path: identity.events_path(),
            offset: 0,
        }
    }

    /// Events appended since the previous call.
    pub async fn read_new(&mut self) -> Result<Vec<JobEvent>> {
        let mut file = match tokio::fs::File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context("Failed to open job event log"),
        };

        let len = file.metadata().await.context("Failed to stat job event log")?.len();
        if len < self.offset {
            // Log was reset by a new run.
            self.offset = 0;
        }
        file.seek(SeekFrom::Start(self.offset))
            .await
            .context("Failed to seek job event log")?;

        let mut buf = Vec::new();
        file.read_to_end(&mut buf)
            .await
            .context("Failed to read job event log")?;

        let Some(last_newline) = buf.iter().rposition(|b| *b == b'\n') else {
            return Ok(Vec::new());
        };
        let complete = &buf[..=last_newline];
        self.offset += complete.len() as u64;

        let mut events = Vec::new();
        for line in complete.split(|b| *b == b'\n').filter(|l| !l.is_empty()) {
            match serde_json::from_slice::<JobEvent>(line) {
                Ok(event) => events.push(event),
                Err(e) => warn!(error = %e, "Skipping malformed job event"),
            }
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::EventKind;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reader_sees_only_new_events() {
        let dir = TempDir::new().unwrap();
        let identity = JobIdentity::from_output_dir("out", dir.path());
        let log = EventLog::new(&identity);
        let mut reader = EventLogReader::new(&identity);

        assert!(reader.read_new().await.unwrap().is_empty());

        log.append(&JobEvent::new(EventKind::Batch, "batch 0 started"))
            .await
            .unwrap();
        log.append(&JobEvent::new(EventKind::Log, "hello")).await.unwrap();

        let events = reader.read_new().await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].message, "batch 0 started");

        assert!(reader.read_new().await.unwrap().is_empty());

        log.append(&JobEvent::new(EventKind::Finished, "done")).await.unwrap();
        let events = reader.read_new().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Finished);
    }

    #[tokio::test]
    async fn test_partial_line_is_deferred() {
        let dir = TempDir::new().unwrap();
        let identity = JobIdentity::from_output_dir("out", dir.path());
        std::fs::create_dir_all(identity.session_dir()).unwrap();

        let event = serde_json::to_string(&JobEvent::new(EventKind::Log, "x")).unwrap();
        std::fs::write(identity.events_path(), &event[..5]).unwrap();

        let mut reader = EventLogReader::new(&identity);
        assert!(reader.read_new().await.unwrap().is_empty());

        std::fs::write(identity.events_path(), format!("{event}\n")).unwrap();
        assert_eq!(reader.read_new().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reset_restarts_reader() {
        let dir = TempDir::new().unwrap();
        let identity = JobIdentity::from_output_dir("out", dir.path());
        let log = EventLog::new(&identity);
        let mut reader = EventLogReader::new(&identity);

        log.append(&JobEvent::new(EventKind::Log, "first run, long message"))
            .await
            .unwrap();
        assert_eq!(reader.read_new().await.unwrap().len(), 1);

        log.reset().await.unwrap();
        log.append(&JobEvent::new(EventKind::Log, "new")).await.unwrap();
        let events = reader.read_new().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "new");
    }
}
