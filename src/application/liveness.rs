//! Reconciling persisted status with process liveness.

use crate::domain::models::{JobStatus, StatusRecord};
use crate::domain::ports::ProcessControl;

/// Message shown for a job whose process disappeared.
pub fn stale_message(pid: u32) -> String {
    format!("job process {pid} exited without reporting a final status")
}

/// Whether `pid` is alive and is still the process `record` was written for.
/// A start time that cannot be read on either side is not held against it.
pub fn is_job_process(record: &StatusRecord, pid: u32, process: &dyn ProcessControl) -> bool {
    if !process.is_alive(pid) {
        return false;
    }
    match (record.process_start, process.start_time(pid)) {
        (Some(recorded), Some(current)) => recorded == current,
        _ => true,
    }
}

/// Whether `record` claims an active job whose process is gone, or whose
/// pid now belongs to some other process.
pub fn is_stale(record: &StatusRecord, process: &dyn ProcessControl) -> bool {
    record.is_active()
        && record
            .pid
            .is_some_and(|pid| !is_job_process(record, pid, process))
}

/// The record as readers should treat it: a stale active record counts as
/// failed. Nothing is written.
pub fn effective_record(record: StatusRecord, process: &dyn ProcessControl) -> StatusRecord {
    if !is_stale(&record, process) {
        return record;
    }

    let pid = record.pid.unwrap_or_default();
    let mut view = record;
    // Starting and Running may both move to Failed.
    if view
        .transition_to(JobStatus::Failed, Some(stale_message(pid)))
        .is_err()
    {
        view.status = JobStatus::Failed;
    }
    view
}
