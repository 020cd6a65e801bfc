//! Session reporter port - user-facing progress of a session.

use crate::domain::models::{JobEvent, JobIdentity, StatusRecord};

/// Receives what a session wants the operator to see.
///
/// All methods default to doing nothing.
pub trait SessionReporter: Send + Sync {
    fn launching(&self, _identity: &JobIdentity) {}

    /// Readiness polling started.
    fn waiting(&self) {}

    fn ready(&self, _record: &StatusRecord) {}

    fn status_changed(&self, _record: &StatusRecord) {}

    fn event(&self, _event: &JobEvent) {}

    fn notice(&self, _message: &str) {}
}

/// A reporter that shows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl SessionReporter for NullReporter {}
