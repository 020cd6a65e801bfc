//! Terminal rendering of a live session.

use console::{style, StyledObject};
use indicatif::ProgressBar;
use std::sync::Mutex;

use super::progress::create_spinner;
use crate::domain::models::{EventKind, JobEvent, JobIdentity, JobStatus, StatusRecord};
use crate::domain::ports::SessionReporter;

/// Status name colored for the terminal.
pub fn styled_status(status: JobStatus) -> StyledObject<&'static str> {
    let text = style(status.as_str()).bold();
    match status {
        JobStatus::NeverRun => text.dim(),
        JobStatus::Starting => text.yellow(),
        JobStatus::Running => text.cyan(),
        JobStatus::Completed => text.green(),
        JobStatus::Failed => text.red(),
        JobStatus::Stopped => text.magenta(),
    }
}

/// Reports progress on stdout. In JSON mode nothing is printed, so the
/// command's final JSON document stays the only output.
pub struct ConsoleReporter {
    quiet: bool,
    spinner: Mutex<Option<ProgressBar>>,
}

impl ConsoleReporter {
    /// Reporter printing progress; silent in JSON mode.
    pub fn new(json_mode: bool) -> Self {
        Self {
            quiet: json_mode,
            spinner: Mutex::new(None),
        }
    }

    fn println(&self, line: String) {
        if self.quiet {
            return;
        }
        match self.spinner.lock().ok().as_deref().and_then(Option::as_ref) {
            Some(spinner) => spinner.println(line),
            None => println!("{line}"),
        }
    }

    fn finish_spinner(&self, message: &str) {
        if let Ok(mut guard) = self.spinner.lock() {
            if let Some(spinner) = guard.take() {
                spinner.finish_with_message(message.to_string());
            }
        }
    }
}

impl SessionReporter for ConsoleReporter {
    fn launching(&self, identity: &JobIdentity) {
        self.println(format!("Starting optimization in {identity}"));
    }

    fn waiting(&self) {
        if self.quiet {
            return;
        }
        if let Ok(mut guard) = self.spinner.lock() {
            *guard = Some(create_spinner("Waiting for the optimization job ..."));
        }
    }

    fn ready(&self, _record: &StatusRecord) {
        self.finish_spinner("Optimization job is ready");
    }

    fn status_changed(&self, record: &StatusRecord) {
        let mut line = format!("Status: {}", styled_status(record.status));
        if record.is_terminal() {
            if let Some(ref message) = record.message {
                line.push_str(&format!(" ({message})"));
            }
        }
        self.println(line);
    }

    fn event(&self, event: &JobEvent) {
        let kind = match event.kind {
            EventKind::Batch => style(event.kind.as_str()).blue(),
            EventKind::Objective => style(event.kind.as_str()).green(),
            EventKind::ForwardModel => style(event.kind.as_str()).cyan(),
            EventKind::Finished => style(event.kind.as_str()).bold(),
            EventKind::Log => style(event.kind.as_str()).dim(),
        };
        self.println(format!(
            "[{}] {kind} {}",
            event.timestamp.format("%H:%M:%S"),
            event.message
        ));
    }

    fn notice(&self, message: &str) {
        self.println(message.to_string());
    }
}

impl Drop for ConsoleReporter {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.spinner.lock() {
            if let Some(spinner) = guard.take() {
                spinner.finish_and_clear();
            }
        }
    }
}
