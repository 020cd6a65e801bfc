//! Status record table for the prior-run and status reports.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};

use crate::domain::models::{JobIdentity, JobStatus, StatusRecord};

/// Table cell color for a status.
pub fn status_color(status: JobStatus) -> Color {
    match status {
        JobStatus::NeverRun => Color::Grey,
        JobStatus::Starting => Color::Yellow,
        JobStatus::Running => Color::Cyan,
        JobStatus::Completed => Color::Green,
        JobStatus::Failed => Color::Red,
        JobStatus::Stopped => Color::Magenta,
    }
}

/// Two-column table describing a job's status record.
pub fn format_status_table(identity: &JobIdentity, record: &StatusRecord, use_colors: bool) -> String {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let status = Cell::new(record.status.as_str()).add_attribute(Attribute::Bold);
    let status = if use_colors {
        status.fg(status_color(record.status))
    } else {
        status
    };

    table.add_row(vec![Cell::new("Output directory"), Cell::new(identity.output_dir().display())]);
    table.add_row(vec![Cell::new("Status"), status]);
    if let Some(ref message) = record.message {
        table.add_row(vec![Cell::new("Message"), Cell::new(message)]);
    }
    if let Some(pid) = record.pid {
        table.add_row(vec![Cell::new("Process"), Cell::new(pid)]);
    }
    if let Some(run_id) = record.run_id {
        table.add_row(vec![Cell::new("Run"), Cell::new(run_id)]);
    }
    if record.status != JobStatus::NeverRun {
        table.add_row(vec![
            Cell::new("Started"),
            Cell::new(record.created_at.format("%Y-%m-%d %H:%M:%S UTC")),
        ]);
        table.add_row(vec![
            Cell::new("Updated"),
            Cell::new(record.updated_at.format("%Y-%m-%d %H:%M:%S UTC")),
        ]);
    }

    table.to_string()
}
