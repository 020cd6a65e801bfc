//! Output formatting for the CLI.
//!
//! Every command produces one value implementing [`CommandOutput`], printed
//! either for humans or as a single JSON document.

pub mod progress;
pub mod reporter;
pub mod session;
pub mod table;

use serde::Serialize;

pub use progress::create_spinner;
pub use reporter::ConsoleReporter;
pub use session::{already_running_message, SessionReport};
pub use table::format_status_table;

/// Result of a command, printable as text or JSON.
pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;
    fn to_json(&self) -> serde_json::Value;
}

/// Print `result` as JSON or as human-readable text.
pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&result.to_json()).unwrap_or_default()
        );
    } else {
        println!("{}", result.to_human());
    }
}

/// Frame a message between rules of `=`.
pub fn banner(message: &str) -> String {
    let rule = "=".repeat(80);
    format!("{rule}\n{message}\n{rule}")
}
