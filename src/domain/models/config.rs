use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tool settings for Optima (not the job configuration)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Settings {
    /// How long `run` waits for the job to report readiness
    #[serde(default = "default_readiness_timeout_secs")]
    pub readiness_timeout_secs: u64,

    /// Interval between status polls while waiting or monitoring
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long `kill` waits for the job to acknowledge
    #[serde(default = "default_kill_timeout_secs")]
    pub kill_timeout_secs: u64,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

const fn default_readiness_timeout_secs() -> u64 {
    600
}

const fn default_poll_interval_ms() -> u64 {
    1000
}

const fn default_kill_timeout_secs() -> u64 {
    60
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            readiness_timeout_secs: default_readiness_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            kill_timeout_secs: default_kill_timeout_secs(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Settings {
    /// Readiness budget.
    pub const fn readiness_timeout(&self) -> Duration {
        Duration::from_secs(self.readiness_timeout_secs)
    }

    /// Interval between status polls.
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// How long `kill` waits for the job to stop.
    pub const fn kill_timeout(&self) -> Duration {
        Duration::from_secs(self.kill_timeout_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Level for CLI diagnostics on stderr: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Level for the detached job process log file
    #[serde(default = "default_job_log_level")]
    pub job_level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Rotation of the job process log file: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_job_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "never".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            job_level: default_job_log_level(),
            format: default_log_format(),
            rotation: default_rotation(),
        }
    }
}
