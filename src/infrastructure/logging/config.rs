use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::models::config::LoggingConfig;

/// File name of the job process log inside its log directory.
pub const JOB_LOG_FILE: &str = "job.log";

/// Logging configuration resolved for one process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Output format for stderr (json, pretty)
    pub format: LogFormat,

    /// Directory for log files (if None, no file output)
    pub log_dir: Option<PathBuf>,

    /// Enable stderr logging
    pub enable_stderr: bool,

    /// Log file rotation policy
    pub rotation: RotationPolicy,
}

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// Parse `json` or `pretty`.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            _ => bail!("Invalid log format: {s}"),
        }
    }
}

/// How often the job log file is rotated.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    Daily,
    Hourly,
    #[default]
    Never,
}

impl RotationPolicy {
    /// Parse `daily`, `hourly` or `never`.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "daily" => Ok(Self::Daily),
            "hourly" => Ok(Self::Hourly),
            "never" => Ok(Self::Never),
            _ => bail!("Invalid log rotation: {s}"),
        }
    }
}

impl LogConfig {
    /// Diagnostics of a CLI invocation, on stderr only.
    pub fn for_cli(settings: &LoggingConfig, debug: bool) -> Result<Self> {
        Ok(Self {
            level: if debug {
                "debug".to_string()
            } else {
                settings.level.clone()
            },
            format: LogFormat::parse(&settings.format)?,
            log_dir: None,
            enable_stderr: true,
            rotation: RotationPolicy::parse(&settings.rotation)?,
        })
    }

    /// The detached job process: JSON lines in `log_dir`, no terminal.
    pub fn for_job(settings: &LoggingConfig, log_dir: PathBuf) -> Result<Self> {
        Ok(Self {
            level: settings.job_level.clone(),
            format: LogFormat::Json,
            log_dir: Some(log_dir),
            enable_stderr: false,
            rotation: RotationPolicy::parse(&settings.rotation)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_debug_raises_level() {
        let settings = LoggingConfig::default();
        assert_eq!(LogConfig::for_cli(&settings, false).unwrap().level, "warn");
        assert_eq!(LogConfig::for_cli(&settings, true).unwrap().level, "debug");
    }

    #[test]
    fn test_job_logs_to_file_only() {
        let config =
            LogConfig::for_job(&LoggingConfig::default(), PathBuf::from("/tmp/logs")).unwrap();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Json);
        assert!(!config.enable_stderr);
        assert_eq!(config.rotation, RotationPolicy::Never);
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let settings = LoggingConfig {
            format: "xml".to_string(),
            ..LoggingConfig::default()
        };
        assert!(LogConfig::for_cli(&settings, false).is_err());
    }
}
