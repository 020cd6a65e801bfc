use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Settings;

/// Settings error types
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Invalid readiness_timeout_secs: {0}. Must be at least 1")]
    InvalidReadinessTimeout(u64),

    #[error("Invalid poll_interval_ms: {0}. Must be at least 1")]
    InvalidPollInterval(u64),

    #[error("Invalid kill_timeout_secs: {0}. Must be at least 1")]
    InvalidKillTimeout(u64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),
}

/// Settings loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load settings with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .optima/config.yaml (project settings)
    /// 3. .optima/local.yaml (local overrides, optional)
    /// 4. Environment variables (OPTIMA_* prefix, highest priority)
    pub fn load() -> Result<Settings> {
        let settings: Settings = Self::figment(Path::new("."))
            .extract()
            .context("Failed to extract settings from figment")?;

        Self::validate(&settings)?;
        Ok(settings)
    }

    /// The merged provider chain rooted at `dir`.
    pub fn figment(dir: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Yaml::file(dir.join(".optima/config.yaml")))
            .merge(Yaml::file(dir.join(".optima/local.yaml")))
            .merge(Env::prefixed("OPTIMA_").split("__"))
    }

    /// Load settings from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Settings> {
        let settings: Settings = Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load settings from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&settings)?;
        Ok(settings)
    }

    /// Validate settings after loading
    pub fn validate(settings: &Settings) -> Result<(), SettingsError> {
        if settings.readiness_timeout_secs == 0 {
            return Err(SettingsError::InvalidReadinessTimeout(
                settings.readiness_timeout_secs,
            ));
        }

        if settings.poll_interval_ms == 0 {
            return Err(SettingsError::InvalidPollInterval(settings.poll_interval_ms));
        }

        if settings.kill_timeout_secs == 0 {
            return Err(SettingsError::InvalidKillTimeout(settings.kill_timeout_secs));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        for level in [&settings.logging.level, &settings.logging.job_level] {
            if !valid_log_levels.contains(&level.as_str()) {
                return Err(SettingsError::InvalidLogLevel(level.clone()));
            }
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&settings.logging.format.as_str()) {
            return Err(SettingsError::InvalidLogFormat(
                settings.logging.format.clone(),
            ));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&settings.logging.rotation.as_str()) {
            return Err(SettingsError::InvalidLogRotation(
                settings.logging.rotation.clone(),
            ));
        }

        Ok(())
    }
}
