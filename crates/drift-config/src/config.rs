//! Configuration types and loading.
//!
//! The main entry point is [`DriftConfig`], which represents the contents of
//! `drift.yaml`. Configuration is loaded with [`load_config`] (YAML file
//! merged with `DRIFT_`-prefixed environment overrides) and saved with
//! [`save_config`].

use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read or written.
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// The configuration file contained invalid YAML.
    #[error("failed to parse config file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Merging file and environment configuration failed.
    #[error("failed to load configuration: {0}")]
    LoadError(#[from] figment::Error),

    /// A configuration value was invalid.
    #[error("invalid configuration value for key '{key}': {reason}")]
    InvalidValue {
        /// The configuration key that had an invalid value.
        key: String,
        /// A description of why the value is invalid.
        reason: String,
    },
}

/// A specialized `Result` type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Output file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Directory scripts and reports are written into.
    #[serde(default = "default_output_dir")]
    pub dir: String,

    #[serde(default = "default_migration_file")]
    pub migration_file: String,

    #[serde(default = "default_rollback_file")]
    pub rollback_file: String,

    #[serde(default = "default_report_file")]
    pub report_file: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            migration_file: default_migration_file(),
            rollback_file: default_rollback_file(),
            report_file: default_report_file(),
        }
    }
}

fn default_output_dir() -> String {
    "./drift_output".to_string()
}

fn default_migration_file() -> String {
    "migration.sql".to_string()
}

fn default_rollback_file() -> String {
    "rollback.sql".to_string()
}

fn default_report_file() -> String {
    "report.txt".to_string()
}

/// Safety analysis settings. Warnings are advisory and never block script
/// generation; this only controls whether the analysis runs and is shown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetySettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for SafetySettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Migration history settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Path of the SQLite history database.
    #[serde(default = "default_history_path")]
    pub path: String,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_history_path(),
        }
    }
}

fn default_history_path() -> String {
    ".drift_history.db".to_string()
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// DriftConfig
// ---------------------------------------------------------------------------

/// Top-level configuration, the contents of `drift.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriftConfig {
    #[serde(default)]
    pub output: OutputSettings,

    #[serde(default)]
    pub safety: SafetySettings,

    #[serde(default)]
    pub history: HistorySettings,
}

/// Loads configuration from a YAML file merged with `DRIFT_` environment
/// overrides (`DRIFT_OUTPUT__DIR`, `DRIFT_HISTORY__PATH`, ...).
///
/// A missing file is fine and yields defaults (still subject to environment
/// overrides).
pub fn load_config(path: &Path) -> Result<DriftConfig> {
    let mut figment = Figment::new();
    if path.exists() {
        figment = figment.merge(Yaml::file(path));
    }
    let config = figment
        .merge(Env::prefixed("DRIFT_").split("__"))
        .extract()?;
    Ok(config)
}

/// Saves configuration as YAML, creating parent directories as needed.
pub fn save_config(path: &Path, config: &DriftConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(path, yaml)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
