//! Runtime context for command execution.
//!
//! The [`RuntimeContext`] holds everything a command handler needs: the
//! loaded configuration, resolved file paths, and the global output flags.

use std::path::PathBuf;

use anyhow::Context as _;
use drift_config::DriftConfig;

use crate::cli::GlobalArgs;

/// Runtime context passed to every command handler.
///
/// Constructed once in `main` after CLI parsing, before command dispatch.
#[derive(Debug)]
pub struct RuntimeContext {
    /// Path the configuration was (or would be) loaded from.
    pub config_path: PathBuf,

    /// The loaded configuration.
    pub config: DriftConfig,

    /// Whether to produce JSON output.
    pub json: bool,

    /// Verbose output.
    pub verbose: bool,

    /// Quiet mode: suppress non-essential output.
    pub quiet: bool,
}

impl RuntimeContext {
    /// Builds a `RuntimeContext` from parsed global arguments.
    ///
    /// The config path resolves as: `--config` flag > `DRIFT_CONFIG_FILE`
    /// env (handled by clap) > `./drift.yaml`.
    pub fn from_global_args(global: &GlobalArgs) -> anyhow::Result<Self> {
        let config_path = global
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from("drift.yaml"));

        let config = drift_config::load_config(&config_path)
            .with_context(|| format!("loading configuration from {}", config_path.display()))?;

        Ok(Self {
            config_path,
            config,
            json: global.json,
            verbose: global.verbose,
            quiet: global.quiet,
        })
    }

    /// Path of the saved-profiles file, kept next to the configuration.
    pub fn profiles_path(&self) -> PathBuf {
        match self.config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.join("drift_profiles.yaml"),
            _ => PathBuf::from("drift_profiles.yaml"),
        }
    }

    /// Path of the history database from the configuration.
    pub fn history_path(&self) -> PathBuf {
        PathBuf::from(&self.config.history.path)
    }
}
