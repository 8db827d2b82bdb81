//! Configuration management for drift.
//!
//! [`DriftConfig`] holds the `drift.yaml` settings (output files, safety
//! analysis, history); [`ProfileStore`] keeps named connection profiles next
//! to it.

pub mod config;
pub mod profiles;

pub use config::{
    ConfigError, DriftConfig, HistorySettings, OutputSettings, Result, SafetySettings,
    load_config, save_config,
};
pub use profiles::{ConnectionProfile, ProfileStore};
