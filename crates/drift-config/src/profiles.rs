//! Saved connection profiles.
//!
//! A profile is a named descriptor of a database environment (host, port,
//! user, schema). Profiles label script headers, reports and history rows;
//! they carry no passwords and drift never connects anywhere with them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::{ConfigError, Result};

/// One named database environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub user: String,

    /// The schema (database) name this profile points at.
    pub schema: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3306
}

/// YAML-backed store of named profiles.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
    profiles: BTreeMap<String, ConnectionProfile>,
}

impl ProfileStore {
    /// Loads the store from a YAML file; a missing file yields an empty
    /// store.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Ok(Self {
                path,
                profiles: BTreeMap::new(),
            });
        }
        let content = std::fs::read_to_string(&path)?;
        let profiles = if content.trim().is_empty() {
            BTreeMap::new()
        } else {
            serde_yaml::from_str(&content)?
        };
        Ok(Self { path, profiles })
    }

    /// Persists the store back to its file.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let yaml = serde_yaml::to_string(&self.profiles)?;
        std::fs::write(&self.path, yaml)?;
        Ok(())
    }

    /// Inserts or replaces a profile.
    pub fn upsert(&mut self, name: impl Into<String>, profile: ConnectionProfile) -> Result<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "profile name".into(),
                reason: "must not be empty".into(),
            });
        }
        self.profiles.insert(name, profile);
        Ok(())
    }

    /// Removes a profile. Returns `true` if it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.profiles.remove(name).is_some()
    }

    /// Looks up a profile by name.
    pub fn get(&self, name: &str) -> Option<&ConnectionProfile> {
        self.profiles.get(name)
    }

    /// All profiles, ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ConnectionProfile)> {
        self.profiles.iter()
    }

    /// Number of stored profiles.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Returns `true` if no profiles are stored.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
