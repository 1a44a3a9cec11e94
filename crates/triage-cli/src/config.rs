//! Optional TOML configuration file.
//!
//! ```toml
//! [store]
//! path = "data.json"
//! categories = ["wildlife", "police", "water", "fire", "medical"]
//! duplicates = "first_write_wins"
//! unknown_categories = "reject"
//!
//! [server]
//! bind = "127.0.0.1:8080"
//!
//! [watch]
//! interval_ms = 5000
//! max_read_failures = 12
//! ```
//!
//! Every key is optional. Command-line flags override the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use triage_ingest::ServerConfig;
use triage_store::{
    CategoryError, CategorySet, DEFAULT_STORE_PATH, DuplicatePolicy, MergePolicy, StoreConfig,
    UnknownCategoryPolicy,
};
use triage_watch::{DEFAULT_MAX_CONSECUTIVE_FAILURES, DEFAULT_POLL_INTERVAL};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {message}")]
    Parse { path: String, message: String },

    #[error(transparent)]
    Category(#[from] CategoryError),

    #[error("invalid --bind address `{value}`: {message}")]
    Bind { value: String, message: String },

    #[error("watch interval must be greater than zero")]
    ZeroInterval,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    pub store: StoreSection,
    pub server: ServerConfig,
    pub watch: WatchSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub path: PathBuf,
    pub categories: CategorySet,
    pub duplicates: DuplicatePolicy,
    pub unknown_categories: UnknownCategoryPolicy,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STORE_PATH),
            categories: CategorySet::default(),
            duplicates: DuplicatePolicy::default(),
            unknown_categories: UnknownCategoryPolicy::default(),
        }
    }
}

impl StoreSection {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            categories: self.categories.clone(),
            policy: MergePolicy {
                duplicates: self.duplicates,
                unknown_categories: self.unknown_categories,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSection {
    pub interval_ms: u64,
    /// `0` retries forever.
    pub max_read_failures: u32,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            max_read_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
        }
    }
}

impl WatchSection {
    pub fn interval(&self) -> Result<Duration, ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(Duration::from_millis(self.interval_ms))
    }

    pub fn failure_ceiling(&self) -> Option<u32> {
        (self.max_read_failures > 0).then_some(self.max_read_failures)
    }
}

impl TriageConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content).map_err(|message| ConfigError::Parse {
            path: path.display().to_string(),
            message,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// The file at `path` when given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn override_store_path(&mut self, path: Option<PathBuf>) {
        if let Some(path) = path {
            self.store.path = path;
        }
    }

    pub fn override_categories(&mut self, names: Vec<String>) -> Result<(), ConfigError> {
        if !names.is_empty() {
            self.store.categories = CategorySet::new(names)?;
        }
        Ok(())
    }

    pub fn override_bind(&mut self, bind: Option<String>) -> Result<(), ConfigError> {
        if let Some(value) = bind {
            self.server.bind = value.parse().map_err(|e: std::net::AddrParseError| {
                ConfigError::Bind {
                    value: value.clone(),
                    message: e.to_string(),
                }
            })?;
        }
        Ok(())
    }
}
