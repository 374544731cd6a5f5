//! Orchestrator settings
//!
//! Loaded from TOML or YAML; every field has a default so an empty document
//! yields an in-memory, synchronous orchestrator.
//!
//! ```toml
//! log_format = "json"
//!
//! [repository]
//! type = "filesystem"
//! storage_folder = ".data"
//!
//! [job]
//! mode = "standalone"
//! workers = 4
//! ```

use crate::observability::LogFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Settings loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Settings file unreadable
    #[error("cannot read settings {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Invalid TOML
    #[error("invalid TOML settings: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid YAML
    #[error("invalid YAML settings: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Extension is neither TOML nor YAML
    #[error("unsupported settings format: {path}")]
    UnsupportedFormat {
        /// File path
        path: PathBuf,
    },
}

/// Where entities are stored
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RepositorySettings {
    /// Process memory, lost on exit
    #[default]
    InMemory,
    /// One JSON document per entity under `storage_folder`
    Filesystem {
        /// Root folder
        storage_folder: PathBuf,
    },
}

/// How jobs are executed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum JobMode {
    /// Inline in the submitting thread
    #[default]
    Synchronous,
    /// On a worker pool; submission returns immediately
    Standalone {
        /// Worker thread count
        #[serde(default = "default_workers")]
        workers: usize,
    },
}

fn default_workers() -> usize {
    2
}

/// Orchestrator settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Entity storage
    pub repository: RepositorySettings,
    /// Job execution
    pub job: JobMode,
    /// Format used by [`crate::observability::init_logging`]
    pub log_format: LogFormat,
}

impl OrchestratorConfig {
    /// Defaults: in-memory, synchronous, pretty logs
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With repository
    #[inline]
    #[must_use]
    pub fn with_repository(mut self, repository: RepositorySettings) -> Self {
        self.repository = repository;
        self
    }

    /// With job mode
    #[inline]
    #[must_use]
    pub fn with_job_mode(mut self, job: JobMode) -> Self {
        self.job = job;
        self
    }

    /// With log format
    #[inline]
    #[must_use]
    pub fn with_log_format(mut self, log_format: LogFormat) -> Self {
        self.log_format = log_format;
        self
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// Returns error if the text is not valid settings
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Parse YAML text
    ///
    /// # Errors
    /// Returns error if the text is not valid settings
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Load a `.toml`, `.yaml` or `.yml` file
    ///
    /// # Errors
    /// Returns error if the file is unreadable, has another extension, or
    /// does not parse
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let parse: fn(&str) -> Result<Self, ConfigError> = match extension.as_deref() {
            Some("toml") => Self::from_toml_str,
            Some("yaml" | "yml") => Self::from_yaml_str,
            _ => {
                return Err(ConfigError::UnsupportedFormat {
                    path: path.to_path_buf(),
                })
            }
        };

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        parse(&text)
    }
}
