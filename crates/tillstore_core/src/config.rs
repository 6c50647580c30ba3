//! Runtime configuration for the store and core logging.
//!
//! # Responsibility
//! - Describe where the store lives and how the connection is tuned.
//! - Describe how core logging is initialized.
//! - Load both from a JSON document.
//!
//! # Invariants
//! - Every field has a default, so `{}` is a valid in-memory configuration.

use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Backing database location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StoreLocation {
    /// Private in-process database, dropped with the connection.
    #[default]
    Memory,
    /// SQLite database file, created when missing.
    File { path: PathBuf },
}

impl StoreLocation {
    /// Short label used in log events.
    pub fn mode_label(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File { .. } => "file",
        }
    }
}

/// Connection settings for a `Store`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub location: StoreLocation,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self {
            location: StoreLocation::Memory,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: StoreLocation::File { path: path.into() },
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// File logging settings consumed by `init_logging`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// One of `trace|debug|info|warn|error`, case-insensitive.
    #[serde(default = "default_level_string")]
    pub level: String,
    /// Absolute directory for rolling log files.
    pub log_dir: PathBuf,
}

impl LogConfig {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            level: default_level_string(),
            log_dir: log_dir.into(),
        }
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    /// Logging stays disabled when absent.
    #[serde(default)]
    pub logging: Option<LogConfig>,
}

impl AppConfig {
    /// Parses a JSON configuration document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(ConfigError::Parse)
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config document: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
        }
    }
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

fn default_level_string() -> String {
    default_log_level().to_string()
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, StoreLocation};
    use std::path::PathBuf;

    #[test]
    fn empty_document_defaults_to_memory_without_logging() {
        let config = AppConfig::from_json_str("{}").unwrap();
        assert_eq!(config.store.location, StoreLocation::Memory);
        assert_eq!(config.store.busy_timeout_ms, 5_000);
        assert!(config.logging.is_none());
    }

    #[test]
    fn file_location_and_logging_are_parsed() {
        let config = AppConfig::from_json_str(
            r#"{
                "store": { "location": { "mode": "file", "path": "/tmp/till.db" }, "busy_timeout_ms": 250 },
                "logging": { "level": "warn", "log_dir": "/tmp/till-logs" }
            }"#,
        )
        .unwrap();

        assert_eq!(
            config.store.location,
            StoreLocation::File {
                path: PathBuf::from("/tmp/till.db")
            }
        );
        assert_eq!(config.store.busy_timeout_ms, 250);
        let logging = config.logging.unwrap();
        assert_eq!(logging.level, "warn");
        assert_eq!(logging.log_dir, PathBuf::from("/tmp/till-logs"));
    }

    #[test]
    fn unknown_location_mode_is_rejected() {
        let err = AppConfig::from_json_str(r#"{"store": {"location": {"mode": "tcp"}}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
