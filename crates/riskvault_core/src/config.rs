//! Core runtime configuration.
//!
//! # Responsibility
//! - Describe store locations, logging and note-graph call bounds.
//! - Load from JSON with per-field defaults and validate before use.
//!
//! # Invariants
//! - A validated config always has a non-zero graph timeout and at least
//!   one store attempt.

use crate::graph::RetryPolicy;
use crate::model::note::RISK_TAG;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_GRAPH_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_INITIAL_BACKOFF_MS: u64 = 100;
const DEFAULT_RETRY_MAX_BACKOFF_MS: u64 = 2_000;

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, message: String },
    Parse(String),
    Invalid(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, message } => {
                write!(f, "failed to read config `{}`: {message}", path.display())
            }
            Self::Parse(message) => write!(f, "invalid config json: {message}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {}

/// Runtime configuration for the core.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// SQLite file for the local store; `None` keeps it in memory.
    pub db_path: Option<PathBuf>,
    /// `trace|debug|info|warn|error`; defaults by build mode.
    pub log_level: Option<String>,
    /// Absolute directory for rolling log files; `None` disables file logging.
    pub log_dir: Option<PathBuf>,
    /// Note-graph query enumerating risk notes.
    pub risk_query: String,
    pub graph_timeout_ms: u64,
    pub retry_max_attempts: u32,
    pub retry_initial_backoff_ms: u64,
    pub retry_max_backoff_ms: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: None,
            log_dir: None,
            risk_query: RISK_TAG.to_string(),
            graph_timeout_ms: DEFAULT_GRAPH_TIMEOUT_MS,
            retry_max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
            retry_initial_backoff_ms: DEFAULT_RETRY_INITIAL_BACKOFF_MS,
            retry_max_backoff_ms: DEFAULT_RETRY_MAX_BACKOFF_MS,
        }
    }
}

impl CoreConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.risk_query.trim().is_empty() {
            return Err(ConfigError::Invalid("risk_query must not be empty"));
        }
        if self.graph_timeout_ms == 0 {
            return Err(ConfigError::Invalid("graph_timeout_ms must be positive"));
        }
        if self.retry_max_attempts == 0 {
            return Err(ConfigError::Invalid("retry_max_attempts must be at least 1"));
        }
        if self.retry_initial_backoff_ms > self.retry_max_backoff_ms {
            return Err(ConfigError::Invalid(
                "retry_initial_backoff_ms must not exceed retry_max_backoff_ms",
            ));
        }
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid("log_dir must be an absolute path"));
            }
        }
        Ok(())
    }

    pub fn graph_timeout(&self) -> Duration {
        Duration::from_millis(self.graph_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_max_attempts,
            initial_backoff: Duration::from_millis(self.retry_initial_backoff_ms),
            max_backoff: Duration::from_millis(self.retry_max_backoff_ms),
        }
    }
}
