//! Process configuration for the user store.
//!
//! # Responsibility
//! - Collect database and logging settings in one value built at startup.
//! - Read overrides from `TXREPO_*` environment variables.
//!
//! # Invariants
//! - Missing `db_path` selects an in-memory database.
//! - Malformed values are reported, never silently replaced by defaults.

use crate::db::DEFAULT_BUSY_TIMEOUT;
use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "TXREPO_DB_PATH";
pub const ENV_BUSY_TIMEOUT_MS: &str = "TXREPO_BUSY_TIMEOUT_MS";
pub const ENV_LOG_LEVEL: &str = "TXREPO_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "TXREPO_LOG_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// SQLite database file. `None` means in-memory.
    pub db_path: Option<PathBuf>,
    /// How long a connection waits on a locked database.
    pub busy_timeout: Duration,
    pub log_level: String,
    /// Rolling log directory. `None` logs to stderr.
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidNumber { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidNumber { key, value } => {
                write!(f, "`{key}` must be a non-negative integer, got `{value}`")
            }
        }
    }
}

impl Error for ConfigError {}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl StoreConfig {
    /// Builds a config from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(path) = read(ENV_DB_PATH) {
            config.db_path = Some(PathBuf::from(path));
        }
        if let Some(raw) = read(ENV_BUSY_TIMEOUT_MS) {
            let millis = raw
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidNumber {
                    key: ENV_BUSY_TIMEOUT_MS,
                    value: raw.clone(),
                })?;
            config.busy_timeout = Duration::from_millis(millis);
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        if let Some(dir) = read(ENV_LOG_DIR) {
            config.log_dir = Some(PathBuf::from(dir));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, StoreConfig, ENV_BUSY_TIMEOUT_MS, ENV_DB_PATH, ENV_LOG_DIR};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| values.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = StoreConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, StoreConfig::default());
        assert!(config.db_path.is_none());
    }

    #[test]
    fn values_are_read_and_blank_ones_ignored() {
        let config = StoreConfig::from_lookup(lookup_from(&[
            (ENV_DB_PATH, " /var/lib/txrepo/users.db "),
            (ENV_BUSY_TIMEOUT_MS, "250"),
            (ENV_LOG_DIR, "   "),
        ]))
        .unwrap();
        assert_eq!(
            config.db_path,
            Some(PathBuf::from("/var/lib/txrepo/users.db"))
        );
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn malformed_timeout_is_rejected() {
        let err = StoreConfig::from_lookup(lookup_from(&[(ENV_BUSY_TIMEOUT_MS, "soon")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                key: ENV_BUSY_TIMEOUT_MS,
                value: "soon".to_string(),
            }
        );
    }
}
