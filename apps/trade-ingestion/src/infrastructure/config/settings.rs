//! Configuration Settings
//!
//! Configuration types for the loader and the metrics API, read from
//! environment variables once at startup and passed into constructors.

use std::path::PathBuf;
use std::time::Duration;

use crate::application::pipeline::{DEFAULT_BATCH_SIZE, PipelineSettings, ShutdownPolicy};
use crate::domain::trade::ColumnLayout;
use crate::infrastructure::files::{DEFAULT_DELIMITER, DEFAULT_EXTENSION};

/// Default SQLite database.
const DEFAULT_DB_DSN: &str = "trades.db";

/// Default input directory.
const DEFAULT_DATA_DIR: &str = "b3Data";

/// Default idle flush window in seconds.
const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 5;

/// Trade store settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    /// SQLite path or `sqlite:` URL.
    pub dsn: String,
    /// Reader pool size.
    pub max_connections: u32,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            dsn: DEFAULT_DB_DSN.to_string(),
            max_connections: 8,
        }
    }
}

impl StoreSettings {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let dsn = match lookup("DB_DSN") {
            Some(v) if v.trim().is_empty() => {
                return Err(ConfigError::EmptyValue("DB_DSN".to_string()));
            }
            Some(v) => v,
            None => DEFAULT_DB_DSN.to_string(),
        };

        Ok(Self {
            dsn,
            max_connections: parse_nonzero(
                lookup,
                "DB_MAX_CONNECTIONS",
                Self::default().max_connections,
            ),
        })
    }
}

/// Loader binary configuration.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Directory scanned for dumps.
    pub data_dir: PathBuf,
    /// Recognized file extension, without the dot.
    pub file_extension: String,
    /// Field delimiter.
    pub delimiter: u8,
    /// Trade store settings.
    pub store: StoreSettings,
    /// Pipeline tuning.
    pub pipeline: PipelineSettings,
}

impl LoaderConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty `DB_DSN`, a multi-byte
    /// `FIELD_DELIMITER`, or an unknown `PERSISTENCE_SHUTDOWN_POLICY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = PipelineSettings::default();

        // WORKER_COUNT is the shared fallback for both pools.
        let workers = parse_nonzero(&lookup, "WORKER_COUNT", defaults.parser_workers);

        let shutdown_policy = match lookup("PERSISTENCE_SHUTDOWN_POLICY") {
            Some(v) => v.parse::<ShutdownPolicy>().map_err(|reason| ConfigError::InvalidValue {
                key: "PERSISTENCE_SHUTDOWN_POLICY".to_string(),
                value: v.clone(),
                reason,
            })?,
            None => ShutdownPolicy::default(),
        };

        let flush_secs = parse_u64(&lookup, "FLUSH_INTERVAL_SECS", DEFAULT_FLUSH_INTERVAL_SECS);
        let idle_flush = (flush_secs > 0).then(|| Duration::from_secs(flush_secs));

        let pipeline = PipelineSettings {
            parser_workers: parse_nonzero(&lookup, "PARSER_WORKER_COUNT", workers),
            persistence_workers: parse_nonzero(&lookup, "DB_WORKER_COUNT", workers),
            batch_size: parse_nonzero(&lookup, "BATCH_SIZE", DEFAULT_BATCH_SIZE),
            idle_flush,
            shutdown_policy,
            layout: ColumnLayout::default(),
        };

        let delimiter = match lookup("FIELD_DELIMITER") {
            Some(v) => match v.as_bytes() {
                [byte] => *byte,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "FIELD_DELIMITER".to_string(),
                        value: v.clone(),
                        reason: "must be a single byte".to_string(),
                    });
                }
            },
            None => DEFAULT_DELIMITER,
        };

        Ok(Self {
            data_dir: lookup("DATA_DIR")
                .filter(|v| !v.trim().is_empty())
                .map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from),
            file_extension: lookup("FILE_EXTENSION")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_EXTENSION.to_string()),
            delimiter,
            store: StoreSettings::from_lookup(&lookup)?,
            pipeline,
        })
    }
}

/// Metrics API binary configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// HTTP port.
    pub port: u16,
    /// Trade store settings.
    pub store: StoreSettings,
}

impl ApiConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty `DB_DSN`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            port: lookup("API_PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(8080),
            store: StoreSettings::from_lookup(&lookup)?,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable has a value that cannot be used.
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Offending value.
        value: String,
        /// What is wrong with it.
        reason: String,
    },
}

fn parse_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> u64 {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Parse a positive count; zero and garbage fall back to `default`.
fn parse_nonzero<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + PartialOrd + Default,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .filter(|v| *v > T::default())
        .unwrap_or(default)
}
