//! Configuration for a copy run
//!
//! Values come from an optional TOML file and are then overridden by command
//! line flags. Every section has defaults so a file may set only what it needs:
//!
//! ```toml
//! concurrency = 100
//! status_interval = 5000
//!
//! [source]
//! addr = "10.0.0.1:6379"
//! db = 2
//!
//! [destination]
//! addr = "10.0.0.2:6379"
//! password = "s3cret"
//!
//! [logging]
//! level = "debug"
//! format = "json"
//! ```

use std::num::NonZeroUsize;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::replication::{ReplicationOptions, TransferOptions};

/// Default number of concurrent transfer workers
pub const DEFAULT_CONCURRENCY: usize = 50;
/// Default number of published keys between progress lines
pub const DEFAULT_STATUS_INTERVAL: u64 = 1000;
/// Default `SCAN COUNT` hint
pub const DEFAULT_SCAN_BATCH: usize = 1000;
/// Pattern matching the whole keyspace
pub const MATCH_ALL: &str = "*";

/// Connection settings for one server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// `host:port` of the server (empty when not configured)
    pub addr: String,
    /// Password for `AUTH`
    pub password: Option<String>,
    /// Logical database index
    pub db: i64,
}

impl EndpointConfig {
    /// Whether an address has been provided
    pub fn is_configured(&self) -> bool {
        !self.addr.trim().is_empty()
    }

    fn validate(&self, role: &str) -> Result<(), ConfigError> {
        let (host, port) = self.addr.rsplit_once(':').ok_or_else(|| {
            ConfigError::Invalid(format!(
                "{} address '{}' must be in host:port form",
                role, self.addr
            ))
        })?;
        if host.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "{} address '{}' has no host",
                role, self.addr
            )));
        }
        port.parse::<u16>().map_err(|_| {
            ConfigError::Invalid(format!("{} address '{}' has an invalid port", role, self.addr))
        })?;
        if self.db < 0 {
            return Err(ConfigError::Invalid(format!(
                "{} database index cannot be negative",
                role
            )));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (pretty, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format
    #[default]
    Pretty,

    /// JSON format
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::Invalid(format!(
                "unknown log format '{}', expected pretty or json",
                other
            ))),
        }
    }
}

/// Full configuration of a copy run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyConfig {
    /// Server keys are read from
    pub source: EndpointConfig,
    /// Server that is flushed and then filled
    pub destination: EndpointConfig,
    /// Number of concurrent transfer workers
    pub concurrency: usize,
    /// Published keys between progress lines, 0 disables them
    pub status_interval: u64,
    /// Glob selecting the source keys
    pub pattern: String,
    /// `SCAN COUNT` hint used while enumerating
    pub scan_batch: usize,
    /// Fail a key whose TTL cannot be read instead of copying it without expiry
    pub strict_ttl: bool,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            source: EndpointConfig::default(),
            destination: EndpointConfig::default(),
            concurrency: DEFAULT_CONCURRENCY,
            status_interval: DEFAULT_STATUS_INTERVAL,
            pattern: MATCH_ALL.to_string(),
            scan_batch: DEFAULT_SCAN_BATCH,
            strict_ttl: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl CopyConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::parse_str(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn parse_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate the configuration. Both endpoints must be configured.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.source.validate("source")?;
        self.destination.validate("destination")?;

        if self.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.scan_batch == 0 {
            return Err(ConfigError::Invalid(
                "scan batch must be at least 1".to_string(),
            ));
        }
        if self.pattern.is_empty() {
            return Err(ConfigError::Invalid("key pattern cannot be empty".to_string()));
        }

        Ok(())
    }

    /// Engine options derived from this configuration
    pub fn replication_options(&self) -> Result<ReplicationOptions, ConfigError> {
        let concurrency = NonZeroUsize::new(self.concurrency).ok_or_else(|| {
            ConfigError::Invalid("concurrency must be at least 1".to_string())
        })?;

        Ok(ReplicationOptions {
            concurrency,
            status_interval: self.status_interval,
            pattern: self.pattern.clone(),
            scan_batch: self.scan_batch,
            transfer: TransferOptions {
                strict_ttl: self.strict_ttl,
            },
        })
    }
}
