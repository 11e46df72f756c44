//! Error types for rediscopy
//!
//! Two layers of errors exist. [`StoreError`] describes the failure of a single
//! call against a store and is handled per key by the transfer unit.
//! [`CopyError`] describes failures that abort the whole run before any key
//! has been transferred.

use thiserror::Error;

/// Error returned by a single store operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The key does not exist (never created, deleted, or expired)
    #[error("key not found")]
    NotFound,

    /// Network level failure: refused, dropped, or timed out connection
    #[error("connection error: {0}")]
    Connection(String),

    /// The server answered with an error reply
    #[error("command error: {0}")]
    Command(String),

    /// The server answered with a reply of an unexpected shape
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl StoreError {
    /// Whether this error means the key is absent rather than unreachable.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_dropped()
            || err.is_connection_refusal()
            || err.is_timeout()
        {
            return StoreError::Connection(err.to_string());
        }
        match err.kind() {
            redis::ErrorKind::TypeError => StoreError::Protocol(err.to_string()),
            _ => StoreError::Command(err.to_string()),
        }
    }
}

/// Configuration loading or validation error
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that was read
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`crate::config::CopyConfig`]
    #[error("failed to parse config: {0}")]
    Parse(String),

    /// A value is out of range or missing
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Run-level error. Every variant aborts the copy before any transfer starts.
#[derive(Error, Debug)]
pub enum CopyError {
    /// Could not connect to one of the endpoints
    #[error("failed to connect to {endpoint}: {source}")]
    Connection {
        /// `host:port` of the endpoint
        endpoint: String,
        /// Underlying store error
        #[source]
        source: StoreError,
    },

    /// Clearing the destination failed; nothing was copied
    #[error("failed to clear destination: {0}")]
    DestinationClear(#[source] StoreError),

    /// Listing the source keys failed; nothing was copied
    #[error("failed to enumerate source keys: {0}")]
    Enumeration(#[source] StoreError),

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result alias for run-level operations
pub type Result<T> = std::result::Result<T, CopyError>;
