//! Error types for hn-fetch
//!
//! This module provides the error taxonomy for the fetch pipeline:
//! - Transport failures (network, timeouts, HTTP status) which may be retried
//! - Validation failures for malformed API payloads, which are never retried
//! - Persistence failures from the SQLite store
//! - Configuration and contract violations raised before any work starts

use thiserror::Error;

/// Result type alias for hn-fetch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for hn-fetch
///
/// Each variant carries enough context to log a useful message. Whether an
/// error is worth another attempt is decided by [`crate::retry::IsRetryable`].
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "MAX_STORIES")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Transport-level failure (connect, DNS, timeout, body read)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The source answered with a non-success HTTP status
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// Response status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// Payload did not match the expected shape
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A caller broke an argument contract (e.g. non-positive item id)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The run was cancelled from outside
    #[error("operation cancelled")]
    Cancelled,

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Record not found
    #[error("record not found: {0}")]
    NotFound(String),

    /// Constraint violation (e.g., duplicate key, completed run)
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Schema validation errors for API payloads
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field was absent or null
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// A field was present but its value is not acceptable
    #[error("invalid value for `{field}`: {reason}")]
    InvalidField {
        /// Field name as it appears in the payload
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// The payload is not valid JSON or has the wrong overall shape
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// An entry of an id list is not a positive integer
    #[error("invalid id list entry at index {index}: {reason}")]
    InvalidIdList {
        /// Position of the offending entry
        index: usize,
        /// Why the entry was rejected
        reason: String,
    },
}

impl Error {
    /// Create a configuration error tied to a specific key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Machine-readable error code, used as a structured log field
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Database(_) | Error::Sqlx(_) => "database_error",
            Error::Network(_) => "network_error",
            Error::HttpStatus { .. } => "http_status",
            Error::Validation(_) => "validation_error",
            Error::Serialization(_) => "serialization_error",
            Error::Io(_) => "io_error",
            Error::InvalidArgument(_) => "invalid_argument",
            Error::Cancelled => "cancelled",
            Error::Other(_) => "internal_error",
        }
    }
}
