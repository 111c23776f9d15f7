//! Error types for the synchronizer
//!
//! [`Error`] is the crate-wide error. Its `Config` variant is the fatal
//! configuration error raised at startup; everything that goes wrong during a
//! tick is folded into a [`SyncFailure`] and logged instead of propagated.

use thiserror::Error;

/// Result type alias for synchronizer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed configuration (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure to resolve the value the record should point at
    #[error("Value source error: {0}")]
    ValueSource(String),

    /// I/O errors, including failing to spawn the update tool
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Network-level failures (unreachable host, timeouts)
    #[error("Network error: {0}")]
    Network(String),

    /// Authentication errors reported by the provider
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The provider rejected the request
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a value source error
    pub fn value_source(msg: impl Into<String>) -> Self {
        Self::ValueSource(msg.into())
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether this error should abort startup
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

/// Non-fatal failure of a single synchronization attempt
///
/// Authentication failures, unreachable providers, rejected records and
/// unresolvable values all collapse into this one kind. Only the message
/// survives; it is what ends up in the log.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SyncFailure {
    /// Human-readable description of what went wrong
    pub message: String,
}

impl SyncFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<Error> for SyncFailure {
    fn from(err: Error) -> Self {
        Self::new(err.to_string())
    }
}
