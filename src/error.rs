//! Error types
//!
//! `RelayError` covers everything that can stop the process from starting.
//! `ForwardError` is the single request-level failure: the upstream call
//! could not be completed. It never escapes the router; it becomes a 500.

use thiserror::Error;

/// Start-up failures
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid listen address '{addr}': {source}")]
    InvalidAddress {
        addr: String,
        source: std::net::AddrParseError,
    },

    #[error("server.workers must be at least 1")]
    InvalidWorkers,

    #[error("invalid upstream origin '{origin}': {reason}")]
    InvalidOrigin { origin: String, reason: String },

    #[error("failed to build upstream client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("logger initialisation failed: {0}")]
    Logger(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Upstream transport failure
///
/// The `Display` text is what the caller sees in the `{"error": ...}` body.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}
