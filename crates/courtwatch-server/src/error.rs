//! Server error types.

use std::io;
use std::time::Duration;

use courtwatch_providers::ProviderError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that stop the monitor.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error (signal handler installation, etc.).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Provider error that could not be handled by a retry.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Authentication kept failing.
    #[error("Authentication failed {failures} times in a row, last error: {last_error}")]
    AuthFailuresExceeded { failures: u32, last_error: String },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Shutdown requested.
    #[error("Monitor shutdown requested")]
    Shutdown,
}

impl ServerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an auth-threshold error.
    pub fn auth_failures_exceeded(failures: u32, last_error: impl Into<String>) -> Self {
        Self::AuthFailuresExceeded {
            failures,
            last_error: last_error.into(),
        }
    }
}

/// Errors from a single delivery attempt to one sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The request never reached the destination.
    #[error("delivery failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The destination answered with an error status.
    #[error("rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The local notification daemon refused the message.
    #[error("desktop notification failed: {0}")]
    Desktop(String),

    /// The delivery did not finish in time.
    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),

    /// The sink is misconfigured.
    #[error("sink configuration error: {0}")]
    Config(String),
}
