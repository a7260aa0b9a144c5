//! Client error types.

use std::fmt;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that end the process.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// Provider setup error.
    Provider(String),
    /// Notification sink setup error.
    Sink(String),
    /// The monitor stopped with an error.
    Monitor(String),
    /// Logging could not be initialized.
    Logging(String),
    /// IO error.
    Io(std::io::Error),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Provider(msg) => write!(f, "provider error: {}", msg),
            Self::Sink(msg) => write!(f, "notification sink error: {}", msg),
            Self::Monitor(msg) => write!(f, "monitor error: {}", msg),
            Self::Logging(msg) => write!(f, "logging error: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<courtwatch_providers::ProviderError> for ClientError {
    fn from(err: courtwatch_providers::ProviderError) -> Self {
        Self::Provider(err.to_string())
    }
}

impl From<courtwatch_server::SinkError> for ClientError {
    fn from(err: courtwatch_server::SinkError) -> Self {
        Self::Sink(err.to_string())
    }
}

impl From<courtwatch_server::ServerError> for ClientError {
    fn from(err: courtwatch_server::ServerError) -> Self {
        match err {
            courtwatch_server::ServerError::Io(e) => Self::Io(e),
            other => Self::Monitor(other.to_string()),
        }
    }
}

impl From<courtwatch_core::TracingError> for ClientError {
    fn from(err: courtwatch_core::TracingError) -> Self {
        Self::Logging(err.to_string())
    }
}
