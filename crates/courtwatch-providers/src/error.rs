//! Error types for availability provider operations.
//!
//! Every failure talking to the scheduling service is a [`ProviderError`]
//! carrying a [`ProviderErrorCode`]. The code decides how the poll loop
//! reacts: see [`ErrorCategory`].

use std::fmt;
use thiserror::Error;

/// How the poll loop treats an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Credentials or configuration are wrong. Repeated occurrences are fatal.
    Auth,
    /// Transient network or server trouble. Retried with backoff.
    Transport,
    /// The response could not be understood. The cycle is skipped.
    Parse,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Transport => "transport",
            Self::Parse => "parse",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What went wrong, as far as the caller needs to know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// Login rejected.
    AuthenticationFailed,
    /// Token no longer accepted; a fresh login may fix it.
    SessionExpired,
    /// Connection, TLS, DNS or timeout failure.
    NetworkError,
    /// HTTP 429.
    RateLimited,
    /// HTTP 5xx or another unexpected status.
    ServerError,
    /// Body did not have the expected shape.
    InvalidResponse,
    /// Missing or unusable settings.
    ConfigurationError,
    /// Local failure unrelated to the remote side.
    InternalError,
}

impl ProviderErrorCode {
    /// Classifies the code for the poll loop.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::AuthenticationFailed | Self::SessionExpired | Self::ConfigurationError => {
                ErrorCategory::Auth
            }
            Self::NetworkError | Self::RateLimited | Self::ServerError => {
                ErrorCategory::Transport
            }
            Self::InvalidResponse | Self::InternalError => ErrorCategory::Parse,
        }
    }

    /// True for transport failures, which may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Transport
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::SessionExpired => "session_expired",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::ConfigurationError => "configuration_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed provider call.
///
/// Displays as `[provider] code: message`.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    provider: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            source: None,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationFailed, message)
    }

    pub fn session_expired(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::SessionExpired, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::RateLimited, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ServerError, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InternalError, message)
    }

    /// Tags the error with the provider that raised it.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Attaches the underlying error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// True when renewing the session and repeating the request may succeed.
    pub fn is_session_expired(&self) -> bool {
        self.code == ProviderErrorCode::SessionExpired
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref provider) = self.provider {
            write!(f, "[{}] ", provider)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Result of a provider call.
pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_codes_are_retryable() {
        assert!(ProviderErrorCode::NetworkError.is_retryable());
        assert!(ProviderErrorCode::RateLimited.is_retryable());
        assert!(ProviderErrorCode::ServerError.is_retryable());
        assert!(!ProviderErrorCode::AuthenticationFailed.is_retryable());
        assert!(!ProviderErrorCode::SessionExpired.is_retryable());
        assert!(!ProviderErrorCode::InvalidResponse.is_retryable());
    }

    #[test]
    fn codes_map_to_poll_categories() {
        use ErrorCategory::*;
        use ProviderErrorCode::*;

        let cases = [
            (AuthenticationFailed, Auth),
            (SessionExpired, Auth),
            (ConfigurationError, Auth),
            (NetworkError, Transport),
            (RateLimited, Transport),
            (ServerError, Transport),
            (InvalidResponse, Parse),
            (InternalError, Parse),
        ];
        for (code, category) in cases {
            assert_eq!(code.category(), category, "{code}");
        }
    }

    #[test]
    fn tagged_error_keeps_code() {
        let err = ProviderError::network("connection timeout").with_provider("mindbody");
        assert_eq!(err.code(), ProviderErrorCode::NetworkError);
        assert_eq!(err.provider(), Some("mindbody"));
        assert!(err.is_retryable());
        assert!(!err.is_session_expired());
    }

    #[test]
    fn display_includes_provider_and_code() {
        let err = ProviderError::session_expired("token rejected").with_provider("mindbody");
        assert_eq!(err.to_string(), "[mindbody] session_expired: token rejected");
        assert!(err.is_session_expired());
        assert_eq!(err.category(), ErrorCategory::Auth);
    }

    #[test]
    fn source_is_exposed() {
        use std::error::Error;
        let io_err = std::io::Error::other("connection reset");
        let err = ProviderError::network("fetch failed").with_source(io_err);
        assert!(err.source().is_some());
    }
}
