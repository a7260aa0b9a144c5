//! Session handling.
//!
//! [`SessionProvider`] owns the one authenticated session of the process.
//! Its lifecycle is explicit: [`SessionProvider::new`] starts without a
//! session, [`SessionProvider::ensure_session`] authenticates lazily and
//! reuses the cached session while it is valid, [`SessionProvider::refresh`]
//! forces a new login and [`SessionProvider::invalidate`] drops the cache.
//!
//! Mutation goes through `&mut self`. The poll loop runs one cycle at a time
//! and is the only owner, so the cached session needs no lock.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use courtwatch_core::Clock;
use tracing::{debug, info, warn};

use crate::error::ProviderResult;
use crate::provider::AvailabilityProvider;

/// Seconds shaved off a reported token lifetime so it is renewed early.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Credentials used to open a session.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Account login.
    Password {
        /// Account user name or email.
        username: String,
        /// Account password.
        password: String,
    },
    /// A bearer token obtained out of band (e.g. from a browser session).
    AccessToken(String),
}

impl Credentials {
    /// Creates username/password credentials.
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Password {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Creates pre-obtained token credentials.
    pub fn access_token(token: impl Into<String>) -> Self {
        Self::AccessToken(token.into())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::AccessToken(_) => f.debug_tuple("AccessToken").field(&"<redacted>").finish(),
        }
    }
}

/// An authenticated session.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    obtained_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Creates a session from a token and the lifetime reported by the provider.
    ///
    /// The expiry estimate is moved 60 seconds earlier so the session is
    /// renewed before the provider starts rejecting it. Without a reported
    /// lifetime the session stays valid until the provider says otherwise.
    /// A lifetime too large to represent is treated the same way.
    pub fn new(
        token: impl Into<String>,
        obtained_at: DateTime<Utc>,
        expires_in_secs: Option<i64>,
    ) -> Self {
        let expires_at = expires_in_secs.and_then(|secs| {
            let lifetime = Duration::try_seconds(secs)?;
            obtained_at
                .checked_add_signed(lifetime)?
                .checked_sub_signed(Duration::seconds(EXPIRY_MARGIN_SECS))
        });
        Self {
            token: token.into(),
            obtained_at,
            expires_at,
        }
    }

    /// Returns the bearer token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// When the session was obtained.
    pub fn obtained_at(&self) -> DateTime<Utc> {
        self.obtained_at
    }

    /// Estimated expiry, if the provider reported a lifetime.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Returns true if the session is still usable at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now < expires_at,
            None => true,
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("obtained_at", &self.obtained_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Owns and renews the process-wide session.
pub struct SessionProvider {
    provider: Arc<dyn AvailabilityProvider>,
    credentials: Credentials,
    clock: Arc<dyn Clock>,
    session: Option<Session>,
}

impl SessionProvider {
    /// Creates a session provider with no session yet.
    pub fn new(
        provider: Arc<dyn AvailabilityProvider>,
        credentials: Credentials,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            provider,
            credentials,
            clock,
            session: None,
        }
    }

    /// Returns the cached session if valid, authenticating otherwise.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationFailed` when the credentials are rejected, or
    /// a transport error if the provider could not be reached.
    pub async fn ensure_session(&mut self) -> ProviderResult<Session> {
        let now = self.clock.now();
        if let Some(ref session) = self.session {
            if session.is_valid_at(now) {
                return Ok(session.clone());
            }
            debug!(expires_at = ?session.expires_at(), "cached session expired");
        }
        self.refresh().await
    }

    /// Forces a new login, replacing any cached session.
    pub async fn refresh(&mut self) -> ProviderResult<Session> {
        self.session = None;
        match self.provider.authenticate(&self.credentials).await {
            Ok(session) => {
                info!(
                    provider = self.provider.name(),
                    expires_at = ?session.expires_at(),
                    "authenticated"
                );
                self.session = Some(session.clone());
                Ok(session)
            }
            Err(e) => {
                warn!(provider = self.provider.name(), error = %e, "authentication failed");
                Err(e)
            }
        }
    }

    /// Drops the cached session so the next call re-authenticates.
    pub fn invalidate(&mut self) {
        if self.session.take().is_some() {
            debug!("session invalidated");
        }
    }

    /// Returns the cached session, valid or not.
    pub fn current(&self) -> Option<&Session> {
        self.session.as_ref()
    }
}
