//! Mindbody provider implementation.

use std::sync::Arc;

use courtwatch_core::{Clock, SystemClock, TimeWindow};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{AvailabilityProvider, BoxFuture};
use crate::raw_slot::RawSlot;
use crate::session::{Credentials, Session};

use super::auth::password_grant;
use super::client::MindbodyClient;
use super::config::MindbodyConfig;

const PROVIDER_NAME: &str = "mindbody";

/// Court availability from a Mindbody site.
pub struct MindbodyProvider {
    client: MindbodyClient,
    clock: Arc<dyn Clock>,
}

impl MindbodyProvider {
    /// Creates a provider after validating the configuration.
    pub fn new(config: MindbodyConfig) -> ProviderResult<Self> {
        config
            .validate()
            .map_err(|e| ProviderError::configuration(e).with_provider(PROVIDER_NAME))?;
        let client = MindbodyClient::new(config).map_err(|e| e.with_provider(PROVIDER_NAME))?;
        Ok(Self {
            client,
            clock: Arc::new(SystemClock),
        })
    }

    /// Sets the clock used to stamp new sessions.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &MindbodyConfig {
        self.client.config()
    }

    async fn login(&self, credentials: &Credentials) -> ProviderResult<Session> {
        match credentials {
            Credentials::AccessToken(token) => {
                if token.trim().is_empty() {
                    return Err(ProviderError::configuration("access token is empty"));
                }
                Ok(Session::new(token.clone(), self.clock.now(), None))
            }
            Credentials::Password { username, password } => {
                let token = password_grant(&self.client, username, password).await?;
                Ok(Session::new(
                    token.access_token,
                    self.clock.now(),
                    token.expires_in,
                ))
            }
        }
    }
}

impl AvailabilityProvider for MindbodyProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn authenticate<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, ProviderResult<Session>> {
        Box::pin(async move {
            self.login(credentials)
                .await
                .map_err(|e| e.with_provider(PROVIDER_NAME))
        })
    }

    fn list_schedule<'a>(
        &'a self,
        session: &'a Session,
        window: TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<RawSlot>>> {
        Box::pin(async move {
            self.client
                .list_availability(session.token(), window)
                .await
                .map_err(|e| e.with_provider(PROVIDER_NAME))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use chrono::{TimeZone, Utc};
    use courtwatch_core::FixedClock;

    #[test]
    fn rejects_invalid_config() {
        let config = MindbodyConfig::default().with_availability_url("::nope::");
        let err = MindbodyProvider::new(config).err().unwrap();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
        assert_eq!(err.provider(), Some("mindbody"));
    }

    #[tokio::test]
    async fn access_token_becomes_session_without_expiry() {
        let now = Utc.with_ymd_and_hms(2025, 5, 10, 12, 0, 0).unwrap();
        let provider = MindbodyProvider::new(MindbodyConfig::default())
            .unwrap()
            .with_clock(Arc::new(FixedClock::new(now)));

        let session = provider
            .authenticate(&Credentials::access_token("abc"))
            .await
            .unwrap();

        assert_eq!(session.token(), "abc");
        assert_eq!(session.obtained_at(), now);
        assert!(session.expires_at().is_none());
    }

    #[tokio::test]
    async fn empty_access_token_is_rejected() {
        let provider = MindbodyProvider::new(MindbodyConfig::default()).unwrap();

        let err = provider
            .authenticate(&Credentials::access_token(" "))
            .await
            .unwrap_err();

        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
    }
}
