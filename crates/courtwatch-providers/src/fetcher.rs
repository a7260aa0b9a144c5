//! Availability fetching.
//!
//! [`AvailabilityFetcher`] pulls the raw schedule for a window and
//! normalizes it into a [`SlotSet`]. An expired session is renewed once and
//! the request retried; every other failure goes back to the caller, which
//! owns the backoff policy.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use courtwatch_core::{SlotSet, TimeWindow};
use tracing::{debug, warn};

use crate::error::ProviderResult;
use crate::normalize::{NormalizeOptions, normalize_slots};
use crate::provider::AvailabilityProvider;
use crate::session::SessionProvider;

/// Default lookahead, in days.
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// Retrieves the current set of bookable slots.
pub struct AvailabilityFetcher {
    provider: Arc<dyn AvailabilityProvider>,
    options: NormalizeOptions,
    window_days: u32,
}

impl AvailabilityFetcher {
    /// Creates a fetcher with the default 7-day window.
    pub fn new(provider: Arc<dyn AvailabilityProvider>, options: NormalizeOptions) -> Self {
        Self {
            provider,
            options,
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }

    /// Builder method to set the lookahead in days.
    pub fn with_window_days(mut self, days: u32) -> Self {
        self.window_days = days;
        self
    }

    /// Returns the configured lookahead in days.
    pub fn window_days(&self) -> u32 {
        self.window_days
    }

    /// Returns the provider name.
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Returns the window to poll at `now`.
    pub fn window_at(&self, now: DateTime<Utc>) -> TimeWindow {
        TimeWindow::lookahead(now, self.window_days)
    }

    /// Fetches and normalizes the slots starting inside `window`.
    ///
    /// # Errors
    ///
    /// - `SessionExpired` if the provider rejects the renewed session too
    /// - `AuthenticationFailed` if renewing the session fails
    /// - transport codes (`NetworkError`, `RateLimited`, `ServerError`)
    /// - `InvalidResponse` for malformed data
    pub async fn fetch(
        &self,
        window: TimeWindow,
        sessions: &mut SessionProvider,
    ) -> ProviderResult<SlotSet> {
        let session = sessions.ensure_session().await?;

        let raw = match self.provider.list_schedule(&session, window).await {
            Ok(raw) => raw,
            Err(e) if e.is_session_expired() => {
                warn!(provider = self.provider.name(), error = %e, "session rejected, renewing");
                sessions.invalidate();
                let session = sessions.refresh().await?;
                self.provider.list_schedule(&session, window).await?
            }
            Err(e) => return Err(e),
        };

        let slots = normalize_slots(&raw, window, &self.options)?;
        debug!(
            provider = self.provider.name(),
            records = raw.len(),
            slots = slots.len(),
            %window,
            "fetched availability"
        );
        Ok(slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ProviderError, ProviderErrorCode};
    use crate::provider::BoxFuture;
    use crate::raw_slot::RawSlot;
    use crate::session::{Credentials, Session};
    use chrono::TimeZone;
    use courtwatch_core::FixedClock;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 10, 12, 0, 0).unwrap()
    }

    /// Replays scripted schedule responses in order.
    struct ScriptedProvider {
        logins: AtomicU32,
        responses: Mutex<VecDeque<ProviderResult<Vec<RawSlot>>>>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<ProviderResult<Vec<RawSlot>>>) -> Self {
            Self {
                logins: AtomicU32::new(0),
                responses: Mutex::new(responses.into()),
            }
        }
    }

    impl AvailabilityProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn authenticate<'a>(
            &'a self,
            _credentials: &'a Credentials,
        ) -> BoxFuture<'a, ProviderResult<Session>> {
            let n = self.logins.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move { Ok(Session::new(format!("token-{}", n), now(), None)) })
        }

        fn list_schedule<'a>(
            &'a self,
            _session: &'a Session,
            _window: TimeWindow,
        ) -> BoxFuture<'a, ProviderResult<Vec<RawSlot>>> {
            let next = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()));
            Box::pin(async move { next })
        }
    }

    fn setup(
        responses: Vec<ProviderResult<Vec<RawSlot>>>,
    ) -> (AvailabilityFetcher, SessionProvider, Arc<ScriptedProvider>) {
        let provider = Arc::new(ScriptedProvider::new(responses));
        let fetcher = AvailabilityFetcher::new(provider.clone(), NormalizeOptions::default());
        let sessions = SessionProvider::new(
            provider.clone(),
            Credentials::access_token("tok"),
            Arc::new(FixedClock::new(now())),
        );
        (fetcher, sessions, provider)
    }

    fn one_slot() -> Vec<RawSlot> {
        vec![RawSlot::new("1", now() + chrono::Duration::hours(1))]
    }

    #[test]
    fn window_uses_configured_days() {
        let (fetcher, _, _) = setup(Vec::new());
        let fetcher = fetcher.with_window_days(3);

        let window = fetcher.window_at(now());

        assert_eq!(window.duration(), chrono::Duration::days(3));
    }

    #[tokio::test]
    async fn fetch_normalizes_slots() {
        let (fetcher, mut sessions, _) = setup(vec![Ok(one_slot())]);

        let slots = fetcher.fetch(fetcher.window_at(now()), &mut sessions).await.unwrap();

        assert_eq!(slots.len(), 1);
    }

    #[tokio::test]
    async fn expired_session_is_renewed_once() {
        let (fetcher, mut sessions, provider) = setup(vec![
            Err(ProviderError::session_expired("401")),
            Ok(one_slot()),
        ]);

        let slots = fetcher.fetch(fetcher.window_at(now()), &mut sessions).await.unwrap();

        assert_eq!(slots.len(), 1);
        assert_eq!(provider.logins.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn second_expiry_propagates() {
        let (fetcher, mut sessions, provider) = setup(vec![
            Err(ProviderError::session_expired("401")),
            Err(ProviderError::session_expired("401 again")),
        ]);

        let err = fetcher
            .fetch(fetcher.window_at(now()), &mut sessions)
            .await
            .unwrap_err();

        assert_eq!(err.code(), ProviderErrorCode::SessionExpired);
        assert_eq!(provider.logins.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn transport_errors_are_not_retried_here() {
        let (fetcher, mut sessions, provider) =
            setup(vec![Err(ProviderError::server("502")), Ok(one_slot())]);

        let err = fetcher
            .fetch(fetcher.window_at(now()), &mut sessions)
            .await
            .unwrap_err();

        assert_eq!(err.code(), ProviderErrorCode::ServerError);
        assert_eq!(provider.logins.load(Ordering::SeqCst), 1);
        assert_eq!(provider.responses.lock().unwrap().len(), 1);
    }
}
