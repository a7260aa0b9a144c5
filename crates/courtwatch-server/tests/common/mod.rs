#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use courtwatch_core::{FixedClock, MessageFormatter, MessageStyle, TimeWindow};
use courtwatch_providers::{
    AvailabilityFetcher, AvailabilityProvider, BoxFuture, Credentials, NormalizeOptions,
    ProviderError, ProviderResult, RawSlot, Session, SessionProvider,
};
use courtwatch_server::{DispatchConfig, Monitor, NotificationSink, NotifierDispatcher, SinkError};

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 10, 12, 0, 0).unwrap()
}

/// A 15-minute slot on `court` starting four hours from [`now`].
pub fn raw(court: &str) -> RawSlot {
    RawSlot::new(court, now() + Duration::hours(4))
}

pub fn schedule(courts: &[&str]) -> ProviderResult<Vec<RawSlot>> {
    Ok(courts.iter().map(|c| raw(c)).collect())
}

/// Provider replaying scripted logins and schedules.
///
/// An exhausted script answers with a successful login and an empty schedule.
#[derive(Default)]
pub struct FakeProvider {
    schedules: Mutex<VecDeque<ProviderResult<Vec<RawSlot>>>>,
    logins: Mutex<VecDeque<ProviderResult<()>>>,
    pub login_count: AtomicUsize,
    pub fetch_count: AtomicUsize,
    pub fetch_times: Mutex<Vec<tokio::time::Instant>>,
    pub hang: AtomicBool,
    pub login_delay: Mutex<Option<std::time::Duration>>,
}

impl FakeProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_schedule(&self, response: ProviderResult<Vec<RawSlot>>) {
        self.schedules.lock().unwrap().push_back(response);
    }

    pub fn push_login(&self, response: ProviderResult<()>) {
        self.logins.lock().unwrap().push_back(response);
    }

    pub fn fetches(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    pub fn logins(&self) -> usize {
        self.login_count.load(Ordering::SeqCst)
    }
}

impl AvailabilityProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    fn authenticate<'a>(
        &'a self,
        _credentials: &'a Credentials,
    ) -> BoxFuture<'a, ProviderResult<Session>> {
        let n = self.login_count.fetch_add(1, Ordering::SeqCst);
        let scripted = self.logins.lock().unwrap().pop_front().unwrap_or(Ok(()));
        let result = scripted.map(|()| Session::new(format!("token-{}", n), now(), None));
        let delay = *self.login_delay.lock().unwrap();
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            result
        })
    }

    fn list_schedule<'a>(
        &'a self,
        _session: &'a Session,
        _window: TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<RawSlot>>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        self.fetch_times
            .lock()
            .unwrap()
            .push(tokio::time::Instant::now());
        if self.hang.load(Ordering::SeqCst) {
            return Box::pin(std::future::pending());
        }
        let result = self
            .schedules
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()));
        Box::pin(async move { result })
    }
}

/// Sink recording every message; optionally always failing.
pub struct RecordingSink {
    name: &'static str,
    fail: bool,
    messages: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            fail: false,
            messages: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            fail: true,
            messages: Mutex::new(Vec::new()),
        })
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn name(&self) -> &str {
        self.name
    }

    fn deliver<'a>(&'a self, message: &'a str) -> BoxFuture<'a, Result<(), SinkError>> {
        let result = if self.fail {
            Err(SinkError::Rejected {
                status: 500,
                body: "unavailable".to_string(),
            })
        } else {
            self.messages.lock().unwrap().push(message.to_string());
            Ok(())
        };
        Box::pin(async move { result })
    }
}

/// Builds a monitor over `provider` delivering one message per slot.
pub fn monitor(provider: Arc<FakeProvider>, sinks: &[Arc<RecordingSink>]) -> Monitor {
    let clock = Arc::new(FixedClock::new(now()));
    let sessions = SessionProvider::new(
        provider.clone(),
        Credentials::access_token("token"),
        clock.clone(),
    );
    let fetcher = AvailabilityFetcher::new(provider, NormalizeOptions::default());
    let mut dispatcher = NotifierDispatcher::new(
        MessageFormatter::new(MessageStyle::PerSlot, chrono_tz::UTC),
        DispatchConfig::default(),
    );
    for sink in sinks {
        dispatcher.add_sink(sink.clone());
    }
    Monitor::new(sessions, fetcher, dispatcher, clock)
}

pub fn auth_error() -> ProviderError {
    ProviderError::authentication("login rejected")
}
