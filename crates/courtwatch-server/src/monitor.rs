//! One poll cycle: authenticate, fetch, diff, notify.
//!
//! [`Monitor`] owns everything a cycle touches. The scheduler drives it one
//! cycle at a time, so the session provider and cycle counter need no lock.
//! The current [`PollPhase`] is published on a watch channel.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use courtwatch_core::{Clock, NotificationEvent, TimeWindow};
use courtwatch_providers::{AvailabilityFetcher, ProviderResult, SessionProvider};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::dispatch::{DispatchReport, NotifierDispatcher};
use crate::snapshot::{SharedSnapshotStore, new_snapshot_store};

/// Where the poll loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollPhase {
    /// Waiting for the next tick.
    Idle,
    /// Obtaining a session.
    Authenticating,
    /// Requesting the schedule.
    Fetching,
    /// Comparing against the snapshot.
    Diffing,
    /// Delivering notifications.
    Notifying,
    /// Waiting out the interval or backoff.
    Sleeping,
    /// Stopped. Terminal.
    ShuttingDown,
}

impl PollPhase {
    /// Returns a short name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Authenticating => "authenticating",
            Self::Fetching => "fetching",
            Self::Diffing => "diffing",
            Self::Notifying => "notifying",
            Self::Sleeping => "sleeping",
            Self::ShuttingDown => "shutting_down",
        }
    }
}

impl fmt::Display for PollPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of a completed cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Cycle number, starting at 1.
    pub cycle: u64,
    /// Window that was polled.
    pub window: TimeWindow,
    /// When the cycle started.
    pub started_at: DateTime<Utc>,
    /// Slots currently open.
    pub fetched: usize,
    /// Slots that opened since the previous snapshot.
    pub opened: usize,
    /// Slots that closed since the previous snapshot.
    pub closed: usize,
    /// True for the cycle that only established the baseline.
    pub baseline: bool,
    /// Delivery outcome, when notifications were sent.
    pub dispatch: Option<DispatchReport>,
}

/// Runs poll cycles against a provider.
pub struct Monitor {
    sessions: SessionProvider,
    fetcher: AvailabilityFetcher,
    dispatcher: NotifierDispatcher,
    snapshot: SharedSnapshotStore,
    clock: Arc<dyn Clock>,
    phase_tx: watch::Sender<PollPhase>,
    cycle: u64,
    current_window: Option<TimeWindow>,
}

impl Monitor {
    /// Creates a monitor with an empty snapshot.
    pub fn new(
        sessions: SessionProvider,
        fetcher: AvailabilityFetcher,
        dispatcher: NotifierDispatcher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (phase_tx, _) = watch::channel(PollPhase::Idle);
        Self {
            sessions,
            fetcher,
            dispatcher,
            snapshot: new_snapshot_store(),
            clock,
            phase_tx,
            cycle: 0,
            current_window: None,
        }
    }

    /// Returns the shared snapshot store.
    pub fn snapshot(&self) -> SharedSnapshotStore {
        self.snapshot.clone()
    }

    /// Subscribes to phase changes.
    pub fn phases(&self) -> watch::Receiver<PollPhase> {
        self.phase_tx.subscribe()
    }

    /// Returns the current phase.
    pub fn phase(&self) -> PollPhase {
        *self.phase_tx.borrow()
    }

    /// Returns the dispatcher.
    pub fn dispatcher(&self) -> &NotifierDispatcher {
        &self.dispatcher
    }

    /// Number of cycles started.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Window of the most recent cycle.
    pub fn current_window(&self) -> Option<TimeWindow> {
        self.current_window
    }

    /// Returns the current wall-clock time.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn set_phase(&self, phase: PollPhase) {
        self.phase_tx.send_replace(phase);
        debug!(phase = %phase, "poll phase");
    }

    /// Runs one cycle.
    ///
    /// The snapshot is only replaced after a successful fetch. The first
    /// successful cycle records the baseline and notifies nobody.
    ///
    /// # Errors
    ///
    /// Returns the provider error of the authentication or fetch step. The
    /// snapshot is left untouched in that case.
    pub async fn run_cycle(&mut self) -> ProviderResult<CycleReport> {
        self.cycle += 1;
        let cycle = self.cycle;
        let started_at = self.clock.now();
        let window = self.fetcher.window_at(started_at);
        self.current_window = Some(window);

        self.set_phase(PollPhase::Authenticating);
        self.sessions.ensure_session().await?;

        self.set_phase(PollPhase::Fetching);
        let slots = self.fetcher.fetch(window, &mut self.sessions).await?;
        let fetched = slots.len();

        self.set_phase(PollPhase::Diffing);
        let (diff, baseline) = {
            let mut store = self.snapshot.write().await;
            let baseline = store.is_first_cycle();
            (store.diff_and_replace(slots, window, started_at), baseline)
        };

        self.set_phase(PollPhase::Notifying);
        let events = NotificationEvent::for_opened(&diff.opened, self.clock.now());
        let dispatch = if baseline {
            info!(
                cycle,
                provider = self.fetcher.provider_name(),
                slots = fetched,
                "baseline snapshot recorded"
            );
            None
        } else if events.is_empty() {
            debug!(cycle, closed = diff.closed.len(), "no new availability");
            None
        } else {
            info!(cycle, opened = events.len(), "new availability");
            Some(self.dispatcher.notify(&events).await)
        };

        Ok(CycleReport {
            cycle,
            window,
            started_at,
            fetched,
            opened: diff.opened.len(),
            closed: diff.closed.len(),
            baseline,
            dispatch,
        })
    }
}
