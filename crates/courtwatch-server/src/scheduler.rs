//! Poll scheduler.
//!
//! This module drives the [`Monitor`] on a fixed cadence with support for:
//! - Optional jitter on the normal interval
//! - Exponential backoff on transport and parse errors
//! - A fatal threshold on consecutive authentication failures
//! - Manual polls and stop requests through a [`SchedulerHandle`]
//! - Graceful shutdown with a grace period for the in-flight cycle
//!
//! Cycles never overlap: the loop awaits each cycle before sleeping.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use courtwatch_core::{SHUTDOWN_MESSAGE, STARTUP_MESSAGE};
use courtwatch_providers::{ErrorCategory, ProviderResult};
use tokio::sync::{RwLock, mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::error::{ServerError, ServerResult};
use crate::monitor::{CycleReport, Monitor, PollPhase};
use crate::signals::ShutdownSignal;
use crate::snapshot::SharedSnapshotStore;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Base interval between polls.
    pub poll_interval: Duration,
    /// Maximum jitter added to the poll interval (as fraction 0.0-1.0).
    pub jitter_fraction: f64,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Consecutive authentication failures before giving up.
    pub max_auth_failures: u32,
    /// Time an in-flight cycle gets to finish after shutdown is requested.
    pub shutdown_grace: Duration,
    /// Whether start and stop are announced to the sinks.
    pub announce_lifecycle: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(15),
            jitter_fraction: 0.0,
            max_backoff: Duration::from_secs(300),
            max_auth_failures: 5,
            shutdown_grace: Duration::from_secs(10),
            announce_lifecycle: true,
        }
    }
}

impl SchedulerConfig {
    /// Creates a new scheduler config with the given poll interval.
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            ..Default::default()
        }
    }

    /// Builder: set jitter fraction.
    pub fn with_jitter(mut self, fraction: f64) -> Self {
        self.jitter_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    /// Builder: set the backoff cap.
    pub fn with_max_backoff(mut self, max: Duration) -> Self {
        self.max_backoff = max;
        self
    }

    /// Builder: set the authentication failure threshold.
    pub fn with_max_auth_failures(mut self, max: u32) -> Self {
        self.max_auth_failures = max.max(1);
        self
    }

    /// Builder: set the shutdown grace period.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Builder: enable or disable lifecycle announcements.
    pub fn with_announcements(mut self, enabled: bool) -> Self {
        self.announce_lifecycle = enabled;
        self
    }

    /// Calculates the next poll delay with jitter.
    pub fn next_poll_delay(&self) -> Duration {
        let base = self.poll_interval.as_secs_f64();
        let jitter_range = base * self.jitter_fraction;
        let jitter = rand_jitter(jitter_range);
        Duration::from_secs_f64((base + jitter).max(0.0))
    }

    /// Calculates the backoff delay after `consecutive_failures` failures.
    ///
    /// The interval doubles per failure up to `max_backoff`; without
    /// failures it is the plain poll interval.
    pub fn backoff_delay(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 {
            return self.poll_interval;
        }

        let base = self.poll_interval.as_secs_f64();
        let multiplier = 2f64.powi(consecutive_failures.min(32) as i32);
        // Never poll a failing upstream faster than a healthy one.
        let max = self.max_backoff.max(self.poll_interval).as_secs_f64();

        Duration::from_secs_f64((base * multiplier).min(max))
    }
}

/// Simple pseudo-random jitter generator.
/// Uses the current time to generate a value in [-range, range].
fn rand_jitter(range: f64) -> f64 {
    if range <= 0.0 {
        return 0.0;
    }
    use std::time::SystemTime;

    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();

    let fraction = (nanos as f64) / (1_000_000_000.0);
    (fraction * 2.0 - 1.0) * range
}

/// Commands that can be sent to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerCommand {
    /// Poll now instead of waiting out the interval.
    PollNow,
    /// Stop the scheduler.
    Stop,
}

/// Scheduler state.
#[derive(Debug, Clone, Default)]
pub struct SchedulerState {
    /// Cycles attempted.
    pub cycles: u64,
    /// Number of consecutive failed cycles.
    pub consecutive_failures: u32,
    /// Number of consecutive authentication failures.
    pub auth_failures: u32,
    /// Last successful cycle time.
    pub last_success: Option<DateTime<Utc>>,
    /// Last cycle attempt time.
    pub last_attempt: Option<DateTime<Utc>>,
    /// Last error message.
    pub last_error: Option<String>,
    /// Category of the last error.
    pub last_error_category: Option<ErrorCategory>,
    /// Slots opened over the lifetime of the scheduler.
    pub total_opened: u64,
}

impl SchedulerState {
    /// Creates a new scheduler state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful cycle.
    pub fn record_success(&mut self, at: DateTime<Utc>, opened: usize) {
        self.cycles += 1;
        self.consecutive_failures = 0;
        self.auth_failures = 0;
        self.last_success = Some(at);
        self.last_attempt = Some(at);
        self.last_error = None;
        self.last_error_category = None;
        self.total_opened += opened as u64;
    }

    /// Records a failed cycle.
    ///
    /// Authentication failures are only reset by a success, so a transport
    /// error between two rejected logins does not clear the count.
    pub fn record_failure(
        &mut self,
        at: DateTime<Utc>,
        category: ErrorCategory,
        error: impl Into<String>,
    ) {
        self.cycles += 1;
        self.consecutive_failures += 1;
        if category == ErrorCategory::Auth {
            self.auth_failures += 1;
        }
        self.last_attempt = Some(at);
        self.last_error = Some(error.into());
        self.last_error_category = Some(category);
    }
}

/// Shared scheduler state.
pub type SharedSchedulerState = Arc<RwLock<SchedulerState>>;

/// Creates a new shared scheduler state.
pub fn new_scheduler_state() -> SharedSchedulerState {
    Arc::new(RwLock::new(SchedulerState::new()))
}

/// How a cycle ended from the loop's point of view.
enum CycleOutcome {
    Finished(ProviderResult<CycleReport>),
    /// Stop requested mid-cycle. Holds the result if the cycle finished
    /// within the grace period.
    Interrupted(Option<ProviderResult<CycleReport>>),
}

/// The scheduler drives poll cycles.
pub struct Scheduler {
    config: SchedulerConfig,
    monitor: Monitor,
    state: SharedSchedulerState,
    command_tx: mpsc::Sender<SchedulerCommand>,
    command_rx: mpsc::Receiver<SchedulerCommand>,
}

impl Scheduler {
    /// Creates a new scheduler for `monitor`.
    pub fn new(config: SchedulerConfig, monitor: Monitor) -> Self {
        let (command_tx, command_rx) = mpsc::channel(16);
        Self {
            config,
            monitor,
            state: new_scheduler_state(),
            command_tx,
            command_rx,
        }
    }

    /// Returns a handle for sending commands to the scheduler.
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            command_tx: self.command_tx.clone(),
            state: self.state.clone(),
            phase_rx: self.monitor.phases(),
            snapshot: self.monitor.snapshot(),
        }
    }

    /// Returns the shared state.
    pub fn state(&self) -> SharedSchedulerState {
        self.state.clone()
    }

    /// Runs poll cycles until shutdown, a stop command, or a fatal error.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::AuthFailuresExceeded`] once authentication has
    /// failed `max_auth_failures` cycles in a row.
    pub async fn run(self, shutdown: ShutdownSignal) -> ServerResult<()> {
        let Self {
            config,
            mut monitor,
            state,
            command_tx: _command_tx,
            mut command_rx,
        } = self;

        info!(
            interval_secs = config.poll_interval.as_secs(),
            max_backoff_secs = config.max_backoff.as_secs(),
            "Scheduler started"
        );
        if config.announce_lifecycle {
            monitor.dispatcher().announce(STARTUP_MESSAGE).await;
        }

        let shutdown = shutdown.wait();
        tokio::pin!(shutdown);

        let result = loop {
            monitor.set_phase(PollPhase::Idle);

            let outcome = {
                let cycle = monitor.run_cycle();
                tokio::pin!(cycle);
                loop {
                    tokio::select! {
                        res = &mut cycle => break CycleOutcome::Finished(res),
                        _ = &mut shutdown => {
                            info!("Shutdown requested during cycle");
                            break CycleOutcome::Interrupted(
                                finish_within(config.shutdown_grace, &mut cycle).await,
                            );
                        }
                        cmd = command_rx.recv() => match cmd {
                            Some(SchedulerCommand::PollNow) => {
                                debug!("Poll already in progress, ignoring PollNow");
                            }
                            Some(SchedulerCommand::Stop) | None => {
                                info!("Stop requested during cycle");
                                break CycleOutcome::Interrupted(
                                    finish_within(config.shutdown_grace, &mut cycle).await,
                                );
                            }
                        }
                    }
                }
            };

            match outcome {
                CycleOutcome::Finished(res) => {
                    if let Err(e) = record_cycle(&config, &state, &monitor, res).await {
                        break Err(e);
                    }
                }
                CycleOutcome::Interrupted(res) => {
                    break match res {
                        Some(res) => record_cycle(&config, &state, &monitor, res).await,
                        None => Ok(()),
                    };
                }
            }

            monitor.set_phase(PollPhase::Sleeping);
            let delay = next_delay(&config, &state).await;
            debug!(delay_ms = delay.as_millis() as u64, "Scheduling next poll");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break Ok(());
                }
                cmd = command_rx.recv() => match cmd {
                    Some(SchedulerCommand::PollNow) => debug!("Received PollNow command"),
                    Some(SchedulerCommand::Stop) | None => {
                        info!("Scheduler stopping");
                        break Ok(());
                    }
                }
            }
        };

        monitor.set_phase(PollPhase::ShuttingDown);
        if config.announce_lifecycle {
            monitor.dispatcher().announce(SHUTDOWN_MESSAGE).await;
        }
        info!("Scheduler stopped");
        result
    }
}

/// Waits up to `grace` for an in-flight cycle.
async fn finish_within<F>(grace: Duration, cycle: &mut F) -> Option<F::Output>
where
    F: Future + Unpin,
{
    match tokio::time::timeout(grace, cycle).await {
        Ok(res) => Some(res),
        Err(_) => {
            warn!(grace_secs = grace.as_secs(), "Cycle abandoned after grace period");
            None
        }
    }
}

async fn next_delay(config: &SchedulerConfig, state: &SharedSchedulerState) -> Duration {
    let state = state.read().await;
    if state.consecutive_failures > 0 {
        let backoff = config.backoff_delay(state.consecutive_failures);
        debug!(
            failures = state.consecutive_failures,
            backoff_ms = backoff.as_millis() as u64,
            "Using backoff delay"
        );
        return backoff;
    }
    config.next_poll_delay()
}

async fn record_cycle(
    config: &SchedulerConfig,
    state: &SharedSchedulerState,
    monitor: &Monitor,
    result: ProviderResult<CycleReport>,
) -> ServerResult<()> {
    let now = monitor.now();
    let mut state = state.write().await;
    match result {
        Ok(report) => {
            info!(
                cycle = report.cycle,
                fetched = report.fetched,
                opened = report.opened,
                closed = report.closed,
                baseline = report.baseline,
                "Cycle completed"
            );
            let opened = if report.baseline { 0 } else { report.opened };
            state.record_success(now, opened);
            Ok(())
        }
        Err(e) => {
            let category = e.category();
            state.record_failure(now, category, e.to_string());
            let window = monitor
                .current_window()
                .map(|w| w.to_string())
                .unwrap_or_default();
            warn!(
                cycle = monitor.cycle(),
                at = %now,
                kind = %category,
                retryable = e.is_retryable(),
                window = %window,
                failures = state.consecutive_failures,
                error = %e,
                "Cycle failed"
            );

            if category == ErrorCategory::Auth && state.auth_failures >= config.max_auth_failures {
                error!(
                    failures = state.auth_failures,
                    max = config.max_auth_failures,
                    "Giving up after repeated authentication failures"
                );
                return Err(ServerError::auth_failures_exceeded(
                    state.auth_failures,
                    e.to_string(),
                ));
            }
            Ok(())
        }
    }
}

/// Handle for sending commands to a running scheduler.
#[derive(Clone, Debug)]
pub struct SchedulerHandle {
    command_tx: mpsc::Sender<SchedulerCommand>,
    state: SharedSchedulerState,
    phase_rx: watch::Receiver<PollPhase>,
    snapshot: SharedSnapshotStore,
}

impl SchedulerHandle {
    /// Triggers an immediate poll.
    pub async fn poll_now(&self) -> Result<(), mpsc::error::SendError<SchedulerCommand>> {
        self.command_tx.send(SchedulerCommand::PollNow).await
    }

    /// Stops the scheduler.
    pub async fn stop(&self) -> Result<(), mpsc::error::SendError<SchedulerCommand>> {
        self.command_tx.send(SchedulerCommand::Stop).await
    }

    /// Returns the current scheduler state.
    pub async fn state(&self) -> SchedulerState {
        self.state.read().await.clone()
    }

    /// Returns the current poll phase.
    pub fn phase(&self) -> PollPhase {
        *self.phase_rx.borrow()
    }

    /// Subscribes to phase changes.
    pub fn phases(&self) -> watch::Receiver<PollPhase> {
        self.phase_rx.clone()
    }

    /// Returns the shared snapshot store.
    pub fn snapshot(&self) -> SharedSnapshotStore {
        self.snapshot.clone()
    }
}
