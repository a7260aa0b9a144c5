//! Wires configuration into a running monitor.
//!
//! Builds the Mindbody provider, the notification sinks and the scheduler,
//! then runs until SIGTERM/SIGINT or a fatal error.

use std::sync::Arc;
use std::time::Duration;

use courtwatch_core::{Clock, MessageFormatter, SystemClock};
use courtwatch_providers::mindbody::MindbodyProvider;
use courtwatch_providers::{AvailabilityFetcher, NormalizeOptions, SessionProvider};
use courtwatch_server::{
    DesktopSink, DiscordSink, LogSink, Monitor, NoopSink, NotificationSink, NotifierDispatcher,
    Scheduler, SignalHandler, SinkKind,
};
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Builds the sinks named in `[notifications]`.
///
/// Dry runs and an empty sink list deliver to the no-op sink only.
pub fn build_sinks(config: &ClientConfig) -> ClientResult<Vec<Arc<dyn NotificationSink>>> {
    let notifications = &config.notifications;
    if notifications.dry_run {
        info!("Dry run: notifications will not be delivered");
        return Ok(vec![Arc::new(NoopSink)]);
    }
    if notifications.sinks.is_empty() {
        warn!("No notification sinks configured");
        return Ok(vec![Arc::new(NoopSink)]);
    }

    let timeout = Duration::from_secs(notifications.delivery_timeout_secs);
    let mut sinks: Vec<Arc<dyn NotificationSink>> = Vec::with_capacity(notifications.sinks.len());
    for kind in &notifications.sinks {
        let sink: Arc<dyn NotificationSink> = match kind {
            SinkKind::Discord => {
                let (token, channel_id) = config.discord.resolve().map_err(ClientError::Config)?;
                Arc::new(DiscordSink::new(token, channel_id, timeout)?)
            }
            SinkKind::Desktop => Arc::new(
                DesktopSink::default().with_timeout(notifications.desktop_timeout_secs),
            ),
            SinkKind::Log => Arc::new(LogSink),
            SinkKind::Noop => Arc::new(NoopSink),
        };
        sinks.push(sink);
    }
    Ok(sinks)
}

/// Builds the monitor described by `config`.
pub fn build_monitor(config: &ClientConfig, clock: Arc<dyn Clock>) -> ClientResult<Monitor> {
    let timezone = config.notifications.timezone().map_err(ClientError::Config)?;
    let mindbody = config.mindbody_config().map_err(ClientError::Config)?;
    let credentials = config.credentials.resolve().map_err(ClientError::Config)?;

    let options = NormalizeOptions::default()
        .with_slot_length(mindbody.slot_length())
        .with_timezone(timezone);
    let provider = Arc::new(MindbodyProvider::new(mindbody)?.with_clock(clock.clone()));

    let sessions = SessionProvider::new(provider.clone(), credentials, clock.clone());
    let fetcher =
        AvailabilityFetcher::new(provider, options).with_window_days(config.monitor.window_days);

    let formatter = MessageFormatter::new(config.notifications.style, timezone);
    let mut dispatcher =
        NotifierDispatcher::new(formatter, config.notifications.dispatch_config());
    for sink in build_sinks(config)? {
        dispatcher.add_sink(sink);
    }

    Ok(Monitor::new(sessions, fetcher, dispatcher, clock))
}

/// Runs the monitor until shutdown.
///
/// # Errors
///
/// Returns an error for invalid configuration or when the monitor gives up
/// after repeated authentication failures.
pub async fn run(config: ClientConfig) -> ClientResult<()> {
    config.validate().map_err(ClientError::Config)?;

    let monitor = build_monitor(&config, Arc::new(SystemClock))?;
    info!(
        interval_secs = config.monitor.interval_secs,
        window_days = config.monitor.window_days,
        sinks = ?monitor.dispatcher().sink_names(),
        dry_run = config.notifications.dry_run,
        "Starting court monitor"
    );

    let signals = SignalHandler::new();
    signals.spawn_listener()?;

    let scheduler = Scheduler::new(config.monitor.scheduler_config(), monitor);
    scheduler.run(signals.shutdown()).await?;
    Ok(())
}
