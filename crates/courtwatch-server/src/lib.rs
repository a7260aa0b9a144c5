//! Monitor: snapshot store, poll scheduler, notification sinks.
//!
//! This crate runs the availability change detector:
//! - [`Monitor`] runs one authenticate, fetch, diff and notify cycle
//! - [`SnapshotStore`] keeps the slots seen by the last successful poll
//! - [`NotifierDispatcher`] fans new-slot messages out to sinks
//! - [`Scheduler`] repeats cycles with backoff and graceful shutdown
//!
//! # Example
//!
//! ```rust,ignore
//! use courtwatch_server::{Monitor, Scheduler, SchedulerConfig, SignalHandler};
//!
//! let monitor = Monitor::new(sessions, fetcher, dispatcher, clock);
//! let scheduler = Scheduler::new(SchedulerConfig::default(), monitor);
//! let signals = SignalHandler::new();
//! signals.spawn_listener()?;
//! scheduler.run(signals.shutdown()).await?;
//! ```

mod dispatch;
mod error;
mod monitor;
mod scheduler;
mod signals;
mod snapshot;

pub use dispatch::{
    DISCORD_MESSAGE_LIMIT, DesktopSink, DiscordSink, DispatchConfig, DispatchReport, LogSink,
    NoopSink, NotificationSink, NotifierDispatcher, SinkKind, SinkOutcome, truncate_message,
};
pub use error::{ServerError, ServerResult, SinkError};
pub use monitor::{CycleReport, Monitor, PollPhase};
pub use scheduler::{
    Scheduler, SchedulerCommand, SchedulerConfig, SchedulerHandle, SchedulerState,
    SharedSchedulerState, new_scheduler_state,
};
pub use signals::{ShutdownSignal, SignalHandler};
pub use snapshot::{SharedSnapshotStore, SnapshotStore, new_snapshot_store};
