//! Core types: slots, time windows, diffing, message formatting

pub mod clock;
pub mod diff;
pub mod event;
pub mod format;
pub mod slot;
pub mod time;
pub mod tracing;

pub use clock::{Clock, FixedClock, SystemClock};
pub use diff::{SlotDiff, diff_slots};
pub use event::NotificationEvent;
pub use format::{
    DIGEST_HEADER, MessageFormatter, MessageStyle, SHUTDOWN_MESSAGE, STARTUP_MESSAGE, slot_label,
};
pub use slot::{Slot, SlotId, SlotSet};
pub use time::TimeWindow;
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
