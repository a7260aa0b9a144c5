//! Time windows for availability queries.
//!
//! [`TimeWindow`] is the half-open range of start times requested from the
//! provider on each poll. The monitor queries a rolling window that begins
//! at the current instant and extends a configured number of days.

use std::fmt;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Slot start times `[start, end)` polled in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// # Panics
    ///
    /// Panics if `end` precedes `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start <= end, "window end precedes start");
        Self { start, end }
    }

    /// The rolling window `[now, now + days)`.
    ///
    /// The end saturates at the latest representable instant.
    pub fn lookahead(now: DateTime<Utc>, days: u32) -> Self {
        let end = now
            .checked_add_signed(Duration::days(i64::from(days)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self::new(now, end)
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// True if a slot starting at `at` belongs to the window.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        (self.start..self.end).contains(&at)
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{}",
            self.start.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.end.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }
}
