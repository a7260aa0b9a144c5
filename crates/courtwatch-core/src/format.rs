//! Notification message formatting.
//!
//! Two styles are supported:
//! - [`MessageStyle::Digest`]: one message per cycle, grouping new slots by
//!   local day and merging back-to-back slots into periods regardless of court
//! - [`MessageStyle::PerSlot`]: one message per newly opened slot
//!
//! A compact variant of the digest (days only) is used as the fallback when
//! a sink rejects the full message.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::event::NotificationEvent;

/// Header line of every digest message.
pub const DIGEST_HEADER: &str = "New availabilities!! Bookings freed up on:";

/// Announcement sent when the monitor starts.
pub const STARTUP_MESSAGE: &str = "Checking for court openings...";

/// Announcement sent when the monitor stops.
pub const SHUTDOWN_MESSAGE: &str = "Monitor stopped.";

const DAY_FORMAT: &str = "%a %m/%d";
const TIME_FORMAT: &str = "%-I:%M %p";

/// How new slots are turned into messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStyle {
    /// One summary message per cycle.
    #[default]
    Digest,
    /// One message per slot.
    PerSlot,
}

/// Builds the label of a slot, e.g. `Court 3 Sat 05/10 9:00 AM - 9:15 AM`.
pub fn slot_label(court: &str, start: DateTime<Utc>, end: DateTime<Utc>, timezone: &Tz) -> String {
    let start = start.with_timezone(timezone);
    let end = end.with_timezone(timezone);
    format!(
        "Court {} {} {} - {}",
        court,
        start.format(DAY_FORMAT),
        start.format(TIME_FORMAT),
        end.format(TIME_FORMAT)
    )
}

/// A merged run of contiguous or overlapping slot times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Period {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

/// Formats notification events into sink-ready text.
#[derive(Debug, Clone)]
pub struct MessageFormatter {
    style: MessageStyle,
    timezone: Tz,
    max_periods_per_day: usize,
}

impl Default for MessageFormatter {
    fn default() -> Self {
        Self::new(MessageStyle::Digest, Tz::UTC)
    }
}

impl MessageFormatter {
    /// Creates a formatter rendering times in `timezone`.
    pub fn new(style: MessageStyle, timezone: Tz) -> Self {
        Self {
            style,
            timezone,
            max_periods_per_day: 2,
        }
    }

    /// Builder: number of periods a day line lists before collapsing.
    pub fn with_max_periods_per_day(mut self, max: usize) -> Self {
        self.max_periods_per_day = max;
        self
    }

    /// Returns the configured style.
    pub fn style(&self) -> MessageStyle {
        self.style
    }

    /// Returns the display timezone.
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Formats events into messages. No events means no messages.
    pub fn format(&self, events: &[NotificationEvent]) -> Vec<String> {
        if events.is_empty() {
            return Vec::new();
        }
        match self.style {
            MessageStyle::Digest => vec![self.digest(events)],
            MessageStyle::PerSlot => events
                .iter()
                .map(|event| format!("New availability!! {}", event.slot.raw_label))
                .collect(),
        }
    }

    /// Formats all events into a single digest message.
    pub fn digest(&self, events: &[NotificationEvent]) -> String {
        let mut message = String::from(DIGEST_HEADER);
        for (day, periods) in self.day_periods(events) {
            message.push('\n');
            message.push_str(&self.day_line(day, &periods));
        }
        message
    }

    /// Formats the short fallback message listing only the affected days.
    pub fn compact(&self, events: &[NotificationEvent]) -> String {
        let mut message = String::from(DIGEST_HEADER);
        for day in self.day_periods(events).keys() {
            message.push('\n');
            message.push_str(&day.format(DAY_FORMAT).to_string());
        }
        message
    }

    /// Builds the human-readable label of a slot in the display timezone.
    pub fn slot_label(&self, court: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> String {
        slot_label(court, start, end, &self.timezone)
    }

    fn day_periods(&self, events: &[NotificationEvent]) -> BTreeMap<NaiveDate, Vec<Period>> {
        let mut ranges: Vec<(DateTime<Utc>, DateTime<Utc>)> = events
            .iter()
            .map(|event| (event.slot.start, event.slot.end))
            .collect();
        ranges.sort();
        ranges.dedup();

        let mut days: BTreeMap<NaiveDate, Vec<Period>> = BTreeMap::new();
        for (start, end) in ranges {
            let day = start.with_timezone(&self.timezone).date_naive();
            let periods = days.entry(day).or_default();
            match periods.last_mut() {
                Some(last) if start <= last.end => {
                    if end > last.end {
                        last.end = end;
                    }
                }
                _ => periods.push(Period { start, end }),
            }
        }
        days
    }

    fn day_line(&self, day: NaiveDate, periods: &[Period]) -> String {
        let day = day.format(DAY_FORMAT);
        if periods.len() > self.max_periods_per_day {
            return format!("{}: Lots of courts open now!", day);
        }
        let times: Vec<String> = periods
            .iter()
            .map(|period| {
                format!(
                    "{} - {}",
                    period.start.with_timezone(&self.timezone).format(TIME_FORMAT),
                    period.end.with_timezone(&self.timezone).format(TIME_FORMAT)
                )
            })
            .collect();
        format!("{}: {}", day, times.join(", "))
    }
}
