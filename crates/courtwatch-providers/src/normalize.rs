//! RawSlot to Slot conversion pipeline.
//!
//! Normalization fills in what providers leave out (slot end, display
//! label), rejects records that cannot describe a reservation and drops
//! records that start outside the requested window.

use chrono::Duration;
use chrono_tz::Tz;
use courtwatch_core::{Slot, SlotSet, TimeWindow, slot_label};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::raw_slot::RawSlot;

/// Defaults applied while normalizing.
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// Length of a slot when the provider only reports start times.
    pub slot_length: Duration,
    /// Timezone used for generated labels.
    pub timezone: Tz,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            slot_length: Duration::minutes(15),
            timezone: Tz::UTC,
        }
    }
}

impl NormalizeOptions {
    /// Builder method to set the slot length.
    pub fn with_slot_length(mut self, slot_length: Duration) -> Self {
        self.slot_length = slot_length;
        self
    }

    /// Builder method to set the label timezone.
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }
}

/// Converts one raw record into a [`Slot`].
///
/// # Errors
///
/// Returns `InvalidResponse` if the court is empty or the slot does not end
/// after it starts.
pub fn normalize_slot(raw: &RawSlot, options: &NormalizeOptions) -> ProviderResult<Slot> {
    let court = raw.court.trim();
    if court.is_empty() {
        return Err(ProviderError::invalid_response(format!(
            "slot starting at {} has no court",
            raw.start
        )));
    }

    let end = raw.end.unwrap_or(raw.start + options.slot_length);
    if end <= raw.start {
        return Err(ProviderError::invalid_response(format!(
            "slot on court {} ends at {} before it starts at {}",
            court, end, raw.start
        )));
    }

    let label = match raw.label {
        Some(ref label) if !label.trim().is_empty() => label.clone(),
        _ => slot_label(court, raw.start, end, &options.timezone),
    };

    Ok(Slot::new(court, raw.start, end).with_label(label))
}

/// Batch normalize raw records into a [`SlotSet`].
///
/// Records starting outside `window` are dropped. Duplicate records collapse
/// to one entry per identifier. A single malformed record fails the batch,
/// since a partial set would report its missing slots as closed.
pub fn normalize_slots(
    raw_slots: &[RawSlot],
    window: TimeWindow,
    options: &NormalizeOptions,
) -> ProviderResult<SlotSet> {
    let mut set = SlotSet::new();
    let mut skipped = 0usize;

    for raw in raw_slots {
        if !window.contains(raw.start) {
            skipped += 1;
            continue;
        }
        set.insert(normalize_slot(raw, options)?);
    }

    if skipped > 0 {
        debug!(skipped, %window, "dropped slots outside window");
    }
    Ok(set)
}
