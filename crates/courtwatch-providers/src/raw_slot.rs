//! Provider-native slot records.
//!
//! A [`RawSlot`] is what a provider hands back before normalization: the
//! court and start time are always known, while the end and the display
//! label are optional and filled in by [`crate::normalize`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One bookable slot as reported by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSlot {
    /// Court identifier after provider-specific mapping.
    pub court: String,
    /// Start of the slot.
    pub start: DateTime<Utc>,
    /// End of the slot, when the provider reports one.
    pub end: Option<DateTime<Utc>>,
    /// Provider-supplied description.
    pub label: Option<String>,
}

impl RawSlot {
    /// Creates a record with only court and start time.
    pub fn new(court: impl Into<String>, start: DateTime<Utc>) -> Self {
        Self {
            court: court.into(),
            start,
            end: None,
            label: None,
        }
    }

    /// Builder method to set the end time.
    pub fn with_end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    /// Builder method to set the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}
