//! Notification events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::slot::Slot;

/// One "slot newly opened" fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// The slot that became available.
    pub slot: Slot,
    /// When the opening was detected.
    pub detected_at: DateTime<Utc>,
}

impl NotificationEvent {
    /// Creates an event for a slot detected at the given time.
    pub fn new(slot: Slot, detected_at: DateTime<Utc>) -> Self {
        Self { slot, detected_at }
    }

    /// Builds one event per opened slot, preserving order.
    pub fn for_opened(opened: &[Slot], detected_at: DateTime<Utc>) -> Vec<Self> {
        opened
            .iter()
            .cloned()
            .map(|slot| Self::new(slot, detected_at))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn for_opened_keeps_order_and_timestamp() {
        let start = Utc.with_ymd_and_hms(2025, 5, 10, 16, 0, 0).unwrap();
        let detected = Utc.with_ymd_and_hms(2025, 5, 9, 8, 30, 0).unwrap();
        let slots = vec![
            Slot::new("1", start, start + Duration::minutes(15)),
            Slot::new("2", start, start + Duration::minutes(15)),
        ];

        let events = NotificationEvent::for_opened(&slots, detected);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].slot.court, "1");
        assert_eq!(events[1].slot.court, "2");
        assert!(events.iter().all(|e| e.detected_at == detected));
    }
}
