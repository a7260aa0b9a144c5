//! Snapshot of the slots seen by the last successful poll.
//!
//! The store holds one [`SlotSet`] for the single polled window. It is
//! replaced wholesale after every successful fetch and never persisted.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use courtwatch_core::{SlotDiff, SlotId, SlotSet, TimeWindow, diff_slots};
use tokio::sync::RwLock;
use tracing::{debug, trace};

/// The last observed set of open slots.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    slots: SlotSet,
    window: Option<TimeWindow>,
    updated_at: Option<DateTime<Utc>>,
    generation: u64,
}

impl SnapshotStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true until the first successful [`Self::diff_and_replace`].
    pub fn is_first_cycle(&self) -> bool {
        self.generation == 0
    }

    /// Diffs `slots` against the stored set, then stores `slots`.
    ///
    /// Callers holding a write guard observe the diff and the replacement as
    /// one step.
    pub fn diff_and_replace(
        &mut self,
        slots: SlotSet,
        window: TimeWindow,
        observed_at: DateTime<Utc>,
    ) -> SlotDiff {
        let diff = diff_slots(&self.slots, &slots);
        trace!(
            opened = diff.opened.len(),
            closed = diff.closed.len(),
            unchanged = diff.unchanged.len(),
            "snapshot diff"
        );

        self.slots = slots;
        self.window = Some(window);
        self.updated_at = Some(observed_at);
        self.generation += 1;
        debug!(
            generation = self.generation,
            slots = self.slots.len(),
            "snapshot replaced"
        );
        diff
    }

    /// Number of open slots in the snapshot.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if the snapshot holds no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Window the snapshot was fetched for.
    pub fn window(&self) -> Option<TimeWindow> {
        self.window
    }

    /// When the snapshot was last replaced.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Number of successful replacements so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Identifiers of the open slots, in identifier order.
    pub fn slot_ids(&self) -> Vec<SlotId> {
        self.slots.ids().cloned().collect()
    }

    /// The stored slots.
    pub fn slots(&self) -> &SlotSet {
        &self.slots
    }
}

/// Snapshot store shared between the poll loop and readers.
pub type SharedSnapshotStore = Arc<RwLock<SnapshotStore>>;

/// Creates a new shared snapshot store.
pub fn new_snapshot_store() -> SharedSnapshotStore {
    Arc::new(RwLock::new(SnapshotStore::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use courtwatch_core::Slot;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 10, hour, 0, 0).unwrap()
    }

    fn set(courts: &[&str]) -> SlotSet {
        courts
            .iter()
            .map(|court| Slot::new(*court, at(16), at(16) + Duration::minutes(15)))
            .collect()
    }

    fn window() -> TimeWindow {
        TimeWindow::lookahead(at(0), 7)
    }

    #[test]
    fn first_cycle_until_first_replace() {
        let mut store = SnapshotStore::new();
        assert!(store.is_first_cycle());
        assert!(store.updated_at().is_none());

        let diff = store.diff_and_replace(set(&["1", "2"]), window(), at(12));

        assert_eq!(diff.opened.len(), 2);
        assert!(!store.is_first_cycle());
        assert_eq!(store.len(), 2);
        assert_eq!(store.window(), Some(window()));
        assert_eq!(store.updated_at(), Some(at(12)));
    }

    #[test]
    fn replace_reports_opened_and_closed() {
        let mut store = SnapshotStore::new();
        store.diff_and_replace(set(&["1", "2"]), window(), at(12));

        let diff = store.diff_and_replace(set(&["2", "3"]), window(), at(13));

        assert_eq!(diff.opened.len(), 1);
        assert_eq!(diff.opened[0].court, "3");
        assert_eq!(diff.closed.len(), 1);
        assert_eq!(diff.closed[0].court, "1");
        assert_eq!(store.generation(), 2);
        assert_eq!(store.slot_ids(), set(&["2", "3"]).ids().cloned().collect::<Vec<_>>());
    }

    #[test]
    fn same_set_twice_opens_nothing() {
        let mut store = SnapshotStore::new();
        store.diff_and_replace(set(&["1"]), window(), at(12));

        let diff = store.diff_and_replace(set(&["1"]), window(), at(13));

        assert!(diff.opened.is_empty());
        assert!(diff.is_empty());
    }

    #[tokio::test]
    async fn shared_store_is_readable_after_update() {
        let store = new_snapshot_store();
        {
            let mut guard = store.write().await;
            guard.diff_and_replace(set(&["1"]), window(), at(12));
        }
        assert_eq!(store.read().await.len(), 1);
    }
}
