//! Set difference between two slot snapshots.
//!
//! [`diff_slots`] is a pure function: it partitions two [`SlotSet`]s into
//! opened, closed and unchanged slots using exact identifier equality. It
//! performs no I/O and holds no state, so every property of change detection
//! can be checked here without a provider.

use crate::slot::{Slot, SlotSet};

/// The delta between a previous and a current slot set.
///
/// Every partition is sorted by [`Slot::sort_key`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotDiff {
    /// Slots present now that were absent before.
    pub opened: Vec<Slot>,
    /// Slots present before that are absent now.
    pub closed: Vec<Slot>,
    /// Slots present in both sets, as seen in the current set.
    pub unchanged: Vec<Slot>,
}

impl SlotDiff {
    /// Returns true if nothing opened or closed.
    pub fn is_empty(&self) -> bool {
        self.opened.is_empty() && self.closed.is_empty()
    }
}

/// Computes opened, closed and unchanged slots between two sets.
///
/// Slots are matched by identifier only; a slot whose label changed but whose
/// court and times did not is reported as unchanged.
pub fn diff_slots(previous: &SlotSet, current: &SlotSet) -> SlotDiff {
    let mut opened = Vec::new();
    let mut unchanged = Vec::new();
    for slot in current.iter() {
        if previous.contains(&slot.id) {
            unchanged.push(slot.clone());
        } else {
            opened.push(slot.clone());
        }
    }

    let mut closed: Vec<Slot> = previous
        .iter()
        .filter(|slot| !current.contains(&slot.id))
        .cloned()
        .collect();

    sort_slots(&mut opened);
    sort_slots(&mut closed);
    sort_slots(&mut unchanged);

    SlotDiff {
        opened,
        closed,
        unchanged,
    }
}

fn sort_slots(slots: &mut [Slot]) {
    slots.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}
