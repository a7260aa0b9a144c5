//! Bookable slot types.
//!
//! A [`Slot`] is one court reserved for one time range. Slots are keyed by a
//! [`SlotId`] derived from court, start and end, so the same reservation unit
//! fetched twice always maps to the same key. [`SlotSet`] holds the slots
//! seen by one fetch, keyed by identifier.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Stable identifier of a slot.
///
/// Rendered as `<court>@<start>/<end>` with both instants in RFC 3339 UTC at
/// second precision. The timestamp suffix has a fixed shape, so two distinct
/// (court, start, end) triples never render to the same identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(String);

impl SlotId {
    /// Derives the identifier for a court and time range.
    pub fn derive(court: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self(format!(
            "{}@{}/{}",
            court,
            start.to_rfc3339_opts(SecondsFormat::Secs, true),
            end.to_rfc3339_opts(SecondsFormat::Secs, true)
        ))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One bookable reservation unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// Identifier derived from `court`, `start` and `end`.
    pub id: SlotId,
    /// Identifier of the physical court.
    pub court: String,
    /// Start of the reservation.
    pub start: DateTime<Utc>,
    /// End of the reservation.
    pub end: DateTime<Utc>,
    /// Human-readable description used in notification text.
    pub raw_label: String,
}

impl Slot {
    /// Creates a slot, deriving its identifier and a default label.
    pub fn new(court: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let court = court.into();
        let raw_label = format!(
            "Court {} {} - {}",
            court,
            start.format("%Y-%m-%d %H:%M UTC"),
            end.format("%H:%M UTC")
        );
        Self {
            id: SlotId::derive(&court, start, end),
            court,
            start,
            end,
            raw_label,
        }
    }

    /// Builder: replace the label. The identifier is unaffected.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.raw_label = label.into();
        self
    }

    /// Returns the length of the slot.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Ordering used for readable output: start time, then court, then id.
    pub fn sort_key(&self) -> (DateTime<Utc>, &str, &SlotId) {
        (self.start, self.court.as_str(), &self.id)
    }
}

/// A set of slots keyed by [`SlotId`].
///
/// Inserting a slot whose identifier is already present replaces the stored
/// entry, so a set never holds two slots with the same identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotSet {
    slots: BTreeMap<SlotId, Slot>,
}

impl SlotSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a slot, returning the previous entry with the same identifier.
    pub fn insert(&mut self, slot: Slot) -> Option<Slot> {
        self.slots.insert(slot.id.clone(), slot)
    }

    /// Returns true if a slot with this identifier is present.
    pub fn contains(&self, id: &SlotId) -> bool {
        self.slots.contains_key(id)
    }

    /// Looks up a slot by identifier.
    pub fn get(&self, id: &SlotId) -> Option<&Slot> {
        self.slots.get(id)
    }

    /// Number of slots in the set.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterates over the slots in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &Slot> {
        self.slots.values()
    }

    /// Iterates over the identifiers.
    pub fn ids(&self) -> impl Iterator<Item = &SlotId> {
        self.slots.keys()
    }

    /// Returns the slots sorted by [`Slot::sort_key`].
    pub fn to_sorted_vec(&self) -> Vec<Slot> {
        let mut slots: Vec<Slot> = self.slots.values().cloned().collect();
        slots.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        slots
    }
}

impl FromIterator<Slot> for SlotSet {
    fn from_iter<I: IntoIterator<Item = Slot>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl Extend<Slot> for SlotSet {
    fn extend<I: IntoIterator<Item = Slot>>(&mut self, iter: I) {
        for slot in iter {
            self.insert(slot);
        }
    }
}

impl IntoIterator for SlotSet {
    type Item = Slot;
    type IntoIter = btree_map::IntoValues<SlotId, Slot>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.into_values()
    }
}
