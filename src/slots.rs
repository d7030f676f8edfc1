//! Time-of-day slot machinery for the estimation pipeline.
//!
//! Incoming timestamps are UTC instants. They are shifted to the
//! facility's local offset and matched against the configured daily
//! slots; times outside every slot resolve to off-hours.

use thiserror::Error;
use time::{OffsetDateTime, Time, UtcOffset};

/// Label stored for observations recorded outside every configured slot.
pub const OFF_HOURS_LABEL: &str = "off-hours";

/// A slot label that is not part of the configured table. Points at a
/// configuration or programming bug, not at bad request data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown time slot label: {0}")]
pub struct InvalidSlot(pub String);

/// One half-open daily interval `[start, end)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSlot {
    pub label: String,
    pub start: Time,
    pub end: Time,
}

impl TimeSlot {
    /// Builds a slot with its canonical `HH:MM-HH:MM` label.
    pub fn new(start: Time, end: Time) -> Self {
        let label = format!(
            "{:02}:{:02}-{:02}:{:02}",
            start.hour(),
            start.minute(),
            end.hour(),
            end.minute()
        );
        Self { label, start, end }
    }

    pub fn contains(&self, clock: Time) -> bool {
        self.start <= clock && clock < self.end
    }
}

/// Result of matching a local clock time against the slot table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlotMatch<'a> {
    Within(&'a TimeSlot),
    OffHours,
}

/// Ordered, non-overlapping daily slots plus the facility's UTC offset.
#[derive(Debug, Clone)]
pub struct TimeSlotIndex {
    slots: Vec<TimeSlot>,
    local_offset: UtcOffset,
}

impl TimeSlotIndex {
    pub fn new(slots: Vec<TimeSlot>, local_offset: UtcOffset) -> Self {
        Self {
            slots,
            local_offset,
        }
    }

    pub fn local_offset(&self) -> UtcOffset {
        self.local_offset
    }

    pub fn slots(&self) -> &[TimeSlot] {
        &self.slots
    }

    /// Shifts `timestamp` to facility-local time and matches its clock
    /// component against the slot table. Returns the match together with
    /// the localized timestamp.
    pub fn resolve(&self, timestamp: OffsetDateTime) -> (SlotMatch<'_>, OffsetDateTime) {
        let local = timestamp.to_offset(self.local_offset);
        let clock = local.time();
        match self.slots.iter().find(|slot| slot.contains(clock)) {
            Some(slot) => (SlotMatch::Within(slot), local),
            None => (SlotMatch::OffHours, local),
        }
    }

    /// Start and end times of the slot with the given label.
    pub fn boundaries(&self, label: &str) -> Result<(Time, Time), InvalidSlot> {
        self.slots
            .iter()
            .find(|slot| slot.label == label)
            .map(|slot| (slot.start, slot.end))
            .ok_or_else(|| InvalidSlot(label.to_string()))
    }

    /// Chronological neighbors of the named slot. Edge slots and unknown
    /// labels yield `None` on the missing side.
    pub fn adjacent(&self, label: &str) -> (Option<&TimeSlot>, Option<&TimeSlot>) {
        let Some(position) = self.slots.iter().position(|slot| slot.label == label) else {
            return (None, None);
        };
        let previous = position.checked_sub(1).and_then(|i| self.slots.get(i));
        let next = self.slots.get(position + 1);
        (previous, next)
    }
}

/// Extra minutes spent in the classification room during one daily interval.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomWaitSlot {
    pub start: Time,
    pub end: Time,
    pub minutes: f64,
}

/// Lookup table for the room-wait offset added on top of queue estimates.
#[derive(Debug, Clone, Default)]
pub struct RoomWaitTable {
    entries: Vec<RoomWaitSlot>,
}

impl RoomWaitTable {
    pub fn new(entries: Vec<RoomWaitSlot>) -> Self {
        Self { entries }
    }

    /// Offset for the given local clock time; zero outside every interval.
    pub fn offset_at(&self, clock: Time) -> f64 {
        self.entries
            .iter()
            .find(|entry| entry.start <= clock && clock < entry.end)
            .map(|entry| entry.minutes)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, time};

    fn morning_slots() -> TimeSlotIndex {
        let offset = UtcOffset::from_hms(-3, 0, 0).expect("valid offset");
        TimeSlotIndex::new(
            vec![
                TimeSlot::new(time!(5:00), time!(8:00)),
                TimeSlot::new(time!(8:00), time!(11:30)),
                TimeSlot::new(time!(11:30), time!(15:00)),
            ],
            offset,
        )
    }

    #[test]
    fn labels_are_derived_from_boundaries() {
        let slot = TimeSlot::new(time!(8:00), time!(11:30));
        assert_eq!(slot.label, "08:00-11:30");
    }

    #[test]
    fn resolve_matches_slot_in_local_time() {
        let index = morning_slots();
        // 12:30 UTC is 09:30 local at UTC-3.
        let (matched, local) = index.resolve(datetime!(2025-06-04 12:30 UTC));
        match matched {
            SlotMatch::Within(slot) => assert_eq!(slot.label, "08:00-11:30"),
            SlotMatch::OffHours => panic!("expected an in-slot match"),
        }
        assert_eq!(local.time(), time!(9:30));
        assert_eq!(local.offset(), UtcOffset::from_hms(-3, 0, 0).expect("valid offset"));
    }

    #[test]
    fn resolve_start_is_inclusive_and_end_exclusive() {
        let index = morning_slots();
        // Local 08:00 exactly belongs to the second slot, not the first.
        let (matched, _) = index.resolve(datetime!(2025-06-04 11:00 UTC));
        match matched {
            SlotMatch::Within(slot) => assert_eq!(slot.label, "08:00-11:30"),
            SlotMatch::OffHours => panic!("expected an in-slot match"),
        }
    }

    #[test]
    fn resolve_outside_all_slots_is_off_hours() {
        let index = morning_slots();
        // Local 02:00 precedes the first slot.
        let (matched, _) = index.resolve(datetime!(2025-06-04 5:00 UTC));
        assert_eq!(matched, SlotMatch::OffHours);
    }

    #[test]
    fn adjacent_reports_neighbors_and_edges() {
        let index = morning_slots();
        let (previous, next) = index.adjacent("08:00-11:30");
        assert_eq!(previous.map(|s| s.label.as_str()), Some("05:00-08:00"));
        assert_eq!(next.map(|s| s.label.as_str()), Some("11:30-15:00"));

        let (previous, next) = index.adjacent("05:00-08:00");
        assert!(previous.is_none());
        assert_eq!(next.map(|s| s.label.as_str()), Some("08:00-11:30"));

        let (previous, next) = index.adjacent("23:00-23:30");
        assert!(previous.is_none());
        assert!(next.is_none());
    }

    #[test]
    fn boundaries_rejects_unknown_labels() {
        let index = morning_slots();
        assert_eq!(
            index.boundaries("05:00-08:00"),
            Ok((time!(5:00), time!(8:00)))
        );
        assert_eq!(
            index.boundaries("10:00-10:30"),
            Err(InvalidSlot("10:00-10:30".to_string()))
        );
    }

    #[test]
    fn room_wait_offset_defaults_to_zero() {
        let table = RoomWaitTable::new(vec![
            RoomWaitSlot {
                start: time!(5:00),
                end: time!(7:00),
                minutes: 15.0,
            },
            RoomWaitSlot {
                start: time!(7:00),
                end: time!(11:00),
                minutes: 25.0,
            },
        ]);
        assert_eq!(table.offset_at(time!(6:15)), 15.0);
        assert_eq!(table.offset_at(time!(7:00)), 25.0);
        assert_eq!(table.offset_at(time!(23:45)), 0.0);
    }
}
