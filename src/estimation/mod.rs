//! Wait-time estimation pipeline.
//!
//! `WaitTimeEstimator` resolves a query to its facility-local time
//! slot, blends the four historical views for that slot, and smooths
//! across the neighboring slot near a boundary. The blended value is
//! clipped to a plausible range and the room-wait offset added on top.

pub mod multi_source;
pub mod recency;
pub mod stats;

pub use multi_source::{ColorDefaults, DefaultWaitTable, EstimatorParams, MultiSourceEstimator};

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;

use crate::error::AppError;
use crate::slots::{RoomWaitTable, SlotMatch, TimeSlot, TimeSlotIndex};
use crate::store::{SampleRepository, UrgencyColor};
use stats::StatsError;

#[derive(Debug, Error)]
pub enum EstimateError {
    #[error(transparent)]
    Store(#[from] AppError),
    #[error(transparent)]
    Stats(#[from] StatsError),
    #[error("no default wait configured for slot {slot}")]
    MissingDefault { slot: String },
}

/// Outcome of a wait-time query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Estimate {
    Minutes(f64),
    /// The query time falls outside every configured slot.
    OffHours,
}

pub struct WaitTimeEstimator<R> {
    core: MultiSourceEstimator<R>,
    slots: Arc<TimeSlotIndex>,
    room_waits: RoomWaitTable,
    params: EstimatorParams,
}

impl<R: SampleRepository> WaitTimeEstimator<R> {
    pub fn new(
        repository: R,
        params: EstimatorParams,
        slots: Arc<TimeSlotIndex>,
        room_waits: RoomWaitTable,
        defaults: DefaultWaitTable,
    ) -> Self {
        Self {
            core: MultiSourceEstimator::new(repository, params.clone(), defaults),
            slots,
            room_waits,
            params,
        }
    }

    /// Estimated wait in minutes for one unit and urgency color at
    /// `query_time`.
    ///
    /// Within a smoothing window of a slot boundary the current and
    /// neighboring slots are both estimated and interpolated linearly,
    /// so the reported wait does not jump when a query crosses the
    /// boundary. The start-side window is checked first and wins when a
    /// short slot puts the query inside both windows.
    pub fn estimate(
        &self,
        unit: &str,
        color: UrgencyColor,
        query_time: OffsetDateTime,
    ) -> Result<Estimate, EstimateError> {
        let (matched, local_time) = self.slots.resolve(query_time);
        let slot = match matched {
            SlotMatch::Within(slot) => slot,
            SlotMatch::OffHours => return Ok(Estimate::OffHours),
        };

        let window = self.params.smoothing_window_minutes;
        let since_start = minutes_between(local_time.replace_time(slot.start), local_time);
        let until_end = minutes_between(local_time, local_time.replace_time(slot.end));
        let (previous, next) = self.slots.adjacent(&slot.label);

        let raw = if since_start < window && let Some(previous) = previous {
            self.blend(unit, color, local_time, slot, previous, since_start / window)?
        } else if until_end < window && let Some(next) = next {
            self.blend(unit, color, local_time, slot, next, until_end / window)?
        } else {
            self.core.slot_estimate(unit, color, local_time, &slot.label)?
        };

        let clipped = raw.clamp(self.params.min_wait_minutes, self.params.max_wait_minutes);
        let offset = self.room_waits.offset_at(local_time.time());
        Ok(Estimate::Minutes(clipped + offset))
    }

    /// `(1 - t) * current + t * neighbor`, both slots estimated at the
    /// same query time.
    fn blend(
        &self,
        unit: &str,
        color: UrgencyColor,
        local_time: OffsetDateTime,
        slot: &TimeSlot,
        neighbor: &TimeSlot,
        t: f64,
    ) -> Result<f64, EstimateError> {
        let current = self.core.slot_estimate(unit, color, local_time, &slot.label)?;
        let adjacent = self.core.slot_estimate(unit, color, local_time, &neighbor.label)?;
        Ok((1.0 - t) * current + t * adjacent)
    }
}

fn minutes_between(earlier: OffsetDateTime, later: OffsetDateTime) -> f64 {
    (later - earlier).as_seconds_f64() / 60.0
}
