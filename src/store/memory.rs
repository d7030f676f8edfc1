//! In-memory observation store.
//!
//! Pairs intake and classification events per patient and unit; each
//! completed pair becomes one wait observation keyed by the
//! classification's local day, weekday, and time slot. Patients are
//! tracked only as salted hashes of their pseudonyms.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use time::{Date, OffsetDateTime};
use tracing::{debug, warn};

use crate::error::AppError;
use crate::slots::{OFF_HOURS_LABEL, SlotMatch, TimeSlotIndex};
use crate::store::{
    SampleRepository, SampleSet, StoreEvent, UnitRecord, UrgencyColor, WaitObservation,
    WaitSample, hash_pseudonym,
};

pub struct MemoryStore {
    salt: String,
    slots: Arc<TimeSlotIndex>,
    inner: RwLock<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    /// Keys are (patient hash, unit).
    pending_intakes: HashMap<(String, String), OffsetDateTime>,
    observations: HashMap<(String, String), WaitObservation>,
    units: BTreeMap<String, UnitRecord>,
}

impl MemoryStore {
    pub fn new(salt: impl Into<String>, slots: Arc<TimeSlotIndex>) -> Self {
        Self {
            salt: salt.into(),
            slots,
            inner: RwLock::new(StoreInner::default()),
        }
    }

    /// Records one queue event.
    ///
    /// An intake starts the visit over for its patient and unit: it
    /// clears any stored observation and replaces any pending intake. A
    /// classification pairs with the pending intake and yields the
    /// elapsed minutes of the completed pair; without a pending intake
    /// it is ignored. The pending intake is kept afterwards, so a
    /// corrected classification re-pairs with the same intake.
    pub fn ingest_event(
        &self,
        pseudonym: &str,
        unit: &str,
        event: StoreEvent,
        timestamp: OffsetDateTime,
    ) -> Result<Option<f64>, AppError> {
        let patient = hash_pseudonym(pseudonym, &self.salt);
        let key = (patient, unit.to_string());
        let mut inner = self.inner.write().map_err(|_| AppError::StateLock)?;
        match event {
            StoreEvent::Intake => {
                inner.observations.remove(&key);
                inner.pending_intakes.insert(key, timestamp);
                Ok(None)
            }
            StoreEvent::Classification { color } => {
                let Some(intake_at) = inner.pending_intakes.get(&key).copied() else {
                    debug!(unit, "classification without pending intake ignored");
                    return Ok(None);
                };
                let elapsed_minutes = (timestamp - intake_at).as_seconds_f64() / 60.0;
                if elapsed_minutes < 0.0 {
                    warn!(unit, elapsed_minutes, "classification precedes intake, event dropped");
                    return Ok(None);
                }
                let (matched, local) = self.slots.resolve(timestamp);
                let time_slot = match matched {
                    SlotMatch::Within(slot) => slot.label.clone(),
                    SlotMatch::OffHours => OFF_HOURS_LABEL.to_string(),
                };
                let observation = WaitObservation {
                    unit: unit.to_string(),
                    color,
                    elapsed_minutes,
                    occurred_on: local.date(),
                    time_slot,
                    weekday: local.weekday().number_days_from_monday(),
                };
                inner.observations.insert(key, observation);
                Ok(Some(elapsed_minutes))
            }
        }
    }

    pub fn register_unit(&self, record: UnitRecord) -> Result<(), AppError> {
        let mut inner = self.inner.write().map_err(|_| AppError::StateLock)?;
        inner.units.insert(record.name.clone(), record);
        Ok(())
    }

    /// Registered units in name order.
    pub fn units(&self) -> Result<Vec<UnitRecord>, AppError> {
        let inner = self.inner.read().map_err(|_| AppError::StateLock)?;
        Ok(inner.units.values().cloned().collect())
    }

    fn collect<F>(&self, matches: F) -> Result<SampleSet, AppError>
    where
        F: Fn(&WaitObservation) -> bool,
    {
        let inner = self.inner.read().map_err(|_| AppError::StateLock)?;
        let mut samples: SampleSet = inner
            .observations
            .values()
            .filter(|observation| matches(observation))
            .map(|observation| WaitSample::new(observation.elapsed_minutes, observation.occurred_on))
            .collect();
        // Map iteration order is arbitrary; return a stable ordering.
        samples.sort_by(|a, b| {
            a.occurred_on
                .cmp(&b.occurred_on)
                .then_with(|| a.elapsed_minutes.total_cmp(&b.elapsed_minutes))
        });
        Ok(samples)
    }
}

impl SampleRepository for MemoryStore {
    fn samples_by_unit_day_slot_color(
        &self,
        unit: &str,
        color: UrgencyColor,
        slot: &str,
        day: Date,
    ) -> Result<SampleSet, AppError> {
        self.collect(|o| {
            o.unit == unit && o.color == color && o.time_slot == slot && o.occurred_on == day
        })
    }

    fn samples_by_unit_slot_color_all_days(
        &self,
        unit: &str,
        color: UrgencyColor,
        slot: &str,
    ) -> Result<SampleSet, AppError> {
        self.collect(|o| o.unit == unit && o.color == color && o.time_slot == slot)
    }

    fn samples_by_unit_color_slot_weekday(
        &self,
        unit: &str,
        color: UrgencyColor,
        slot: &str,
        weekday: u8,
    ) -> Result<SampleSet, AppError> {
        self.collect(|o| {
            o.unit == unit && o.color == color && o.time_slot == slot && o.weekday == weekday
        })
    }

    fn samples_by_color_slot_all_units(
        &self,
        color: UrgencyColor,
        slot: &str,
    ) -> Result<SampleSet, AppError> {
        self.collect(|o| o.color == color && o.time_slot == slot)
    }
}
