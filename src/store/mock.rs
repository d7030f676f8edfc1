//! Scripted repository for estimator tests.

use std::collections::HashMap;

use time::Date;

use crate::error::AppError;
use crate::store::{SampleRepository, SampleSet, UrgencyColor};

/// Test repository returning canned sample sets per slot label.
///
/// Unit, color, day, and weekday arguments are accepted but ignored;
/// tests drive one unit and color at a time and script each of the four
/// views separately.
#[derive(Debug, Clone, Default)]
pub struct MockRepository {
    same_day: HashMap<String, SampleSet>,
    same_weekday: HashMap<String, SampleSet>,
    all_days: HashMap<String, SampleSet>,
    cross_unit: HashMap<String, SampleSet>,
    fail_queries: bool,
}

impl MockRepository {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Repository whose every query fails with a poisoned-lock error.
    pub fn failing() -> Self {
        Self {
            fail_queries: true,
            ..Self::default()
        }
    }

    pub fn with_same_day(mut self, slot: &str, samples: SampleSet) -> Self {
        self.same_day.insert(slot.to_string(), samples);
        self
    }

    pub fn with_same_weekday(mut self, slot: &str, samples: SampleSet) -> Self {
        self.same_weekday.insert(slot.to_string(), samples);
        self
    }

    pub fn with_all_days(mut self, slot: &str, samples: SampleSet) -> Self {
        self.all_days.insert(slot.to_string(), samples);
        self
    }

    pub fn with_cross_unit(mut self, slot: &str, samples: SampleSet) -> Self {
        self.cross_unit.insert(slot.to_string(), samples);
        self
    }

    fn lookup(&self, table: &HashMap<String, SampleSet>, slot: &str) -> Result<SampleSet, AppError> {
        if self.fail_queries {
            return Err(AppError::StateLock);
        }
        Ok(table.get(slot).cloned().unwrap_or_default())
    }
}

impl SampleRepository for MockRepository {
    fn samples_by_unit_day_slot_color(
        &self,
        _unit: &str,
        _color: UrgencyColor,
        slot: &str,
        _day: Date,
    ) -> Result<SampleSet, AppError> {
        self.lookup(&self.same_day, slot)
    }

    fn samples_by_unit_slot_color_all_days(
        &self,
        _unit: &str,
        _color: UrgencyColor,
        slot: &str,
    ) -> Result<SampleSet, AppError> {
        self.lookup(&self.all_days, slot)
    }

    fn samples_by_unit_color_slot_weekday(
        &self,
        _unit: &str,
        _color: UrgencyColor,
        slot: &str,
        _weekday: u8,
    ) -> Result<SampleSet, AppError> {
        self.lookup(&self.same_weekday, slot)
    }

    fn samples_by_color_slot_all_units(
        &self,
        _color: UrgencyColor,
        slot: &str,
    ) -> Result<SampleSet, AppError> {
        self.lookup(&self.cross_unit, slot)
    }
}
