//! Observation storage and the repository seam the estimator reads from.

pub mod cache;
pub mod memory;
pub mod mock;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::Date;

use crate::error::AppError;

/// Triage severity assigned at classification time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyColor {
    #[serde(alias = "b")]
    Blue,
    #[serde(alias = "g")]
    Green,
    #[serde(alias = "y")]
    Yellow,
    #[serde(alias = "o")]
    Orange,
    #[serde(alias = "r")]
    Red,
}

impl UrgencyColor {
    pub const ALL: [UrgencyColor; 5] = [
        UrgencyColor::Blue,
        UrgencyColor::Green,
        UrgencyColor::Yellow,
        UrgencyColor::Orange,
        UrgencyColor::Red,
    ];

    pub fn name(self) -> &'static str {
        match self {
            UrgencyColor::Blue => "blue",
            UrgencyColor::Green => "green",
            UrgencyColor::Yellow => "yellow",
            UrgencyColor::Orange => "orange",
            UrgencyColor::Red => "red",
        }
    }
}

impl fmt::Display for UrgencyColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of queue event reported by a facility, as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Intake,
    Classification,
}

/// Validated event handed to the store. A classification always carries
/// the color assigned to the patient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StoreEvent {
    Intake,
    Classification { color: UrgencyColor },
}

/// One completed wait, inferred from a paired intake/classification.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitObservation {
    pub unit: String,
    pub color: UrgencyColor,
    pub elapsed_minutes: f64,
    pub occurred_on: Date,
    /// Slot label of the classification time, or the off-hours sentinel.
    pub time_slot: String,
    /// 0 = Monday.
    pub weekday: u8,
}

/// Projection of an observation consumed by the estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitSample {
    pub elapsed_minutes: f64,
    pub occurred_on: Date,
}

impl WaitSample {
    pub fn new(elapsed_minutes: f64, occurred_on: Date) -> Self {
        Self {
            elapsed_minutes,
            occurred_on,
        }
    }
}

pub type SampleSet = Vec<WaitSample>;

/// A registered care unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitRecord {
    pub name: String,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Read-side lookup surface of the observation store.
///
/// Each method returns the samples matching one historical view; an
/// empty set means no matching observations, never a failure.
pub trait SampleRepository {
    /// Observations for one unit, color, and slot on a single day.
    fn samples_by_unit_day_slot_color(
        &self,
        unit: &str,
        color: UrgencyColor,
        slot: &str,
        day: Date,
    ) -> Result<SampleSet, AppError>;

    /// Observations for one unit, color, and slot across all days.
    fn samples_by_unit_slot_color_all_days(
        &self,
        unit: &str,
        color: UrgencyColor,
        slot: &str,
    ) -> Result<SampleSet, AppError>;

    /// Observations for one unit, color, and slot on a given weekday.
    fn samples_by_unit_color_slot_weekday(
        &self,
        unit: &str,
        color: UrgencyColor,
        slot: &str,
        weekday: u8,
    ) -> Result<SampleSet, AppError>;

    /// Observations for one color and slot across every unit.
    fn samples_by_color_slot_all_units(
        &self,
        color: UrgencyColor,
        slot: &str,
    ) -> Result<SampleSet, AppError>;
}

impl<R: SampleRepository + ?Sized> SampleRepository for Arc<R> {
    fn samples_by_unit_day_slot_color(
        &self,
        unit: &str,
        color: UrgencyColor,
        slot: &str,
        day: Date,
    ) -> Result<SampleSet, AppError> {
        (**self).samples_by_unit_day_slot_color(unit, color, slot, day)
    }

    fn samples_by_unit_slot_color_all_days(
        &self,
        unit: &str,
        color: UrgencyColor,
        slot: &str,
    ) -> Result<SampleSet, AppError> {
        (**self).samples_by_unit_slot_color_all_days(unit, color, slot)
    }

    fn samples_by_unit_color_slot_weekday(
        &self,
        unit: &str,
        color: UrgencyColor,
        slot: &str,
        weekday: u8,
    ) -> Result<SampleSet, AppError> {
        (**self).samples_by_unit_color_slot_weekday(unit, color, slot, weekday)
    }

    fn samples_by_color_slot_all_units(
        &self,
        color: UrgencyColor,
        slot: &str,
    ) -> Result<SampleSet, AppError> {
        (**self).samples_by_color_slot_all_units(color, slot)
    }
}

/// Salted hex SHA-256 of a patient pseudonym. Raw pseudonyms are never
/// stored or logged.
pub fn hash_pseudonym(pseudonym: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(pseudonym.as_bytes());
    hex::encode(hasher.finalize())
}
