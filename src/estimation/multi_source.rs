//! Multi-source blending over the four historical views.
//!
//! For one slot the estimator queries four concepts, ordered by
//! specificity:
//!
//! - C1: same unit, day, and slot (IQR-filtered plain median)
//! - C2: same unit, weekday, and slot (recency-weighted median)
//! - C3: same unit and slot, all days (recency-weighted median)
//! - C4: same slot across every unit (IQR-filtered median, static
//!   default when no unit has data)
//!
//! The concepts are blended by a fixed hierarchy: pick a primary,
//! tilt toward the weekday view in proportion to its sample count, and
//! lean on the cross-unit view when a fallback primary has thin
//! history. The result here is raw; the caller clips it and adds the
//! room-wait offset.

use std::collections::HashMap;

use time::{Date, OffsetDateTime};
use tracing::debug;

use crate::estimation::EstimateError;
use crate::estimation::recency::temporal_weights;
use crate::estimation::stats::{iqr_filter, median, weighted_median};
use crate::store::{SampleRepository, SampleSet, UrgencyColor, WaitSample};

/// Tuning knobs for the blending hierarchy and the outer clip.
///
/// Doubles as the `[estimator]` config section; every field falls back
/// to its default when omitted.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct EstimatorParams {
    pub min_wait_minutes: f64,
    pub max_wait_minutes: f64,
    pub concept1_min_samples: usize,
    pub concept3_min_samples: usize,
    pub iqr_factor: f64,
    pub decay_rate: f64,
    pub smoothing_window_minutes: f64,
}

impl Default for EstimatorParams {
    fn default() -> Self {
        Self {
            min_wait_minutes: 5.0,
            max_wait_minutes: 360.0,
            concept1_min_samples: 1,
            concept3_min_samples: 5,
            iqr_factor: 2.0,
            decay_rate: 0.8,
            smoothing_window_minutes: 75.0,
        }
    }
}

/// Static per-color default waits for one slot, used when the
/// cross-unit view has no samples at all.
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
pub struct ColorDefaults {
    pub blue: f64,
    pub green: f64,
    pub yellow: f64,
    pub orange: f64,
    pub red: f64,
}

impl ColorDefaults {
    pub fn wait_for(&self, color: UrgencyColor) -> f64 {
        match color {
            UrgencyColor::Blue => self.blue,
            UrgencyColor::Green => self.green,
            UrgencyColor::Yellow => self.yellow,
            UrgencyColor::Orange => self.orange,
            UrgencyColor::Red => self.red,
        }
    }
}

/// Slot-keyed table of static default waits.
#[derive(Debug, Clone, Default)]
pub struct DefaultWaitTable {
    by_slot: HashMap<String, ColorDefaults>,
}

impl DefaultWaitTable {
    pub fn new(by_slot: HashMap<String, ColorDefaults>) -> Self {
        Self { by_slot }
    }

    pub fn wait_for(&self, slot: &str, color: UrgencyColor) -> Option<f64> {
        self.by_slot.get(slot).map(|defaults| defaults.wait_for(color))
    }

    pub fn covers(&self, slot: &str) -> bool {
        self.by_slot.contains_key(slot)
    }
}

/// Produces one raw slot estimate from the four repository views.
pub struct MultiSourceEstimator<R> {
    repository: R,
    params: EstimatorParams,
    defaults: DefaultWaitTable,
}

impl<R: SampleRepository> MultiSourceEstimator<R> {
    pub fn new(repository: R, params: EstimatorParams, defaults: DefaultWaitTable) -> Self {
        Self {
            repository,
            params,
            defaults,
        }
    }

    /// Raw blended estimate for one slot at the given facility-local
    /// query time. Clipping and the room-wait offset are the caller's.
    pub fn slot_estimate(
        &self,
        unit: &str,
        color: UrgencyColor,
        local_time: OffsetDateTime,
        slot: &str,
    ) -> Result<f64, EstimateError> {
        let query_date = local_time.date();
        let weekday = local_time.weekday().number_days_from_monday();

        let c1 = self
            .repository
            .samples_by_unit_day_slot_color(unit, color, slot, query_date)?;
        let s1 = iqr_filter(&minutes(&c1), self.params.iqr_factor);
        let n1 = s1.len();
        let m1 = if s1.is_empty() { None } else { Some(median(&s1)?) };

        let c2 = self
            .repository
            .samples_by_unit_color_slot_weekday(unit, color, slot, weekday)?;
        let n2 = c2.len();
        let m2 = self.weighted_estimate(&c2, query_date)?;

        let c3 = self
            .repository
            .samples_by_unit_slot_color_all_days(unit, color, slot)?;
        let n3 = c3.len();
        let m3 = self.weighted_estimate(&c3, query_date)?;

        let c4 = self.repository.samples_by_color_slot_all_units(color, slot)?;
        let s4 = iqr_filter(&minutes(&c4), self.params.iqr_factor);
        let n4 = s4.len();
        let m4 = if s4.is_empty() {
            self.defaults
                .wait_for(slot, color)
                .ok_or_else(|| EstimateError::MissingDefault {
                    slot: slot.to_string(),
                })?
        } else {
            median(&s4)?
        };

        debug!(unit, %color, slot, n1, n2, n3, n4, "concept sample counts");

        // Primary source: same-day evidence first, then slot history,
        // then the cross-unit view. A same-day set at exactly the
        // minimum count still raises the fallback flag, so step 3 can
        // pull a lone sample toward the cross-unit view.
        let mut fell_back_to_c3 = false;
        let (mut estimate, mut total_n) = match m1 {
            Some(m1) if n1 >= self.params.concept1_min_samples => {
                fell_back_to_c3 = n1 == self.params.concept1_min_samples;
                (m1, n1)
            }
            _ => match m3 {
                Some(m3) => {
                    fell_back_to_c3 = true;
                    (m3, n3)
                }
                None => (m4, n4),
            },
        };

        // Weekday evidence tilts the estimate in proportion to its
        // sample count.
        if let Some(m2) = m2 {
            let w2 = n2 as f64 / (total_n + n2) as f64;
            estimate = (1.0 - w2) * estimate + w2 * m2;
            total_n += n2;
        }

        // A fallback primary with thin history leans on the cross-unit
        // view. The threshold rises with the weekday count so heavy C2
        // evidence demands more history before the correction is
        // skipped.
        let threshold = self.params.concept3_min_samples.max(n2);
        if fell_back_to_c3 && n3 < threshold {
            let w4 = n4 as f64 / (total_n + n4) as f64;
            estimate = (1.0 - w4) * estimate + w4 * m4;
        }

        Ok(estimate)
    }

    fn weighted_estimate(
        &self,
        samples: &SampleSet,
        reference: Date,
    ) -> Result<Option<f64>, EstimateError> {
        if samples.is_empty() {
            return Ok(None);
        }
        let dates: Vec<Date> = samples.iter().map(|sample| sample.occurred_on).collect();
        let weights = temporal_weights(&dates, reference, self.params.decay_rate);
        let pairs: Vec<(f64, f64)> = samples
            .iter()
            .zip(weights)
            .map(|(sample, weight)| (sample.elapsed_minutes, weight))
            .collect();
        Ok(Some(weighted_median(&pairs)?))
    }
}

fn minutes(samples: &[WaitSample]) -> Vec<f64> {
    samples.iter().map(|sample| sample.elapsed_minutes).collect()
}
