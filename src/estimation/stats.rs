//! Robust statistics over wait-time samples.
//!
//! The estimator works on small, noisy samples, so every aggregate here
//! is rank-based: interpolated percentiles, an IQR outlier filter, and
//! plain plus weighted medians.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatsError {
    #[error("empty sample input")]
    EmptyInput,
}

/// Percentile with linear interpolation between closest ranks.
///
/// `pct` is clamped to `[0, 100]`. Returns `None` for empty input.
pub fn percentile(values: &[f64], pct: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (sorted.len() - 1) as f64 * pct.clamp(0.0, 100.0) / 100.0;
    let below = rank.floor() as usize;
    let fraction = rank - below as f64;
    match sorted.get(below + 1) {
        Some(above) => Some(sorted[below] + fraction * (above - sorted[below])),
        None => Some(sorted[below]),
    }
}

/// Drops values outside `[Q1 - factor * IQR, Q3 + factor * IQR]`.
///
/// Bounds are inclusive, so a zero spread keeps every identical value.
/// Input order is preserved; empty input yields an empty vector.
pub fn iqr_filter(values: &[f64], factor: f64) -> Vec<f64> {
    let (Some(q1), Some(q3)) = (percentile(values, 25.0), percentile(values, 75.0)) else {
        return Vec::new();
    };
    let spread = q3 - q1;
    let lower = q1 - factor * spread;
    let upper = q3 + factor * spread;
    values
        .iter()
        .copied()
        .filter(|value| (lower..=upper).contains(value))
        .collect()
}

/// Median of the values; even-length input averages the middle pair.
pub fn median(values: &[f64]) -> Result<f64, StatsError> {
    if values.is_empty() {
        return Err(StatsError::EmptyInput);
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Ok(sorted[mid])
    } else {
        Ok((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

/// Weighted median over `(value, weight)` pairs.
///
/// Sorts by value and returns the first value whose cumulative weight
/// reaches half the total. No interpolation takes place, so the result
/// is always one of the input values; when every weight is zero this is
/// the smallest value.
pub fn weighted_median(samples: &[(f64, f64)]) -> Result<f64, StatsError> {
    if samples.is_empty() {
        return Err(StatsError::EmptyInput);
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

    let total: f64 = sorted.iter().map(|(_, weight)| weight).sum();
    let cutoff = total / 2.0;
    let mut cumulative = 0.0;
    for (value, weight) in &sorted {
        cumulative += weight;
        if cumulative >= cutoff {
            return Ok(*value);
        }
    }
    // Unreachable with non-negative weights; guards against rounding.
    Ok(sorted[sorted.len() - 1].0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates_between_ranks() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&values, 25.0), Some(1.75));
        assert_eq!(percentile(&values, 50.0), Some(2.5));
        assert_eq!(percentile(&values, 0.0), Some(1.0));
        assert_eq!(percentile(&values, 100.0), Some(4.0));
    }

    #[test]
    fn percentile_of_nothing_is_none() {
        assert_eq!(percentile(&[], 50.0), None);
    }

    #[test]
    fn median_averages_middle_pair_for_even_lengths() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Ok(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Ok(2.5));
        assert_eq!(median(&[]), Err(StatsError::EmptyInput));
    }

    #[test]
    fn iqr_filter_drops_far_outliers() {
        let values = [30.0, 32.0, 31.0, 29.0, 400.0];
        let kept = iqr_filter(&values, 2.0);
        assert_eq!(kept, vec![30.0, 32.0, 31.0, 29.0]);
    }

    #[test]
    fn iqr_filter_keeps_identical_values() {
        // Zero spread collapses both fences onto the value itself, and
        // the inclusive comparison must still keep everything.
        let values = [45.0, 45.0, 45.0, 45.0];
        assert_eq!(iqr_filter(&values, 2.0), values.to_vec());
    }

    #[test]
    fn iqr_filter_of_nothing_is_empty() {
        assert!(iqr_filter(&[], 2.0).is_empty());
    }

    #[test]
    fn iqr_filter_is_idempotent() {
        let values = [30.0, 32.0, 31.0, 29.0, 400.0];
        let once = iqr_filter(&values, 2.0);
        assert_eq!(iqr_filter(&once, 2.0), once);
    }

    #[test]
    fn weighted_median_with_equal_weights_matches_median() {
        let samples = [(35.0, 0.8), (20.0, 0.8), (50.0, 0.8)];
        assert_eq!(weighted_median(&samples), Ok(35.0));
    }

    #[test]
    fn weighted_median_leans_toward_heavy_values() {
        let samples = [(10.0, 0.1), (50.0, 5.0)];
        assert_eq!(weighted_median(&samples), Ok(50.0));
    }

    #[test]
    fn weighted_median_of_even_input_takes_the_lower_middle() {
        // Unlike `median`, no interpolation: the cumulative weight of the
        // lower middle already reaches half the total.
        let samples = [(10.0, 1.0), (20.0, 1.0), (30.0, 1.0), (40.0, 1.0)];
        assert_eq!(weighted_median(&samples), Ok(20.0));
    }

    #[test]
    fn weighted_median_with_all_zero_weights_is_smallest_value() {
        let samples = [(30.0, 0.0), (10.0, 0.0), (20.0, 0.0)];
        assert_eq!(weighted_median(&samples), Ok(10.0));
    }

    #[test]
    fn weighted_median_of_nothing_is_error() {
        assert_eq!(weighted_median(&[]), Err(StatsError::EmptyInput));
    }
}
