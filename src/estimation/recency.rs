//! Recency weighting for historical samples.
//!
//! Each sample is weighted by `decay_rate ^ n`, where `n` is the
//! business-day distance between the sample date and the query date.
//! Same-day and later samples weigh zero; today's observations enter
//! the blend only through the same-day lookup.

use time::Date;

/// Inclusive count of Monday-Friday calendar days from `start` to `end`.
/// Zero when `start` falls on or after `end`.
pub fn business_days_between(start: Date, end: Date) -> u32 {
    if start >= end {
        return 0;
    }
    let mut count = 0;
    let mut day = start;
    while day <= end {
        if day.weekday().number_days_from_monday() < 5 {
            count += 1;
        }
        match day.next_day() {
            Some(next) => day = next,
            None => break,
        }
    }
    count
}

/// Decay weight for each sample date relative to `reference`.
pub fn temporal_weights(dates: &[Date], reference: Date, decay_rate: f64) -> Vec<f64> {
    dates
        .iter()
        .map(|date| {
            let distance = business_days_between(*date, reference);
            if distance == 0 {
                0.0
            } else {
                decay_rate.powi(distance as i32)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn same_day_and_future_dates_count_zero() {
        assert_eq!(business_days_between(date!(2025 - 06 - 04), date!(2025 - 06 - 04)), 0);
        assert_eq!(business_days_between(date!(2025 - 06 - 05), date!(2025 - 06 - 04)), 0);
    }

    #[test]
    fn count_is_inclusive_and_skips_weekends() {
        // Monday through Wednesday.
        assert_eq!(business_days_between(date!(2025 - 06 - 02), date!(2025 - 06 - 04)), 3);
        // Friday through Monday crosses a weekend.
        assert_eq!(business_days_between(date!(2025 - 06 - 06), date!(2025 - 06 - 09)), 2);
    }

    #[test]
    fn weights_follow_decay_powers() {
        let reference = date!(2025 - 06 - 04);
        let dates = [
            date!(2025 - 06 - 04), // same day
            date!(2025 - 06 - 03), // two inclusive business days back
            date!(2025 - 06 - 02),
            date!(2025 - 05 - 30), // previous Friday
        ];
        let weights = temporal_weights(&dates, reference, 0.8);
        assert_eq!(weights[0], 0.0);
        assert!((weights[1] - 0.8f64.powi(2)).abs() < 1e-12);
        assert!((weights[2] - 0.8f64.powi(3)).abs() < 1e-12);
        assert!((weights[3] - 0.8f64.powi(4)).abs() < 1e-12);
        // Older samples never outweigh newer ones.
        assert!(weights[1] > weights[2] && weights[2] > weights[3]);
    }

    #[test]
    fn weekend_only_span_weighs_zero() {
        // A Saturday sample queried on Sunday spans no business days.
        let weights = temporal_weights(&[date!(2025 - 06 - 07)], date!(2025 - 06 - 08), 0.8);
        assert_eq!(weights, vec![0.0]);
    }
}
