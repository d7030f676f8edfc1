//! TTL-bounded LRU cache over repository queries.
//!
//! The cache wraps a `SampleRepository` without changing its contract:
//! within the TTL a hit returns exactly what the wrapped repository
//! returned for the same key. Lock failures inside the cache degrade to
//! misses instead of surfacing errors.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;
use time::Date;

use crate::error::AppError;
use crate::store::{SampleRepository, SampleSet, UrgencyColor};

/// Key identifying one repository lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    UnitDaySlotColor {
        unit: String,
        color: UrgencyColor,
        slot: String,
        day: Date,
    },
    UnitSlotColorAllDays {
        unit: String,
        color: UrgencyColor,
        slot: String,
    },
    UnitColorSlotWeekday {
        unit: String,
        color: UrgencyColor,
        slot: String,
        weekday: u8,
    },
    ColorSlotAllUnits {
        color: UrgencyColor,
        slot: String,
    },
}

struct CacheEntry {
    samples: SampleSet,
    expire_at: Instant,
}

/// Bounded query cache with per-entry expiry.
pub struct QueryCache {
    entries: Mutex<LruCache<QueryKey, CacheEntry>>,
    ttl: Duration,
}

impl QueryCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Unexpired samples for `key`, if cached. Expired entries are
    /// evicted on the way out.
    pub fn get(&self, key: &QueryKey, now: Instant) -> Option<SampleSet> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some(entry) if entry.expire_at > now => Some(entry.samples.clone()),
            Some(_) => {
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: QueryKey, samples: SampleSet, now: Instant) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        entries.put(
            key,
            CacheEntry {
                samples,
                expire_at: now + self.ttl,
            },
        );
    }
}

/// Caching wrapper around a repository.
pub struct CachedStore<R> {
    inner: R,
    cache: QueryCache,
}

impl<R> CachedStore<R> {
    pub fn new(inner: R, cache: QueryCache) -> Self {
        Self { inner, cache }
    }
}

impl<R: SampleRepository> CachedStore<R> {
    fn fetch<F>(&self, key: QueryKey, load: F) -> Result<SampleSet, AppError>
    where
        F: FnOnce() -> Result<SampleSet, AppError>,
    {
        let now = Instant::now();
        if let Some(samples) = self.cache.get(&key, now) {
            return Ok(samples);
        }
        let samples = load()?;
        self.cache.insert(key, samples.clone(), now);
        Ok(samples)
    }
}

impl<R: SampleRepository> SampleRepository for CachedStore<R> {
    fn samples_by_unit_day_slot_color(
        &self,
        unit: &str,
        color: UrgencyColor,
        slot: &str,
        day: Date,
    ) -> Result<SampleSet, AppError> {
        self.fetch(
            QueryKey::UnitDaySlotColor {
                unit: unit.to_string(),
                color,
                slot: slot.to_string(),
                day,
            },
            || self.inner.samples_by_unit_day_slot_color(unit, color, slot, day),
        )
    }

    fn samples_by_unit_slot_color_all_days(
        &self,
        unit: &str,
        color: UrgencyColor,
        slot: &str,
    ) -> Result<SampleSet, AppError> {
        self.fetch(
            QueryKey::UnitSlotColorAllDays {
                unit: unit.to_string(),
                color,
                slot: slot.to_string(),
            },
            || self.inner.samples_by_unit_slot_color_all_days(unit, color, slot),
        )
    }

    fn samples_by_unit_color_slot_weekday(
        &self,
        unit: &str,
        color: UrgencyColor,
        slot: &str,
        weekday: u8,
    ) -> Result<SampleSet, AppError> {
        self.fetch(
            QueryKey::UnitColorSlotWeekday {
                unit: unit.to_string(),
                color,
                slot: slot.to_string(),
                weekday,
            },
            || self.inner.samples_by_unit_color_slot_weekday(unit, color, slot, weekday),
        )
    }

    fn samples_by_color_slot_all_units(
        &self,
        color: UrgencyColor,
        slot: &str,
    ) -> Result<SampleSet, AppError> {
        self.fetch(
            QueryKey::ColorSlotAllUnits {
                color,
                slot: slot.to_string(),
            },
            || self.inner.samples_by_color_slot_all_units(color, slot),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::WaitSample;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use time::macros::date;

    fn key(slot: &str) -> QueryKey {
        QueryKey::ColorSlotAllUnits {
            color: UrgencyColor::Green,
            slot: slot.to_string(),
        }
    }

    fn samples(value: f64) -> SampleSet {
        vec![WaitSample::new(value, date!(2025 - 06 - 04))]
    }

    #[test]
    fn entries_expire_after_the_ttl() {
        let cache = QueryCache::new(16, Duration::from_secs(720));
        let start = Instant::now();
        cache.insert(key("08:00-11:30"), samples(30.0), start);

        let shortly_after = start + Duration::from_secs(10);
        assert_eq!(cache.get(&key("08:00-11:30"), shortly_after), Some(samples(30.0)));

        let past_ttl = start + Duration::from_secs(721);
        assert_eq!(cache.get(&key("08:00-11:30"), past_ttl), None);
        // The expired entry was evicted, not just skipped.
        assert_eq!(cache.get(&key("08:00-11:30"), shortly_after), None);
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let cache = QueryCache::new(2, Duration::from_secs(720));
        let now = Instant::now();
        cache.insert(key("a"), samples(1.0), now);
        cache.insert(key("b"), samples(2.0), now);
        cache.insert(key("c"), samples(3.0), now);

        let later = now + Duration::from_secs(1);
        assert_eq!(cache.get(&key("a"), later), None);
        assert_eq!(cache.get(&key("b"), later), Some(samples(2.0)));
        assert_eq!(cache.get(&key("c"), later), Some(samples(3.0)));
    }

    struct CountingRepository {
        calls: AtomicUsize,
        samples: SampleSet,
    }

    impl CountingRepository {
        fn new(samples: SampleSet) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                samples,
            }
        }
    }

    impl SampleRepository for CountingRepository {
        fn samples_by_unit_day_slot_color(
            &self,
            _unit: &str,
            _color: UrgencyColor,
            _slot: &str,
            _day: Date,
        ) -> Result<SampleSet, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.samples.clone())
        }

        fn samples_by_unit_slot_color_all_days(
            &self,
            _unit: &str,
            _color: UrgencyColor,
            _slot: &str,
        ) -> Result<SampleSet, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.samples.clone())
        }

        fn samples_by_unit_color_slot_weekday(
            &self,
            _unit: &str,
            _color: UrgencyColor,
            _slot: &str,
            _weekday: u8,
        ) -> Result<SampleSet, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.samples.clone())
        }

        fn samples_by_color_slot_all_units(
            &self,
            _color: UrgencyColor,
            _slot: &str,
        ) -> Result<SampleSet, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.samples.clone())
        }
    }

    #[test]
    fn repeated_queries_hit_the_cache() {
        let store = CachedStore::new(
            CountingRepository::new(samples(42.0)),
            QueryCache::new(16, Duration::from_secs(720)),
        );
        let first = store
            .samples_by_color_slot_all_units(UrgencyColor::Green, "08:00-11:30")
            .expect("first query");
        let second = store
            .samples_by_color_slot_all_units(UrgencyColor::Green, "08:00-11:30")
            .expect("second query");
        assert_eq!(first, second);
        assert_eq!(store.inner.calls.load(Ordering::SeqCst), 1);

        // A different key goes back to the repository.
        store
            .samples_by_unit_slot_color_all_days("central", UrgencyColor::Green, "08:00-11:30")
            .expect("third query");
        assert_eq!(store.inner.calls.load(Ordering::SeqCst), 2);
    }
}
