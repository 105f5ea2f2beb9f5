//! Dashboard freshness cache
//!
//! Process-local cache for the collections backing the engagement dashboard:
//! - Unified key schema with versioning
//! - Time-boxed freshness window per entry
//! - Explicit invalidation (single key or everything) that keeps the last
//!   value around but marks it stale
//! - Metrics integration

mod error;
mod keys;
mod metrics;

pub use error::{CacheError, CacheResult};
pub use keys::{CacheKey, CACHE_VERSION};
pub use metrics::CacheMetrics;

use dashmap::DashMap;
use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default freshness window (30 seconds)
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(30);

/// Returns true while `now` is strictly inside `max_age` of `fetched_at`.
///
/// Clock skew where `now` precedes `fetched_at` counts as fresh.
pub fn is_fresh(fetched_at: Instant, max_age: Duration, now: Instant) -> bool {
    now.saturating_duration_since(fetched_at) < max_age
}

/// Core cache operations trait
pub trait CacheOperations: Send + Sync {
    /// Get a fresh value; stale or absent entries read as `None`
    fn get<T: Send + Sync + 'static>(&self, key: &str) -> CacheResult<Option<Arc<T>>>;

    /// Store a value and stamp it as fetched now
    fn set<T: Send + Sync + 'static>(&self, key: &str, value: T) -> Arc<T>;

    /// Remove a key entirely
    fn del(&self, key: &str) -> bool;

    /// Check whether a key holds a value inside its freshness window
    fn is_fresh(&self, key: &str) -> bool;

    /// Reset the freshness timestamp of one key
    fn invalidate(&self, key: &str) -> bool;

    /// Reset the freshness timestamp of every key, returning how many were reset
    fn invalidate_all(&self) -> usize;
}

struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    /// `None` once invalidated
    fetched_at: Option<Instant>,
}

impl CacheEntry {
    fn is_fresh(&self, max_age: Duration, now: Instant) -> bool {
        self.fetched_at
            .map(|at| is_fresh(at, max_age, now))
            .unwrap_or(false)
    }
}

/// In-memory cache client
#[derive(Clone)]
pub struct MemoryCache {
    entries: Arc<DashMap<String, CacheEntry>>,
    max_age: Duration,
    metrics: CacheMetrics,
}

impl MemoryCache {
    pub fn new(max_age: Duration) -> CacheResult<Self> {
        Self::with_metrics(max_age, CacheMetrics::new())
    }

    pub fn with_metrics(max_age: Duration, metrics: CacheMetrics) -> CacheResult<Self> {
        if max_age.is_zero() {
            return Err(CacheError::InvalidMaxAge);
        }

        Ok(Self {
            entries: Arc::new(DashMap::new()),
            max_age,
            metrics,
        })
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// When the key was last stamped, if it has not been invalidated since
    pub fn fetched_at(&self, key: &str) -> Option<Instant> {
        self.entries.get(key).and_then(|entry| entry.fetched_at)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            max_age: DEFAULT_MAX_AGE,
            metrics: CacheMetrics::new(),
        }
    }
}

impl CacheOperations for MemoryCache {
    fn get<T: Send + Sync + 'static>(&self, key: &str) -> CacheResult<Option<Arc<T>>> {
        let Some(entry) = self.entries.get(key) else {
            debug!(key = %key, "Cache miss");
            self.metrics.record_miss(key);
            return Ok(None);
        };

        if !entry.is_fresh(self.max_age, Instant::now()) {
            debug!(key = %key, "Cache entry stale");
            self.metrics.record_stale(key);
            return Ok(None);
        }

        match Arc::clone(&entry.value).downcast::<T>() {
            Ok(value) => {
                debug!(key = %key, "Cache hit");
                self.metrics.record_hit(key);
                Ok(Some(value))
            }
            Err(_) => {
                self.metrics.record_error(key, "type_mismatch");
                Err(CacheError::TypeMismatch {
                    key: key.to_string(),
                })
            }
        }
    }

    fn set<T: Send + Sync + 'static>(&self, key: &str, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value: Arc::clone(&value) as Arc<dyn Any + Send + Sync>,
                fetched_at: Some(Instant::now()),
            },
        );

        debug!(key = %key, max_age_ms = self.max_age.as_millis() as u64, "Cache set");
        self.metrics.record_write(key);
        value
    }

    fn del(&self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            debug!(key = %key, "Cache delete");
            self.metrics.record_invalidation(key);
        }
        removed
    }

    fn is_fresh(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .map(|entry| entry.is_fresh(self.max_age, Instant::now()))
            .unwrap_or(false)
    }

    fn invalidate(&self, key: &str) -> bool {
        match self.entries.get_mut(key) {
            Some(mut entry) => {
                entry.fetched_at = None;
                debug!(key = %key, "Cache invalidate");
                self.metrics.record_invalidation(key);
                true
            }
            None => false,
        }
    }

    fn invalidate_all(&self) -> usize {
        let mut count = 0;
        for mut entry in self.entries.iter_mut() {
            entry.fetched_at = None;
            self.metrics.record_invalidation(entry.key());
            count += 1;
        }

        debug!(invalidated = count, "Cache invalidate all");
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cache() -> MemoryCache {
        MemoryCache::new(Duration::from_secs(3600)).unwrap()
    }

    #[test]
    fn test_is_fresh_boundaries() {
        let start = Instant::now();
        let max_age = Duration::from_millis(30_000);

        assert!(is_fresh(start, max_age, start));
        assert!(is_fresh(start, max_age, start + Duration::from_millis(29_999)));
        assert!(!is_fresh(start, max_age, start + max_age));
        assert!(!is_fresh(start, max_age, start + Duration::from_secs(60)));
    }

    #[test]
    fn test_is_fresh_tolerates_clock_going_backwards() {
        let later = Instant::now() + Duration::from_secs(5);
        assert!(is_fresh(later, Duration::from_secs(1), Instant::now()));
    }

    #[test]
    fn test_zero_max_age_rejected() {
        assert_eq!(
            MemoryCache::new(Duration::ZERO).err(),
            Some(CacheError::InvalidMaxAge)
        );
    }

    #[test]
    fn test_get_returns_fresh_value() {
        let cache = cache();
        cache.set(&CacheKey::users(), vec!["u1".to_string()]);

        let value = cache.get::<Vec<String>>(&CacheKey::users()).unwrap();
        assert_eq!(value.as_deref(), Some(&vec!["u1".to_string()]));
        assert!(cache.is_fresh(&CacheKey::users()));
    }

    #[test]
    fn test_get_missing_key() {
        let cache = cache();
        assert!(cache.get::<Vec<String>>("v1:posts").unwrap().is_none());
        assert!(!cache.is_fresh("v1:posts"));
    }

    #[test]
    fn test_get_type_mismatch() {
        let cache = cache();
        cache.set(&CacheKey::posts(), 42u32);

        let err = cache.get::<String>(&CacheKey::posts()).unwrap_err();
        assert_eq!(
            err,
            CacheError::TypeMismatch {
                key: "v1:posts".to_string()
            }
        );
    }

    #[test]
    fn test_expired_entry_reads_as_none() {
        let cache = MemoryCache::new(Duration::from_millis(1)).unwrap();
        cache.set(&CacheKey::comments(), 7usize);
        std::thread::sleep(Duration::from_millis(5));

        assert!(cache.get::<usize>(&CacheKey::comments()).unwrap().is_none());
        // Entry itself is still held
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_marks_stale_but_keeps_entry() {
        let cache = cache();
        cache.set(&CacheKey::users(), 1u8);

        assert!(cache.invalidate(&CacheKey::users()));
        assert!(!cache.is_fresh(&CacheKey::users()));
        assert!(cache.fetched_at(&CacheKey::users()).is_none());
        assert_eq!(cache.len(), 1);
        assert!(!cache.invalidate("v1:unknown"));
    }

    #[test]
    fn test_invalidate_all() {
        let cache = cache();
        cache.set(&CacheKey::users(), 1u8);
        cache.set(&CacheKey::posts(), 2u8);
        cache.set(&CacheKey::comments(), 3u8);

        assert_eq!(cache.invalidate_all(), 3);
        assert!(!cache.is_fresh(&CacheKey::users()));
        assert!(!cache.is_fresh(&CacheKey::posts()));
        assert!(!cache.is_fresh(&CacheKey::comments()));

        // A new write restores freshness
        cache.set(&CacheKey::posts(), 4u8);
        assert!(cache.is_fresh(&CacheKey::posts()));
    }

    #[test]
    fn test_del() {
        let cache = cache();
        cache.set(&CacheKey::users(), 1u8);
        assert!(cache.del(&CacheKey::users()));
        assert!(!cache.del(&CacheKey::users()));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = cache();
        let other = cache.clone();
        cache.set(&CacheKey::users(), 1u8);
        assert!(other.is_fresh(&CacheKey::users()));
    }

    proptest! {
        #[test]
        fn prop_fresh_iff_elapsed_below_window(
            elapsed_ms in 0u64..100_000,
            window_ms in 1u64..100_000,
        ) {
            let start = Instant::now();
            let fresh = is_fresh(
                start,
                Duration::from_millis(window_ms),
                start + Duration::from_millis(elapsed_ms),
            );
            prop_assert_eq!(fresh, elapsed_ms < window_ms);
        }
    }
}
