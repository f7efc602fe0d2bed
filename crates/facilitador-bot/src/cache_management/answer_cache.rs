//! Question → answer cache with LRU eviction and a per-entry TTL.
//!
//! Every operation takes the same mutex, so `get`/`set`/`clear`/`stats`
//! are linearizable with respect to each other. Expired entries stay in
//! memory until the next `get` of that key or until LRU eviction pushes
//! them out.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use lru::LruCache;
use serde::{Serialize, Serializer};
use tracing::debug;

use super::cache_config::AnswerCacheConfig;
use crate::types::AnswerPayload;

struct CacheEntry {
    value: AnswerPayload,
    inserted_at: Instant,
}

struct CacheInner {
    entries: LruCache<String, CacheEntry>,
    hits: u64,
    misses: u64,
}

/// Snapshot returned by [`AnswerCache::stats`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
    /// Percentage in `0.0..=100.0`, rendered as `"12.5%"`
    #[serde(serialize_with = "as_percentage")]
    pub hit_rate: f64,
}

fn as_percentage<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{:.1}%", value))
}

pub struct AnswerCache {
    inner: Mutex<CacheInner>,
    ttl: Duration,
    max_size: usize,
}

impl AnswerCache {
    pub fn new(config: AnswerCacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(CacheInner {
                entries: LruCache::new(capacity),
                hits: 0,
                misses: 0,
            }),
            ttl: config.ttl,
            max_size: capacity.get(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        // A panic while holding the lock cannot leave an entry half written,
        // so a poisoned guard is still consistent.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Look up a question. A hit promotes the entry to most-recently-used.
    pub fn get(&self, key: &str) -> Option<AnswerPayload> {
        let mut inner = self.lock();

        let lookup = inner.entries.get(key).map(|entry| {
            if entry.inserted_at.elapsed() < self.ttl {
                Some(entry.value.clone())
            } else {
                None
            }
        });

        match lookup {
            Some(Some(value)) => {
                inner.hits += 1;
                return Some(value);
            }
            Some(None) => {
                inner.entries.pop(key);
                debug!("Cache entry expired and removed");
            }
            None => {}
        }
        inner.misses += 1;
        None
    }

    /// Insert or overwrite, stamping the current time. Evicts at most one
    /// least-recently-used entry when the cache is full.
    pub fn set(&self, key: impl Into<String>, value: AnswerPayload) {
        let mut inner = self.lock();
        // `put` promotes an existing key and evicts the LRU tail when full
        inner.entries.put(
            key.into(),
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop every entry. Hit/miss counters are left untouched.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        let total = inner.hits + inner.misses;
        let hit_rate = if total > 0 {
            inner.hits as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        CacheStats {
            size: inner.entries.len(),
            hits: inner.hits,
            misses: inner.misses,
            hit_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Whether the key is physically stored, ignoring TTL and without
    /// touching recency or counters.
    pub fn contains_raw(&self, key: &str) -> bool {
        self.lock().entries.contains(key)
    }
}

impl Default for AnswerCache {
    fn default() -> Self {
        Self::new(AnswerCacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn payload(answer: &str) -> AnswerPayload {
        AnswerPayload::new(answer, Vec::new(), 0.1)
    }

    fn cache(max_size: usize, ttl: Duration) -> AnswerCache {
        AnswerCache::new(AnswerCacheConfig { max_size, ttl })
    }

    #[test]
    fn test_get_after_set_returns_value() {
        let cache = AnswerCache::default();
        cache.set("¿Qué es conciliar?", payload("Es un proceso voluntario"));

        let hit = cache.get("¿Qué es conciliar?").unwrap();
        assert_eq!(hit.answer, "Es un proceso voluntario");
    }

    #[test]
    fn test_lookup_is_exact_string_match() {
        let cache = AnswerCache::default();
        cache.set("Pensión", payload("a"));

        assert!(cache.get("pensión").is_none());
        assert!(cache.get("Pensión ").is_none());
    }

    #[test]
    fn test_expired_entry_is_absent_and_removed() {
        let cache = cache(10, Duration::from_millis(30));
        cache.set("q", payload("a"));
        assert!(cache.contains_raw("q"));

        std::thread::sleep(Duration::from_millis(60));

        assert!(cache.get("q").is_none());
        assert!(!cache.contains_raw("q"));
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_zero_ttl_never_hits() {
        let cache = cache(10, Duration::ZERO);
        cache.set("q", payload("a"));
        assert!(cache.get("q").is_none());
    }

    #[test]
    fn test_overwrite_keeps_single_entry() {
        let cache = AnswerCache::default();
        cache.set("q", payload("first"));
        cache.set("q", payload("second"));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("q").unwrap().answer, "second");
    }

    #[test]
    fn test_eviction_removes_least_recently_used() {
        let cache = cache(2, Duration::from_secs(60));
        cache.set("a", payload("1"));
        cache.set("b", payload("2"));

        // Touch "a" so "b" becomes the eviction candidate
        assert!(cache.get("a").is_some());
        cache.set("c", payload("3"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_stats_hit_rate() {
        let cache = AnswerCache::default();
        assert_eq!(cache.stats().hit_rate, 0.0);
        assert_eq!(serde_json::to_value(cache.stats()).unwrap()["hit_rate"], "0.0%");

        cache.set("q", payload("a"));
        cache.get("q");
        cache.get("q");
        cache.get("q");
        cache.get("missing");

        let stats = cache.stats();
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
        assert!((stats.hit_rate - 75.0).abs() < f64::EPSILON);
        assert_eq!(serde_json::to_value(&stats).unwrap()["hit_rate"], "75.0%");
    }

    #[test]
    fn test_clear_keeps_counters() {
        let cache = AnswerCache::default();
        cache.set("q", payload("a"));
        cache.get("q");
        cache.get("other");
        cache.clear();

        let stats = cache.stats();
        assert_eq!(stats.size, 0);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_concurrent_access_is_bounded_and_counted() {
        let cache = Arc::new(cache(50, Duration::from_secs(60)));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..200 {
                        let key = format!("{}-{}", t, i % 40);
                        cache.set(key.clone(), payload(&key));
                        cache.get(&key);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = cache.stats();
        assert!(stats.size <= 50);
        assert_eq!(stats.hits + stats.misses, 8 * 200);
    }

    proptest! {
        #[test]
        fn prop_cache_never_exceeds_capacity(max_size in 1usize..20, extra in 1usize..20) {
            let cache = cache(max_size, Duration::from_secs(60));
            let total = max_size + extra;
            for i in 0..total {
                cache.set(format!("k{}", i), payload("v"));
            }

            prop_assert_eq!(cache.len(), max_size);
            for i in 0..extra {
                let evicted = format!("k{}", i);
                prop_assert!(!cache.contains_raw(&evicted));
            }
            for i in extra..total {
                let kept = format!("k{}", i);
                prop_assert!(cache.contains_raw(&kept));
            }
        }
    }
}
