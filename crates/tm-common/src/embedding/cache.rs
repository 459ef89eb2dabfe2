use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use lru::LruCache;
use serde::Serialize;

use crate::telemetry;

/// Bounded least-recently-used map from text fingerprint to embedding.
///
/// One short-lived lock guards the entries and the hit/miss counters, so the
/// cache is safe to share between concurrent pipelines.
#[derive(Debug)]
pub struct EmbeddingCache {
    state: Mutex<CacheState>,
}

#[derive(Debug)]
struct CacheState {
    entries: LruCache<String, Vec<f32>>,
    hits: u64,
    misses: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CachePerformance {
    Good,
    Moderate,
    Poor,
}

impl CachePerformance {
    fn from_hit_rate(hit_rate: f64) -> Self {
        if hit_rate > 0.7 {
            CachePerformance::Good
        } else if hit_rate > 0.4 {
            CachePerformance::Moderate
        } else {
            CachePerformance::Poor
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub hit_rate: f64,
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    pub capacity: usize,
    pub performance: CachePerformance,
}

impl EmbeddingCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                hits: 0,
                misses: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up `key`, counting a hit or a miss. A hit marks the entry most recently used.
    pub fn get(&self, key: &str) -> Option<Vec<f32>> {
        let mut state = self.lock();
        let found = state.entries.get(key).cloned();
        if found.is_some() {
            state.hits += 1;
        } else {
            state.misses += 1;
        }
        drop(state);

        telemetry::increment(if found.is_some() {
            telemetry::EMBEDDING_CACHE_HITS
        } else {
            telemetry::EMBEDDING_CACHE_MISSES
        });
        found
    }

    /// Insert or replace `key`, evicting the least recently used entry when full.
    pub fn add(&self, key: &str, vector: Vec<f32>) {
        let evicted = self.lock().entries.push(key.to_string(), vector);
        if let Some((evicted, _)) = evicted.filter(|(k, _)| k != key) {
            tracing::trace!(key = %evicted, "evicted least recently used embedding");
        }
    }

    /// Membership check that neither counts as an access nor changes recency.
    pub fn contains(&self, key: &str) -> bool {
        self.lock().entries.contains(key)
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.hits = 0;
        state.misses = 0;
    }

    pub fn size(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn capacity(&self) -> usize {
        self.lock().entries.cap().get()
    }

    /// `hits / (hits + misses)`, or 0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let state = self.lock();
        ratio(state.hits, state.misses)
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        let hit_rate = ratio(state.hits, state.misses);
        CacheStats {
            hit_rate,
            hits: state.hits,
            misses: state.misses,
            size: state.entries.len(),
            capacity: state.entries.cap().get(),
            performance: CachePerformance::from_hit_rate(hit_rate),
        }
    }
}

fn ratio(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 { 0.0 } else { hits as f64 / total as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_least_recently_used_entry() {
        let cache = EmbeddingCache::new(2);
        cache.add("a", vec![1.0]);
        cache.add("b", vec![2.0]);
        cache.add("c", vec![3.0]);

        assert_eq!(cache.size(), 2);
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn get_promotes_entry() {
        let cache = EmbeddingCache::new(2);
        cache.add("a", vec![1.0]);
        cache.add("b", vec![2.0]);
        assert_eq!(cache.get("a"), Some(vec![1.0]));

        cache.add("c", vec![3.0]);

        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
    }

    #[test]
    fn replacing_a_key_does_not_grow_or_evict() {
        let cache = EmbeddingCache::new(2);
        cache.add("a", vec![1.0]);
        cache.add("b", vec![2.0]);
        cache.add("a", vec![9.0]);

        assert_eq!(cache.size(), 2);
        assert_eq!(cache.get("a"), Some(vec![9.0]));
        assert!(cache.contains("b"));

        // "b" is now the oldest
        cache.add("c", vec![3.0]);
        assert!(!cache.contains("b"));
    }

    #[test]
    fn hit_rate_tracks_lookups() {
        let cache = EmbeddingCache::new(4);
        assert_eq!(cache.hit_rate(), 0.0);

        cache.add("a", vec![1.0]);
        cache.get("a");
        cache.get("a");
        cache.get("a");
        cache.get("missing");

        assert!((cache.hit_rate() - 0.75).abs() < 1e-12);
        let stats = cache.stats();
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.performance, CachePerformance::Good);
    }

    #[test]
    fn contains_does_not_count_or_promote() {
        let cache = EmbeddingCache::new(2);
        cache.add("a", vec![1.0]);
        cache.add("b", vec![2.0]);
        assert!(cache.contains("a"));
        assert_eq!(cache.hit_rate(), 0.0);

        cache.add("c", vec![3.0]);
        assert!(!cache.contains("a"));
    }

    #[test]
    fn clear_resets_entries_and_counters() {
        let cache = EmbeddingCache::new(3);
        cache.add("a", vec![1.0]);
        cache.get("a");
        cache.clear();

        assert_eq!(cache.size(), 0);
        assert_eq!(cache.hit_rate(), 0.0);
        assert_eq!(cache.capacity(), 3);
    }

    #[test]
    fn size_never_exceeds_capacity() {
        let cache = EmbeddingCache::new(5);
        for i in 0..50 {
            cache.add(&format!("k{i}"), vec![i as f32]);
            assert!(cache.size() <= 5);
        }
        assert!(cache.contains("k49"));
        assert!(!cache.contains("k44"));
    }

    #[test]
    fn zero_capacity_holds_one_entry() {
        let cache = EmbeddingCache::new(0);
        cache.add("a", vec![1.0]);
        cache.add("b", vec![2.0]);

        assert_eq!(cache.capacity(), 1);
        assert_eq!(cache.size(), 1);
        assert_eq!(cache.get("b"), Some(vec![2.0]));
    }

    #[test]
    fn performance_bands() {
        assert_eq!(CachePerformance::from_hit_rate(0.71), CachePerformance::Good);
        assert_eq!(CachePerformance::from_hit_rate(0.7), CachePerformance::Moderate);
        assert_eq!(CachePerformance::from_hit_rate(0.41), CachePerformance::Moderate);
        assert_eq!(CachePerformance::from_hit_rate(0.4), CachePerformance::Poor);
    }

    #[test]
    fn concurrent_access_is_safe() {
        use std::sync::Arc;

        let cache = Arc::new(EmbeddingCache::new(16));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let key = format!("t{t}-{}", i % 10);
                        if cache.get(&key).is_none() {
                            cache.add(&key, vec![i as f32]);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(cache.size() <= 16);
    }
}
