//! Content-addressed memoization of computed results
//!
//! Entries live for a fixed TTL and the least recently used entries are
//! evicted once the cache is over capacity. Every failure inside the cache
//! degrades to a miss.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Hex SHA-256 over the JSON of `(kind, canonical)`. `None` if the canonical
/// form cannot be serialized, in which case the caller skips the cache.
pub fn cache_key<T: Serialize>(kind: &str, canonical: &T) -> Option<String> {
    let bytes = match serde_json::to_vec(&(kind, canonical)) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Cannot derive cache key for {}: {}", kind, e);
            return None;
        }
    };
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Some(format!("{:x}", hasher.finalize()))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    inserted: Instant,
    last_access: u64,
}

#[derive(Debug)]
struct CacheState<V> {
    entries: HashMap<String, Entry<V>>,
    clock: u64,
    stats: CacheStats,
}

/// Bounded TTL + LRU cache keyed by content hash
#[derive(Debug)]
pub struct Cache<V> {
    state: Mutex<CacheState<V>>,
    max_entries: usize,
    ttl: Duration,
    enabled: bool,
}

impl<V: Clone> Cache<V> {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                clock: 0,
                stats: CacheStats::default(),
            }),
            max_entries,
            ttl,
            enabled: max_entries > 0,
        }
    }

    /// A cache that never stores anything
    pub fn disabled() -> Self {
        let mut cache = Self::new(0, Duration::ZERO);
        cache.enabled = false;
        cache
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn put(&self, key: String, value: V) {
        self.put_at(key, value, Instant::now())
    }

    pub(crate) fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        if !self.enabled {
            return None;
        }
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(_) => {
                warn!("Cache lock poisoned; recomputing");
                return None;
            }
        };

        let inserted = state.entries.get(key).map(|entry| entry.inserted);
        let live = match inserted {
            Some(inserted) => now.saturating_duration_since(inserted) <= self.ttl,
            None => {
                state.stats.misses += 1;
                debug!("Cache miss for {}", short(key));
                return None;
            }
        };

        if !live {
            state.entries.remove(key);
            state.stats.misses += 1;
            state.stats.evictions += 1;
            debug!("Cache entry for {} expired", short(key));
            return None;
        }

        state.clock += 1;
        let tick = state.clock;
        state.stats.hits += 1;
        let entry = state.entries.get_mut(key)?;
        entry.last_access = tick;
        debug!("Cache hit for {}", short(key));
        Some(entry.value.clone())
    }

    pub(crate) fn put_at(&self, key: String, value: V, now: Instant) {
        if !self.enabled {
            return;
        }
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(_) => {
                warn!("Cache lock poisoned; dropping result for {}", short(&key));
                return;
            }
        };

        state.clock += 1;
        let tick = state.clock;
        state.entries.insert(
            key,
            Entry {
                value,
                inserted: now,
                last_access: tick,
            },
        );

        let ttl = self.ttl;
        let before = state.entries.len();
        state
            .entries
            .retain(|_, entry| now.saturating_duration_since(entry.inserted) <= ttl);
        let mut evicted = (before - state.entries.len()) as u64;

        while state.entries.len() > self.max_entries {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(oldest) => {
                    state.entries.remove(&oldest);
                    evicted += 1;
                }
                None => break,
            }
        }
        state.stats.evictions += evicted;
    }

    pub fn stats(&self) -> CacheStats {
        match self.state.lock() {
            Ok(state) => CacheStats {
                entries: state.entries.len(),
                ..state.stats
            },
            Err(_) => CacheStats::default(),
        }
    }
}

fn short(key: &str) -> &str {
    key.get(..12).unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_put_then_get() {
        let cache = Cache::new(10, Duration::from_secs(60));
        cache.put("k".to_string(), 42);

        assert_eq!(cache.get("k"), Some(42));
        assert_eq!(cache.get("missing"), None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_ttl_expiry() {
        let cache = Cache::new(10, Duration::from_secs(60));
        let start = Instant::now();
        cache.put_at("k".to_string(), "chart", start);

        assert_eq!(cache.get_at("k", start + Duration::from_secs(60)), Some("chart"));
        assert_eq!(cache.get_at("k", start + Duration::from_secs(61)), None);
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_lru_eviction() {
        let cache = Cache::new(2, Duration::from_secs(60));
        let now = Instant::now();
        cache.put_at("a".to_string(), 1, now);
        cache.put_at("b".to_string(), 2, now);

        // Touch "a" so "b" becomes least recently used
        assert_eq!(cache.get_at("a", now), Some(1));
        cache.put_at("c".to_string(), 3, now);

        assert_eq!(cache.get_at("a", now), Some(1));
        assert_eq!(cache.get_at("b", now), None);
        assert_eq!(cache.get_at("c", now), Some(3));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_overwrite_is_idempotent() {
        let cache = Cache::new(2, Duration::from_secs(60));
        cache.put("k".to_string(), 1);
        cache.put("k".to_string(), 1);
        assert_eq!(cache.stats().entries, 1);
        assert_eq!(cache.get("k"), Some(1));
    }

    #[test]
    fn test_disabled_cache_stores_nothing() {
        let cache = Cache::disabled();
        cache.put("k".to_string(), 1);
        assert_eq!(cache.get("k"), None);
        assert!(!cache.is_enabled());
    }

    #[test]
    fn test_key_is_order_independent_for_sets() {
        let a: BTreeSet<&str> = ["ceres", "chiron", "lilith"].into_iter().collect();
        let b: BTreeSet<&str> = ["lilith", "ceres", "chiron"].into_iter().collect();

        let key_a = cache_key("chart", &a).unwrap();
        assert_eq!(key_a, cache_key("chart", &b).unwrap());
        assert_eq!(key_a.len(), 64);
        assert_ne!(key_a, cache_key("events", &a).unwrap());
    }
}
