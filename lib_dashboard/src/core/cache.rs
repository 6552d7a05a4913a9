//! # TTL Cache
//!
//! A key/value store where every entry expires a fixed time after it was
//! stored. Expiry is lazy: an entry is checked, and evicted if too old, when it
//! is read. There is no background sweeper, and a hit does not extend the
//! entry's life.
//!
//! Hits and misses accumulate for the lifetime of the cache instance; `clear`
//! drops entries but keeps the counters.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::core::round_to;

/// Five minutes.
pub const DEFAULT_TTL: Duration = Duration::from_millis(300_000);

struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

impl<V> CacheEntry<V> {
    fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.stored_at)
    }
}

struct CacheInner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    hits: u64,
    misses: u64,
}

/// Point-in-time view of the cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub size: usize,
    /// Stored keys, sorted. Includes entries that have expired but not yet
    /// been read.
    pub keys: Vec<String>,
    pub hits: u64,
    pub misses: u64,
    /// `hits / (hits + misses)` to two decimals, 0 before any lookup.
    pub hit_rate: f64,
}

pub struct TtlCache<V> {
    ttl: Duration,
    inner: Mutex<CacheInner<V>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                hits: 0,
                misses: 0,
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the value stored under `key` if it is at most `ttl` old.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut inner = self.inner.lock().expect("Cache lock poisoned");

        let expired = match inner.entries.get(key) {
            None => {
                inner.misses += 1;
                return None;
            }
            Some(entry) => entry.age(now) > self.ttl,
        };

        if expired {
            inner.entries.remove(key);
            inner.misses += 1;
            log::debug!("Cache entry '{}' expired", key);
            return None;
        }

        inner.hits += 1;
        inner.entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        let mut inner = self.inner.lock().expect("Cache lock poisoned");
        inner.entries.insert(
            key.into(),
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn clear(&self) {
        self.inner.lock().expect("Cache lock poisoned").entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().expect("Cache lock poisoned");
        let mut keys: Vec<String> = inner.entries.keys().cloned().collect();
        keys.sort();

        let lookups = inner.hits + inner.misses;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            round_to(inner.hits as f64 / lookups as f64, 2)
        };

        CacheStats {
            size: inner.entries.len(),
            keys,
            hits: inner.hits,
            misses: inner.misses,
            hit_rate,
        }
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
