//! Fingerprint-keyed synthesis result cache.
//!
//! Strict LRU over a [`hashlink::LinkedHashMap`] (front = least recently
//! used), with two orthogonal ceilings: a byte budget and an optional
//! entry count. Eviction runs synchronously inside `put`, so the byte
//! accounting never exceeds the budget once `put` returns. An optional
//! TTL expires entries lazily on `get`. One mutex guards the map and the
//! accounting together.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use hashlink::LinkedHashMap;
use serde::{Deserialize, Serialize};

use crate::types::TtsResult;

/// Cache observability counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
    pub bytes: usize,
    pub hit_rate: f32,
}

#[derive(Debug)]
struct CacheEntry {
    result: TtsResult,
    created: Instant,
    last_access: Instant,
    access_count: u64,
    bytes: usize,
}

struct CacheInner {
    map: LinkedHashMap<u64, CacheEntry>,
    current_bytes: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// LRU + TTL result cache keyed by request fingerprint.
pub struct ResultCache {
    inner: Mutex<CacheInner>,
    max_bytes: usize,
    /// 0 disables the entry-count ceiling.
    max_entries: usize,
    /// `None` disables expiry.
    ttl: Option<Duration>,
}

impl ResultCache {
    pub fn new(max_bytes: usize, max_entries: usize, ttl_seconds: u64) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                map: LinkedHashMap::new(),
                current_bytes: 0,
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
            max_bytes: max_bytes.max(1),
            max_entries,
            ttl: (ttl_seconds > 0).then(|| Duration::from_secs(ttl_seconds)),
        }
    }

    /// Look up a fingerprint. Hits refresh LRU position and access
    /// bookkeeping; expired entries are removed and count as misses.
    pub fn get(&self, key: u64) -> Option<TtsResult> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        let expired = match inner.map.get(&key) {
            Some(entry) => self
                .ttl
                .is_some_and(|ttl| entry.created.elapsed() > ttl),
            None => {
                inner.misses += 1;
                return None;
            }
        };

        if expired {
            if let Some(entry) = inner.map.remove(&key) {
                inner.current_bytes = inner.current_bytes.saturating_sub(entry.bytes);
            }
            inner.misses += 1;
            return None;
        }

        // Refresh: re-insert at the MRU end.
        let mut entry = inner.map.remove(&key).expect("checked above");
        entry.last_access = Instant::now();
        entry.access_count += 1;
        let result = entry.result.clone();
        inner.map.insert(key, entry);
        inner.hits += 1;
        Some(result)
    }

    /// Insert a result, evicting from the LRU end until both ceilings
    /// hold.
    pub fn put(&self, key: u64, result: TtsResult) {
        let bytes = result.memory_footprint();
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(old) = inner.map.remove(&key) {
            inner.current_bytes = inner.current_bytes.saturating_sub(old.bytes);
        }

        let now = Instant::now();
        inner.map.insert(
            key,
            CacheEntry {
                result,
                created: now,
                last_access: now,
                access_count: 0,
                bytes,
            },
        );
        inner.current_bytes = inner.current_bytes.saturating_add(bytes);

        while inner.current_bytes > self.max_bytes
            || (self.max_entries > 0 && inner.map.len() > self.max_entries)
        {
            match inner.map.pop_front() {
                Some((_, evicted)) => {
                    inner.current_bytes = inner.current_bytes.saturating_sub(evicted.bytes);
                    inner.evictions += 1;
                }
                None => break,
            }
        }
    }

    pub fn contains(&self, key: u64) -> bool {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.map.contains_key(&key)
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.map.clear();
        inner.current_bytes = 0;
        // Hit/miss/eviction counters survive a clear.
    }

    /// Drop entries whose last access is older than `max_age`.
    pub fn clear_older_than(&self, max_age: Duration) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let stale: Vec<u64> = inner
            .map
            .iter()
            .filter(|(_, entry)| entry.last_access.elapsed() > max_age)
            .map(|(&key, _)| key)
            .collect();
        for key in stale {
            if let Some(entry) = inner.map.remove(&key) {
                inner.current_bytes = inner.current_bytes.saturating_sub(entry.bytes);
                inner.evictions += 1;
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let total = inner.hits + inner.misses;
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            entries: inner.map.len(),
            bytes: inner.current_bytes,
            hit_rate: if total > 0 {
                inner.hits as f32 / total as f32
            } else {
                0.0
            },
        }
    }

    pub fn current_bytes(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.current_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Status, TtsResult};

    fn result_with_samples(n: usize) -> TtsResult {
        let mut result = TtsResult::failure(Status::Ok, "");
        result.audio.samples = vec![0.1; n];
        result
    }

    #[test]
    fn get_after_put_hits() {
        let cache = ResultCache::new(1 << 20, 0, 0);
        cache.put(1, result_with_samples(10));
        assert!(cache.get(1).is_some());
        assert!(cache.get(2).is_none());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 0.5).abs() < 1e-6);
    }

    #[test]
    fn byte_budget_holds_after_every_put() {
        // Each entry: 400 KiB of samples plus overhead.
        let cache = ResultCache::new(1 << 20, 0, 0);
        for key in 0..8u64 {
            cache.put(key, result_with_samples(100_000));
            assert!(cache.current_bytes() <= 1 << 20, "after put {key}");
        }
        let stats = cache.stats();
        assert!(stats.evictions >= 6);
        assert!(stats.entries <= 2);
    }

    #[test]
    fn eviction_removes_least_recently_used_first() {
        let cache = ResultCache::new(1 << 20, 3, 0);
        cache.put(1, result_with_samples(10));
        cache.put(2, result_with_samples(10));
        cache.put(3, result_with_samples(10));

        // Touch 1 so 2 becomes the LRU victim.
        assert!(cache.get(1).is_some());
        cache.put(4, result_with_samples(10));

        assert!(cache.contains(1));
        assert!(!cache.contains(2));
        assert!(cache.contains(3));
        assert!(cache.contains(4));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn entry_ceiling_is_orthogonal_to_bytes() {
        let cache = ResultCache::new(usize::MAX, 2, 0);
        cache.put(1, result_with_samples(10));
        cache.put(2, result_with_samples(10));
        cache.put(3, result_with_samples(10));
        assert_eq!(cache.stats().entries, 2);
        assert!(!cache.contains(1));
    }

    #[test]
    fn replacing_a_key_reuses_its_budget() {
        let cache = ResultCache::new(1 << 20, 0, 0);
        cache.put(7, result_with_samples(1000));
        let before = cache.current_bytes();
        cache.put(7, result_with_samples(1000));
        assert_eq!(cache.current_bytes(), before);
        assert_eq!(cache.stats().entries, 1);
    }

    #[test]
    fn ttl_expires_on_get() {
        let cache = ResultCache::new(1 << 20, 0, 1);
        cache.put(1, result_with_samples(10));
        assert!(cache.get(1).is_some());
        std::thread::sleep(Duration::from_millis(1100));
        assert!(cache.get(1).is_none());
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn zero_ttl_never_expires() {
        let cache = ResultCache::new(1 << 20, 0, 0);
        cache.put(1, result_with_samples(10));
        std::thread::sleep(Duration::from_millis(20));
        assert!(cache.get(1).is_some());
    }

    #[test]
    fn clear_preserves_counters() {
        let cache = ResultCache::new(1 << 20, 0, 0);
        cache.put(1, result_with_samples(10));
        cache.get(1);
        cache.clear();
        assert_eq!(cache.stats().entries, 0);
        assert_eq!(cache.stats().bytes, 0);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn clear_older_than_drops_stale_entries() {
        let cache = ResultCache::new(1 << 20, 0, 0);
        cache.put(1, result_with_samples(10));
        std::thread::sleep(Duration::from_millis(30));
        cache.put(2, result_with_samples(10));
        cache.clear_older_than(Duration::from_millis(15));
        assert!(!cache.contains(1));
        assert!(cache.contains(2));
    }
}
