//! In-memory request cache (process-wide, thread-safe).
//!
//! Uses DashMap for lock-free concurrent access with per-key sharding.
//! Expired entries are evicted lazily on access; there is no background
//! sweep. The cache stores opaque envelope bytes (see
//! [`crate::serialization`]) so one instance can back executors of
//! different payload types.
//!
//! Freshness is judged at read time against a caller-supplied window, so
//! two executors with different `fresh_for` settings can share one entry.
//! Hard expiry (`max_age`) is fixed when the entry is written.

use dashmap::DashMap;
use regex::Regex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One cached value and its timing metadata.
///
/// Entries are immutable once stored; a new write for the same key
/// replaces the entry wholesale.
#[derive(Clone)]
pub struct CacheEntry {
    /// Envelope bytes of the cached payload.
    pub data: Vec<u8>,
    /// When the entry was written.
    pub written_at: Instant,
    /// Hard expiry; past this the entry is treated as absent.
    pub expires_at: Instant,
}

impl CacheEntry {
    fn new(data: Vec<u8>, max_age: Duration) -> Self {
        let written_at = Instant::now();
        CacheEntry {
            data,
            written_at,
            expires_at: written_at + max_age,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }

    /// True while the entry is younger than the given freshness window.
    pub fn is_fresh(&self, fresh_for: Duration) -> bool {
        Instant::now() < self.written_at + fresh_for
    }
}

/// Cache statistics snapshot.
#[derive(Clone, Debug)]
pub struct CacheStats {
    pub size: usize,
    pub keys: Vec<String>,
}

/// Thread-safe in-memory request cache.
///
/// `Clone` is cheap and shares the underlying store — create one instance
/// at application startup and clone it into every executor to get the
/// shared-by-default behavior; construct separate instances in tests for
/// isolation.
///
/// # Example
///
/// ```no_run
/// use fetch_kit::cache::RequestCache;
/// use std::time::Duration;
///
/// let cache = RequestCache::new();
/// cache.set("journals:abc123", b"bytes".to_vec(), Duration::from_secs(1800));
/// assert!(cache.get("journals:abc123").is_some());
/// assert!(cache.is_fresh("journals:abc123", Duration::from_secs(300)));
/// ```
#[derive(Clone)]
pub struct RequestCache {
    store: Arc<DashMap<String, CacheEntry>>,
}

impl RequestCache {
    /// Create a new, empty request cache.
    pub fn new() -> Self {
        RequestCache {
            store: Arc::new(DashMap::new()),
        }
    }

    /// Retrieve an entry, evicting it first if it has hard-expired.
    ///
    /// Returns `None` for absent and expired keys alike — expiry is not an
    /// error, just a miss.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        if let Some(entry) = self.store.get(key) {
            if !entry.is_expired() {
                debug!("✓ Cache GET {} -> HIT", key);
                return Some(CacheEntry {
                    data: entry.data.clone(),
                    written_at: entry.written_at,
                    expires_at: entry.expires_at,
                });
            }
        } else {
            debug!("✓ Cache GET {} -> MISS", key);
            return None;
        }

        // Expired: lazy eviction
        self.store.remove(key);
        debug!("✓ Cache GET {} -> EXPIRED (evicted)", key);
        None
    }

    /// True iff an unexpired entry exists and is within `fresh_for` of its
    /// write time.
    pub fn is_fresh(&self, key: &str, fresh_for: Duration) -> bool {
        self.get(key).is_some_and(|e| e.is_fresh(fresh_for))
    }

    /// True iff an unexpired entry exists but has aged past `fresh_for`.
    pub fn is_stale(&self, key: &str, fresh_for: Duration) -> bool {
        self.get(key).is_some_and(|e| !e.is_fresh(fresh_for))
    }

    /// Write an entry. Always overwrites; the previous entry for the key,
    /// if any, is replaced wholesale.
    pub fn set(&self, key: &str, data: Vec<u8>, max_age: Duration) {
        let entry = CacheEntry::new(data, max_age);
        self.store.insert(key.to_string(), entry);
        debug!("✓ Cache SET {} (max_age: {:?})", key, max_age);
    }

    /// Delete one entry.
    pub fn invalidate(&self, key: &str) {
        self.store.remove(key);
        debug!("✓ Cache INVALIDATE {}", key);
    }

    /// Delete all entries whose key matches the pattern.
    ///
    /// Used for bulk invalidation after mutations, e.g. dropping every
    /// cached page of a resource with `^journals:`. Returns the number of
    /// entries removed.
    pub fn invalidate_by_pattern(&self, pattern: &Regex) -> usize {
        let matching: Vec<String> = self
            .store
            .iter()
            .filter(|entry| pattern.is_match(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();

        for key in &matching {
            self.store.remove(key);
        }

        debug!(
            "✓ Cache INVALIDATE_BY_PATTERN {} -> {} removed",
            pattern,
            matching.len()
        );
        matching.len()
    }

    /// Delete everything.
    pub fn clear(&self) {
        self.store.clear();
        warn!("⚠ Cache CLEAR executed - all entries dropped");
    }

    /// Snapshot of current size and keys.
    ///
    /// Includes entries that have expired but not yet been touched (lazy
    /// eviction only runs on `get`).
    pub fn stats(&self) -> CacheStats {
        let keys: Vec<String> = self.store.iter().map(|e| e.key().clone()).collect();
        CacheStats {
            size: keys.len(),
            keys,
        }
    }

    /// Current number of entries.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// True if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl Default for RequestCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_set_get() {
        let cache = RequestCache::new();

        cache.set("key1", b"value1".to_vec(), Duration::from_secs(60));

        let entry = cache.get("key1").expect("Entry missing");
        assert_eq!(entry.data, b"value1".to_vec());
    }

    #[test]
    fn test_cache_miss() {
        let cache = RequestCache::new();
        assert!(cache.get("nonexistent").is_none());
    }

    #[test]
    fn test_cache_overwrite_replaces_entry() {
        let cache = RequestCache::new();

        cache.set("key1", b"old".to_vec(), Duration::from_secs(60));
        cache.set("key1", b"new".to_vec(), Duration::from_secs(60));

        let entry = cache.get("key1").expect("Entry missing");
        assert_eq!(entry.data, b"new".to_vec());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_cache_freshness_window() {
        let cache = RequestCache::new();

        cache.set("key1", b"value".to_vec(), Duration::from_secs(60));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cache.is_fresh("key1", Duration::from_millis(100)));
        assert!(!cache.is_stale("key1", Duration::from_millis(100)));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!cache.is_fresh("key1", Duration::from_millis(100)));
        assert!(cache.is_stale("key1", Duration::from_millis(100)));
    }

    #[tokio::test]
    async fn test_cache_expiry_evicts() {
        let cache = RequestCache::new();

        cache.set("key1", b"value".to_vec(), Duration::from_millis(100));
        assert!(cache.get("key1").is_some());

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(cache.get("key1").is_none());
        // Lazy eviction removed the entry from storage
        assert_eq!(cache.stats().size, 0);
    }

    #[tokio::test]
    async fn test_expired_entry_is_neither_fresh_nor_stale() {
        let cache = RequestCache::new();

        cache.set("key1", b"value".to_vec(), Duration::from_millis(50));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(!cache.is_fresh("key1", Duration::from_millis(10)));
        assert!(!cache.is_stale("key1", Duration::from_millis(10)));
    }

    #[test]
    fn test_cache_invalidate() {
        let cache = RequestCache::new();

        cache.set("key1", b"value".to_vec(), Duration::from_secs(60));
        cache.invalidate("key1");

        assert!(cache.get("key1").is_none());
    }

    #[test]
    fn test_cache_invalidate_by_pattern() {
        let cache = RequestCache::new();

        cache.set("a_1", b"1".to_vec(), Duration::from_secs(60));
        cache.set("a_2", b"2".to_vec(), Duration::from_secs(60));
        cache.set("b_1", b"3".to_vec(), Duration::from_secs(60));

        let pattern = Regex::new("^a_").expect("Bad pattern");
        let removed = cache.invalidate_by_pattern(&pattern);

        assert_eq!(removed, 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("b_1").is_some());
    }

    #[test]
    fn test_cache_clear() {
        let cache = RequestCache::new();

        cache.set("key1", b"1".to_vec(), Duration::from_secs(60));
        cache.set("key2", b"2".to_vec(), Duration::from_secs(60));
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_stats() {
        let cache = RequestCache::new();

        cache.set("key1", b"1".to_vec(), Duration::from_secs(60));
        cache.set("key2", b"2".to_vec(), Duration::from_secs(60));

        let stats = cache.stats();
        assert_eq!(stats.size, 2);
        assert!(stats.keys.contains(&"key1".to_string()));
        assert!(stats.keys.contains(&"key2".to_string()));
    }

    #[test]
    fn test_cache_clone_shares_store() {
        let cache1 = RequestCache::new();
        cache1.set("key", b"value".to_vec(), Duration::from_secs(60));

        let cache2 = cache1.clone();
        assert!(cache2.get("key").is_some());

        cache2.invalidate("key");
        assert!(cache1.get("key").is_none());
    }

    #[tokio::test]
    async fn test_cache_thread_safe() {
        let cache = RequestCache::new();
        let mut handles = vec![];

        for i in 0..10 {
            let c = cache.clone();
            let handle = tokio::spawn(async move {
                let key = format!("key_{}", i);
                c.set(&key, vec![i as u8], Duration::from_secs(60));
            });
            handles.push(handle);
        }

        for handle in handles {
            handle.await.expect("Task failed");
        }

        assert_eq!(cache.len(), 10);
    }
}
