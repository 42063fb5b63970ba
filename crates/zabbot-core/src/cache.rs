//! In-memory key/value cache with read-time expiry.
//!
//! Entries carry only their capture instant. The freshness requirement is
//! supplied by the reader, so the same entry can be fresh for one caller
//! and stale for another. Expired entries are dropped lazily on read;
//! there is no background sweeper and no capacity bound.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A cached value together with the instant it was stored.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

/// Thread-safe TTL cache.
///
/// Every operation takes the single internal lock for the duration of one
/// key access only. Callers fetch outside the cache and then `set`, so
/// slow producers never hold the lock.
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Get a value if it was stored no longer than `ttl` ago.
    ///
    /// A stale entry is removed before returning `None`.
    pub fn get(&self, key: &str, ttl: Duration) -> Option<V> {
        self.get_at(key, ttl, Instant::now())
    }

    fn get_at(&self, key: &str, ttl: Duration, now: Instant) -> Option<V> {
        let mut entries = self.entries.lock();
        let entry = entries.get(key)?;

        if now.saturating_duration_since(entry.stored_at) > ttl {
            entries.remove(key);
            tracing::debug!(key = %key, "Cache entry expired");
            return None;
        }

        Some(entry.value.clone())
    }

    /// Store a value, overwriting any previous entry for the key.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let entry = CacheEntry {
            value,
            stored_at: Instant::now(),
        };
        self.entries.lock().insert(key.into(), entry);
    }

    /// Remove a single entry. Returns whether it existed.
    pub fn remove(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Remove every entry and return how many were dropped.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.lock();
        let count = entries.len();
        entries.clear();
        count
    }

    /// Number of stored entries, including stale ones not yet read.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_set_then_get() {
        let cache = TtlCache::new();
        cache.set("all_hosts", vec![1, 2, 3]);

        assert_eq!(
            cache.get("all_hosts", Duration::from_secs(60)),
            Some(vec![1, 2, 3])
        );
    }

    #[test]
    fn test_get_missing_key() {
        let cache: TtlCache<String> = TtlCache::new();
        assert_eq!(cache.get("nothing", Duration::from_secs(60)), None);
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let cache = TtlCache::new();
        cache.set("active_problems", "stale".to_string());

        let later = Instant::now() + Duration::from_secs(61);
        assert_eq!(
            cache.get_at("active_problems", Duration::from_secs(60), later),
            None
        );
        assert!(cache.is_empty());

        // Still absent even under a generous TTL until the next set
        assert_eq!(cache.get("active_problems", Duration::from_secs(3600)), None);
    }

    #[test]
    fn test_expiry_after_sleep() {
        let cache = TtlCache::new();
        cache.set("k", 1u32);
        std::thread::sleep(Duration::from_millis(30));

        assert_eq!(cache.get("k", Duration::from_millis(5)), None);
        assert_eq!(cache.get("k", Duration::from_secs(60)), None);
    }

    #[test]
    fn test_ttl_is_chosen_by_reader() {
        let cache = TtlCache::new();
        cache.set("shared", 7u8);

        let later = Instant::now() + Duration::from_secs(120);
        // Long-TTL reader still sees it
        assert_eq!(cache.get_at("shared", Duration::from_secs(300), later), Some(7));
        // Short-TTL reader finds it stale and evicts it
        assert_eq!(cache.get_at("shared", Duration::from_secs(60), later), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_set_overwrites() {
        let cache = TtlCache::new();
        cache.set("k", "old");
        cache.set("k", "new");

        assert_eq!(cache.get("k", Duration::from_secs(1)), Some("new"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_remove() {
        let cache = TtlCache::new();
        cache.set("k", 1);

        assert!(cache.remove("k"));
        assert!(!cache.remove("k"));
        assert_eq!(cache.get("k", Duration::from_secs(60)), None);
    }

    #[test]
    fn test_clear_reports_count() {
        let cache = TtlCache::new();
        let keys = ["all_hosts", "dcs_hosts", "active_problems"];
        for key in keys {
            cache.set(key, key.len());
        }

        assert_eq!(cache.clear(), 3);
        for key in keys {
            assert_eq!(cache.get(key, Duration::from_secs(600)), None);
        }
        assert_eq!(cache.clear(), 0);
    }

    #[test]
    fn test_concurrent_access() {
        let cache = Arc::new(TtlCache::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for j in 0..100 {
                        let key = format!("key-{}", (i + j) % 4);
                        cache.set(key.clone(), j);
                        let _ = cache.get(&key, Duration::from_secs(60));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 4);
    }
}
