//! Lookup Cache
//!
//! Purpose suggestions and travel advisories are pure lookups keyed on
//! one or two strings, and their answers change rarely, so they get a
//! small TTL cache with SHA256 keys. Verified search results are never
//! cached - freshness is the product there.

use moka::future::Cache;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub entries: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate_percent: f64,
}

/// TTL cache for one-shot lookup payloads, stored as serialized JSON
#[derive(Clone)]
pub struct LookupCache {
    cache: Cache<String, String>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    enabled: bool,
}

impl LookupCache {
    /// Create new cache with TTL
    pub fn new(max_entries: u64, ttl_secs: u64, enabled: bool) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self {
            cache,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
            enabled,
        }
    }

    /// Key = SHA256(task + normalized params)
    pub fn compute_key(task: &str, params: &[&str]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(task.as_bytes());

        for param in params {
            // Separator byte keeps ("ab","c") and ("a","bc") distinct
            hasher.update([0x1f]);
            hasher.update(param.trim().to_lowercase().as_bytes());
        }

        hex::encode(hasher.finalize())
    }

    /// Get cached payload
    pub async fn get(&self, key: &str) -> Option<String> {
        if !self.enabled {
            return None;
        }

        if let Some(payload) = self.cache.get(key).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Cache HIT: {}", &key[..16]);
            Some(payload)
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!("Cache MISS: {}", &key[..16]);
            None
        }
    }

    /// Store payload in cache
    pub async fn set(&self, key: &str, payload: String) {
        if !self.enabled {
            return;
        }

        self.cache.insert(key.to_string(), payload).await;
        debug!("Cache SET: {}", &key[..16]);
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        CacheStats {
            entries: self.cache.entry_count(),
            hits,
            misses,
            hit_rate_percent: if total > 0 {
                (hits as f64 / total as f64) * 100.0
            } else {
                0.0
            },
        }
    }

    /// Clear all entries
    pub async fn clear(&self) {
        self.cache.invalidate_all();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cache_hit_miss() {
        let cache = LookupCache::new(100, 3600, true);

        let key = LookupCache::compute_key("purposes", &["Canada", "Japan"]);

        // Miss
        assert!(cache.get(&key).await.is_none());

        // Set
        cache.set(&key, "[{\"id\":\"tourism\"}]".to_string()).await;

        // Hit
        let result = cache.get(&key).await;
        assert_eq!(result.unwrap(), "[{\"id\":\"tourism\"}]");

        // Stats
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_disabled_cache_never_hits() {
        let cache = LookupCache::new(100, 3600, false);

        let key = LookupCache::compute_key("advisory", &["Japan"]);
        cache.set(&key, "[]".to_string()).await;

        assert!(cache.get(&key).await.is_none());
    }

    #[test]
    fn test_key_normalizes_params() {
        let key1 = LookupCache::compute_key("purposes", &["Canada", "Japan"]);
        let key2 = LookupCache::compute_key("purposes", &["  canada ", "JAPAN"]);

        assert_eq!(key1, key2);
    }

    #[test]
    fn test_key_varies_with_task_and_params() {
        let key1 = LookupCache::compute_key("purposes", &["Canada", "Japan"]);
        let key2 = LookupCache::compute_key("advisory", &["Canada", "Japan"]);
        let key3 = LookupCache::compute_key("purposes", &["Canada", "France"]);

        assert_ne!(key1, key2);
        assert_ne!(key1, key3);
    }

    #[test]
    fn test_key_boundary_safety() {
        let key1 = LookupCache::compute_key("t", &["ab", "c"]);
        let key2 = LookupCache::compute_key("t", &["a", "bc"]);

        assert_ne!(key1, key2);
    }

    #[tokio::test]
    async fn test_clear_resets_counters() {
        let cache = LookupCache::new(100, 3600, true);
        let key = LookupCache::compute_key("purposes", &["x"]);

        cache.get(&key).await;
        cache.clear().await;

        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
    }
}
