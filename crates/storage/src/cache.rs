//! Payload cache
//!
//! This module provides an in-memory LRU cache with TTL support and a byte
//! budget. Values are serialized payloads keyed by request fingerprint; the
//! cache never interprets them.

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::time::{Duration, SystemTime};
use thiserror::Error;

/// Cache error types
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    /// Payload is larger than the whole cache budget
    #[error("Payload for {key} is {size} bytes, cache limit is {limit} bytes")]
    TooLarge {
        /// Fingerprint of the rejected entry
        key: String,
        /// Payload size in bytes
        size: usize,
        /// Configured byte budget
        limit: usize,
    },
}

/// Result type for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

/// A cached payload with its bookkeeping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPayload {
    /// Serialized value
    pub body: String,
    /// When the payload was written
    pub stored_at: SystemTime,
    /// When the payload expires (None = never)
    pub expires_at: Option<SystemTime>,
}

impl CachedPayload {
    fn new(body: String, ttl: Option<Duration>) -> Self {
        let stored_at = SystemTime::now();
        // a TTL past the end of the clock never expires
        let expires_at = ttl.and_then(|d| stored_at.checked_add(d));
        Self { body, stored_at, expires_at }
    }

    /// Check whether the payload has outlived its TTL
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => SystemTime::now() > expires_at,
            None => false,
        }
    }

    fn size(&self) -> usize {
        self.body.len()
    }
}

/// Cache configuration
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Maximum number of entries
    pub max_entries: usize,
    /// Maximum total payload size in bytes
    pub max_size_bytes: usize,
    /// Default TTL for entries
    pub default_ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 500,
            max_size_bytes: 16 * 1024 * 1024,            // 16MB
            default_ttl: Some(Duration::from_secs(300)), // 5 minutes
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum entries
    pub fn max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    /// Set maximum size in bytes
    pub fn max_size_bytes(mut self, bytes: usize) -> Self {
        self.max_size_bytes = bytes;
        self
    }

    /// Set default TTL
    pub fn default_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.default_ttl = ttl;
        self
    }
}

struct CacheInner {
    entries: LruCache<String, CachedPayload>,
    size_bytes: usize,
}

impl CacheInner {
    fn pop(&mut self, key: &str) -> Option<CachedPayload> {
        let entry = self.entries.pop(key)?;
        self.size_bytes = self.size_bytes.saturating_sub(entry.size());
        Some(entry)
    }
}

/// In-memory LRU cache
pub struct MemoryCache {
    inner: Mutex<CacheInner>,
    config: CacheConfig,
}

impl MemoryCache {
    /// Create a new memory cache
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);

        Self {
            inner: Mutex::new(CacheInner { entries: LruCache::new(capacity), size_bytes: 0 }),
            config,
        }
    }

    /// Get the configuration this cache was built with
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get a payload, dropping it if it has expired
    pub fn get(&self, key: &str) -> Option<CachedPayload> {
        let mut inner = self.inner.lock();

        if inner.entries.peek(key).is_some_and(CachedPayload::is_expired) {
            inner.pop(key);
            tracing::trace!(key, "cache entry expired");
            return None;
        }

        inner.entries.get(key).cloned()
    }

    /// Put a payload in the cache, evicting least recently used entries
    /// until it fits the byte budget
    pub fn put(&self, key: impl Into<String>, body: String, ttl: Option<Duration>) -> Result<()> {
        let key = key.into();
        let entry = CachedPayload::new(body, ttl.or(self.config.default_ttl));
        let size = entry.size();

        if size > self.config.max_size_bytes {
            return Err(CacheError::TooLarge { key, size, limit: self.config.max_size_bytes });
        }

        let mut inner = self.inner.lock();
        inner.pop(&key);

        while inner.size_bytes + size > self.config.max_size_bytes {
            match inner.entries.pop_lru() {
                Some((evicted_key, evicted)) => {
                    inner.size_bytes = inner.size_bytes.saturating_sub(evicted.size());
                    tracing::trace!(key = %evicted_key, "evicted for size");
                }
                None => break,
            }
        }

        if let Some((_, evicted)) = inner.entries.push(key, entry) {
            inner.size_bytes = inner.size_bytes.saturating_sub(evicted.size());
        }
        inner.size_bytes += size;

        Ok(())
    }

    /// Remove a payload from the cache
    pub fn remove(&self, key: &str) -> bool {
        self.inner.lock().pop(key).is_some()
    }

    /// Remove every payload whose key starts with `prefix`
    pub fn remove_prefix(&self, prefix: &str) -> usize {
        let mut inner = self.inner.lock();
        let keys: Vec<String> = inner
            .entries
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect();

        for key in &keys {
            inner.pop(key);
        }
        keys.len()
    }

    /// Clear all entries
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.size_bytes = 0;
    }

    /// Check if key exists and is not expired
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Get the number of entries
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Get current size in bytes
    pub fn size_bytes(&self) -> usize {
        self.inner.lock().size_bytes
    }

    /// Remove expired entries
    pub fn evict_expired(&self) -> usize {
        let mut inner = self.inner.lock();
        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, v)| v.is_expired())
            .map(|(k, _)| k.clone())
            .collect();

        for key in &expired {
            inner.pop(key);
        }
        expired.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_cache_basic() {
        let cache = MemoryCache::new(CacheConfig::new().max_entries(10));

        cache.put("key1", "value1".to_string(), None).unwrap();

        let value = cache.get("key1").map(|p| p.body);
        assert_eq!(value, Some("value1".to_string()));
    }

    #[test]
    fn test_memory_cache_ttl() {
        let config = CacheConfig::new().default_ttl(Some(Duration::from_millis(50)));
        let cache = MemoryCache::new(config);

        cache.put("key1", "42".to_string(), None).unwrap();
        assert!(cache.contains("key1"));

        std::thread::sleep(Duration::from_millis(100));

        assert_eq!(cache.get("key1"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_huge_ttl_never_expires() {
        let cache = MemoryCache::new(CacheConfig::new());

        cache.put("key1", "1".to_string(), Some(Duration::from_secs(u64::MAX))).unwrap();
        let entry = cache.get("key1").unwrap();
        assert_eq!(entry.expires_at, None);
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_memory_cache_lru_eviction() {
        let cache = MemoryCache::new(CacheConfig::new().max_entries(3));

        cache.put("key1", "1".to_string(), None).unwrap();
        cache.put("key2", "2".to_string(), None).unwrap();
        cache.put("key3", "3".to_string(), None).unwrap();
        assert_eq!(cache.len(), 3);

        cache.put("key4", "4".to_string(), None).unwrap();

        assert_eq!(cache.len(), 3);
        assert!(!cache.contains("key1"));
        assert!(cache.contains("key2"));
        assert!(cache.contains("key4"));
    }

    #[test]
    fn test_memory_cache_size_limit() {
        let cache = MemoryCache::new(CacheConfig::new().max_entries(100).max_size_bytes(1000));

        for i in 0..50 {
            cache.put(format!("key{}", i), "x".repeat(100), None).unwrap();
        }

        assert!(cache.size_bytes() <= 1000);
        assert_eq!(cache.len(), 10);
        assert!(cache.contains("key49"));
    }

    #[test]
    fn test_memory_cache_rejects_oversized_payload() {
        let cache = MemoryCache::new(CacheConfig::new().max_size_bytes(8));

        let err = cache.put("big", "x".repeat(9), None).unwrap_err();
        assert!(matches!(err, CacheError::TooLarge { size: 9, limit: 8, .. }));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_memory_cache_replace_tracks_size() {
        let cache = MemoryCache::new(CacheConfig::new());

        cache.put("key", "abcd".to_string(), None).unwrap();
        cache.put("key", "ab".to_string(), None).unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.size_bytes(), 2);
    }

    #[test]
    fn test_memory_cache_remove_prefix() {
        let cache = MemoryCache::new(CacheConfig::new());

        cache.put("query:products:1", "a".to_string(), None).unwrap();
        cache.put("query:products:2", "b".to_string(), None).unwrap();
        cache.put("query:cart:me", "c".to_string(), None).unwrap();

        assert_eq!(cache.remove_prefix("query:products:"), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.remove("query:cart:me"));
        assert!(!cache.remove("query:cart:me"));
    }

    #[test]
    fn test_evict_expired() {
        let cache = MemoryCache::new(CacheConfig::new());

        cache.put("short", "1".to_string(), Some(Duration::from_millis(10))).unwrap();
        cache.put("long", "2".to_string(), None).unwrap();

        std::thread::sleep(Duration::from_millis(40));

        assert_eq!(cache.evict_expired(), 1);
        assert!(cache.contains("long"));
    }

    #[test]
    fn test_config_builder() {
        let config = CacheConfig::new()
            .max_entries(50)
            .max_size_bytes(1024)
            .default_ttl(Some(Duration::from_secs(30)));

        assert_eq!(config.max_entries, 50);
        assert_eq!(config.max_size_bytes, 1024);
        assert_eq!(config.default_ttl, Some(Duration::from_secs(30)));
    }
}
