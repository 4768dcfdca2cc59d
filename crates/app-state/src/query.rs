//! Query management
//!
//! This module is the data-fetch layer's cache facade: request fingerprints,
//! the `Query` trait that performs the actual network call, and a client that
//! stores resolved payloads with stale-time bookkeeping.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use storage::{CacheConfig, MemoryCache};
use thiserror::Error;

/// Query errors
#[derive(Debug, Error)]
pub enum QueryError {
    /// Query fetch failed
    #[error("Query fetch failed: {0}")]
    FetchError(String),

    /// Cache error
    #[error("Cache error: {0}")]
    CacheError(#[from] storage::CacheError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result type for query operations
pub type Result<T> = std::result::Result<T, QueryError>;

/// Request fingerprint: endpoint plus parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
pub struct QueryKey {
    /// Endpoint scope (e.g., "products", "categories", "cart")
    pub scope: String,

    /// Unique identifier within the scope
    pub id: String,

    /// Request parameters, kept sorted so equal requests fingerprint equally
    pub params: BTreeMap<String, String>,
}

impl QueryKey {
    /// Create a new query key
    pub fn new(scope: impl Into<String>, id: impl Into<String>) -> Self {
        Self { scope: scope.into(), id: id.into(), params: BTreeMap::new() }
    }

    /// Add a parameter to the query key
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Convert to cache key string
    pub fn to_cache_key(&self) -> String {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.params.hash(&mut hasher);
        format!("query:{}:{}:{:x}", self.scope, self.id, hasher.finish())
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope, self.id)?;
        let mut sep = '?';
        for (k, v) in &self.params {
            write!(f, "{}{}={}", sep, k, v)?;
            sep = '&';
        }
        Ok(())
    }
}

/// Query state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    /// Query is idle (not fetching)
    Idle,

    /// Query is fetching data
    Fetching,

    /// Query fetch succeeded
    Success,

    /// Query fetch failed
    Error,
}

#[derive(Debug, Clone, Copy)]
enum Freshness {
    /// Nothing written yet
    Missing,
    /// Fresh until this instant
    Until(SystemTime),
    /// Stale time past the end of the clock
    Forever,
}

#[derive(Debug, Clone)]
struct QueryMeta {
    state: QueryState,
    freshness: Freshness,
    fetch_count: u32,
    last_error: Option<String>,
}

impl QueryMeta {
    fn new() -> Self {
        Self { state: QueryState::Idle, freshness: Freshness::Missing, fetch_count: 0, last_error: None }
    }

    fn is_stale(&self) -> bool {
        match self.freshness {
            Freshness::Missing => true,
            Freshness::Until(stale_at) => SystemTime::now() >= stale_at,
            Freshness::Forever => false,
        }
    }
}

/// Query configuration
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Time until data becomes stale
    pub stale_time: Duration,

    /// Time until data is evicted from the cache
    pub cache_time: Duration,

    /// Retry failed queries
    pub retry: bool,

    /// Maximum fetch attempts when retrying
    pub retry_count: u32,

    /// Retry delay
    pub retry_delay: Duration,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(30),
            cache_time: Duration::from_secs(300), // 5 minutes
            retry: true,
            retry_count: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Query trait for defining data fetching logic
#[async_trait]
pub trait Query: Send + Sync {
    /// The type of data this query returns
    type Data: Serialize + DeserializeOwned + Clone + Send + Sync;

    /// Fetch the data
    async fn fetch(&self) -> Result<Self::Data>;

    /// Get the query key
    fn key(&self) -> QueryKey;

    /// Get the query configuration
    fn config(&self) -> QueryConfig {
        QueryConfig::default()
    }
}

/// Query client for managing cached server state
#[derive(Clone)]
pub struct QueryClient {
    cache: Arc<MemoryCache>,
    meta: Arc<RwLock<HashMap<String, QueryMeta>>>,
}

impl QueryClient {
    /// Create a new query client
    pub fn new(cache_config: CacheConfig) -> Self {
        Self {
            cache: Arc::new(MemoryCache::new(cache_config)),
            meta: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get query data, using fresh cached data if available
    pub async fn get<Q: Query>(&self, query: &Q) -> Result<Q::Data> {
        let key = query.key();
        if self.is_fresh(&key) {
            if let Some(data) = self.get_query_data(&key)? {
                return Ok(data);
            }
        }

        self.fetch(query).await
    }

    /// Fetch query data (always fetches, ignoring cache)
    pub async fn fetch<Q: Query>(&self, query: &Q) -> Result<Q::Data> {
        let key = query.key();
        let cache_key = key.to_cache_key();
        let config = query.config();

        {
            let mut meta = self.meta.write();
            let query_meta = meta.entry(cache_key.clone()).or_insert_with(QueryMeta::new);
            query_meta.state = QueryState::Fetching;
            query_meta.fetch_count += 1;
        }

        let max_attempts = if config.retry { config.retry_count.max(1) } else { 1 };
        let mut attempt = 0;

        loop {
            attempt += 1;
            match query.fetch().await {
                Ok(data) => {
                    self.set_query_data(&key, &data, &config)?;
                    return Ok(data);
                }
                Err(e) if attempt < max_attempts => {
                    tracing::debug!(key = %key, attempt, error = %e, "query fetch failed, retrying");
                    tokio::time::sleep(config.retry_delay).await;
                }
                Err(e) => {
                    let mut meta = self.meta.write();
                    if let Some(query_meta) = meta.get_mut(&cache_key) {
                        query_meta.state = QueryState::Error;
                        query_meta.last_error = Some(e.to_string());
                    }
                    return Err(e);
                }
            }
        }
    }

    /// Write resolved data for a query into the cache
    pub fn set_query_data<T: Serialize>(
        &self,
        key: &QueryKey,
        data: &T,
        config: &QueryConfig,
    ) -> Result<()> {
        let body = serde_json::to_string(data)?;
        self.write_payload(key, body, config)
    }

    /// Write an already serialized payload into the cache
    pub fn write_payload(&self, key: &QueryKey, body: String, config: &QueryConfig) -> Result<()> {
        let cache_key = key.to_cache_key();
        self.cache.put(cache_key.clone(), body, Some(config.cache_time))?;

        let now = SystemTime::now();
        let mut meta = self.meta.write();
        let query_meta = meta.entry(cache_key).or_insert_with(QueryMeta::new);
        query_meta.state = QueryState::Success;
        query_meta.freshness = match now.checked_add(config.stale_time) {
            Some(stale_at) => Freshness::Until(stale_at),
            None => Freshness::Forever,
        };
        query_meta.last_error = None;

        Ok(())
    }

    /// Read cached data for a query
    pub fn get_query_data<T: DeserializeOwned>(&self, key: &QueryKey) -> Result<Option<T>> {
        match self.cache.get(&key.to_cache_key()) {
            Some(payload) => Ok(Some(serde_json::from_str(&payload.body)?)),
            None => Ok(None),
        }
    }

    /// Check whether the cache holds data for the key that is not yet stale
    pub fn is_fresh(&self, key: &QueryKey) -> bool {
        let cache_key = key.to_cache_key();
        let fresh = self.meta.read().get(&cache_key).is_some_and(|m| !m.is_stale());
        fresh && self.cache.contains(&cache_key)
    }

    /// Invalidate cached query data
    pub fn invalidate(&self, key: &QueryKey) {
        let cache_key = key.to_cache_key();
        self.cache.remove(&cache_key);
        self.meta.write().remove(&cache_key);
    }

    /// Invalidate all queries matching a scope
    pub fn invalidate_scope(&self, scope: &str) -> usize {
        let prefix = format!("query:{}:", scope);
        self.meta.write().retain(|k, _| !k.starts_with(&prefix));
        self.cache.remove_prefix(&prefix)
    }

    /// Get query state
    pub fn state(&self, key: &QueryKey) -> QueryState {
        self.meta
            .read()
            .get(&key.to_cache_key())
            .map(|m| m.state)
            .unwrap_or(QueryState::Idle)
    }

    /// Number of fetches issued through this client for a key
    pub fn fetch_count(&self, key: &QueryKey) -> u32 {
        self.meta.read().get(&key.to_cache_key()).map(|m| m.fetch_count).unwrap_or(0)
    }

    /// Clear all cached queries
    pub fn clear(&self) {
        self.cache.clear();
        self.meta.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize, serde::Deserialize, PartialEq)]
    struct TestData {
        value: String,
    }

    #[derive(Clone)]
    struct TestQuery {
        key: QueryKey,
        data: TestData,
        should_fail: bool,
    }

    #[async_trait]
    impl Query for TestQuery {
        type Data = TestData;

        async fn fetch(&self) -> Result<Self::Data> {
            if self.should_fail {
                Err(QueryError::FetchError("simulated failure".to_string()))
            } else {
                Ok(self.data.clone())
            }
        }

        fn key(&self) -> QueryKey {
            self.key.clone()
        }

        fn config(&self) -> QueryConfig {
            QueryConfig { retry_delay: Duration::from_millis(1), ..Default::default() }
        }
    }

    fn test_query(id: &str, should_fail: bool) -> TestQuery {
        TestQuery {
            key: QueryKey::new("products", id),
            data: TestData { value: format!("product {}", id) },
            should_fail,
        }
    }

    #[test]
    fn test_query_key_fingerprint_ignores_param_order() {
        let a = QueryKey::new("search", "results").with_param("q", "shoes").with_param("page", "2");
        let b = QueryKey::new("search", "results").with_param("page", "2").with_param("q", "shoes");

        assert_eq!(a.to_cache_key(), b.to_cache_key());
        assert!(a.to_cache_key().starts_with("query:search:results:"));
        assert_eq!(a.to_string(), "search:results?page=2&q=shoes");
    }

    #[test]
    fn test_query_key_fingerprint_differs_by_params() {
        let a = QueryKey::new("search", "results").with_param("q", "shoes");
        let b = QueryKey::new("search", "results").with_param("q", "hats");
        assert_ne!(a.to_cache_key(), b.to_cache_key());
    }

    #[tokio::test]
    async fn test_query_client_fetch() {
        let client = QueryClient::new(CacheConfig::default());
        let query = test_query("1", false);

        let result = client.fetch(&query).await.unwrap();
        assert_eq!(result.value, "product 1");
        assert_eq!(client.state(&query.key), QueryState::Success);
        assert!(client.is_fresh(&query.key));
    }

    #[tokio::test]
    async fn test_query_client_get_uses_cache() {
        let client = QueryClient::new(CacheConfig::default());
        let query = test_query("2", false);

        client.get(&query).await.unwrap();
        client.get(&query).await.unwrap();

        assert_eq!(client.fetch_count(&query.key), 1);
    }

    #[tokio::test]
    async fn test_query_retry_then_error() {
        let client = QueryClient::new(CacheConfig::default());
        let query = test_query("fail", true);

        let result = client.fetch(&query).await;
        assert!(result.is_err());
        assert_eq!(client.state(&query.key), QueryState::Error);
        assert!(!client.is_fresh(&query.key));
    }

    #[test]
    fn test_set_and_read_query_data() {
        let client = QueryClient::new(CacheConfig::default());
        let key = QueryKey::new("cart", "me");

        let empty: Option<TestData> = client.get_query_data(&key).unwrap();
        assert!(empty.is_none());

        let data = TestData { value: "3 items".to_string() };
        client.set_query_data(&key, &data, &QueryConfig::default()).unwrap();

        let read: Option<TestData> = client.get_query_data(&key).unwrap();
        assert_eq!(read, Some(data));
    }

    #[test]
    fn test_zero_stale_time_is_never_fresh() {
        let client = QueryClient::new(CacheConfig::default());
        let key = QueryKey::new("products", "stale");
        let config = QueryConfig { stale_time: Duration::ZERO, ..Default::default() };

        client.write_payload(&key, "{}".to_string(), &config).unwrap();
        assert!(!client.is_fresh(&key));
    }

    #[test]
    fn test_huge_stale_time_never_goes_stale() {
        let client = QueryClient::new(CacheConfig::default().default_ttl(None));
        let key = QueryKey::new("products", "pinned");
        let config = QueryConfig {
            stale_time: Duration::from_secs(u64::MAX),
            cache_time: Duration::from_secs(u64::MAX),
            ..Default::default()
        };

        client.write_payload(&key, "{}".to_string(), &config).unwrap();
        assert!(client.is_fresh(&key));
    }

    #[test]
    fn test_query_invalidation() {
        let client = QueryClient::new(CacheConfig::default());
        let p1 = QueryKey::new("products", "1");
        let p2 = QueryKey::new("products", "2");
        let cart = QueryKey::new("cart", "me");
        for key in [&p1, &p2, &cart] {
            client.write_payload(key, "{}".to_string(), &QueryConfig::default()).unwrap();
        }

        assert_eq!(client.invalidate_scope("products"), 2);
        assert_eq!(client.state(&p1), QueryState::Idle);
        assert_eq!(client.state(&cart), QueryState::Success);

        client.invalidate(&cart);
        assert_eq!(client.state(&cart), QueryState::Idle);
    }

    #[test]
    fn test_query_clear() {
        let client = QueryClient::new(CacheConfig::default());
        let key = QueryKey::new("profile", "me");
        client.write_payload(&key, "{}".to_string(), &QueryConfig::default()).unwrap();

        client.clear();
        assert_eq!(client.state(&key), QueryState::Idle);
        assert!(!client.is_fresh(&key));
    }
}
