//! Interaction-triggered prefetch
//!
//! A press-in on a navigable item (or idle detection) fetches the data the
//! destination screen will need. The fetch itself belongs to the data-fetch
//! layer; this module only decides when the resolved payload is written to
//! the cache. A payload that resolves while a transition is animating is
//! written through the task queue once the lock releases.
//!
//! Prefetching is an optimization: failures are logged and swallowed, and
//! nothing here retries.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::coordinator::TransitionCoordinator;
use crate::query::{Query, QueryClient, QueryKey};
use crate::task_queue::Enqueued;

/// What kicked off a prefetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefetchTrigger {
    /// Finger down on an item that navigates
    PressIn,
    /// Predictive prefetch while the app is idle
    Idle,
}

/// What the prefetcher did with a request
#[derive(Debug)]
pub enum PrefetchStatus {
    /// Fresh data is already cached
    AlreadyCached,
    /// A prefetch for the same fingerprint is fetching or waiting to write
    InFlight,
    /// Idle prefetch parked until the transition lock releases
    Deferred,
    /// No tokio runtime was available to run the fetch
    NoRuntime,
    /// Fetch started; the handle completes once the payload is written or
    /// handed to the task queue
    Started(JoinHandle<()>),
}

/// Holds a fingerprint in the in-flight set until the fetch has failed or
/// its cache write has run
struct InFlightGuard {
    set: Arc<Mutex<HashSet<String>>>,
    cache_key: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.lock().remove(&self.cache_key);
    }
}

/// Schedules prefetches and gates their cache writes on the transition lock
#[derive(Clone)]
pub struct Prefetcher {
    coordinator: Arc<TransitionCoordinator>,
    client: QueryClient,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl Prefetcher {
    /// Create a prefetcher writing into `client`
    pub fn new(coordinator: Arc<TransitionCoordinator>, client: QueryClient) -> Self {
        Self { coordinator, client, in_flight: Arc::new(Mutex::new(HashSet::new())) }
    }

    /// The query client that receives prefetched payloads
    pub fn client(&self) -> &QueryClient {
        &self.client
    }

    /// Prefetch for a press-in on a navigable item
    pub fn on_press_in<Q: Query + 'static>(&self, query: Q) -> PrefetchStatus {
        self.prefetch(query, PrefetchTrigger::PressIn)
    }

    /// Predictive prefetch on idle
    pub fn on_idle<Q: Query + 'static>(&self, query: Q) -> PrefetchStatus {
        self.prefetch(query, PrefetchTrigger::Idle)
    }

    /// Issue a prefetch. Idle prefetches consult the lock before starting;
    /// press-in prefetches start at once and only their cache write waits.
    pub fn prefetch<Q: Query + 'static>(&self, query: Q, trigger: PrefetchTrigger) -> PrefetchStatus {
        let key = query.key();
        if self.client.is_fresh(&key) {
            tracing::trace!(key = %key, "prefetch skipped, data fresh");
            return PrefetchStatus::AlreadyCached;
        }

        let Ok(runtime) = Handle::try_current() else {
            tracing::debug!(key = %key, "prefetch skipped, no runtime");
            return PrefetchStatus::NoRuntime;
        };

        if trigger == PrefetchTrigger::Idle && self.coordinator.is_locked() {
            let this = self.clone();
            let label = format!("prefetch-start:{}", key);
            self.coordinator.enqueue(label, move || {
                let _guard = runtime.enter();
                this.start(query, key);
                Ok(())
            });
            return PrefetchStatus::Deferred;
        }

        match self.start(query, key) {
            Some(handle) => PrefetchStatus::Started(handle),
            None => PrefetchStatus::InFlight,
        }
    }

    fn start<Q: Query + 'static>(&self, query: Q, key: QueryKey) -> Option<JoinHandle<()>> {
        let cache_key = key.to_cache_key();
        if !self.in_flight.lock().insert(cache_key.clone()) {
            tracing::trace!(key = %key, "prefetch already in flight");
            return None;
        }

        let guard = InFlightGuard { set: Arc::clone(&self.in_flight), cache_key };
        let coordinator = Arc::clone(&self.coordinator);
        let client = self.client.clone();

        Some(tokio::spawn(async move {
            let data = match query.fetch().await {
                Ok(data) => data,
                Err(e) => {
                    tracing::debug!(key = %key, error = %e, "prefetch failed");
                    return;
                }
            };

            let config = query.config();
            let body = match serde_json::to_string(&data) {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!(key = %key, error = %e, "prefetch payload not serializable");
                    return;
                }
            };

            let label = format!("prefetch:{}", key);
            let write_key = key.clone();
            let outcome = coordinator.enqueue(label, move || {
                // released once the write is done, so repeats see fresh data
                let _guard = guard;
                client.write_payload(&write_key, body, &config)?;
                Ok(())
            });
            if let Enqueued::Deferred { position } = outcome {
                tracing::trace!(key = %key, position, "prefetch write deferred until settle");
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{QueryConfig, QueryError, QueryState};
    use crate::transition_lock::{SettleOutcome, TransitionDescriptor};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use storage::CacheConfig;

    #[derive(Clone)]
    struct ProductQuery {
        id: String,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    impl ProductQuery {
        fn new(id: &str) -> Self {
            Self { id: id.to_string(), fail: false, calls: Arc::new(AtomicUsize::new(0)) }
        }
    }

    #[async_trait]
    impl Query for ProductQuery {
        type Data = Vec<String>;

        async fn fetch(&self) -> crate::query::Result<Self::Data> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(QueryError::FetchError("offline".to_string()));
            }
            Ok(vec![format!("product {}", self.id)])
        }

        fn key(&self) -> QueryKey {
            QueryKey::new("products", self.id.clone())
        }

        fn config(&self) -> QueryConfig {
            QueryConfig { retry: false, ..Default::default() }
        }
    }

    fn setup() -> (Arc<TransitionCoordinator>, Prefetcher) {
        let coordinator = Arc::new(TransitionCoordinator::default());
        let client = QueryClient::new(CacheConfig::default());
        let prefetcher = Prefetcher::new(Arc::clone(&coordinator), client);
        (coordinator, prefetcher)
    }

    async fn finish(status: PrefetchStatus) {
        match status {
            PrefetchStatus::Started(handle) => handle.await.unwrap(),
            other => panic!("expected a started prefetch, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_prefetch_writes_immediately_when_unlocked() {
        let (_, prefetcher) = setup();
        let query = ProductQuery::new("1");

        finish(prefetcher.on_press_in(query.clone())).await;

        let cached: Option<Vec<String>> = prefetcher.client().get_query_data(&query.key()).unwrap();
        assert_eq!(cached, Some(vec!["product 1".to_string()]));
    }

    #[tokio::test]
    async fn test_prefetch_write_waits_for_release() {
        let (coordinator, prefetcher) = setup();
        let query = ProductQuery::new("2");

        let id = coordinator.begin(TransitionDescriptor::push(390.0)).unwrap();
        finish(prefetcher.on_press_in(query.clone())).await;

        assert_eq!(query.calls.load(Ordering::SeqCst), 1);
        assert_eq!(prefetcher.client().state(&query.key()), QueryState::Idle);
        assert_eq!(coordinator.pending_tasks(), 1);

        let report = coordinator.settle(id, SettleOutcome::Commit).unwrap();
        assert_eq!(report.drain.executed.len(), 1);
        assert!(prefetcher.client().is_fresh(&query.key()));
    }

    #[tokio::test]
    async fn test_prefetch_failure_is_swallowed() {
        let (coordinator, prefetcher) = setup();
        let mut query = ProductQuery::new("3");
        query.fail = true;

        finish(prefetcher.on_press_in(query.clone())).await;

        assert_eq!(coordinator.pending_tasks(), 0);
        assert_eq!(prefetcher.client().state(&query.key()), QueryState::Idle);

        // not stuck in flight after a failure
        assert!(matches!(prefetcher.on_press_in(query.clone()), PrefetchStatus::Started(_)));
    }

    #[tokio::test]
    async fn test_prefetch_skips_fresh_data() {
        let (_, prefetcher) = setup();
        let query = ProductQuery::new("4");

        finish(prefetcher.on_press_in(query.clone())).await;
        assert!(matches!(prefetcher.on_press_in(query.clone()), PrefetchStatus::AlreadyCached));
        assert_eq!(query.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_prefetch_dedupes_in_flight() {
        let (_, prefetcher) = setup();
        let query = ProductQuery::new("5");

        let first = prefetcher.on_press_in(query.clone());
        assert!(matches!(prefetcher.on_press_in(query.clone()), PrefetchStatus::InFlight));
        finish(first).await;
    }

    #[tokio::test]
    async fn test_repeated_press_in_while_locked_fetches_once() {
        let (coordinator, prefetcher) = setup();
        let query = ProductQuery::new("8");

        let id = coordinator.begin(TransitionDescriptor::push(390.0)).unwrap();
        finish(prefetcher.on_press_in(query.clone())).await;

        // fetched, but the write is still queued behind the lock
        for _ in 0..2 {
            assert!(matches!(prefetcher.on_press_in(query.clone()), PrefetchStatus::InFlight));
        }
        assert_eq!(query.calls.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.pending_tasks(), 1);

        let report = coordinator.settle(id, SettleOutcome::Commit).unwrap();
        assert_eq!(report.drain.executed, vec!["prefetch:products:8".to_string()]);
        assert!(matches!(prefetcher.on_press_in(query.clone()), PrefetchStatus::AlreadyCached));
        assert_eq!(query.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_idle_prefetch_deferred_while_locked() {
        let (coordinator, prefetcher) = setup();
        let query = ProductQuery::new("6");

        let id = coordinator.begin(TransitionDescriptor::push(390.0)).unwrap();
        assert!(matches!(prefetcher.on_idle(query.clone()), PrefetchStatus::Deferred));
        tokio::task::yield_now().await;
        assert_eq!(query.calls.load(Ordering::SeqCst), 0);

        coordinator.settle(id, SettleOutcome::Commit).unwrap();

        for _ in 0..100 {
            if prefetcher.client().is_fresh(&query.key()) {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(query.calls.load(Ordering::SeqCst), 1);
        assert!(prefetcher.client().is_fresh(&query.key()));
    }

    #[test]
    fn test_prefetch_without_runtime() {
        let (_, prefetcher) = setup();
        assert!(matches!(prefetcher.on_press_in(ProductQuery::new("7")), PrefetchStatus::NoRuntime));
    }
}
