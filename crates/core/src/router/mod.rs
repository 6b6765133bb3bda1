//! Request-routing cache layer.
//!
//! [`CacheRouter`] routes each intercepted request to one of three strategies
//! by URL path:
//!
//! 1. network-first patterns (fresh data, cache as offline fallback)
//! 2. cache-first patterns (static assets, network only on a miss)
//! 3. stale-while-revalidate for everything else
//!
//! The router also owns the install/activate hooks for its two partitions
//! and the maintenance operations (size, clear, static refresh).

pub mod lifecycle;
pub mod maintenance;
pub mod patterns;
pub mod strategies;

use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinSet;
use url::Url;

use crate::Error;
use crate::cache::{CacheKey, CacheStore, Partitions};
use crate::http::{Request, Response, Transport};

pub use maintenance::{CacheUsage, PartitionUsage, UpdateReport};
pub use patterns::{DEFAULT_CACHE_FIRST, DEFAULT_NETWORK_FIRST, PatternTable, Strategy};

/// Strategy dispatcher over an injected store and transport.
pub struct CacheRouter {
    store: Arc<dyn CacheStore>,
    transport: Arc<dyn Transport>,
    patterns: PatternTable,
    partitions: Partitions,
    offline_shell: Url,
    /// Stale-while-revalidate refreshes; aborted when the router is dropped.
    background: Mutex<JoinSet<()>>,
}

impl CacheRouter {
    pub fn new(
        store: Arc<dyn CacheStore>, transport: Arc<dyn Transport>, patterns: PatternTable, partitions: Partitions,
        offline_shell: Url,
    ) -> Self {
        Self { store, transport, patterns, partitions, offline_shell, background: Mutex::new(JoinSet::new()) }
    }

    pub fn partitions(&self) -> &Partitions {
        &self.partitions
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// The strategy `route` would use for this request.
    pub fn strategy_for(&self, request: &Request) -> Strategy {
        self.patterns.select(request.url.path())
    }

    /// Route a request to its strategy and return that strategy's result.
    pub async fn route(&self, request: &Request) -> Result<Response, Error> {
        let strategy = self.strategy_for(request);
        tracing::debug!(url = %request.url, %strategy, "routing request");

        match strategy {
            Strategy::NetworkFirst => self.network_first(request).await,
            Strategy::CacheFirst => self.cache_first(request).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(request).await,
        }
    }

    /// Send a request straight to the transport, bypassing every cache.
    pub async fn passthrough(&self, request: &Request) -> Result<Response, Error> {
        self.transport.fetch(request).await
    }

    /// Wait for every outstanding background refresh to finish.
    pub async fn drain_background(&self) {
        let mut tasks = {
            let mut guard = self.background.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *guard)
        };

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "background refresh task aborted");
            }
        }
    }

    /// Number of background refreshes not yet reaped.
    pub fn pending_background(&self) -> usize {
        self.background.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Cache lookup across all partitions. Store failures read as a miss.
    async fn lookup(&self, key: &CacheKey) -> Option<Response> {
        match self.store.match_any(key).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(url = %key.url, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Store a copy of a response. Failures are logged, never propagated.
    async fn store_copy(&self, partition: &str, key: &CacheKey, response: &Response) {
        match self.store.put(partition, key, response).await {
            Ok(()) => tracing::debug!(partition, url = %key.url, "cached response"),
            Err(e) => tracing::warn!(partition, url = %key.url, error = %e, "cache write failed"),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted transport and router fixtures shared by router tests.

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::cache::MemoryStore;

    pub const ORIGIN: &str = "https://example.com";

    pub fn url(path: &str) -> Url {
        Url::parse(ORIGIN).unwrap().join(path).unwrap()
    }

    /// Transport serving canned responses by path, with an offline switch.
    #[derive(Default)]
    pub struct FakeTransport {
        responses: Mutex<HashMap<String, Response>>,
        offline: AtomicBool,
        calls: AtomicUsize,
    }

    impl FakeTransport {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn serve(&self, path: &str, response: Response) {
            self.responses.lock().unwrap().insert(path.to_string(), response);
        }

        pub fn set_offline(&self, offline: bool) {
            self.offline.store(offline, Ordering::SeqCst);
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn fetch(&self, request: &Request) -> Result<Response, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.offline.load(Ordering::SeqCst) {
                return Err(Error::Network(format!("offline: {}", request.url)));
            }
            let responses = self.responses.lock().unwrap();
            Ok(responses
                .get(request.url.path())
                .cloned()
                .unwrap_or_else(|| Response::new(404, "not found")))
        }
    }

    /// Transport whose fetches never complete.
    pub struct StalledTransport;

    #[async_trait]
    impl Transport for StalledTransport {
        async fn fetch(&self, _request: &Request) -> Result<Response, Error> {
            std::future::pending().await
        }
    }

    /// Store whose reads and writes all fail.
    pub struct FailingStore;

    impl FailingStore {
        fn broken() -> Error {
            Error::CorruptEntry("disk I/O error".into())
        }
    }

    #[async_trait]
    impl CacheStore for FailingStore {
        async fn open(&self, _name: &str) -> Result<(), Error> {
            Err(Self::broken())
        }

        async fn put(&self, _name: &str, _key: &CacheKey, _response: &Response) -> Result<(), Error> {
            Err(Self::broken())
        }

        async fn put_all(&self, _name: &str, _entries: &[(CacheKey, Response)]) -> Result<(), Error> {
            Err(Self::broken())
        }

        async fn match_in(&self, _name: &str, _key: &CacheKey) -> Result<Option<Response>, Error> {
            Err(Self::broken())
        }

        async fn match_any(&self, _key: &CacheKey) -> Result<Option<Response>, Error> {
            Err(Self::broken())
        }

        async fn delete(&self, _name: &str) -> Result<bool, Error> {
            Err(Self::broken())
        }

        async fn keys(&self) -> Result<Vec<String>, Error> {
            Err(Self::broken())
        }

        async fn size(&self, _name: &str) -> Result<u64, Error> {
            Err(Self::broken())
        }
    }

    pub fn router_over(store: Arc<dyn CacheStore>, transport: Arc<dyn Transport>) -> CacheRouter {
        CacheRouter::new(
            store,
            transport,
            PatternTable::new(DEFAULT_NETWORK_FIRST, DEFAULT_CACHE_FIRST).unwrap(),
            Partitions::for_version("v1.0.0"),
            url("/index.html"),
        )
    }

    pub fn router(store: Arc<MemoryStore>, transport: Arc<FakeTransport>) -> CacheRouter {
        router_over(store, transport)
    }
}
