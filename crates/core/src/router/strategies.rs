//! The three caching strategies.

use std::sync::{Arc, PoisonError};

use super::CacheRouter;
use crate::Error;
use crate::cache::CacheKey;
use crate::http::{Request, Response, ResponseSource};

impl CacheRouter {
    /// Live fetch; ok responses are copied into the dynamic partition.
    ///
    /// A transport failure falls back to any cached entry, then to the
    /// offline shell for navigations. Non-ok responses are returned as-is
    /// and not cached.
    pub async fn network_first(&self, request: &Request) -> Result<Response, Error> {
        let key = CacheKey::for_request(request);

        match self.transport.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.store_copy(&self.partitions.dynamic_name, &key, &response).await;
                }
                Ok(response)
            }
            Err(err) if err.is_transport() => {
                tracing::debug!(url = %request.url, error = %err, "network failed, trying cache");

                if let Some(cached) = self.lookup(&key).await {
                    return Ok(cached.with_source(ResponseSource::Cache));
                }

                if request.is_navigation() {
                    let shell_key = CacheKey::new("GET", &self.offline_shell);
                    if let Some(shell) = self.lookup(&shell_key).await {
                        tracing::debug!(url = %request.url, "serving offline shell");
                        return Ok(shell.with_source(ResponseSource::OfflineShell));
                    }
                }

                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Cached entry if present, with no network round-trip.
    ///
    /// On a miss, fetches and stores ok responses in the static partition.
    /// A transport failure propagates.
    pub async fn cache_first(&self, request: &Request) -> Result<Response, Error> {
        let key = CacheKey::for_request(request);

        if let Some(cached) = self.lookup(&key).await {
            tracing::debug!(url = %request.url, "cache hit");
            return Ok(cached.with_source(ResponseSource::Cache));
        }

        let response = self.transport.fetch(request).await.inspect_err(|e| {
            tracing::warn!(url = %request.url, error = %e, "cache-first fetch failed");
        })?;

        if response.is_ok() {
            self.store_copy(&self.partitions.static_name, &key, &response).await;
        }

        Ok(response)
    }

    /// Cached entry immediately plus a background refresh of the dynamic
    /// partition; a one-shot network fetch when the cache is cold.
    pub async fn stale_while_revalidate(&self, request: &Request) -> Result<Response, Error> {
        let key = CacheKey::for_request(request);

        if let Some(cached) = self.lookup(&key).await {
            self.spawn_revalidate(request.clone(), key);
            return Ok(cached.with_source(ResponseSource::Cache));
        }

        let response = self.transport.fetch(request).await?;
        if response.is_ok() {
            self.store_copy(&self.partitions.dynamic_name, &key, &response).await;
        }

        Ok(response)
    }

    /// Fire-and-forget refresh with its own error boundary.
    fn spawn_revalidate(&self, request: Request, key: CacheKey) {
        let store = Arc::clone(&self.store);
        let transport = Arc::clone(&self.transport);
        let partition = self.partitions.dynamic_name.clone();

        let mut background = self.background.lock().unwrap_or_else(PoisonError::into_inner);
        while background.try_join_next().is_some() {}

        background.spawn(async move {
            match transport.fetch(&request).await {
                Ok(response) if response.is_ok() => match store.put(&partition, &key, &response).await {
                    Ok(()) => tracing::debug!(url = %request.url, "background refresh stored"),
                    Err(e) => tracing::warn!(url = %request.url, error = %e, "background refresh write failed"),
                },
                Ok(response) => {
                    tracing::debug!(url = %request.url, status = response.status, "background refresh not ok, kept cached entry")
                }
                Err(e) => tracing::warn!(url = %request.url, error = %e, "background update failed"),
            }
        });
    }
}
