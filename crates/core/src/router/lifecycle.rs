//! Install and activate hooks.

use url::Url;

use super::CacheRouter;
use crate::Error;
use crate::cache::CacheKey;
use crate::http::Request;

impl CacheRouter {
    /// Pre-cache the asset manifest into the static partition.
    ///
    /// Every asset is fetched and buffered first; a transport failure or
    /// non-ok status on any one aborts before anything is written. The batch
    /// is then committed with a single `put_all`, which also creates the
    /// partition, so a failed install leaves nothing behind.
    pub async fn on_install(&self, manifest: &[Url]) -> Result<usize, Error> {
        let partition = &self.partitions.static_name;

        let mut entries = Vec::with_capacity(manifest.len());
        for asset in manifest {
            let request = Request::get(asset.clone());
            let response = self
                .transport
                .fetch(&request)
                .await
                .map_err(|e| Error::InstallFailed { asset: asset.to_string(), reason: e.to_string() })?;

            if !response.is_ok() {
                return Err(Error::InstallFailed {
                    asset: asset.to_string(),
                    reason: format!("status {}", response.status),
                });
            }

            entries.push((CacheKey::for_request(&request), response));
        }

        self.store
            .put_all(partition, &entries)
            .await
            .map_err(|e| Error::InstallFailed { asset: partition.clone(), reason: e.to_string() })?;

        tracing::info!(partition = %partition, assets = entries.len(), "static assets cached");
        Ok(entries.len())
    }

    /// Whether the current static partition already holds every manifest
    /// asset, i.e. an earlier run of this version completed its install.
    pub async fn is_installed(&self, manifest: &[Url]) -> Result<bool, Error> {
        let partition = &self.partitions.static_name;
        if !self.store.keys().await?.contains(partition) {
            return Ok(false);
        }

        for asset in manifest {
            let key = CacheKey::new("GET", asset);
            if self.store.match_in(partition, &key).await?.is_none() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Whether any partition survives from an earlier run.
    pub async fn has_caches(&self) -> Result<bool, Error> {
        Ok(!self.store.keys().await?.is_empty())
    }

    /// Delete every partition that is not one of the two current names.
    ///
    /// Returns the deleted names; a second call with no install in between
    /// deletes nothing.
    pub async fn on_activate(&self) -> Result<Vec<String>, Error> {
        let mut deleted = Vec::new();

        for name in self.store.keys().await? {
            if self.partitions.is_current(&name) {
                continue;
            }
            if self.store.delete(&name).await? {
                tracing::info!(partition = %name, "deleted old cache");
                deleted.push(name);
            }
        }

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::testing::*;
    use crate::Error;
    use crate::cache::{CacheKey, CacheStore, MemoryStore};
    use crate::http::Response;

    fn manifest() -> Vec<url::Url> {
        ["/", "/index.html", "/css/style.css"].into_iter().map(url).collect()
    }

    fn serve_manifest(transport: &FakeTransport) {
        transport.serve("/", Response::new(200, "<home>"));
        transport.serve("/index.html", Response::new(200, "<shell>"));
        transport.serve("/css/style.css", Response::new(200, "body{}"));
    }

    #[tokio::test]
    async fn test_install_caches_manifest() {
        let store = Arc::new(MemoryStore::new());
        let transport = FakeTransport::new();
        serve_manifest(&transport);
        let router = router(store.clone(), transport);

        let count = router.on_install(&manifest()).await.unwrap();
        assert_eq!(count, 3);
        assert_eq!(store.entry_count("static-v1.0.0").await, 3);

        let shell = store
            .match_in("static-v1.0.0", &CacheKey::new("GET", &url("/index.html")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&shell.body[..], b"<shell>");
    }

    #[tokio::test]
    async fn test_install_non_ok_asset_aborts_everything() {
        let store = Arc::new(MemoryStore::new());
        let transport = FakeTransport::new();
        transport.serve("/", Response::new(200, "<home>"));
        transport.serve("/index.html", Response::new(200, "<shell>"));
        let router = router(store.clone(), transport);

        let result = router.on_install(&manifest()).await;
        assert!(matches!(result, Err(Error::InstallFailed { asset, .. }) if asset.ends_with("/css/style.css")));
        assert_eq!(store.entry_count("static-v1.0.0").await, 0);
    }

    #[tokio::test]
    async fn test_install_offline_aborts() {
        let store = Arc::new(MemoryStore::new());
        let transport = FakeTransport::new();
        serve_manifest(&transport);
        transport.set_offline(true);
        let router = router(store.clone(), transport);

        assert!(matches!(router.on_install(&manifest()).await, Err(Error::InstallFailed { .. })));
        assert_eq!(store.entry_count("static-v1.0.0").await, 0);
        assert!(store.keys().await.unwrap().is_empty());
        assert!(!router.has_caches().await.unwrap());
    }

    #[tokio::test]
    async fn test_is_installed_requires_every_asset() {
        let store = Arc::new(MemoryStore::new());
        let transport = FakeTransport::new();
        serve_manifest(&transport);
        let router = router(store.clone(), transport);

        assert!(!router.is_installed(&manifest()).await.unwrap());

        store
            .put("static-v1.0.0", &CacheKey::new("GET", &url("/")), &Response::new(200, "<home>"))
            .await
            .unwrap();
        assert!(!router.is_installed(&manifest()).await.unwrap());

        router.on_install(&manifest()).await.unwrap();
        assert!(router.is_installed(&manifest()).await.unwrap());
        assert!(router.has_caches().await.unwrap());
    }

    #[tokio::test]
    async fn test_activate_deletes_stale_partitions() {
        let store = Arc::new(MemoryStore::new());
        store.open("virtualtech-pro-v0.9.0").await.unwrap();
        store.open("static-v0.9.0").await.unwrap();
        store.open("static-v1.0.0").await.unwrap();
        store.open("dynamic-v1.0.0").await.unwrap();
        let router = router(store.clone(), FakeTransport::new());

        let deleted = router.on_activate().await.unwrap();
        assert_eq!(deleted, vec!["virtualtech-pro-v0.9.0", "static-v0.9.0"]);
        assert_eq!(store.keys().await.unwrap(), vec!["static-v1.0.0", "dynamic-v1.0.0"]);
    }

    #[tokio::test]
    async fn test_activate_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        store.open("static-v0.9.0").await.unwrap();
        let router = router(store, FakeTransport::new());

        assert_eq!(router.on_activate().await.unwrap().len(), 1);
        assert!(router.on_activate().await.unwrap().is_empty());
    }
}
