//! Cache maintenance: usage accounting, clearing, and static refresh.

use serde::{Deserialize, Serialize};
use url::Url;

use super::CacheRouter;
use crate::Error;
use crate::cache::CacheKey;
use crate::http::Request;

/// Bytes held by one partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PartitionUsage {
    pub name: String,
    pub bytes: u64,
}

/// Bytes held across every partition in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheUsage {
    pub total_bytes: u64,
    pub partitions: Vec<PartitionUsage>,
}

/// Outcome of a static-asset refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct UpdateReport {
    pub updated: Vec<String>,
    pub failed: Vec<String>,
}

impl CacheRouter {
    /// Sum of stored body bytes, per partition and in total.
    pub async fn cache_size(&self) -> Result<CacheUsage, Error> {
        let mut partitions = Vec::new();
        for name in self.store.keys().await? {
            let bytes = self.store.size(&name).await?;
            partitions.push(PartitionUsage { name, bytes });
        }
        let total_bytes = partitions.iter().map(|p| p.bytes).sum();
        Ok(CacheUsage { total_bytes, partitions })
    }

    /// Delete every partition, current or not.
    pub async fn clear_all(&self) -> Result<Vec<String>, Error> {
        let mut cleared = Vec::new();
        for name in self.store.keys().await? {
            if self.store.delete(&name).await? {
                cleared.push(name);
            }
        }
        tracing::info!(count = cleared.len(), "cleared all caches");
        Ok(cleared)
    }

    /// Re-fetch each manifest asset and overwrite its static entry.
    ///
    /// Unlike install this is per-asset: a failed or non-ok fetch leaves that
    /// asset's existing entry in place and the rest still update.
    pub async fn update_static_assets(&self, manifest: &[Url]) -> UpdateReport {
        let mut report = UpdateReport::default();

        for asset in manifest {
            let request = Request::get(asset.clone());
            let outcome = match self.transport.fetch(&request).await {
                Ok(response) if response.is_ok() => self
                    .store
                    .put(&self.partitions.static_name, &CacheKey::for_request(&request), &response)
                    .await
                    .map_err(|e| e.to_string()),
                Ok(response) => Err(format!("status {}", response.status)),
                Err(e) => Err(e.to_string()),
            };

            match outcome {
                Ok(()) => report.updated.push(asset.to_string()),
                Err(reason) => {
                    tracing::warn!(asset = %asset, %reason, "failed to update asset");
                    report.failed.push(asset.to_string());
                }
            }
        }

        report
    }
}
