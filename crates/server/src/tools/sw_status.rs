//! sw_status and sw_skip_waiting tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::perf::PerfEntry;
use shellcache_core::{ServiceWorker, WorkerState};

use super::json_result;

/// Output structure for sw_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwStatusOutput {
    pub state: WorkerState,
    pub origin: String,
    pub static_partition: String,
    pub dynamic_partition: String,
    /// Every partition currently in the store, oldest first.
    pub partitions: Vec<String>,
    /// Background refreshes not yet reaped.
    pub pending_refreshes: usize,
    /// Most recent request timings, oldest first.
    pub recent_requests: Vec<PerfEntry>,
}

/// Output structure for sw_skip_waiting tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SkipWaitingOutput {
    pub state: WorkerState,
}

/// Implementation of the sw_status tool.
pub async fn status_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let router = worker.router();
    let partitions = router.store().keys().await?;

    let output = SwStatusOutput {
        state: worker.state(),
        origin: worker.origin().to_string(),
        static_partition: router.partitions().static_name.clone(),
        dynamic_partition: router.partitions().dynamic_name.clone(),
        partitions,
        pending_refreshes: router.pending_background(),
        recent_requests: worker.perf_entries(),
    };

    json_result(&output)
}

/// Implementation of the sw_skip_waiting tool.
pub async fn skip_waiting_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let state = worker.skip_waiting().await?;
    json_result(&SkipWaitingOutput { state })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::*;
    use shellcache_core::{CacheStore, MemoryStore, Request};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_status_after_install() {
        let (worker, _) = active_worker().await;
        worker
            .handle_fetch(&Request::get("https://example.com/css/style.css".parse().unwrap()))
            .await
            .unwrap();

        let result = status_impl(&worker).await.unwrap();
        let output: SwStatusOutput = serde_json::from_str(&output_text(&result)).unwrap();

        assert_eq!(output.state, WorkerState::Active);
        assert_eq!(output.static_partition, "static-v1.0.0");
        assert_eq!(output.dynamic_partition, "dynamic-v1.0.0");
        assert_eq!(output.partitions, vec!["static-v1.0.0"]);
        assert_eq!(output.recent_requests.len(), 1);
        assert!(output.recent_requests[0].from_cache);
    }

    #[tokio::test]
    async fn test_skip_waiting_activates_and_evicts() {
        let store = Arc::new(MemoryStore::new());
        store.open("static-v0.9.0").await.unwrap();
        let worker = worker(store.clone(), site());

        let result = skip_waiting_impl(&worker).await.unwrap();
        let output: SkipWaitingOutput = serde_json::from_str(&output_text(&result)).unwrap();
        assert_eq!(output.state, WorkerState::Installing);

        worker.install().await.unwrap();
        assert_eq!(worker.state(), WorkerState::Active);
        assert_eq!(store.keys().await.unwrap(), vec!["static-v1.0.0"]);
    }
}
