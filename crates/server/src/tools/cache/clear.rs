//! cache_clear tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::ServiceWorker;

use crate::tools::json_result;

/// Output from the cache_clear tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearOutput {
    /// Names of the partitions that were deleted.
    pub cleared: Vec<String>,
}

/// Implementation of the cache_clear tool.
pub async fn clear_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let cleared = worker.clear_all_caches().await?;
    json_result(&CacheClearOutput { cleared })
}
