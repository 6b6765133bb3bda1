//! cache_size tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use shellcache_core::ServiceWorker;

use crate::tools::json_result;

/// Implementation of the cache_size tool.
pub async fn size_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let usage = worker.cache_size().await?;
    json_result(&usage)
}
