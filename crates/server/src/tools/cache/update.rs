//! cache_update tool implementation.
//!
//! Re-fetches the static manifest into the current static partition. Assets
//! that fail keep their previous entry.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use shellcache_core::ServiceWorker;

use crate::tools::json_result;

/// Implementation of the cache_update tool.
pub async fn update_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let report = worker.update_static_assets().await;
    json_result(&report)
}
