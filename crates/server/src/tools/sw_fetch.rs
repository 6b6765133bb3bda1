//! sw_fetch tool implementation.
//!
//! Builds a request from the tool parameters and hands it to the worker,
//! exactly as an intercepted page request would be.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::resolve;
use shellcache_core::{Error, Request, RequestMode, ResponseSource, ServiceWorker, Strategy};

use super::json_result;

/// Input parameters for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Target URL; site-relative paths resolve against the configured origin.
    pub url: String,

    /// HTTP method (default: GET). Non-GET requests are never cached.
    #[serde(default = "default_method")]
    pub method: String,

    /// Treat the request as a page navigation (eligible for the offline shell).
    #[serde(default)]
    pub navigate: bool,

    /// Optional request body for non-GET requests.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    /// The resolved request URL.
    pub url: String,
    pub method: String,
    /// Whether the worker routed the request through its caches.
    pub intercepted: bool,
    /// Strategy used, if intercepted.
    pub strategy: Option<Strategy>,
    pub source: ResponseSource,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
    pub body_bytes: usize,
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(worker: &ServiceWorker, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let url = resolve(worker.origin(), &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    let mut request = Request::new(params.method.as_str(), url);
    if params.navigate {
        request.mode = RequestMode::Navigate;
    }
    if let Some(body) = params.body {
        request = request.with_body(body);
    }

    let outcome = worker.handle(&request).await?;
    let response = outcome.response;

    let output = SwFetchOutput {
        url: request.url.to_string(),
        method: request.method,
        intercepted: outcome.strategy.is_some(),
        strategy: outcome.strategy,
        source: response.source,
        status: response.status,
        body: String::from_utf8_lossy(&response.body).to_string(),
        body_bytes: response.body.len(),
        headers: response.headers,
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::*;
    use std::sync::Arc;

    fn params(url: &str) -> SwFetchParams {
        SwFetchParams { url: url.into(), method: default_method(), navigate: false, body: None }
    }

    #[tokio::test]
    async fn test_fetch_empty_url() {
        let (worker, _) = active_worker().await;
        let result = fetch_impl(&worker, params("  ")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_fetch_cached_stylesheet() {
        let (worker, _) = active_worker().await;

        let result = fetch_impl(&worker, params("/css/style.css")).await.unwrap();
        let output: SwFetchOutput = serde_json::from_str(&output_text(&result)).unwrap();

        assert!(output.intercepted);
        assert_eq!(output.strategy, Some(Strategy::CacheFirst));
        assert_eq!(output.source, ResponseSource::Cache);
        assert_eq!(output.status, 200);
        assert_eq!(output.body, "body{}");
        assert_eq!(output.url, "https://example.com/css/style.css");
    }

    #[tokio::test]
    async fn test_fetch_post_passes_through() {
        let (worker, _store) = active_worker().await;
        let before = worker.cache_size().await.unwrap().total_bytes;

        let params = SwFetchParams {
            url: "/contact".into(),
            method: "post".into(),
            navigate: false,
            body: Some("name=Ada".into()),
        };
        let result = fetch_impl(&worker, params).await.unwrap();
        let output: SwFetchOutput = serde_json::from_str(&output_text(&result)).unwrap();

        assert!(!output.intercepted);
        assert_eq!(output.strategy, None);
        assert_eq!(output.method, "POST");
        assert_eq!(output.source, ResponseSource::Network);
        assert_eq!(worker.cache_size().await.unwrap().total_bytes, before);
    }

    #[tokio::test]
    async fn test_fetch_before_install_passes_through() {
        let worker = worker(Arc::new(shellcache_core::MemoryStore::new()), site());

        let result = fetch_impl(&worker, params("/")).await.unwrap();
        let output: SwFetchOutput = serde_json::from_str(&output_text(&result)).unwrap();

        assert!(!output.intercepted);
        assert_eq!(output.body, "<home>");
    }
}
