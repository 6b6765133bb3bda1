//! MCP tool implementations.
//!
//! This module contains all tools exposed by the shellcache server.

pub mod cache;
pub mod sw_fetch;
pub mod sw_status;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use shellcache_core::Error;

/// Serialize a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod testing {
    //! Worker fixtures for tool tests.

    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use rmcp::model::CallToolResult;
    use shellcache_core::{AppConfig, Error, MemoryStore, Request, Response, ServiceWorker, Transport};

    pub const ORIGIN: &str = "https://example.com";

    /// Transport serving canned bodies by path; unknown paths are 404.
    #[derive(Default)]
    pub struct SiteTransport {
        pages: Mutex<HashMap<String, Response>>,
    }

    impl SiteTransport {
        pub fn serve(&self, path: &str, response: Response) {
            self.pages.lock().unwrap().insert(path.to_string(), response);
        }
    }

    #[async_trait]
    impl Transport for SiteTransport {
        async fn fetch(&self, request: &Request) -> Result<Response, Error> {
            let pages = self.pages.lock().unwrap();
            Ok(pages
                .get(request.url.path())
                .cloned()
                .unwrap_or_else(|| Response::new(404, "not found")))
        }
    }

    pub fn site() -> Arc<SiteTransport> {
        let transport = SiteTransport::default();
        transport.serve("/", Response::new(200, "<home>"));
        transport.serve("/index.html", Response::new(200, "<shell>"));
        transport.serve("/css/style.css", Response::new(200, "body{}"));
        Arc::new(transport)
    }

    pub fn worker(store: Arc<MemoryStore>, transport: Arc<SiteTransport>) -> ServiceWorker {
        let config = AppConfig {
            origin: ORIGIN.into(),
            static_assets: vec!["/".into(), "/index.html".into(), "/css/style.css".into()],
            ..Default::default()
        };
        ServiceWorker::from_config(&config, store, transport).unwrap()
    }

    /// Installed and active worker over the canned site.
    pub async fn active_worker() -> (ServiceWorker, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let worker = worker(store.clone(), site());
        worker.install().await.unwrap();
        (worker, store)
    }

    /// Text payload of the first content item.
    pub fn output_text(result: &CallToolResult) -> String {
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content")
            .to_string()
    }
}
