//! shellcache server entry point.
//!
//! Loads configuration, installs the caching worker, then serves MCP on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use shellcache_client::{FetchClient, FetchConfig};
use shellcache_core::{AppConfig, CacheDb, CacheStore, MemoryStore, ServiceWorker, Transport};
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(origin = %config.origin, version = %config.cache_version, "Starting shellcache server on stdio transport");

    let store: Arc<dyn CacheStore> = if config.uses_memory_store() {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(CacheDb::open(&config.db_path).await?)
    };
    let transport: Arc<dyn Transport> = Arc::new(FetchClient::new(FetchConfig::from(&config))?);

    let worker = Arc::new(ServiceWorker::from_config(&config, store, transport)?);

    // A failed install leaves the worker redundant. Caches from an earlier
    // run keep serving; with none, requests pass through.
    match worker.start().await {
        Ok(state) => tracing::info!(?state, "worker started"),
        Err(e) => tracing::error!(error = %e, "worker install failed"),
    }

    let handler = handler::ShellCacheServer::new(Arc::clone(&worker));
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;
    worker.router().drain_background().await;

    Ok(())
}
