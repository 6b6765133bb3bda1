//! Core types and caching logic for shellcache.
//!
//! This crate provides:
//! - Request/response model and the network transport seam
//! - Partitioned cache store with SQLite and in-memory backends
//! - Pattern-routed caching strategies and the worker lifecycle
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod perf;
pub mod router;
pub mod worker;

pub use cache::{CacheDb, CacheKey, CacheStore, MemoryStore, Partitions};
pub use config::AppConfig;
pub use error::Error;
pub use http::{Request, RequestMode, Response, ResponseSource, Transport};
pub use router::{CacheRouter, Strategy};
pub use worker::{FetchOutcome, ServiceWorker, WorkerState};
