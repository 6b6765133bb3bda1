//! Partitioned response cache.
//!
//! - [`CacheStore`]: the store seam the router is written against
//! - [`CacheDb`]: SQLite backend (tokio-rusqlite, WAL, schema migrations)
//! - [`MemoryStore`]: in-memory backend with identical semantics
//! - Request-keyed entries: method + URL without fragment, SHA-256 hashed

pub mod connection;
pub mod entries;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use hash::CacheKey;
pub use memory::MemoryStore;
pub use store::{CacheStore, Partitions};
