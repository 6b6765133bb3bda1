//! Partitioned cache store abstraction.
//!
//! A store holds any number of named partitions, each a key→response map.
//! The router only ever talks to this trait, so the SQLite backend and the
//! in-memory backend are interchangeable.

use async_trait::async_trait;

use super::hash::CacheKey;
use crate::Error;
use crate::http::Response;

/// Persistent key-value cache, partitioned by name.
///
/// Each single-key write is atomic. `put_all` is atomic across its entries.
/// There are no other multi-key transactions; concurrent writers to the same
/// key race and the last completed write wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Create the partition if it does not exist.
    async fn open(&self, name: &str) -> Result<(), Error>;

    /// Store a response, replacing any entry under the same key.
    ///
    /// Creates the partition on first write.
    async fn put(&self, name: &str, key: &CacheKey, response: &Response) -> Result<(), Error>;

    /// Store every entry or none of them.
    async fn put_all(&self, name: &str, entries: &[(CacheKey, Response)]) -> Result<(), Error>;

    /// Look up a key in one partition.
    async fn match_in(&self, name: &str, key: &CacheKey) -> Result<Option<Response>, Error>;

    /// Look up a key across all partitions in creation order.
    async fn match_any(&self, key: &CacheKey) -> Result<Option<Response>, Error>;

    /// Delete a partition and all its entries. Returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    /// Names of all existing partitions in creation order.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Total body bytes stored in a partition (0 if absent).
    async fn size(&self, name: &str) -> Result<u64, Error>;
}

/// The two version-qualified partition names the router owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partitions {
    pub static_name: String,
    pub dynamic_name: String,
}

impl Partitions {
    pub fn new(static_name: impl Into<String>, dynamic_name: impl Into<String>) -> Self {
        Self { static_name: static_name.into(), dynamic_name: dynamic_name.into() }
    }

    /// `static-<version>` and `dynamic-<version>`.
    pub fn for_version(version: &str) -> Self {
        Self::new(format!("static-{version}"), format!("dynamic-{version}"))
    }

    pub fn is_current(&self, name: &str) -> bool {
        name == self.static_name || name == self.dynamic_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partitions_for_version() {
        let p = Partitions::for_version("v1.0.0");
        assert_eq!(p.static_name, "static-v1.0.0");
        assert_eq!(p.dynamic_name, "dynamic-v1.0.0");
        assert!(p.is_current("static-v1.0.0"));
        assert!(p.is_current("dynamic-v1.0.0"));
        assert!(!p.is_current("static-v0.9.0"));
        assert!(!p.is_current("virtualtech-pro-v1.0.0"));
    }
}
