//! In-memory cache store.
//!
//! Same semantics as the SQLite backend without touching disk. Used for
//! tests and for ephemeral runs (`db_path = ":memory:"`).

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::hash::CacheKey;
use super::store::CacheStore;
use crate::Error;
use crate::http::{Response, ResponseSource};

type Partition = HashMap<CacheKey, Response>;

/// Partitions kept in creation order behind a single lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    partitions: RwLock<Vec<(String, Partition)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in a partition (0 if absent).
    pub async fn entry_count(&self, name: &str) -> usize {
        let partitions = self.partitions.read().await;
        partitions
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p.len())
            .unwrap_or(0)
    }
}

fn partition_mut<'a>(partitions: &'a mut Vec<(String, Partition)>, name: &str) -> &'a mut Partition {
    let idx = match partitions.iter().position(|(n, _)| n == name) {
        Some(idx) => idx,
        None => {
            partitions.push((name.to_string(), Partition::new()));
            partitions.len() - 1
        }
    };
    &mut partitions[idx].1
}

fn stored(response: &Response) -> Response {
    response.clone().with_source(ResponseSource::Network)
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn open(&self, name: &str) -> Result<(), Error> {
        let mut partitions = self.partitions.write().await;
        partition_mut(&mut partitions, name);
        Ok(())
    }

    async fn put(&self, name: &str, key: &CacheKey, response: &Response) -> Result<(), Error> {
        let mut partitions = self.partitions.write().await;
        partition_mut(&mut partitions, name).insert(key.clone(), stored(response));
        Ok(())
    }

    async fn put_all(&self, name: &str, entries: &[(CacheKey, Response)]) -> Result<(), Error> {
        let mut partitions = self.partitions.write().await;
        let partition = partition_mut(&mut partitions, name);
        for (key, response) in entries {
            partition.insert(key.clone(), stored(response));
        }
        Ok(())
    }

    async fn match_in(&self, name: &str, key: &CacheKey) -> Result<Option<Response>, Error> {
        let partitions = self.partitions.read().await;
        Ok(partitions
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, p)| p.get(key).cloned()))
    }

    async fn match_any(&self, key: &CacheKey) -> Result<Option<Response>, Error> {
        let partitions = self.partitions.read().await;
        Ok(partitions.iter().find_map(|(_, p)| p.get(key).cloned()))
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let mut partitions = self.partitions.write().await;
        let before = partitions.len();
        partitions.retain(|(n, _)| n != name);
        Ok(partitions.len() != before)
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        let partitions = self.partitions.read().await;
        Ok(partitions.iter().map(|(n, _)| n.clone()).collect())
    }

    async fn size(&self, name: &str) -> Result<u64, Error> {
        let partitions = self.partitions.read().await;
        Ok(partitions
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p.values().map(|r| r.body.len() as u64).sum())
            .unwrap_or(0))
    }
}
