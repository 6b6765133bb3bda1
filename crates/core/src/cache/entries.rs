//! Partition and entry operations for the SQLite store.

use async_trait::async_trait;
use bytes::Bytes;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};
use tokio_rusqlite::params;

use super::connection::CacheDb;
use super::hash::CacheKey;
use super::store::CacheStore;
use crate::Error;
use crate::http::Response;

/// Column values of one stored entry before decoding.
struct StoredEntry {
    status: i64,
    headers_json: String,
    body: Vec<u8>,
}

impl StoredEntry {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self { status: row.get(0)?, headers_json: row.get(1)?, body: row.get(2)? })
    }

    fn into_response(self) -> Result<Response, Error> {
        let status = u16::try_from(self.status).map_err(|_| Error::CorruptEntry(format!("status {}", self.status)))?;
        let headers: Vec<(String, String)> =
            serde_json::from_str(&self.headers_json).map_err(|e| Error::CorruptEntry(e.to_string()))?;
        Ok(Response { status, headers, body: Bytes::from(self.body), source: Default::default() })
    }
}

/// Owned row ready to be written inside a `call` closure.
struct NewEntry {
    key_hash: String,
    method: String,
    url: String,
    status: i64,
    headers_json: String,
    body: Vec<u8>,
}

impl NewEntry {
    fn new(key: &CacheKey, response: &Response) -> Result<Self, Error> {
        let headers_json =
            serde_json::to_string(&response.headers).map_err(|e| Error::InvalidInput(e.to_string()))?;
        Ok(Self {
            key_hash: key.hash(),
            method: key.method.clone(),
            url: key.url.clone(),
            status: i64::from(response.status),
            headers_json,
            body: response.body.to_vec(),
        })
    }
}

fn ensure_partition(conn: &rusqlite::Connection, name: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
        params![name, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn upsert_entry(conn: &rusqlite::Connection, partition: &str, entry: &NewEntry, stored_at: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO entries (partition, key_hash, method, url, status, headers_json, body, stored_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(partition, key_hash) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            partition,
            &entry.key_hash,
            &entry.method,
            &entry.url,
            entry.status,
            &entry.headers_json,
            &entry.body,
            stored_at,
        ],
    )?;
    Ok(())
}

#[async_trait]
impl CacheStore for CacheDb {
    async fn open(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                ensure_partition(conn, &name)?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn put(&self, name: &str, key: &CacheKey, response: &Response) -> Result<(), Error> {
        let name = name.to_string();
        let entry = NewEntry::new(key, response)?;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_partition(&tx, &name)?;
                upsert_entry(&tx, &name, &entry, &chrono::Utc::now().to_rfc3339())?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn put_all(&self, name: &str, entries: &[(CacheKey, Response)]) -> Result<(), Error> {
        let name = name.to_string();
        let entries = entries
            .iter()
            .map(|(key, response)| NewEntry::new(key, response))
            .collect::<Result<Vec<_>, _>>()?;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let stored_at = chrono::Utc::now().to_rfc3339();
                let tx = conn.transaction()?;
                ensure_partition(&tx, &name)?;
                for entry in &entries {
                    upsert_entry(&tx, &name, entry, &stored_at)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn match_in(&self, name: &str, key: &CacheKey) -> Result<Option<Response>, Error> {
        let name = name.to_string();
        let key_hash = key.hash();
        let stored = self
            .conn
            .call(move |conn| -> Result<Option<StoredEntry>, Error> {
                let entry = conn
                    .query_row(
                        "SELECT status, headers_json, body FROM entries WHERE partition = ?1 AND key_hash = ?2",
                        params![name, key_hash],
                        StoredEntry::from_row,
                    )
                    .optional()?;
                Ok(entry)
            })
            .await
            .map_err(Error::from)?;

        stored.map(StoredEntry::into_response).transpose()
    }

    async fn match_any(&self, key: &CacheKey) -> Result<Option<Response>, Error> {
        let key_hash = key.hash();
        let stored = self
            .conn
            .call(move |conn| -> Result<Option<StoredEntry>, Error> {
                let entry = conn
                    .query_row(
                        "SELECT e.status, e.headers_json, e.body
                         FROM entries e JOIN partitions p ON p.name = e.partition
                         WHERE e.key_hash = ?1
                         ORDER BY p.seq ASC
                         LIMIT 1",
                        params![key_hash],
                        StoredEntry::from_row,
                    )
                    .optional()?;
                Ok(entry)
            })
            .await
            .map_err(Error::from)?;

        stored.map(StoredEntry::into_response).transpose()
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY seq ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn size(&self, name: &str) -> Result<u64, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let total: i64 = conn.query_row(
                    "SELECT COALESCE(SUM(LENGTH(body)), 0) FROM entries WHERE partition = ?1",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(total as u64)
            })
            .await
            .map_err(Error::from)
    }
}
