//! Stored response CRUD within a cache store.
//!
//! Every write is an upsert keyed by (store, request identity), so
//! overlapping writes for the same resource simply leave the last one.

use super::connection::CacheDb;
use super::hash::compute_request_key;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A stored response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedEntry {
    pub method: String,
    pub url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    /// Response headers as a JSON array of `[name, value]` pairs.
    pub headers_json: Option<String>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl CachedEntry {
    /// Build an entry stamped with the current time.
    pub fn new(method: &str, url: &str, status_code: u16, body: Vec<u8>) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
            status_code,
            content_type: None,
            headers_json: None,
            body,
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Request identity key for this entry.
    pub fn key(&self) -> String {
        compute_request_key(&self.method, &self.url)
    }
}

impl CacheDb {
    /// Insert or overwrite the entry for a request identity.
    ///
    /// # Errors
    ///
    /// Returns `Error::StoreNotFound` if the store has not been opened.
    pub async fn put_entry(&self, store: &str, entry: &CachedEntry) -> Result<(), Error> {
        let store = store.to_string();
        let entry = entry.clone();
        let key = entry.key();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM cache_stores WHERE name = ?1)",
                    params![store],
                    |row| row.get(0),
                )?;
                if !exists {
                    return Err(Error::StoreNotFound(store));
                }

                conn.execute(
                    "INSERT INTO cache_entries (
                        store, key_hash, method, url, status_code,
                        content_type, headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    ON CONFLICT(store, key_hash) DO UPDATE SET
                        status_code = excluded.status_code,
                        content_type = excluded.content_type,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        &store,
                        &key,
                        &entry.method,
                        &entry.url,
                        entry.status_code as i64,
                        &entry.content_type,
                        &entry.headers_json,
                        &entry.body,
                        &entry.stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Find the entry stored for a request identity.
    ///
    /// Returns None if the store or the entry doesn't exist.
    pub async fn match_entry(&self, store: &str, method: &str, url: &str) -> Result<Option<CachedEntry>, Error> {
        let store = store.to_string();
        let key = compute_request_key(method, url);
        self.conn
            .call(move |conn| -> Result<Option<CachedEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status_code, content_type, headers_json, body, stored_at
                     FROM cache_entries WHERE store = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![store, key], |row| {
                    Ok(CachedEntry {
                        method: row.get(0)?,
                        url: row.get(1)?,
                        status_code: row.get::<_, i64>(2)? as u16,
                        content_type: row.get(3)?,
                        headers_json: row.get(4)?,
                        body: row.get(5)?,
                        stored_at: row.get(6)?,
                    })
                });

                match result {
                    Ok(entry) => Ok(Some(entry)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// URLs of every entry in a store, sorted.
    pub async fn entry_keys(&self, store: &str) -> Result<Vec<String>, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM cache_entries WHERE store = ?1 ORDER BY url ASC")?;
                let urls = stmt
                    .query_map(params![store], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in a store.
    pub async fn count_entries(&self, store: &str) -> Result<u64, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM cache_entries WHERE store = ?1", params![store], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete entries whose URL starts with `prefix`.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_entries_by_prefix(&self, store: &str, prefix: &str) -> Result<u64, Error> {
        let store = store.to_string();
        let prefix = prefix.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute(
                    "DELETE FROM cache_entries WHERE store = ?1 AND substr(url, 1, length(?2)) = ?2",
                    params![store, prefix],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
