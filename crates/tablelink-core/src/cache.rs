//! Optional read-through / write-through cache in front of a table.
//!
//! Cache keys are digests of the raw primary pair, so the cache never
//! learns the composite key format. The table remains the source of truth:
//! a failing or cold cache degrades to ordinary table reads, and cache
//! writes are best effort.

use crate::{
    entity::Entity,
    error::Error,
    key::{Gsi, KeyPair},
    row::Row,
    table::Table,
};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::{
    collections::HashMap,
    fmt::Write as _,
    sync::Mutex,
    time::{Duration, Instant},
};
use thiserror::Error as ThisError;
use tracing::warn;

///
/// CacheError
///

#[derive(Debug, ThisError)]
pub enum CacheError {
    #[error("cache transport error: {0}")]
    Transport(String),
}

///
/// CacheBackend
///
/// A byte-oriented cache. Implementations own their own encoding of TTLs;
/// `None` means no expiry.
///

#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>)
    -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Cache key for a raw primary pair: hex SHA-256 of `"pk:sk"`.
///
/// Hashing keeps arbitrary key text safe for any backend's key syntax and
/// uniform in length.
#[must_use]
pub fn cache_key(raw: &KeyPair) -> String {
    let digest = Sha256::digest(format!("{}:{}", raw.pk, raw.sk).as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

///
/// CachedTable
///
/// Same point-operation surface as [`Table`], with a cache in front of
/// reads. Reverse lookups and batches stay on the inner table, reachable
/// through [`CachedTable::table`].
///

pub struct CachedTable<B: CacheBackend> {
    table: Table,
    backend: B,
    ttl: Option<Duration>,
}

impl<B: CacheBackend> CachedTable<B> {
    pub fn new(table: Table, backend: B) -> Self {
        let ttl = table.config().cache_ttl;
        Self {
            table,
            backend,
            ttl,
        }
    }

    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    #[must_use]
    pub const fn table(&self) -> &Table {
        &self.table
    }

    /// Read through the cache.
    ///
    /// A hit decodes straight into the row's object and never touches the
    /// table, so no read image is captured. Misses, undecodable entries,
    /// and backend failures all fall back to the table; a successful table
    /// read populates the cache best effort.
    pub async fn get<T: Entity>(&self, row: &mut Row<T>) -> Result<(), Error> {
        let raw = row.object().keys(Gsi::PRIMARY)?;
        let key = cache_key(&raw);

        match self.backend.get(&key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<T>(&bytes) {
                Ok(object) => {
                    *row.object_mut() = object;
                    return Ok(());
                }
                Err(err) => warn!(%err, "discarding undecodable cache entry"),
            },
            Ok(None) => {}
            Err(err) => warn!(%err, "cache read failed, falling back to the table"),
        }

        self.table.get(row).await?;
        self.store(&key, row.object()).await;
        Ok(())
    }

    /// Write through: the table first, then the cache.
    pub async fn put<T: Entity>(&self, row: &mut Row<T>) -> Result<Option<T>, Error> {
        let previous = self.table.put(row).await?;
        // Keys are re-derived after the write so a generated identifier is
        // cached under its assigned key.
        let raw = row.object().keys(Gsi::PRIMARY)?;
        self.store(&cache_key(&raw), row.object()).await;
        Ok(previous)
    }

    /// Delete from the table and invalidate the cache entry.
    pub async fn delete<T: Entity>(&self, row: &mut Row<T>) -> Result<Option<T>, Error> {
        let raw = row.object().keys(Gsi::PRIMARY)?;
        let previous = self.table.delete(row).await?;
        if let Err(err) = self.backend.delete(&cache_key(&raw)).await {
            warn!(%err, "cache invalidation failed");
        }
        Ok(previous)
    }

    async fn store<T: Entity>(&self, key: &str, object: &T) {
        match serde_json::to_vec(object) {
            Ok(bytes) => {
                if let Err(err) = self.backend.set(key, bytes, self.ttl).await {
                    warn!(%err, "cache write failed");
                }
            }
            Err(err) => warn!(%err, "object is not cacheable"),
        }
    }
}

///
/// MemoryCache
///
/// Process-local backend for tests and single-node deployments.
///

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

struct CacheEntry {
    bytes: Vec<u8>,
    expires_at: Option<Instant>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut entries = self.entries.lock().expect("cache poisoned");
        match entries.get(key) {
            Some(entry) if entry.expires_at.is_some_and(|at| at <= Instant::now()) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.bytes.clone())),
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let entry = CacheEntry {
            bytes: value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.entries
            .lock()
            .expect("cache poisoned")
            .insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.lock().expect("cache poisoned").remove(key);
        Ok(())
    }
}

///
/// TESTS
///
