//! Persistent Cache
//!
//! Key-value byte store that survives process restarts. On a phone this is
//! platform storage; the core only depends on the [`PersistentCache`] trait.
//!
//! - [`MemoryCache`] - in-process map, for tests and throwaway sessions
//! - [`FileCache`] - one file per key under a directory

pub mod file;

pub use file::FileCache;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    #[error("Cache IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Durable key-value store.
///
/// Implementations must make `set` atomic per key: a reader sees either the
/// previous value or the new one, never a partial write.
#[async_trait]
pub trait PersistentCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), CacheError>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), CacheError>;

    /// Remove every key, continuing past failures. Returns the first error.
    async fn remove_many(&self, keys: &[&str]) -> Result<(), CacheError> {
        let mut first_err = None;
        for key in keys {
            if let Err(e) = self.remove(key).await
                && first_err.is_none()
            {
                first_err = Some(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// In-memory cache backed by a concurrent map.
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, Vec<u8>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

#[async_trait]
impl PersistentCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), CacheError> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }
}
