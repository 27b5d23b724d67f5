//! Key-value store adapter.
//!
//! [`CacheStore`] is the single seam between the cache subsystem and the
//! remote store. [`RedisCacheStore`] talks to Redis; [`MemoryCacheStore`]
//! honours the same contract in-process so tests can substitute it.

mod memory_store;
mod redis_store;

pub use memory_store::MemoryCacheStore;
pub use redis_store::{create_pool, RedisCacheStore, RedisCacheStoreParameters};

use crate::{CacheError, CacheResult};
use agora_core::Interface;
use async_trait::async_trait;
use std::time::Duration;

/// One page of a cursor-based scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Cursor to pass to the next call; `0` means the scan is complete.
    pub cursor: u64,
    /// Keys matched on this page. May be empty even when `cursor != 0`.
    pub keys: Vec<String>,
}

/// A single operation inside a [`Pipeline`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    /// Overwrite a key with a value and expiry.
    Set {
        key: String,
        value: String,
        ttl: Duration,
    },
    /// Delete a set of keys.
    Delete { keys: Vec<String> },
}

/// A batch of writes sent to the store in one round trip.
///
/// The store is not required to apply the batch atomically across keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    ops: Vec<StoreOp>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a set-with-expiry.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>, ttl: Duration) -> &mut Self {
        self.ops.push(StoreOp::Set {
            key: key.into(),
            value: value.into(),
            ttl,
        });
        self
    }

    /// Queues a delete. An empty key list is ignored.
    pub fn delete<I, K>(&mut self, keys: I) -> &mut Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        if !keys.is_empty() {
            self.ops.push(StoreOp::Delete { keys });
        }
        self
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Returns the number of queued operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns the queued operations.
    #[must_use]
    pub fn ops(&self) -> &[StoreOp] {
        &self.ops
    }

    /// Consumes the pipeline, returning its operations.
    #[must_use]
    pub fn into_ops(self) -> Vec<StoreOp> {
        self.ops
    }
}

/// Contract every cache backend implements.
///
/// All operations are fallible; callers log failures and carry on as if the
/// cache were empty.
#[async_trait]
pub trait CacheStore: Interface + Send + Sync {
    /// Get a raw value.
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Set a raw value with a TTL. Sub-second TTLs round up to one second.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Delete keys, returning how many existed.
    async fn delete(&self, keys: &[String]) -> CacheResult<u64>;

    /// Fetch one page of keys matching a glob pattern.
    ///
    /// Pass `0` to start; keep passing the returned cursor until it is `0`
    /// again. `count` is a hint for how much work one call does.
    async fn scan_page(&self, pattern: &str, cursor: u64, count: usize) -> CacheResult<ScanPage>;

    /// Send a batch of writes in one round trip.
    async fn execute(&self, pipeline: Pipeline) -> CacheResult<()>;

    /// Check if caching is enabled.
    fn is_enabled(&self) -> bool;
}

/// Typed JSON helpers over any [`CacheStore`].
#[async_trait]
pub trait CacheStoreExt: CacheStore {
    /// Get and deserialize a value. A value that fails to deserialize is
    /// reported as [`CacheError::Malformed`].
    async fn get_json<T: serde::de::DeserializeOwned + Send>(&self, key: &str) -> CacheResult<Option<T>> {
        match self.get(key).await? {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|source| CacheError::Malformed {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    /// Serialize and set a value with a TTL.
    async fn set_json<T: serde::Serialize + Sync + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> CacheResult<()> {
        let json = serde_json::to_string(value)?;
        self.set_with_ttl(key, &json, ttl).await
    }
}

// Blanket implementation for all CacheStore implementations
impl<T: CacheStore + ?Sized> CacheStoreExt for T {}

/// Whole seconds for a store TTL, never zero.
pub(crate) fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs.max(1)
    }
}
