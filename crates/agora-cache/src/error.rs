//! Cache error types.

use agora_core::AgoraError;
use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// How loudly a cache error should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// The affected key is simply treated as a miss or skipped.
    Degraded,
    /// An unbounded set of list entries may have been left stale.
    Severe,
}

/// Cache-related errors.
///
/// None of these ever reach an end user: readers turn them into misses and
/// the invalidation engine turns them into logged no-ops.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The store could not be reached (pool, connection, timeout, disabled).
    #[error("Cache store unavailable: {0}")]
    Unavailable(String),

    /// A stored value failed to deserialize.
    #[error("Malformed cache entry at '{key}': {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A payload failed to serialize.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Cursor draining aborted by an upstream error mid-scan.
    #[error("Scan of '{pattern}' aborted after {scanned} keys: {reason}")]
    ScanIncomplete {
        pattern: String,
        scanned: usize,
        reason: String,
    },
}

impl CacheError {
    /// Creates an unavailable error.
    #[must_use]
    pub fn unavailable<T: Into<String>>(message: T) -> Self {
        Self::Unavailable(message.into())
    }

    /// Returns how loudly this error should be reported.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::ScanIncomplete { .. } => Severity::Severe,
            Self::Unavailable(_) | Self::Malformed { .. } | Self::Serialization(_) => Severity::Degraded,
        }
    }

    /// Returns a short label used for metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "unavailable",
            Self::Malformed { .. } => "malformed",
            Self::Serialization(_) => "serialization",
            Self::ScanIncomplete { .. } => "scan_incomplete",
        }
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        Self::Unavailable(format!("Redis error: {}", err))
    }
}

impl From<deadpool_redis::PoolError> for CacheError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        Self::Unavailable(format!("Failed to get Redis connection: {}", err))
    }
}

impl From<CacheError> for AgoraError {
    fn from(err: CacheError) -> Self {
        Self::Cache(err.to_string())
    }
}
