//! Redis-based cache store.

use super::{ttl_secs, CacheStore, Pipeline, ScanPage, StoreOp};
use crate::{CacheError, CacheResult};
use agora_config::RedisConfig;
use async_trait::async_trait;
use deadpool_redis::{redis::AsyncCommands, Config, Pool, Runtime};
use shaku::Component;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Create a Redis connection pool and check it with a `PING`.
pub async fn create_pool(config: &RedisConfig) -> CacheResult<Pool> {
    info!("Creating Redis connection pool for content cache...");

    let pool = Config::from_url(&config.url)
        .builder()
        .map_err(|e| CacheError::unavailable(format!("Invalid Redis config: {}", e)))?
        .max_size(config.pool_size)
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| CacheError::unavailable(format!("Failed to create pool: {}", e)))?;

    let mut conn = pool.get().await?;
    redis::cmd("PING").query_async::<String>(&mut conn).await?;

    info!("Redis connection pool created successfully");
    Ok(pool)
}

/// Redis-based cache store.
#[derive(Component)]
#[shaku(interface = CacheStore)]
pub struct RedisCacheStore {
    /// Redis connection pool; `None` when caching is disabled.
    pool: Option<Arc<Pool>>,
    /// Upper bound on a single store call, on top of the client's own limits.
    op_timeout: Option<Duration>,
}

impl RedisCacheStore {
    /// Create a new Redis cache store.
    #[must_use]
    pub fn new(pool: Arc<Pool>) -> Self {
        Self {
            pool: Some(pool),
            op_timeout: None,
        }
    }

    /// Create a store whose calls fail as unavailable after `timeout`.
    #[must_use]
    pub fn with_timeout(pool: Arc<Pool>, timeout: Option<Duration>) -> Self {
        Self {
            pool: Some(pool),
            op_timeout: timeout,
        }
    }

    /// Create a no-op store (for when Redis is disabled).
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            pool: None,
            op_timeout: None,
        }
    }

    /// Build a store from configuration, connecting only when enabled.
    pub async fn from_config(config: &RedisConfig) -> CacheResult<Self> {
        if !config.enabled {
            info!("Redis disabled; content cache runs as a no-op");
            return Ok(Self::disabled());
        }

        let pool = create_pool(config).await?;
        Ok(Self::with_timeout(Arc::new(pool), config.op_timeout()))
    }

    /// Get a connection from the pool.
    async fn get_conn(&self) -> CacheResult<deadpool_redis::Connection> {
        match &self.pool {
            Some(pool) => Ok(pool.get().await?),
            None => Err(CacheError::unavailable("Cache is disabled")),
        }
    }

    /// Run a store call under the configured timeout.
    async fn timed<T, F>(&self, op: &'static str, fut: F) -> CacheResult<T>
    where
        F: Future<Output = CacheResult<T>> + Send,
    {
        match self.op_timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| CacheError::unavailable(format!("Redis {} timed out after {:?}", op, limit)))?,
            None => fut.await,
        }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    fn is_enabled(&self) -> bool {
        self.pool.is_some()
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        if !self.is_enabled() {
            return Ok(None);
        }

        let value = self
            .timed("GET", async {
                let mut conn = self.get_conn().await?;
                let value: Option<String> = conn.get(key).await?;
                Ok(value)
            })
            .await?;

        match &value {
            Some(_) => debug!("Cache hit for key '{}'", key),
            None => debug!("Cache miss for key '{}'", key),
        }

        Ok(value)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        let secs = ttl_secs(ttl);
        self.timed("SETEX", async {
            let mut conn = self.get_conn().await?;
            conn.set_ex::<_, _, ()>(key, value, secs).await?;
            Ok(())
        })
        .await?;

        debug!("Cached key '{}' with TTL {}s", key, secs);
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> CacheResult<u64> {
        if !self.is_enabled() || keys.is_empty() {
            return Ok(0);
        }

        let deleted = self
            .timed("DEL", async {
                let mut conn = self.get_conn().await?;
                let deleted: u64 = conn.del(keys).await?;
                Ok(deleted)
            })
            .await?;

        debug!("Deleted {} of {} keys", deleted, keys.len());
        Ok(deleted)
    }

    async fn scan_page(&self, pattern: &str, cursor: u64, count: usize) -> CacheResult<ScanPage> {
        if !self.is_enabled() {
            return Ok(ScanPage::default());
        }

        let (cursor, keys): (u64, Vec<String>) = self
            .timed("SCAN", async {
                let mut conn = self.get_conn().await?;
                let page = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(pattern)
                    .arg("COUNT")
                    .arg(count.max(1))
                    .query_async(&mut conn)
                    .await?;
                Ok(page)
            })
            .await?;

        Ok(ScanPage { cursor, keys })
    }

    async fn execute(&self, pipeline: Pipeline) -> CacheResult<()> {
        if !self.is_enabled() || pipeline.is_empty() {
            return Ok(());
        }

        let len = pipeline.len();
        let mut pipe = redis::pipe();
        for op in pipeline.into_ops() {
            match op {
                StoreOp::Set { key, value, ttl } => {
                    pipe.set_ex(key, value, ttl_secs(ttl)).ignore();
                }
                StoreOp::Delete { keys } => {
                    pipe.del(keys).ignore();
                }
            }
        }

        self.timed("pipeline", async {
            let mut conn = self.get_conn().await?;
            pipe.query_async::<()>(&mut conn).await?;
            Ok(())
        })
        .await?;

        debug!("Executed pipeline of {} operations", len);
        Ok(())
    }
}
