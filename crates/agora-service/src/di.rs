//! Dependency injection wiring.
//!
//! The cache store is resolved through a Shaku module so the Redis-backed
//! store can be swapped for another [`CacheStore`] component in tests or
//! alternative deployments.

use crate::content_service_impl::ContentServiceImpl;
use crate::repository::ContentRepository;
use agora_cache::{create_pool, CacheStore, ContentCache, RedisCacheStore, RedisCacheStoreParameters};
use agora_config::{AppConfig, CacheConfig, RedisConfig};
use agora_core::telemetry::init_tracing;
use agora_core::{AgoraResult, ContentKind};
use shaku::{module, HasComponent};
use std::sync::Arc;
use tracing::info;

// Module providing the content cache store.
module! {
    pub CacheModule {
        components = [RedisCacheStore],
        providers = []
    }
}

/// Builds the cache module, connecting to Redis only when it is enabled.
pub async fn build_cache_module(config: &RedisConfig) -> AgoraResult<Arc<CacheModule>> {
    let pool = if config.enabled {
        Some(Arc::new(create_pool(config).await?))
    } else {
        info!("Redis disabled; content cache runs as a no-op");
        None
    };

    let module = CacheModule::builder()
        .with_component_parameters::<RedisCacheStore>(RedisCacheStoreParameters {
            pool,
            op_timeout: config.op_timeout(),
        })
        .build();

    Ok(Arc::new(module))
}

/// Wires a content service for `kind` against the module's cache store.
pub fn content_service(
    module: &CacheModule,
    repository: Arc<dyn ContentRepository>,
    kind: ContentKind,
    config: &CacheConfig,
) -> ContentServiceImpl {
    let store: Arc<dyn CacheStore> = module.resolve();
    ContentServiceImpl::new(repository, ContentCache::new(store, kind, config))
}

/// Process-level startup: tracing, metric descriptions, then the cache module.
pub async fn bootstrap(config: &AppConfig) -> AgoraResult<Arc<CacheModule>> {
    init_tracing(&config.observability.telemetry())?;
    agora_cache::metrics::register_metrics();

    info!(
        redis_enabled = config.redis.enabled,
        key_prefix = %config.cache.key_prefix,
        "Starting content cache"
    );

    build_cache_module(&config.redis).await
}
