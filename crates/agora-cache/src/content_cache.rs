use crate::invalidation::InvalidationEngine;
use crate::keys::KeySpace;
use crate::reader::CacheAsideReader;
use crate::store::CacheStore;
use crate::ttl::TtlPolicy;
use agora_config::CacheConfig;
use agora_core::ContentKind;
use std::sync::Arc;

/// Reader and invalidation engine for one content kind, sharing a store and
/// key space.
#[derive(Clone)]
pub struct ContentCache {
    reader: CacheAsideReader,
    engine: InvalidationEngine,
}

impl ContentCache {
    /// Wires the cache for `kind` from configuration.
    pub fn new(store: Arc<dyn CacheStore>, kind: ContentKind, config: &CacheConfig) -> Self {
        let keys = KeySpace::for_kind(&config.key_prefix, kind);
        Self {
            reader: CacheAsideReader::new(store.clone(), keys.clone(), TtlPolicy::from(config)),
            engine: InvalidationEngine::from_config(store, keys, config),
        }
    }

    pub fn reader(&self) -> &CacheAsideReader {
        &self.reader
    }

    pub fn engine(&self) -> &InvalidationEngine {
        &self.engine
    }
}
