//! Cache-aside reads.
//!
//! The reader looks a view up in the cache and, on a miss, the caller queries
//! the database and hands the result back through a `populate_*` call. Cache
//! failures never surface: they are logged and reported as a miss, and a
//! failed population just leaves the key absent.

use crate::keys::{KeySpace, ListQuery, ListView, Namespace, SearchParams};
use crate::metrics::CacheMetrics;
use crate::store::{CacheStore, CacheStoreExt};
use crate::ttl::TtlPolicy;
use crate::{CacheError, Severity};
use agora_core::{ContentId, ListPage};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Cache-aside reader over one key space.
#[derive(Clone)]
pub struct CacheAsideReader {
    store: Arc<dyn CacheStore>,
    keys: KeySpace,
    ttl: TtlPolicy,
}

impl CacheAsideReader {
    /// Creates a reader.
    pub fn new(store: Arc<dyn CacheStore>, keys: KeySpace, ttl: TtlPolicy) -> Self {
        Self { store, keys, ttl }
    }

    /// Returns the key space this reader uses.
    #[must_use]
    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    /// Returns the TTL policy applied on population.
    #[must_use]
    pub fn ttl(&self) -> &TtlPolicy {
        &self.ttl
    }

    /// Returns the key a classified list view is stored under.
    #[must_use]
    pub fn list_key(&self, view: &ListView) -> String {
        match view {
            ListView::Page { page, limit } => self.keys.page(*page, *limit),
            ListView::Search(params) => self.keys.search(params),
        }
    }

    /// Reads a detail entry.
    pub async fn read_detail<T>(&self, id: ContentId) -> Option<T>
    where
        T: DeserializeOwned + Send,
    {
        self.read(Namespace::Detail, &self.keys.detail(id)).await
    }

    /// Reads an unfiltered page.
    pub async fn read_page<T>(&self, page: u32, limit: u32) -> Option<ListPage<T>>
    where
        T: DeserializeOwned + Send,
    {
        self.read(Namespace::Page, &self.keys.page(page, limit)).await
    }

    /// Reads a filtered list.
    pub async fn read_search<T>(&self, params: &SearchParams) -> Option<ListPage<T>>
    where
        T: DeserializeOwned + Send,
    {
        self.read(Namespace::Search, &self.keys.search(params)).await
    }

    /// Reads whichever namespace serves `query`.
    pub async fn read_list<T>(&self, query: &ListQuery) -> Option<ListPage<T>>
    where
        T: DeserializeOwned + Send,
    {
        let view = query.view();
        self.read(view.namespace(), &self.list_key(&view)).await
    }

    /// Stores a detail entry. Returns true if the write succeeded.
    pub async fn populate_detail<T>(&self, id: ContentId, payload: &T) -> bool
    where
        T: Serialize + Sync,
    {
        self.populate(Namespace::Detail, &self.keys.detail(id), payload).await
    }

    /// Stores an unfiltered page.
    pub async fn populate_page<T>(&self, page: u32, limit: u32, payload: &ListPage<T>) -> bool
    where
        T: Serialize + Sync,
    {
        self.populate(Namespace::Page, &self.keys.page(page, limit), payload)
            .await
    }

    /// Stores a filtered list.
    pub async fn populate_search<T>(&self, params: &SearchParams, payload: &ListPage<T>) -> bool
    where
        T: Serialize + Sync,
    {
        self.populate(Namespace::Search, &self.keys.search(params), payload)
            .await
    }

    /// Stores a list result under whichever namespace serves `query`.
    pub async fn populate_list<T>(&self, query: &ListQuery, payload: &ListPage<T>) -> bool
    where
        T: Serialize + Sync,
    {
        let view = query.view();
        self.populate(view.namespace(), &self.list_key(&view), payload)
            .await
    }

    /// Reads a detail entry, falling back to `loader` on a miss.
    ///
    /// A found item is written back to the cache. Loader errors are returned
    /// as-is; `Ok(None)` from the loader is not cached.
    pub async fn get_or_load_detail<T, E, F, Fut>(&self, id: ContentId, loader: F) -> Result<Option<T>, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<T>, E>> + Send,
    {
        if let Some(cached) = self.read_detail(id).await {
            return Ok(Some(cached));
        }

        let loaded = loader().await?;
        if let Some(item) = &loaded {
            self.populate_detail(id, item).await;
        }
        Ok(loaded)
    }

    /// Reads a list view, falling back to `loader` on a miss.
    pub async fn get_or_load_list<T, E, F, Fut>(&self, query: &ListQuery, loader: F) -> Result<ListPage<T>, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<ListPage<T>, E>> + Send,
    {
        let view = query.view();
        let key = self.list_key(&view);

        if let Some(cached) = self.read(view.namespace(), &key).await {
            return Ok(cached);
        }

        let loaded = loader().await?;
        self.populate(view.namespace(), &key, &loaded).await;
        Ok(loaded)
    }

    async fn read<T>(&self, namespace: Namespace, key: &str) -> Option<T>
    where
        T: DeserializeOwned + Send,
    {
        if !self.store.is_enabled() {
            return None;
        }

        match self.store.get_json::<T>(key).await {
            Ok(Some(value)) => {
                debug!("Cache hit for key '{}'", key);
                CacheMetrics::hit(namespace.as_str());
                Some(value)
            }
            Ok(None) => {
                debug!("Cache miss for key '{}'", key);
                CacheMetrics::miss(namespace.as_str());
                None
            }
            Err(e) => {
                match (&e, e.severity()) {
                    (_, Severity::Severe) => error!("Cache read failed for key '{}': {}", key, e),
                    (CacheError::Malformed { .. }, _) => warn!("Discarding malformed cache entry: {}", e),
                    _ => warn!("Cache read failed for key '{}': {}", key, e),
                }
                CacheMetrics::error(namespace.as_str(), e.kind());
                CacheMetrics::miss(namespace.as_str());
                None
            }
        }
    }

    async fn populate<T>(&self, namespace: Namespace, key: &str, payload: &T) -> bool
    where
        T: Serialize + Sync,
    {
        if !self.store.is_enabled() {
            return false;
        }

        let ttl = self.ttl.for_namespace(namespace);
        match self.store.set_json(key, payload, ttl).await {
            Ok(()) => {
                CacheMetrics::write(namespace.as_str());
                true
            }
            Err(e) => {
                warn!("Failed to populate cache key '{}': {}", key, e);
                CacheMetrics::error(namespace.as_str(), e.kind());
                false
            }
        }
    }
}
