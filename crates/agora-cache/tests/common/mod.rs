//! Common test infrastructure for content cache integration tests.
//!
//! The store is the in-memory implementation and the "database" is a map, so
//! these tests run without Redis or MySQL.

#![allow(dead_code)]

use agora_cache::{commit_then_invalidate, Committed, ContentCache, ListQuery, MemoryCacheStore, Mutation};
use agora_config::CacheConfig;
use agora_core::{AuthorId, ContentId, ContentItem, ContentKind, ContentStatus, CounterField, ListPage};
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Builds a test item.
pub fn item(id: u64, author: u64, title: &str) -> ContentItem {
    ContentItem {
        id: ContentId::new(id),
        author_id: AuthorId::new(author),
        title: title.to_string(),
        content: format!("{} body", title),
        price: None,
        campus_id: None,
        goods_type: None,
        tag: None,
        status: ContentStatus::Active,
        likes: 0,
        complaints: 0,
        images: Vec::new(),
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
    }
}

/// Map-backed stand-in for the relational store.
#[derive(Default)]
pub struct FakeDatabase {
    rows: Mutex<BTreeMap<ContentId, ContentItem>>,
    queries: AtomicUsize,
}

impl FakeDatabase {
    pub fn find(&self, id: ContentId) -> Option<ContentItem> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.rows.lock().get(&id).filter(|i| !i.is_deleted()).cloned()
    }

    pub fn list(&self, page: u32, limit: u32) -> ListPage<ContentItem> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let rows = self.rows.lock();
        let live: Vec<ContentItem> = rows.values().filter(|i| !i.is_deleted()).cloned().collect();
        let total = live.len() as u64;
        let offset = ((page.max(1) - 1) * limit) as usize;
        let items = live.into_iter().skip(offset).take(limit as usize).collect();
        ListPage::new(items, total, Some(page), Some(limit))
    }

    pub fn upsert(&self, item: ContentItem) -> ContentItem {
        self.rows.lock().insert(item.id, item.clone());
        item
    }

    pub fn soft_delete(&self, id: ContentId) -> Option<ContentItem> {
        let mut rows = self.rows.lock();
        let row = rows.get_mut(&id)?;
        row.status = ContentStatus::Deleted;
        Some(row.clone())
    }

    pub fn adjust(&self, id: ContentId, field: CounterField, delta: i64) -> Option<ContentItem> {
        let mut rows = self.rows.lock();
        let row = rows.get_mut(&id)?;
        match field {
            CounterField::Likes => row.likes = (row.likes + delta).max(0),
            CounterField::Complaints => row.complaints = (row.complaints + delta).max(0),
        }
        Some(row.clone())
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

/// A content cache over an in-memory store plus a fake database.
pub struct Harness {
    pub store: Arc<MemoryCacheStore>,
    pub cache: ContentCache,
    pub db: FakeDatabase,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    pub fn with_config(config: CacheConfig) -> Self {
        let store = Arc::new(MemoryCacheStore::new());
        let cache = ContentCache::new(store.clone(), ContentKind::Post, &config);
        Self {
            store,
            cache,
            db: FakeDatabase::default(),
        }
    }

    /// Cache-aside detail read.
    pub async fn get(&self, id: u64) -> Option<ContentItem> {
        let id = ContentId::new(id);
        self.cache
            .reader()
            .get_or_load_detail(id, || async { Ok::<_, ()>(self.db.find(id)) })
            .await
            .unwrap()
    }

    /// Cache-aside page read.
    pub async fn page(&self, page: u32, limit: u32) -> ListPage<ContentItem> {
        self.cache
            .reader()
            .get_or_load_list(&ListQuery::paged(page, limit), || async {
                Ok::<_, ()>(self.db.list(page, limit))
            })
            .await
            .unwrap()
    }

    /// Inserts or replaces a row, then invalidates with a write-through payload.
    pub async fn save(&self, item: ContentItem, created: bool) -> Committed<ContentItem> {
        commit_then_invalidate(
            self.cache.engine(),
            async { Ok::<_, ()>(self.db.upsert(item)) },
            |saved| {
                let payload = serde_json::to_value(saved).ok();
                if created {
                    Mutation::Create {
                        id: saved.id,
                        author_id: Some(saved.author_id),
                        payload,
                    }
                } else {
                    Mutation::Update {
                        id: saved.id,
                        author_id: Some(saved.author_id),
                        payload,
                    }
                }
            },
        )
        .await
        .unwrap()
    }

    /// Adjusts a counter, then refreshes the cached detail entry.
    pub async fn react(&self, id: u64, field: CounterField, delta: i64) -> Committed<ContentItem> {
        let id = ContentId::new(id);
        commit_then_invalidate(
            self.cache.engine(),
            async { self.db.adjust(id, field, delta).ok_or(()) },
            |row| Mutation::Counter {
                id: row.id,
                author_id: Some(row.author_id),
                field,
                new_value: row.counter(field),
            },
        )
        .await
        .unwrap()
    }

    /// Soft-deletes a row, then invalidates.
    pub async fn delete(&self, id: u64) -> Committed<ContentItem> {
        let id = ContentId::new(id);
        commit_then_invalidate(
            self.cache.engine(),
            async { self.db.soft_delete(id).ok_or(()) },
            |row| Mutation::Delete {
                id: row.id,
                author_id: Some(row.author_id),
            },
        )
        .await
        .unwrap()
    }
}
