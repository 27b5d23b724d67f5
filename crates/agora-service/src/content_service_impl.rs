//! Content service implementation.

use crate::content_service::ContentService;
use crate::dto::{CreateContentRequest, UpdateContentRequest};
use crate::repository::ContentRepository;
use agora_cache::{commit_then_invalidate, ContentCache, ListQuery, Mutation};
use agora_core::{AgoraError, AgoraResult, ContentId, ContentItem, CounterField, ListPage, ValidateExt};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Content service over a repository and the content cache of one kind.
pub struct ContentServiceImpl {
    repository: Arc<dyn ContentRepository>,
    cache: ContentCache,
}

impl ContentServiceImpl {
    /// Creates a new content service.
    pub fn new(repository: Arc<dyn ContentRepository>, cache: ContentCache) -> Self {
        Self { repository, cache }
    }

    /// Detail payload written through to the cache.
    fn payload(item: &ContentItem) -> Option<serde_json::Value> {
        serde_json::to_value(item).ok()
    }
}

#[async_trait]
impl ContentService for ContentServiceImpl {
    async fn get_item(&self, id: ContentId) -> AgoraResult<ContentItem> {
        debug!("Getting content: {}", id);

        let item = self
            .cache
            .reader()
            .get_or_load_detail(id, || self.repository.find_by_id(id))
            .await?
            .filter(|item| !item.is_deleted())
            .ok_or_else(|| AgoraError::not_found("Content", id))?;

        Ok(item)
    }

    async fn list_items(&self, query: ListQuery) -> AgoraResult<ListPage<ContentItem>> {
        debug!("Listing content: page={:?} limit={:?}", query.page, query.limit);

        self.cache
            .reader()
            .get_or_load_list(&query, || self.repository.list(&query))
            .await
    }

    async fn create_item(&self, request: CreateContentRequest) -> AgoraResult<ContentItem> {
        debug!("Creating content: {}", request.title);

        request.validate_request()?;

        let item = commit_then_invalidate(self.cache.engine(), self.repository.create(&request), |item| {
            Mutation::Create {
                id: item.id,
                author_id: Some(item.author_id),
                payload: Self::payload(item),
            }
        })
        .await?
        .into_inner();

        info!("Content created: {}", item.id);
        Ok(item)
    }

    async fn update_item(&self, id: ContentId, request: UpdateContentRequest) -> AgoraResult<ContentItem> {
        debug!("Updating content: {}", id);

        request.validate_request()?;
        if request.is_empty() {
            return Err(AgoraError::validation("Nothing to update"));
        }

        let write = async {
            self.repository
                .update(id, &request)
                .await?
                .ok_or_else(|| AgoraError::not_found("Content", id))
        };

        // Setting the status to deleted is a soft delete.
        let item = commit_then_invalidate(self.cache.engine(), write, |item| {
            if item.is_deleted() {
                Mutation::Delete {
                    id: item.id,
                    author_id: Some(item.author_id),
                }
            } else {
                Mutation::Update {
                    id: item.id,
                    author_id: Some(item.author_id),
                    payload: Self::payload(item),
                }
            }
        })
        .await?
        .into_inner();

        info!("Content updated: {}", id);
        Ok(item)
    }

    async fn delete_item(&self, id: ContentId) -> AgoraResult<()> {
        debug!("Deleting content: {}", id);

        let write = async {
            self.repository
                .soft_delete(id)
                .await?
                .ok_or_else(|| AgoraError::not_found("Content", id))
        };

        commit_then_invalidate(self.cache.engine(), write, |item| Mutation::Delete {
            id: item.id,
            author_id: Some(item.author_id),
        })
        .await?;

        info!("Content deleted: {}", id);
        Ok(())
    }

    async fn set_reaction(&self, id: ContentId, field: CounterField, on: bool) -> AgoraResult<i64> {
        debug!("Setting {} on {} to {}", field, id, on);

        let delta = if on { 1 } else { -1 };
        let write = async {
            self.repository
                .adjust_counter(id, field, delta)
                .await?
                .ok_or_else(|| AgoraError::not_found("Content", id))
        };

        let value = commit_then_invalidate(self.cache.engine(), write, |value| Mutation::Counter {
            id,
            author_id: None,
            field,
            new_value: *value,
        })
        .await?
        .into_inner();

        Ok(value)
    }
}

impl std::fmt::Debug for ContentServiceImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentServiceImpl").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockContentRepository;
    use agora_cache::{CacheStore, MemoryCacheStore};
    use agora_config::CacheConfig;
    use agora_core::{AuthorId, ContentKind, ContentStatus};
    use chrono::Utc;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory content repository for testing.
    #[derive(Default)]
    struct FakeContentRepository {
        rows: Mutex<BTreeMap<ContentId, ContentItem>>,
        next_id: Mutex<u64>,
        reads: AtomicUsize,
    }

    impl FakeContentRepository {
        fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ContentRepository for FakeContentRepository {
        async fn find_by_id(&self, id: ContentId) -> AgoraResult<Option<ContentItem>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.rows.lock().unwrap().get(&id).filter(|i| !i.is_deleted()).cloned())
        }

        async fn list(&self, query: &ListQuery) -> AgoraResult<ListPage<ContentItem>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            let rows = self.rows.lock().unwrap();
            let mut items: Vec<ContentItem> = rows.values().filter(|i| !i.is_deleted()).cloned().collect();
            items.reverse();
            let total = items.len() as u64;
            let limit = query.limit.unwrap_or(10) as usize;
            let offset = (query.page.unwrap_or(1).max(1) as usize - 1) * limit;
            let items = items.into_iter().skip(offset).take(limit).collect();
            Ok(ListPage::new(items, total, query.page, query.limit))
        }

        async fn create(&self, request: &CreateContentRequest) -> AgoraResult<ContentItem> {
            let id = {
                let mut next = self.next_id.lock().unwrap();
                *next += 1;
                ContentId::new(*next)
            };
            let item = ContentItem {
                id,
                author_id: request.author_id,
                title: request.title.clone(),
                content: request.content.clone(),
                price: request.price,
                campus_id: request.campus_id,
                goods_type: request.goods_type.clone(),
                tag: request.tag.clone(),
                status: ContentStatus::Active,
                likes: 0,
                complaints: 0,
                images: request.images.clone(),
                created_at: Utc::now(),
            };
            self.rows.lock().unwrap().insert(id, item.clone());
            Ok(item)
        }

        async fn update(&self, id: ContentId, request: &UpdateContentRequest) -> AgoraResult<Option<ContentItem>> {
            let mut rows = self.rows.lock().unwrap();
            let Some(row) = rows.get_mut(&id).filter(|i| !i.is_deleted()) else {
                return Ok(None);
            };
            if let Some(title) = &request.title {
                row.title = title.clone();
            }
            if let Some(content) = &request.content {
                row.content = content.clone();
            }
            if let Some(price) = request.price {
                row.price = Some(price);
            }
            if let Some(tag) = &request.tag {
                row.tag = Some(tag.clone());
            }
            if let Some(status) = request.status {
                row.status = status;
            }
            if let Some(images) = &request.images {
                row.images = images.clone();
            }
            Ok(Some(row.clone()))
        }

        async fn soft_delete(&self, id: ContentId) -> AgoraResult<Option<ContentItem>> {
            let mut rows = self.rows.lock().unwrap();
            Ok(rows.get_mut(&id).map(|row| {
                row.status = ContentStatus::Deleted;
                row.clone()
            }))
        }

        async fn adjust_counter(&self, id: ContentId, field: CounterField, delta: i64) -> AgoraResult<Option<i64>> {
            let mut rows = self.rows.lock().unwrap();
            Ok(rows.get_mut(&id).map(|row| {
                let counter = match field {
                    CounterField::Likes => &mut row.likes,
                    CounterField::Complaints => &mut row.complaints,
                };
                *counter = (*counter + delta).max(0);
                *counter
            }))
        }
    }

    fn service_with<R: ContentRepository>(repository: Arc<R>) -> (Arc<MemoryCacheStore>, ContentServiceImpl) {
        let store = Arc::new(MemoryCacheStore::new());
        let cache = ContentCache::new(store.clone(), ContentKind::Goods, &CacheConfig::default());
        (store, ContentServiceImpl::new(repository, cache))
    }

    fn create_request(title: &str) -> CreateContentRequest {
        CreateContentRequest {
            author_id: AuthorId::new(7),
            title: title.to_string(),
            content: "Barely used".to_string(),
            price: Some(10.0),
            campus_id: None,
            goods_type: None,
            tag: None,
            images: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_create_seeds_detail_cache() {
        let repo = Arc::new(FakeContentRepository::default());
        let (store, service) = service_with(repo.clone());

        let created = service.create_item(create_request("Desk lamp")).await.unwrap();
        assert!(store.contains(&format!("goods:detail:{}", created.id)));

        let fetched = service.get_item(created.id).await.unwrap();
        assert_eq!(fetched.title, "Desk lamp");
        assert_eq!(repo.reads(), 0);
    }

    #[tokio::test]
    async fn test_update_overwrites_cached_detail() {
        let repo = Arc::new(FakeContentRepository::default());
        let (_, service) = service_with(repo.clone());
        let created = service.create_item(create_request("Desk lamp")).await.unwrap();

        let request = UpdateContentRequest {
            title: Some("Desk lamp (sold)".to_string()),
            status: Some(ContentStatus::Inactive),
            ..UpdateContentRequest::default()
        };
        service.update_item(created.id, request).await.unwrap();

        let fetched = service.get_item(created.id).await.unwrap();
        assert_eq!(fetched.title, "Desk lamp (sold)");
        assert_eq!(fetched.status, ContentStatus::Inactive);
        assert_eq!(repo.reads(), 0);
    }

    #[tokio::test]
    async fn test_reactions_round_trip_through_cache() {
        let repo = Arc::new(FakeContentRepository::default());
        let (_, service) = service_with(repo.clone());
        let created = service.create_item(create_request("Bike")).await.unwrap();

        assert_eq!(service.set_reaction(created.id, CounterField::Likes, true).await.unwrap(), 1);
        assert_eq!(service.get_item(created.id).await.unwrap().likes, 1);

        assert_eq!(service.set_reaction(created.id, CounterField::Likes, false).await.unwrap(), 0);
        assert_eq!(service.get_item(created.id).await.unwrap().likes, 0);

        // Withdrawing again never goes negative.
        assert_eq!(service.set_reaction(created.id, CounterField::Likes, false).await.unwrap(), 0);
        assert_eq!(repo.reads(), 0);
    }

    #[tokio::test]
    async fn test_list_is_cached_until_next_write() {
        let repo = Arc::new(FakeContentRepository::default());
        let (_, service) = service_with(repo.clone());
        service.create_item(create_request("One")).await.unwrap();

        let first = service.list_items(ListQuery::paged(1, 10)).await.unwrap();
        let again = service.list_items(ListQuery::paged(1, 10)).await.unwrap();
        assert_eq!(first, again);
        assert_eq!(repo.reads(), 1);

        service.create_item(create_request("Two")).await.unwrap();
        let after = service.list_items(ListQuery::paged(1, 10)).await.unwrap();
        assert_eq!(after.total, 2);
        assert_eq!(repo.reads(), 2);
    }

    #[tokio::test]
    async fn test_delete_hides_item() {
        let repo = Arc::new(FakeContentRepository::default());
        let (store, service) = service_with(repo);
        let created = service.create_item(create_request("Chair")).await.unwrap();

        service.delete_item(created.id).await.unwrap();
        assert!(!store.contains(&format!("goods:detail:{}", created.id)));

        let err = service.get_item(created.id).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_update_to_deleted_status_evicts_detail() {
        let repo = Arc::new(FakeContentRepository::default());
        let (store, service) = service_with(repo.clone());
        let created = service.create_item(create_request("Chair")).await.unwrap();
        let key = format!("goods:detail:{}", created.id);
        assert!(store.contains(&key));

        let request = UpdateContentRequest {
            status: Some(ContentStatus::Deleted),
            ..UpdateContentRequest::default()
        };
        let updated = service.update_item(created.id, request).await.unwrap();
        assert!(updated.is_deleted());

        assert_eq!(store.get(&key).await.unwrap(), None);
        let err = service.get_item(created.id).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_missing_item_is_not_found() {
        let (_, service) = service_with(Arc::new(FakeContentRepository::default()));
        let err = service
            .update_item(
                ContentId::new(99),
                UpdateContentRequest {
                    tag: Some("x".to_string()),
                    ..UpdateContentRequest::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");

        let err = service.set_reaction(ContentId::new(99), CounterField::Complaints, true).await.unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_invalid_request_never_reaches_repository() {
        let mut repo = MockContentRepository::new();
        repo.expect_create().never();
        let (_, service) = service_with(Arc::new(repo));

        let err = service.create_item(create_request("  ")).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_failed_write_does_not_invalidate() {
        let mut repo = MockContentRepository::new();
        repo.expect_soft_delete()
            .times(1)
            .returning(|_| Err(AgoraError::database("deadlock")));
        let (store, service) = service_with(Arc::new(repo));
        store
            .set_with_ttl("goods:list:page:1:10", "{}", Duration::from_secs(60))
            .await
            .unwrap();

        let err = service.delete_item(ContentId::new(1)).await.unwrap_err();
        assert_eq!(err.error_code(), "DATABASE_ERROR");
        assert!(store.contains("goods:list:page:1:10"));
        assert_eq!(store.pipelines_executed(), 0);
    }

    #[tokio::test]
    async fn test_repository_errors_propagate_on_read() {
        let mut repo = MockContentRepository::new();
        repo.expect_find_by_id()
            .returning(|_| Err(AgoraError::database("connection refused")));
        let (_, service) = service_with(Arc::new(repo));

        let err = service.get_item(ContentId::new(1)).await.unwrap_err();
        assert!(err.is_retriable());
    }

    #[tokio::test]
    async fn test_unavailable_cache_still_serves_reads_and_writes() {
        let repo = Arc::new(FakeContentRepository::default());
        let (store, service) = service_with(repo.clone());
        store.set_unavailable(true);

        let created = service.create_item(create_request("Lamp")).await.unwrap();
        assert_eq!(service.get_item(created.id).await.unwrap().title, "Lamp");
        assert_eq!(repo.reads(), 1);
    }
}
