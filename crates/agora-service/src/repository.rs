//! Repository trait for the system of record.

use crate::dto::{CreateContentRequest, UpdateContentRequest};
use agora_cache::ListQuery;
use agora_core::{AgoraResult, ContentId, ContentItem, CounterField, Interface, ListPage};
use async_trait::async_trait;

/// Content repository trait.
///
/// Implementations own one content kind (one table). Soft-deleted rows are
/// never returned by reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentRepository: Interface + Send + Sync {
    /// Finds an item by ID.
    async fn find_by_id(&self, id: ContentId) -> AgoraResult<Option<ContentItem>>;

    /// Lists items matching the query, newest first.
    async fn list(&self, query: &ListQuery) -> AgoraResult<ListPage<ContentItem>>;

    /// Inserts a new item.
    async fn create(&self, request: &CreateContentRequest) -> AgoraResult<ContentItem>;

    /// Applies changes to an item. Returns `None` if it does not exist.
    async fn update(&self, id: ContentId, request: &UpdateContentRequest) -> AgoraResult<Option<ContentItem>>;

    /// Marks an item deleted. Returns `None` if it does not exist.
    async fn soft_delete(&self, id: ContentId) -> AgoraResult<Option<ContentItem>>;

    /// Adds `delta` to a counter, clamped at zero, and returns the new value.
    /// Returns `None` if the item does not exist.
    async fn adjust_counter(&self, id: ContentId, field: CounterField, delta: i64) -> AgoraResult<Option<i64>>;
}
