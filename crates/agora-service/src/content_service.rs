//! Content service trait definition.

use crate::dto::{CreateContentRequest, UpdateContentRequest};
use agora_cache::ListQuery;
use agora_core::{AgoraResult, ContentId, ContentItem, CounterField, Interface, ListPage};
use async_trait::async_trait;

/// Content service trait.
#[async_trait]
pub trait ContentService: Interface + Send + Sync {
    /// Gets an item by ID.
    async fn get_item(&self, id: ContentId) -> AgoraResult<ContentItem>;

    /// Lists items, paginated and optionally filtered.
    async fn list_items(&self, query: ListQuery) -> AgoraResult<ListPage<ContentItem>>;

    /// Creates an item.
    async fn create_item(&self, request: CreateContentRequest) -> AgoraResult<ContentItem>;

    /// Updates an item.
    async fn update_item(&self, id: ContentId, request: UpdateContentRequest) -> AgoraResult<ContentItem>;

    /// Soft-deletes an item.
    async fn delete_item(&self, id: ContentId) -> AgoraResult<()>;

    /// Adds (`on = true`) or withdraws a like or complaint. Returns the new
    /// counter value.
    async fn set_reaction(&self, id: ContentId, field: CounterField, on: bool) -> AgoraResult<i64>;
}
