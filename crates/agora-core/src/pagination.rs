//! List view payloads.

use serde::{Deserialize, Serialize};

/// A page of list results, exactly as returned to readers.
///
/// `page` and `limit` are `None` when the request did not paginate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListPage<T> {
    /// The total number of matching items across all pages.
    pub total: u64,
    /// The number of items on this page.
    pub count: usize,
    /// The requested page number (1-indexed).
    pub page: Option<u32>,
    /// The requested page size.
    pub limit: Option<u32>,
    /// The items on this page, in result order.
    pub items: Vec<T>,
}

impl<T> ListPage<T> {
    /// Creates a new page; `count` is derived from `items`.
    #[must_use]
    pub fn new(items: Vec<T>, total: u64, page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            total,
            count: items.len(),
            page,
            limit,
            items,
        }
    }

    /// Creates an empty page.
    #[must_use]
    pub fn empty(total: u64, page: Option<u32>, limit: Option<u32>) -> Self {
        Self::new(Vec::new(), total, page, limit)
    }

    /// Returns true if the page is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
