//! Content item domain types.

use crate::{AuthorId, ContentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

/// The kind of content an item belongs to.
///
/// Each kind lives in its own table and gets its own cache key scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Marketplace listing.
    Goods,
    /// Forum post.
    Post,
}

impl ContentKind {
    /// Returns the key scope used for this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Goods => "goods",
            Self::Post => "post",
        }
    }
}

impl Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    /// Visible and open.
    #[default]
    Active,
    /// Sold or otherwise closed, still visible.
    Inactive,
    /// Soft-deleted; never returned by reads.
    Deleted,
}

/// A mutable counter on a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterField {
    /// Like count.
    Likes,
    /// Complaint count.
    Complaints,
}

impl CounterField {
    /// Returns the JSON field name holding this counter.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Likes => "likes",
            Self::Complaints => "complaints",
        }
    }
}

impl Display for CounterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CounterField {
    type Err = String;

    /// Accepts both the action name (`like`) and the field name (`likes`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" | "likes" => Ok(Self::Likes),
            "complaint" | "complaints" => Ok(Self::Complaints),
            other => Err(format!("unknown counter field: {other}")),
        }
    }
}

/// A fully denormalized content item, as stored in the detail cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ContentId,
    pub author_id: AuthorId,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campus_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goods_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default)]
    pub status: ContentStatus,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub complaints: i64,
    /// Attached image URLs.
    #[serde(default)]
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl ContentItem {
    /// Returns the current value of a counter.
    #[must_use]
    pub const fn counter(&self, field: CounterField) -> i64 {
        match field {
            CounterField::Likes => self.likes,
            CounterField::Complaints => self.complaints,
        }
    }

    /// Returns true if the item has been soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.status == ContentStatus::Deleted
    }
}
