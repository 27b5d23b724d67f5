//! Per-namespace expiry.

use crate::keys::Namespace;
use agora_config::CacheConfig;
use std::time::Duration;

/// Detail entries: 10 minutes.
pub const DETAIL_TTL: Duration = Duration::from_secs(600);

/// Unfiltered pages: 5 minutes.
pub const PAGE_TTL: Duration = Duration::from_secs(300);

/// Filtered lists churn fastest and are reused least: 3 minutes.
pub const SEARCH_TTL: Duration = Duration::from_secs(180);

/// TTL applied to each namespace on write.
///
/// Every entry gets one of these; nothing is stored without an expiry, so a
/// lost invalidation heals itself once the TTL runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub detail: Duration,
    pub page: Duration,
    pub search: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            detail: DETAIL_TTL,
            page: PAGE_TTL,
            search: SEARCH_TTL,
        }
    }
}

impl TtlPolicy {
    /// Returns the TTL for a namespace. Author listings are never written, so
    /// they fall back to the page TTL.
    #[must_use]
    pub const fn for_namespace(&self, namespace: Namespace) -> Duration {
        match namespace {
            Namespace::Detail => self.detail,
            Namespace::Page | Namespace::AuthorList => self.page,
            Namespace::Search => self.search,
        }
    }
}

impl From<&CacheConfig> for TtlPolicy {
    fn from(config: &CacheConfig) -> Self {
        Self {
            detail: config.detail_ttl(),
            page: config.page_ttl(),
            search: config.search_ttl(),
        }
    }
}
