//! Cache key generators for consistent key naming.
//!
//! Key format: `[{scope}:]{namespace}:{discriminator}`
//!
//! | Namespace | Key | Written |
//! |---|---|---|
//! | detail | `detail:{id}` | on miss, on create, on update |
//! | page | `list:page:{page}:{limit}` | on miss, unfiltered lists only |
//! | search | `list:search:{sha256}` | on miss, filtered lists |
//! | author | `list:author:{author_id}:*` | never; scan pattern only |

use agora_core::{AuthorId, ContentId, ContentKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Parameter names that select a page rather than filter results.
const PAGINATION_KEYS: [&str; 2] = ["page", "limit"];

/// A group of keys sharing a TTL and an invalidation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// One entry per content item.
    Detail,
    /// One entry per unfiltered (page, limit) pair.
    Page,
    /// One entry per normalized filter signature.
    Search,
    /// Reserved per-author listings.
    AuthorList,
}

impl Namespace {
    /// Returns the label used in logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Detail => "detail",
            Self::Page => "page",
            Self::Search => "search",
            Self::AuthorList => "author",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derives every key and scan pattern for one content kind.
///
/// Two key spaces with different scopes never share a key, so invalidating
/// marketplace lists leaves forum lists alone.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeySpace {
    scope: String,
}

impl KeySpace {
    /// Creates a key space under an explicit scope. An empty scope yields bare
    /// keys such as `detail:42`.
    #[must_use]
    pub fn new(scope: impl Into<String>) -> Self {
        Self { scope: scope.into() }
    }

    /// Creates the key space for a content kind, under an optional global prefix.
    #[must_use]
    pub fn for_kind(prefix: &str, kind: ContentKind) -> Self {
        if prefix.is_empty() {
            Self::new(kind.as_str())
        } else {
            Self::new(format!("{}:{}", prefix, kind.as_str()))
        }
    }

    /// Returns the scope of this key space.
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    fn key(&self, rest: fmt::Arguments<'_>) -> String {
        if self.scope.is_empty() {
            rest.to_string()
        } else {
            format!("{}:{}", self.scope, rest)
        }
    }

    /// Key of the detail entry for an item.
    #[must_use]
    pub fn detail(&self, id: ContentId) -> String {
        self.key(format_args!("detail:{}", id))
    }

    /// Key of an unfiltered page.
    #[must_use]
    pub fn page(&self, page: u32, limit: u32) -> String {
        self.key(format_args!("list:page:{}:{}", page, limit))
    }

    /// Key of a filtered list, derived from the normalized parameter set.
    #[must_use]
    pub fn search(&self, params: &SearchParams) -> String {
        self.key(format_args!("list:search:{}", params.signature()))
    }

    /// Prefix under which an author's listings would live.
    #[must_use]
    pub fn author_list_prefix(&self, author_id: AuthorId) -> String {
        self.key(format_args!("list:author:{}:", author_id))
    }

    /// Pattern matching every unfiltered page.
    #[must_use]
    pub fn page_pattern(&self) -> String {
        self.key(format_args!("list:page:*"))
    }

    /// Pattern matching every filtered list.
    #[must_use]
    pub fn search_pattern(&self) -> String {
        self.key(format_args!("list:search:*"))
    }

    /// Pattern matching every listing of one author.
    #[must_use]
    pub fn author_list_pattern(&self, author_id: AuthorId) -> String {
        format!("{}*", self.author_list_prefix(author_id))
    }

    /// Returns the namespace a key belongs to, if it was derived from this space.
    #[must_use]
    pub fn namespace_of(&self, key: &str) -> Option<Namespace> {
        let rest = if self.scope.is_empty() {
            key
        } else {
            key.strip_prefix(self.scope.as_str())?.strip_prefix(':')?
        };

        if rest.starts_with("detail:") {
            Some(Namespace::Detail)
        } else if rest.starts_with("list:page:") {
            Some(Namespace::Page)
        } else if rest.starts_with("list:search:") {
            Some(Namespace::Search)
        } else if rest.starts_with("list:author:") {
            Some(Namespace::AuthorList)
        } else {
            None
        }
    }
}

/// A set of list query parameters, normalized before it becomes a key.
///
/// Normalization drops `null` values and strings that are empty after
/// trimming, trims the remaining strings, and orders keys lexicographically.
/// Two requests that differ only in argument order or in absent fields
/// therefore share a key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchParams(BTreeMap<String, Value>);

impl SearchParams {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, returning the updated set.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds or replaces a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Removes a parameter, returning its raw value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Returns the raw value of a parameter.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the normalized parameter set.
    #[must_use]
    pub fn normalized(&self) -> BTreeMap<&str, Value> {
        self.0
            .iter()
            .filter_map(|(key, value)| normalize_value(value).map(|v| (key.as_str(), v)))
            .collect()
    }

    /// Returns the canonical string form of the normalized set.
    #[must_use]
    pub fn canonical(&self) -> String {
        // BTreeMap keys serialize in order; serde_json cannot fail on Value.
        serde_json::to_string(&self.normalized()).unwrap_or_default()
    }

    /// Returns the hex SHA-256 of the canonical form.
    #[must_use]
    pub fn signature(&self) -> String {
        let digest = Sha256::digest(self.canonical().as_bytes());
        format!("{:x}", digest)
    }

    /// Returns true if any non-pagination parameter survives normalization.
    #[must_use]
    pub fn is_filtered(&self) -> bool {
        self.normalized()
            .keys()
            .any(|key| !PAGINATION_KEYS.contains(key))
    }

    /// Returns true if no parameter survives normalization.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.normalized().is_empty()
    }
}

impl From<serde_json::Map<String, Value>> for SearchParams {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        Self(map.into_iter().collect())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for SearchParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

fn normalize_value(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(Value::String(trimmed.to_string()))
            }
        }
        other => Some(other.clone()),
    }
}

fn parse_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Which namespace serves a list request.
#[derive(Debug, Clone, PartialEq)]
pub enum ListView {
    /// Unfiltered and fully paginated.
    Page { page: u32, limit: u32 },
    /// Anything else; page and limit are part of the signature.
    Search(SearchParams),
}

impl ListView {
    /// Returns the namespace this view lives in.
    #[must_use]
    pub const fn namespace(&self) -> Namespace {
        match self {
            Self::Page { .. } => Namespace::Page,
            Self::Search(_) => Namespace::Search,
        }
    }
}

/// A list request: pagination plus optional filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub filters: SearchParams,
}

impl ListQuery {
    /// Creates an unfiltered, paginated query.
    #[must_use]
    pub fn paged(page: u32, limit: u32) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
            filters: SearchParams::new(),
        }
    }

    /// Adds a filter, returning the updated query.
    #[must_use]
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.insert(key, value);
        self
    }

    /// Splits a raw parameter set (as received from a query string) into
    /// pagination and filters. Unparseable `page`/`limit` values are dropped.
    #[must_use]
    pub fn from_params(mut params: SearchParams) -> Self {
        let page = params.remove("page").as_ref().and_then(parse_u32);
        let limit = params.remove("limit").as_ref().and_then(parse_u32);
        Self {
            page,
            limit,
            filters: params,
        }
    }

    /// Classifies the request.
    ///
    /// A request is served from the page namespace only when no filter
    /// survives normalization and both page and limit are present. A filter
    /// whose value normalizes to nothing (`null`, `""`, `"  "`) does not count.
    #[must_use]
    pub fn view(&self) -> ListView {
        match (self.page, self.limit) {
            (Some(page), Some(limit)) if !self.filters.is_filtered() => ListView::Page { page, limit },
            _ => {
                let mut params: SearchParams = self
                    .filters
                    .normalized()
                    .into_iter()
                    .filter(|(key, _)| !PAGINATION_KEYS.contains(key))
                    .collect();
                if let Some(page) = self.page {
                    params.insert("page", page);
                }
                if let Some(limit) = self.limit {
                    params.insert("limit", limit);
                }
                ListView::Search(params)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_keys() {
        let keys = KeySpace::default();
        assert_eq!(keys.detail(ContentId::new(42)), "detail:42");
        assert_eq!(keys.page(1, 10), "list:page:1:10");
        assert_eq!(keys.page_pattern(), "list:page:*");
        assert_eq!(keys.search_pattern(), "list:search:*");
        assert_eq!(keys.author_list_pattern(AuthorId::new(7)), "list:author:7:*");
    }

    #[test]
    fn test_scoped_keys() {
        let keys = KeySpace::for_kind("campus", ContentKind::Goods);
        assert_eq!(keys.detail(ContentId::new(3)), "campus:goods:detail:3");
        assert_eq!(keys.page(2, 20), "campus:goods:list:page:2:20");

        let posts = KeySpace::for_kind("", ContentKind::Post);
        assert_eq!(posts.page_pattern(), "post:list:page:*");
    }

    #[test]
    fn test_author_pattern_does_not_cover_longer_ids() {
        let keys = KeySpace::default();
        let pattern = keys.author_list_pattern(AuthorId::new(7));
        let other = keys.author_list_prefix(AuthorId::new(70));
        assert!(!other.starts_with(pattern.trim_end_matches('*')));
    }

    #[test]
    fn test_search_key_ignores_argument_order() {
        let keys = KeySpace::default();
        let a = SearchParams::new().with("a", 1).with("b", 2);
        let b = SearchParams::new().with("b", 2).with("a", 1);
        assert_eq!(keys.search(&a), keys.search(&b));
    }

    #[test]
    fn test_search_key_drops_nulls() {
        let keys = KeySpace::default();
        let with_null = SearchParams::new().with("a", 1).with("b", Value::Null);
        let without = SearchParams::new().with("a", 1);
        assert_eq!(keys.search(&with_null), keys.search(&without));
    }

    #[test]
    fn test_search_key_drops_blank_strings_and_trims() {
        let a = SearchParams::new().with("keyword", " bike ").with("tag", "");
        let b = SearchParams::new().with("keyword", "bike");
        assert_eq!(a.signature(), b.signature());
    }

    #[test]
    fn test_search_key_distinguishes_values() {
        let a = SearchParams::new().with("keyword", "bike");
        let b = SearchParams::new().with("keyword", "desk");
        assert_ne!(a.signature(), b.signature());
    }

    #[test]
    fn test_canonical_form_is_sorted() {
        let params = SearchParams::new().with("tag", "books").with("campus_id", 2);
        assert_eq!(params.canonical(), r#"{"campus_id":2,"tag":"books"}"#);
    }

    #[test]
    fn test_search_key_shape() {
        let key = KeySpace::new("goods").search(&SearchParams::new().with("tag", "x"));
        let hash = key.strip_prefix("goods:list:search:").unwrap();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_unfiltered_query_uses_page_namespace() {
        assert_eq!(ListQuery::paged(1, 10).view(), ListView::Page { page: 1, limit: 10 });
    }

    #[test]
    fn test_filtered_query_uses_search_namespace() {
        let view = ListQuery::paged(1, 10).filter("keyword", "lamp").view();
        match view {
            ListView::Search(params) => {
                assert_eq!(params.get("page"), Some(&json!(1)));
                assert_eq!(params.get("limit"), Some(&json!(10)));
                assert_eq!(params.get("keyword"), Some(&json!("lamp")));
            }
            ListView::Page { .. } => panic!("expected search view"),
        }
    }

    #[test]
    fn test_filter_that_normalizes_to_empty_is_unfiltered() {
        let query = ListQuery::paged(2, 10)
            .filter("keyword", "   ")
            .filter("tag", Value::Null);
        assert_eq!(query.view(), ListView::Page { page: 2, limit: 10 });
    }

    #[test]
    fn test_missing_pagination_falls_back_to_search() {
        let query = ListQuery {
            page: None,
            limit: None,
            filters: SearchParams::new(),
        };
        assert_eq!(query.view().namespace(), Namespace::Search);
    }

    #[test]
    fn test_pages_of_same_filter_differ() {
        let keys = KeySpace::default();
        let one = ListQuery::paged(1, 10).filter("tag", "books").view();
        let two = ListQuery::paged(2, 10).filter("tag", "books").view();
        let key = |view: ListView| match view {
            ListView::Search(params) => keys.search(&params),
            ListView::Page { .. } => unreachable!(),
        };
        assert_ne!(key(one), key(two));
    }

    #[test]
    fn test_from_params_splits_pagination() {
        let raw: SearchParams = [
            ("page", json!("3")),
            ("limit", json!(20)),
            ("campus_id", json!("1")),
        ]
        .into_iter()
        .collect();
        let query = ListQuery::from_params(raw);
        assert_eq!(query.page, Some(3));
        assert_eq!(query.limit, Some(20));
        assert!(query.filters.is_filtered());
        assert!(query.filters.get("page").is_none());
    }

    #[test]
    fn test_namespace_of() {
        let keys = KeySpace::new("goods");
        assert_eq!(keys.namespace_of("goods:detail:1"), Some(Namespace::Detail));
        assert_eq!(keys.namespace_of("goods:list:page:1:10"), Some(Namespace::Page));
        assert_eq!(keys.namespace_of("post:detail:1"), None);
        assert_eq!(keys.namespace_of("goods:other"), None);
    }
}
