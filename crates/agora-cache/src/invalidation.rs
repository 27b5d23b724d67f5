//! Mutation-driven invalidation.
//!
//! Every committed write is described as a [`Mutation`]. The engine turns it
//! into an [`InvalidationPlan`] (exact keys to overwrite or delete, plus the
//! list patterns to sweep) and applies the plan against the store:
//!
//! 1. counter changes patch the cached detail entry in place,
//! 2. each pattern is drained with a full cursor walk,
//! 3. upserts and deletes go out in one pipeline.
//!
//! List views are never patched. Any mutation can change membership or
//! order of any list, so every page and search entry is dropped.

use crate::keys::KeySpace;
use crate::metrics::CacheMetrics;
use crate::scan::{KeyScan, DEFAULT_BATCH_SIZE};
use crate::store::{CacheStore, Pipeline};
use crate::ttl::TtlPolicy;
use crate::{CacheError, CacheResult, Severity};
use agora_config::CacheConfig;
use agora_core::{AuthorId, ContentId, CounterField};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// The kind of write that was committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Create,
    Update,
    Delete,
    Counter,
}

impl MutationKind {
    /// Returns the label used in logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Counter => "counter",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A committed write, as seen by the cache.
///
/// Serialized with a `kind` tag, e.g.
/// `{"kind":"counter","id":42,"authorId":7,"field":"likes","newValue":3}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Mutation {
    /// A new item. `payload`, when present, seeds the detail entry.
    Create {
        id: ContentId,
        #[serde(rename = "authorId", default, skip_serializing_if = "Option::is_none")]
        author_id: Option<AuthorId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    /// Changed fields. `payload` replaces the detail entry; without one the
    /// entry is dropped.
    Update {
        id: ContentId,
        #[serde(rename = "authorId", default, skip_serializing_if = "Option::is_none")]
        author_id: Option<AuthorId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    /// A soft delete.
    Delete {
        id: ContentId,
        #[serde(rename = "authorId", default, skip_serializing_if = "Option::is_none")]
        author_id: Option<AuthorId>,
    },
    /// A counter set to an absolute value.
    Counter {
        id: ContentId,
        #[serde(rename = "authorId", default, skip_serializing_if = "Option::is_none")]
        author_id: Option<AuthorId>,
        field: CounterField,
        #[serde(rename = "newValue")]
        new_value: i64,
    },
}

impl Mutation {
    /// Returns the kind of this mutation.
    #[must_use]
    pub const fn kind(&self) -> MutationKind {
        match self {
            Self::Create { .. } => MutationKind::Create,
            Self::Update { .. } => MutationKind::Update,
            Self::Delete { .. } => MutationKind::Delete,
            Self::Counter { .. } => MutationKind::Counter,
        }
    }

    /// Returns the affected item.
    #[must_use]
    pub const fn id(&self) -> ContentId {
        match self {
            Self::Create { id, .. } | Self::Update { id, .. } | Self::Delete { id, .. } | Self::Counter { id, .. } => {
                *id
            }
        }
    }

    /// Returns the item's author, if the writer knew it.
    #[must_use]
    pub const fn author_id(&self) -> Option<AuthorId> {
        match self {
            Self::Create { author_id, .. }
            | Self::Update { author_id, .. }
            | Self::Delete { author_id, .. }
            | Self::Counter { author_id, .. } => *author_id,
        }
    }
}

/// A counter to patch inside a cached detail entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterRefresh {
    pub key: String,
    pub field: CounterField,
    pub value: i64,
}

/// What the engine will do for one mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidationPlan {
    pub kind: MutationKind,
    /// Detail entry to overwrite.
    pub upsert: Option<(String, Value)>,
    /// Exact keys to delete.
    pub delete: Vec<String>,
    /// Counter read-modify-write to perform first.
    pub counter: Option<CounterRefresh>,
    /// Patterns whose every match is deleted.
    pub patterns: Vec<String>,
}

/// Outcome of applying a mutation.
///
/// Failures are collected here rather than returned; the write that caused
/// the mutation has already committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationReport {
    pub kind: MutationKind,
    /// True when the store is disabled and nothing was attempted.
    pub skipped: bool,
    /// True when the detail entry was seeded or overwritten.
    pub detail_written: bool,
    /// True when a cached detail entry had its counter patched.
    pub counter_refreshed: bool,
    /// Keys submitted for deletion.
    pub keys_deleted: usize,
    /// False if any pattern scan could not be drained.
    pub scans_complete: bool,
    pub errors: Vec<String>,
}

impl InvalidationReport {
    fn new(kind: MutationKind) -> Self {
        Self {
            kind,
            skipped: false,
            detail_written: false,
            counter_refreshed: false,
            keys_deleted: 0,
            scans_complete: true,
            errors: Vec::new(),
        }
    }

    /// Returns true if every step succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.scans_complete && self.errors.is_empty()
    }
}

/// Applies mutations to the cache of one key space.
#[derive(Clone)]
pub struct InvalidationEngine {
    store: Arc<dyn CacheStore>,
    keys: KeySpace,
    ttl: TtlPolicy,
    scan_batch_size: usize,
    retry_failed_scan: bool,
}

impl InvalidationEngine {
    /// Creates an engine with default scan settings.
    pub fn new(store: Arc<dyn CacheStore>, keys: KeySpace, ttl: TtlPolicy) -> Self {
        Self {
            store,
            keys,
            ttl,
            scan_batch_size: DEFAULT_BATCH_SIZE,
            retry_failed_scan: true,
        }
    }

    /// Creates an engine configured from `config`.
    pub fn from_config(store: Arc<dyn CacheStore>, keys: KeySpace, config: &CacheConfig) -> Self {
        Self::new(store, keys, TtlPolicy::from(config))
            .with_scan_batch_size(config.scan_batch_size)
            .with_scan_retry(config.retry_failed_scan)
    }

    /// Sets how many keys each scan call examines.
    #[must_use]
    pub fn with_scan_batch_size(mut self, batch_size: usize) -> Self {
        self.scan_batch_size = batch_size.max(1);
        self
    }

    /// Sets whether a failed scan is retried once from the start.
    #[must_use]
    pub fn with_scan_retry(mut self, retry: bool) -> Self {
        self.retry_failed_scan = retry;
        self
    }

    /// Returns the key space this engine invalidates.
    #[must_use]
    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    /// Builds the plan for a mutation without touching the store.
    #[must_use]
    pub fn plan(&self, mutation: &Mutation) -> InvalidationPlan {
        let detail = self.keys.detail(mutation.id());
        let mut plan = InvalidationPlan {
            kind: mutation.kind(),
            upsert: None,
            delete: Vec::new(),
            counter: None,
            patterns: vec![self.keys.page_pattern(), self.keys.search_pattern()],
        };

        match mutation {
            Mutation::Create { payload, .. } => {
                plan.upsert = payload.clone().map(|p| (detail, p));
            }
            Mutation::Update { payload, .. } => match payload {
                Some(p) => plan.upsert = Some((detail, p.clone())),
                None => plan.delete.push(detail),
            },
            Mutation::Delete { .. } => plan.delete.push(detail),
            Mutation::Counter { field, new_value, .. } => {
                plan.counter = Some(CounterRefresh {
                    key: detail,
                    field: *field,
                    value: *new_value,
                });
            }
        }

        if let Some(author_id) = mutation.author_id() {
            plan.patterns.push(self.keys.author_list_pattern(author_id));
        }

        plan
    }

    /// Sets one counter inside the cached detail entry and re-stores it with
    /// a fresh TTL.
    ///
    /// Returns `Ok(false)` if the item is not cached; it is left uncached. An
    /// entry that cannot be parsed as a JSON object is deleted.
    pub async fn refresh_counter(&self, id: ContentId, field: CounterField, value: i64) -> CacheResult<bool> {
        let key = self.keys.detail(id);
        let Some(raw) = self.store.get(&key).await? else {
            debug!("Counter refresh skipped; '{}' is not cached", key);
            return Ok(false);
        };

        let mut entry: Map<String, Value> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(source) => {
                self.store.delete(std::slice::from_ref(&key)).await?;
                return Err(CacheError::Malformed { key, source });
            }
        };

        entry.insert(field.as_str().to_string(), Value::from(value));
        let json = Value::Object(entry).to_string();
        self.store.set_with_ttl(&key, &json, self.ttl.detail).await?;

        debug!("Set {} = {} on '{}'", field, value, key);
        Ok(true)
    }

    /// Applies a mutation. Never fails; problems are logged and recorded in
    /// the report.
    pub async fn apply(&self, mutation: &Mutation) -> InvalidationReport {
        let plan = self.plan(mutation);
        let mut report = InvalidationReport::new(plan.kind);

        if !self.store.is_enabled() {
            report.skipped = true;
            return report;
        }

        if let Some(counter) = &plan.counter {
            match self.refresh_counter(mutation.id(), counter.field, counter.value).await {
                Ok(refreshed) => report.counter_refreshed = refreshed,
                Err(e) => {
                    warn!("Counter refresh failed for '{}': {}", counter.key, e);
                    CacheMetrics::error("detail", e.kind());
                    report.errors.push(e.to_string());
                }
            }
        }

        let mut doomed: BTreeSet<String> = plan.delete.into_iter().collect();
        for pattern in &plan.patterns {
            self.sweep(pattern, &mut doomed, &mut report).await;
        }

        let mut pipeline = Pipeline::new();
        let upserting = plan.upsert.is_some();
        if let Some((key, payload)) = plan.upsert {
            doomed.remove(&key);
            pipeline.set(key, payload.to_string(), self.ttl.detail);
        }
        let doomed_count = doomed.len();
        pipeline.delete(doomed);

        if !pipeline.is_empty() {
            match self.store.execute(pipeline).await {
                Ok(()) => {
                    report.detail_written = upserting;
                    report.keys_deleted = doomed_count;
                    if upserting {
                        CacheMetrics::write("detail");
                    }
                }
                Err(e) => {
                    warn!("Invalidation pipeline failed for {} {}: {}", plan.kind, mutation.id(), e);
                    CacheMetrics::error("pipeline", e.kind());
                    report.errors.push(e.to_string());
                }
            }
        }

        CacheMetrics::invalidation(plan.kind.as_str(), report.keys_deleted);
        debug!(
            mutation = %plan.kind,
            id = %mutation.id(),
            keys_deleted = report.keys_deleted,
            detail_written = report.detail_written,
            counter_refreshed = report.counter_refreshed,
            clean = report.is_clean(),
            "Invalidation applied"
        );

        report
    }

    /// Collects every key matching `pattern` into `doomed`, retrying once.
    ///
    /// Keys found before a final failure are still deleted.
    async fn sweep(&self, pattern: &str, doomed: &mut BTreeSet<String>, report: &mut InvalidationReport) {
        let mut scan = KeyScan::new(self.store.as_ref(), pattern, self.scan_batch_size);

        let Err(first) = scan.drain_into(doomed).await else {
            return;
        };

        let failure = if self.retry_failed_scan {
            warn!("Scan of '{}' failed, retrying: {}", pattern, first);
            scan.restart();
            match scan.drain_into(doomed).await {
                Ok(()) => return,
                Err(e) => e,
            }
        } else {
            first
        };

        match failure.severity() {
            Severity::Severe => error!(
                "Scan of '{}' could not be drained; matching entries may stay stale until their TTL: {}",
                pattern, failure
            ),
            Severity::Degraded => warn!("Scan of '{}' could not be drained: {}", pattern, failure),
        }
        let namespace = self.keys.namespace_of(pattern).map_or("unknown", |ns| ns.as_str());
        CacheMetrics::scan_incomplete(namespace);
        report.scans_complete = false;
        report.errors.push(failure.to_string());
    }
}
