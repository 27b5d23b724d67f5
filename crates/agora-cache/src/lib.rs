//! # Agora Cache
//!
//! The content cache subsystem sitting between the relational store and its
//! readers. It offers cache-aside reads for single items and list views, and
//! mutation-driven invalidation that keeps staleness bounded after writes.
//!
//! - [`keys`]: how keys are derived and grouped into namespaces.
//! - [`store`]: the key-value store adapter (Redis, plus an in-memory fake).
//! - [`scan`]: cursor-draining pattern scans.
//! - [`reader`]: cache-aside reads and population.
//! - [`invalidation`]: per-mutation invalidation plans.
//! - [`consistency`]: "commit, then invalidate" for the write path.
//!
//! Every cache failure is logged and swallowed at the reader and engine
//! boundary; the database stays the source of truth.

pub mod consistency;
mod content_cache;
mod error;
pub mod invalidation;
pub mod keys;
pub mod metrics;
pub mod reader;
pub mod scan;
pub mod store;
mod ttl;

pub use consistency::{commit_then_invalidate, Committed};
pub use content_cache::ContentCache;
pub use error::{CacheError, CacheResult, Severity};
pub use invalidation::{CounterRefresh, InvalidationEngine, InvalidationPlan, InvalidationReport, Mutation, MutationKind};
pub use keys::{KeySpace, ListQuery, ListView, Namespace, SearchParams};
pub use reader::CacheAsideReader;
pub use scan::KeyScan;
pub use store::{
    create_pool, CacheStore, MemoryCacheStore, Pipeline, RedisCacheStore, RedisCacheStoreParameters, ScanPage, StoreOp,
};
pub use ttl::TtlPolicy;
