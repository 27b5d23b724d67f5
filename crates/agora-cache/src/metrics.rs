//! Metrics for cache effectiveness and invalidation health.
//!
//! Recorded through the `metrics` facade; installing an exporter is up to the
//! embedding application.

use ::metrics::{counter, describe_counter};

/// Metric names for the content cache.
pub mod names {
    /// Reads served from the cache.
    pub const CACHE_HITS_TOTAL: &str = "agora_cache_hits_total";
    /// Reads that fell through to the database.
    pub const CACHE_MISSES_TOTAL: &str = "agora_cache_misses_total";
    /// Cache errors swallowed at the reader or engine boundary.
    pub const CACHE_ERRORS_TOTAL: &str = "agora_cache_errors_total";
    /// Entries written by population or write-through seeding.
    pub const CACHE_WRITES_TOTAL: &str = "agora_cache_writes_total";
    /// Invalidation calls, by mutation kind.
    pub const INVALIDATIONS_TOTAL: &str = "agora_cache_invalidations_total";
    /// Keys deleted by invalidation.
    pub const KEYS_INVALIDATED_TOTAL: &str = "agora_cache_keys_invalidated_total";
    /// Pattern scans that could not be drained.
    pub const SCAN_INCOMPLETE_TOTAL: &str = "agora_cache_scan_incomplete_total";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::CACHE_HITS_TOTAL, "Total number of cache hits");
    describe_counter!(names::CACHE_MISSES_TOTAL, "Total number of cache misses");
    describe_counter!(
        names::CACHE_ERRORS_TOTAL,
        "Total number of cache errors treated as a miss or no-op"
    );
    describe_counter!(names::CACHE_WRITES_TOTAL, "Total number of cache entries written");
    describe_counter!(
        names::INVALIDATIONS_TOTAL,
        "Total number of mutation-driven invalidations"
    );
    describe_counter!(
        names::KEYS_INVALIDATED_TOTAL,
        "Total number of cache keys deleted by invalidation"
    );
    describe_counter!(
        names::SCAN_INCOMPLETE_TOTAL,
        "Total number of pattern scans abandoned before the cursor was drained"
    );
}

/// Cache metrics recorder.
#[derive(Clone)]
pub struct CacheMetrics;

impl CacheMetrics {
    /// Record a cache hit.
    pub fn hit(namespace: &'static str) {
        counter!(names::CACHE_HITS_TOTAL, "namespace" => namespace).increment(1);
    }

    /// Record a cache miss.
    pub fn miss(namespace: &'static str) {
        counter!(names::CACHE_MISSES_TOTAL, "namespace" => namespace).increment(1);
    }

    /// Record a swallowed cache error.
    pub fn error(namespace: &'static str, kind: &'static str) {
        counter!(
            names::CACHE_ERRORS_TOTAL,
            "namespace" => namespace,
            "kind" => kind
        )
        .increment(1);
    }

    /// Record an entry written.
    pub fn write(namespace: &'static str) {
        counter!(names::CACHE_WRITES_TOTAL, "namespace" => namespace).increment(1);
    }

    /// Record a completed invalidation call.
    pub fn invalidation(mutation: &'static str, keys_deleted: usize) {
        counter!(names::INVALIDATIONS_TOTAL, "mutation" => mutation).increment(1);
        counter!(names::KEYS_INVALIDATED_TOTAL, "mutation" => mutation).increment(keys_deleted as u64);
    }

    /// Record an abandoned pattern scan.
    pub fn scan_incomplete(pattern_namespace: &'static str) {
        counter!(names::SCAN_INCOMPLETE_TOTAL, "namespace" => pattern_namespace).increment(1);
    }
}
