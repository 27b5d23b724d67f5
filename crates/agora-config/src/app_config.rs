//! Application configuration structures.

use agora_core::telemetry::TelemetryConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name and metadata.
    #[serde(default)]
    pub app: AppMetadata,

    /// Redis configuration.
    #[serde(default)]
    pub redis: RedisConfig,

    /// Content cache policy.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Application metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppMetadata {
    /// Application name.
    pub name: String,
    /// Application version.
    pub version: String,
    /// Environment (development, staging, production).
    pub environment: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "agora".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Redis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis URL.
    pub url: String,
    /// Connection pool size.
    pub pool_size: usize,
    /// Enable Redis (can be disabled for local development).
    pub enabled: bool,
    /// Per-operation timeout in milliseconds; `0` leaves timeouts to the client.
    pub op_timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            pool_size: 10,
            enabled: true,
            op_timeout_ms: 500,
        }
    }
}

impl RedisConfig {
    /// Returns the per-operation timeout, if one is configured.
    #[must_use]
    pub const fn op_timeout(&self) -> Option<Duration> {
        if self.op_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.op_timeout_ms))
        }
    }
}

/// Content cache policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Global key prefix placed in front of every key scope. Empty for none.
    pub key_prefix: String,
    /// TTL of `detail:<id>` entries in seconds.
    pub detail_ttl_secs: u64,
    /// TTL of `list:page:*` entries in seconds.
    pub page_ttl_secs: u64,
    /// TTL of `list:search:*` entries in seconds.
    pub search_ttl_secs: u64,
    /// `COUNT` hint passed to each `SCAN` call.
    pub scan_batch_size: usize,
    /// Retry a pattern scan once when it fails midway.
    pub retry_failed_scan: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key_prefix: String::new(),
            detail_ttl_secs: 600, // 10 minutes
            page_ttl_secs: 300,   // 5 minutes
            search_ttl_secs: 180, // 3 minutes
            scan_batch_size: 100,
            retry_failed_scan: true,
        }
    }
}

impl CacheConfig {
    /// Returns the detail TTL as a Duration.
    #[must_use]
    pub const fn detail_ttl(&self) -> Duration {
        Duration::from_secs(self.detail_ttl_secs)
    }

    /// Returns the page TTL as a Duration.
    #[must_use]
    pub const fn page_ttl(&self) -> Duration {
        Duration::from_secs(self.page_ttl_secs)
    }

    /// Returns the search TTL as a Duration.
    #[must_use]
    pub const fn search_ttl(&self) -> Duration {
        Duration::from_secs(self.search_ttl_secs)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Log format (json, pretty).
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl ObservabilityConfig {
    /// Builds the tracing subscriber settings for this configuration.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryConfig {
        TelemetryConfig {
            log_level: format!("{},agora=debug", self.log_level),
            json: self.log_format.eq_ignore_ascii_case("json"),
            console_output: true,
        }
    }
}
