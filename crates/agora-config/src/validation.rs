//! Configuration validation module.
//!
//! Fails fast on invalid configuration rather than at runtime.

use crate::AppConfig;
use std::fmt;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// A cache TTL is zero; every entry must expire.
    ZeroTtl { name: String },
    /// Scan batch size is zero.
    ZeroScanBatch,
    /// Redis is enabled but has no URL.
    MissingRedisUrl,
    /// Redis URL does not use a redis scheme.
    InvalidRedisUrl { url: String },
    /// Pool size is zero.
    ZeroPoolSize,
    /// Log level is invalid.
    InvalidLogLevel { value: String },
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroTtl { name } => write!(f, "Cache TTL '{}' must be positive", name),
            Self::ZeroScanBatch => write!(f, "Cache scan batch size must be positive"),
            Self::MissingRedisUrl => write!(f, "Redis URL is required when Redis is enabled"),
            Self::InvalidRedisUrl { url } => {
                write!(f, "Invalid Redis URL '{}' (expected redis:// or rediss://)", url)
            }
            Self::ZeroPoolSize => write!(f, "Redis pool size must be positive"),
            Self::InvalidLogLevel { value } => {
                write!(
                    f,
                    "Invalid log level: '{}' (valid: trace, debug, info, warn, error)",
                    value
                )
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Valid log levels.
    const VALID_LOG_LEVELS: &'static [&'static str] = &["trace", "debug", "info", "warn", "error"];

    /// Validates the entire application configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(config: &AppConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        Self::validate_cache(&config.cache, &mut errors);
        Self::validate_redis(&config.redis, &mut errors);
        Self::validate_observability(&config.observability, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_cache(config: &crate::CacheConfig, errors: &mut Vec<ConfigValidationError>) {
        for (name, value) in [
            ("detail_ttl_secs", config.detail_ttl_secs),
            ("page_ttl_secs", config.page_ttl_secs),
            ("search_ttl_secs", config.search_ttl_secs),
        ] {
            if value == 0 {
                errors.push(ConfigValidationError::ZeroTtl {
                    name: name.to_string(),
                });
            }
        }

        if config.scan_batch_size == 0 {
            errors.push(ConfigValidationError::ZeroScanBatch);
        }
    }

    fn validate_redis(config: &crate::RedisConfig, errors: &mut Vec<ConfigValidationError>) {
        if !config.enabled {
            return;
        }

        if config.url.trim().is_empty() {
            errors.push(ConfigValidationError::MissingRedisUrl);
        } else if !(config.url.starts_with("redis://")
            || config.url.starts_with("rediss://")
            || config.url.starts_with("redis+unix://"))
        {
            errors.push(ConfigValidationError::InvalidRedisUrl {
                url: config.url.clone(),
            });
        }

        if config.pool_size == 0 {
            errors.push(ConfigValidationError::ZeroPoolSize);
        }
    }

    fn validate_observability(config: &crate::ObservabilityConfig, errors: &mut Vec<ConfigValidationError>) {
        if !Self::VALID_LOG_LEVELS.contains(&config.log_level.to_lowercase().as_str()) {
            errors.push(ConfigValidationError::InvalidLogLevel {
                value: config.log_level.clone(),
            });
        }
    }
}
