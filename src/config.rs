//! Configuration for the catalog sync pipeline.
//!
//! # Example
//!
//! ```
//! use catalog_sync::PipelineConfig;
//!
//! // Minimal config (uses defaults)
//! let config = PipelineConfig::default();
//! assert_eq!(config.exchange_name, "product_exchange");
//! assert_eq!(config.cache_ttl_secs, 3600);
//!
//! // Full config
//! let config = PipelineConfig {
//!     redis_url: Some("redis://localhost:6379".into()),
//!     cache_ttl_secs: 300,
//!     max_search_limit: 50,
//!     ..Default::default()
//! };
//! ```

use serde::Deserialize;

/// Configuration for the catalog sync pipeline.
///
/// All fields have sensible defaults. At minimum, you should configure
/// `redis_url` when running against real Redis/RediSearch backends.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Redis connection string (e.g., "redis://localhost:6379").
    /// Used by both the cache layer and the RediSearch-backed index.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Topic exchange the publisher declares and the consumer binds to.
    #[serde(default = "default_exchange_name")]
    pub exchange_name: String,

    /// Binding pattern for the index consumer's exclusive queue.
    #[serde(default = "default_binding_pattern")]
    pub binding_pattern: String,

    /// Cache entry TTL in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Per-queue ready-message capacity in the broker.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Number of channels in the publisher's channel pool.
    #[serde(default = "default_channel_pool_size")]
    pub channel_pool_size: usize,

    /// Default page size for search requests with no explicit limit.
    #[serde(default = "default_search_limit")]
    pub default_search_limit: usize,

    /// Hard upper bound on search page size, enforced at the boundary.
    #[serde(default = "default_max_search_limit")]
    pub max_search_limit: usize,

    /// Name of the product search index.
    #[serde(default = "default_index_name")]
    pub index_name: String,
}

fn default_exchange_name() -> String {
    "product_exchange".to_string()
}

fn default_binding_pattern() -> String {
    "product.*".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_channel_pool_size() -> usize {
    8
}

fn default_search_limit() -> usize {
    10
}

fn default_max_search_limit() -> usize {
    100
}

fn default_index_name() -> String {
    "products".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            exchange_name: default_exchange_name(),
            binding_pattern: default_binding_pattern(),
            cache_ttl_secs: default_cache_ttl_secs(),
            queue_capacity: default_queue_capacity(),
            channel_pool_size: default_channel_pool_size(),
            default_search_limit: default_search_limit(),
            max_search_limit: default_max_search_limit(),
            index_name: default_index_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.exchange_name, "product_exchange");
        assert_eq!(config.binding_pattern, "product.*");
        assert_eq!(config.cache_ttl_secs, 3600);
        assert_eq!(config.default_search_limit, 10);
        assert_eq!(config.max_search_limit, 100);
        assert!(config.redis_url.is_none());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{"redis_url": "redis://cache:6379", "cache_ttl_secs": 120}"#,
        )
        .unwrap();

        assert_eq!(config.redis_url.as_deref(), Some("redis://cache:6379"));
        assert_eq!(config.cache_ttl_secs, 120);
        // Untouched fields fall back to defaults
        assert_eq!(config.exchange_name, "product_exchange");
        assert_eq!(config.channel_pool_size, 8);
    }
}
