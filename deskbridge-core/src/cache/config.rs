//! Configuration for the response cache

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default namespace for keys written by this crate
pub const DEFAULT_NAMESPACE: &str = "deskbridge";

/// Configuration for the response cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Prefix isolating this cache's keys from any other tenant
    pub namespace: String,

    /// Maximum number of entries before least recently used ones are evicted
    pub max_entries: usize,

    /// Whether lookups consult the store when the cache is created
    pub enabled: bool,

    /// Enable the background sweep of expired entries
    pub enable_auto_cleanup: bool,

    /// Interval between background sweeps
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            max_entries: 10_000,
            enabled: true,
            enable_auto_cleanup: true,
            // Sweep every 5 minutes, the shortest TTL tier
            cleanup_interval: Duration::from_secs(300),
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.namespace.is_empty() {
            return Err("namespace must not be empty".to_string());
        }

        if self.namespace.contains(':') {
            return Err(format!(
                "namespace must not contain ':' (got {:?})",
                self.namespace
            ));
        }

        if self.max_entries == 0 {
            return Err("max_entries must be greater than 0".to_string());
        }

        if self.enable_auto_cleanup && self.cleanup_interval.is_zero() {
            return Err("cleanup_interval must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    namespace: Option<String>,
    max_entries: Option<usize>,
    enabled: Option<bool>,
    enable_auto_cleanup: Option<bool>,
    cleanup_interval: Option<Duration>,
}

impl CacheConfigBuilder {
    /// Set the key namespace
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set maximum number of cache entries
    pub fn max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }

    /// Start with caching enabled or disabled
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Enable or disable automatic cleanup
    pub fn enable_auto_cleanup(mut self, enable: bool) -> Self {
        self.enable_auto_cleanup = Some(enable);
        self
    }

    /// Set cleanup interval
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = Some(interval);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();

        CacheConfig {
            namespace: self.namespace.unwrap_or(defaults.namespace),
            max_entries: self.max_entries.unwrap_or(defaults.max_entries),
            enabled: self.enabled.unwrap_or(defaults.enabled),
            enable_auto_cleanup: self
                .enable_auto_cleanup
                .unwrap_or(defaults.enable_auto_cleanup),
            cleanup_interval: self.cleanup_interval.unwrap_or(defaults.cleanup_interval),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.namespace, "deskbridge");
        assert_eq!(config.max_entries, 10_000);
        assert!(config.enabled);
        assert!(config.enable_auto_cleanup);
    }

    #[test]
    fn test_config_validation() {
        assert!(CacheConfig::default().validate().is_ok());

        let invalid = CacheConfig::builder().max_entries(0).build();
        assert!(invalid.validate().is_err());

        let invalid = CacheConfig::builder().namespace("").build();
        assert!(invalid.validate().is_err());

        let invalid = CacheConfig::builder().namespace("a:b").build();
        assert!(invalid.validate().unwrap_err().contains("':'"));

        let invalid = CacheConfig::builder()
            .cleanup_interval(Duration::ZERO)
            .build();
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = CacheConfig::builder()
            .namespace("tests")
            .max_entries(50)
            .enabled(false)
            .enable_auto_cleanup(false)
            .build();

        assert_eq!(config.namespace, "tests");
        assert_eq!(config.max_entries, 50);
        assert!(!config.enabled);
        assert!(!config.enable_auto_cleanup);
        assert_eq!(config.cleanup_interval, Duration::from_secs(300));
    }
}
