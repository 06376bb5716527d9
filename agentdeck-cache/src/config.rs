//! Configuration for the cache system

use crate::error::{CacheError, Result};
use crate::profile::{CacheProfile, ProfileRegistry};
use std::time::Duration;

/// Configuration for the tag cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries in the cache
    /// Prevents unbounded memory growth
    pub max_entries: usize,

    /// Enable automatic cleanup of expired entries
    pub enable_auto_cleanup: bool,

    /// Interval for automatic cleanup checks
    pub cleanup_interval: Duration,

    /// Enable metrics collection
    pub enable_metrics: bool,

    /// Named cache-life profiles producers may bind to
    pub profiles: ProfileRegistry,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            enable_auto_cleanup: true,
            // Cleanup every 5 minutes
            cleanup_interval: Duration::from_secs(300),
            enable_metrics: true,
            profiles: ProfileRegistry::builtin(),
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(CacheError::ConfigError(
                "max_entries must be greater than 0".to_string(),
            ));
        }

        if self.enable_auto_cleanup && self.cleanup_interval.is_zero() {
            return Err(CacheError::ConfigError(
                "cleanup_interval must be non-zero when auto cleanup is enabled".to_string(),
            ));
        }

        if self.profiles.is_empty() {
            return Err(CacheError::ConfigError(
                "at least one cache profile must be registered".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    max_entries: Option<usize>,
    enable_auto_cleanup: Option<bool>,
    cleanup_interval: Option<Duration>,
    enable_metrics: Option<bool>,
    profiles: Vec<(String, CacheProfile)>,
}

impl CacheConfigBuilder {
    /// Set maximum number of cache entries
    pub fn max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
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

    /// Enable or disable metrics collection
    pub fn enable_metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = Some(enable);
        self
    }

    /// Register an extra profile, or override a built-in one
    pub fn profile(mut self, name: impl Into<String>, profile: CacheProfile) -> Self {
        self.profiles.push((name.into(), profile));
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();

        let mut profiles = defaults.profiles;
        for (name, profile) in self.profiles {
            profiles.register(name, profile);
        }

        CacheConfig {
            max_entries: self.max_entries.unwrap_or(defaults.max_entries),
            enable_auto_cleanup: self
                .enable_auto_cleanup
                .unwrap_or(defaults.enable_auto_cleanup),
            cleanup_interval: self.cleanup_interval.unwrap_or(defaults.cleanup_interval),
            enable_metrics: self.enable_metrics.unwrap_or(defaults.enable_metrics),
            profiles,
        }
    }
}
