//! Storefront configuration
//!
//! One JSON document configures the transition engine. Every field has a
//! default, so a partial document (or none at all) is valid.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use app_state::CoordinatorConfig;
use app_ui::TransitionConfig;
use storage::CacheConfig;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config document is not valid JSON for this schema
    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for configuration loading
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Bounds of the prefetch cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Maximum number of cached payloads
    pub max_entries: usize,
    /// Maximum total payload size in bytes
    pub max_size_bytes: usize,
    /// Lifetime of a cached payload; 0 keeps payloads until evicted
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: 500,
            max_size_bytes: 16 * 1024 * 1024,
            ttl_secs: 300,
        }
    }
}

impl CacheSettings {
    /// Cache configuration for the storage layer
    pub fn to_cache_config(&self) -> CacheConfig {
        let ttl = (self.ttl_secs > 0).then(|| Duration::from_secs(self.ttl_secs));
        CacheConfig::new()
            .max_entries(self.max_entries)
            .max_size_bytes(self.max_size_bytes)
            .default_ttl(ttl)
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorefrontConfig {
    /// Transition timing and geometry
    pub transition: TransitionConfig,
    /// Lock and queue coordination
    pub coordinator: CoordinatorConfig,
    /// Prefetch cache bounds
    pub cache: CacheSettings,
}

impl StorefrontConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Set the transition configuration
    pub fn transition(mut self, transition: TransitionConfig) -> Self {
        self.transition = transition;
        self
    }

    /// Set the coordinator configuration
    pub fn coordinator(mut self, coordinator: CoordinatorConfig) -> Self {
        self.coordinator = coordinator;
        self
    }

    /// Set the cache bounds
    pub fn cache(mut self, cache: CacheSettings) -> Self {
        self.cache = cache;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = StorefrontConfig::from_json_str("{}").unwrap();
        assert_eq!(config, StorefrontConfig::default());
        assert_eq!(config.coordinator.stuck_lock_warning_ms, 5_000);
        assert_eq!(config.cache.max_entries, 500);
    }

    #[test]
    fn test_partial_document() {
        let config = StorefrontConfig::from_json_str(
            r#"{"transition": {"easing": "linear", "interpolator": {"commit_threshold": 0.5}},
                "cache": {"ttl_secs": 0}}"#,
        )
        .unwrap();

        assert_eq!(config.transition.interpolator.commit_threshold, 0.5);
        assert_eq!(config.transition.push_duration_ms, 300);
        assert_eq!(config.cache.max_entries, 500);
        assert_eq!(config.cache.to_cache_config().default_ttl, None);
    }

    #[test]
    fn test_invalid_document() {
        let err = StorefrontConfig::from_json_str(r#"{"cache": {"max_entries": "many"}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"coordinator": {{"stuck_lock_warning_ms": 750}}}}"#).unwrap();

        let config = StorefrontConfig::from_path(file.path()).unwrap();
        assert_eq!(config.coordinator.stuck_lock_warning_ms, 750);

        let missing = StorefrontConfig::from_path(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_cache_settings_conversion() {
        let cache = CacheSettings { max_entries: 10, max_size_bytes: 1024, ttl_secs: 60 }.to_cache_config();
        assert_eq!(cache.max_entries, 10);
        assert_eq!(cache.max_size_bytes, 1024);
        assert_eq!(cache.default_ttl, Some(Duration::from_secs(60)));
    }
}
