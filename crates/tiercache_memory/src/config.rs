// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Deserializable configuration for in-memory caches.

use serde::Deserialize;

/// Smallest capacity a cache is built with, in bytes.
pub const MIN_CAPACITY_BYTES: u64 = 512 * 1024;

/// Capacity used when none is configured, in bytes.
pub const DEFAULT_CAPACITY_BYTES: u64 = 64 * 1024 * 1024;

/// Settings for an [`crate::InMemoryCache`].
///
/// Missing fields take their defaults, so an empty document yields an enabled cache of
/// [`DEFAULT_CAPACITY_BYTES`] whose entries never expire unless a TTL is given.
///
/// # Examples
///
/// ```
/// use tiercache_memory::{InMemoryCache, MemoryConfig};
///
/// let config = MemoryConfig {
///     max_bytes: 1024 * 1024,
///     default_ttl_seconds: 60,
///     ..MemoryConfig::default()
/// };
/// let cache = InMemoryCache::new(&config);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Administrative switch. A disabled cache stores nothing.
    pub enabled: bool,
    /// Upper bound on the bytes held, counting keys and payloads. Raised to
    /// [`MIN_CAPACITY_BYTES`] when smaller.
    pub max_bytes: u64,
    /// Expiry applied for [`tiercache_core::Ttl::Default`], in seconds; `0` never expires.
    pub default_ttl_seconds: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_bytes: DEFAULT_CAPACITY_BYTES,
            default_ttl_seconds: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: MemoryConfig = serde_json::from_str("{}").expect("valid config");
        assert_eq!(config, MemoryConfig::default());
        assert!(config.enabled);
    }

    #[test]
    fn fields_are_read_by_name() {
        let config: MemoryConfig =
            serde_json::from_str(r#"{"enabled": false, "max_bytes": 1048576, "default_ttl_seconds": 30}"#).expect("valid config");
        assert!(!config.enabled);
        assert_eq!(config.max_bytes, 1_048_576);
        assert_eq!(config.default_ttl_seconds, 30);
    }
}
