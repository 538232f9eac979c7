// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Deserializable configuration for Redis caches.

use std::time::Duration;

use serde::Deserialize;
use tiercache_core::KEY_SEPARATOR;

/// Network timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings for a [`crate::RedisCache`].
///
/// # Examples
///
/// ```
/// use tiercache_redis::RedisConfig;
///
/// let config: RedisConfig = serde_json::from_str(
///     r#"{"endpoint": "cache.internal:6379", "timeout_seconds": 2, "key_prefix": "orders:"}"#,
/// )
/// .unwrap();
///
/// assert_eq!(config.connection_url(), "redis://cache.internal:6379");
/// assert_eq!(config.normalized_prefix(), "orders");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Administrative switch. A disabled cache never contacts the server.
    pub enabled: bool,
    /// `host:port`, or a full `redis://` / `rediss://` URL.
    pub endpoint: String,
    /// Bound on dialing and on each request, in seconds; `0` uses [`DEFAULT_TIMEOUT`].
    pub timeout_seconds: u64,
    /// Expiry applied for [`tiercache_core::Ttl::Default`], in seconds; `0` never expires.
    pub default_ttl_seconds: u64,
    /// Prefix applied to every key. Trailing `:` characters are ignored.
    pub key_prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "127.0.0.1:6379".to_owned(),
            timeout_seconds: DEFAULT_TIMEOUT.as_secs(),
            default_ttl_seconds: 0,
            key_prefix: String::new(),
        }
    }
}

impl RedisConfig {
    /// Returns the endpoint as a connection URL.
    #[must_use]
    pub fn connection_url(&self) -> String {
        if self.endpoint.contains("://") {
            self.endpoint.clone()
        } else {
            format!("redis://{}", self.endpoint)
        }
    }

    /// Returns the configured timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        match self.timeout_seconds {
            0 => DEFAULT_TIMEOUT,
            seconds => Duration::from_secs(seconds),
        }
    }

    /// Returns the key prefix without trailing separators.
    #[must_use]
    pub fn normalized_prefix(&self) -> &str {
        self.key_prefix.trim_end_matches(KEY_SEPARATOR)
    }
}
