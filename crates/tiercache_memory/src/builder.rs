// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for configuring in-memory caches.
//!
//! This module provides a builder API for `InMemoryCache` that abstracts the underlying moka
//! configuration, providing a stable API surface without exposing moka's types.

use std::time::Duration;

use crate::config::{DEFAULT_CAPACITY_BYTES, MemoryConfig};
use crate::tier::InMemoryCache;

/// Name used in logs when none is configured.
pub const DEFAULT_NAME: &str = "memory";

/// Builder for configuring an `InMemoryCache`.
///
/// # Examples
///
/// ```
/// use tiercache_memory::InMemoryCache;
/// use std::time::Duration;
///
/// let cache = InMemoryCache::builder()
///     .max_bytes(8 * 1024 * 1024)
///     .default_ttl(Duration::from_secs(300))
///     .name("sessions")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryCacheBuilder {
    pub(crate) enabled: bool,
    pub(crate) max_bytes: u64,
    pub(crate) default_ttl: Option<Duration>,
    pub(crate) name: String,
}

impl Default for InMemoryCacheBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCacheBuilder {
    /// Creates a new builder with default settings.
    ///
    /// The default configuration creates an enabled cache bounded to 64 MiB whose entries
    /// never expire unless a TTL is given on set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            enabled: true,
            max_bytes: DEFAULT_CAPACITY_BYTES,
            default_ttl: None,
            name: DEFAULT_NAME.to_owned(),
        }
    }

    /// Creates a builder from deserialized settings.
    #[must_use]
    pub fn from_config(config: &MemoryConfig) -> Self {
        Self::new()
            .enabled(config.enabled)
            .max_bytes(config.max_bytes)
            .default_ttl(Duration::from_secs(config.default_ttl_seconds))
    }

    /// Sets the administrative switch.
    ///
    /// A disabled cache accepts every call but stores nothing.
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the maximum number of bytes held, counting keys and payloads.
    ///
    /// Once the bound is reached, entries are evicted using moka's `TinyLFU` policy. Values
    /// below 512 KiB are raised to 512 KiB.
    #[must_use]
    pub fn max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Sets the expiry applied when a value is set with [`tiercache_core::Ttl::Default`].
    ///
    /// A zero duration means such entries never expire.
    ///
    /// # Examples
    ///
    /// ```
    /// use tiercache_memory::InMemoryCache;
    /// use std::time::Duration;
    ///
    /// let cache = InMemoryCache::builder()
    ///     .default_ttl(Duration::from_secs(300))
    ///     .build();
    /// ```
    #[must_use]
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = (!ttl.is_zero()).then_some(ttl);
        self
    }

    /// Sets the name reported in logs and by the underlying store.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builds the configured `InMemoryCache`.
    #[must_use]
    pub fn build(self) -> InMemoryCache {
        InMemoryCache::from_builder(self)
    }
}
