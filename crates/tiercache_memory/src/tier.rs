// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! In-memory cache implementation using moka.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::future::Cache as MokaCache;
use tiercache_core::telemetry::{self, CacheActivity, CacheOperation};
use tiercache_core::{Cache, Codec, Error, MissLoader, Payload, Result, Slot, Ttl, on_miss};

use crate::builder::InMemoryCacheBuilder;
use crate::config::{MIN_CAPACITY_BYTES, MemoryConfig};

#[derive(Debug, Clone)]
struct Entry {
    payload: Arc<[u8]>,
    ttl: Option<Duration>,
    stored_at: Instant,
}

impl Entry {
    fn weight(key: &str, payload: &[u8]) -> u64 {
        (key.len() + payload.len()) as u64
    }

    fn is_live(&self) -> bool {
        self.ttl.is_none_or(|ttl| self.stored_at.elapsed() < ttl)
    }
}

/// Expires each entry after the TTL it was stored with.
struct EntryExpiry;

impl Expiry<String, Entry> for EntryExpiry {
    fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(&self, _key: &String, value: &Entry, _updated_at: Instant, _duration_until_expiry: Option<Duration>) -> Option<Duration> {
        value.ttl
    }
}

/// Hit and miss counters since construction or the last flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups that found a live entry.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
}

/// An in-memory cache backed by moka.
///
/// This cache provides:
/// - Concurrent access from multiple tasks without external locking
/// - Eviction once the configured byte bound is reached
/// - Per-entry expiration following the [`Ttl`] given on set
///
/// Clones share the same store.
///
/// # Examples
///
/// ```
/// use tiercache_core::{CacheExt, Ttl};
/// use tiercache_memory::{InMemoryCache, MemoryConfig};
/// # futures::executor::block_on(async {
///
/// let cache = InMemoryCache::new(&MemoryConfig::default());
///
/// cache.set_value("key", &vec![1, 2, 3], Ttl::from_seconds(60)).await.unwrap();
/// let value: Option<Vec<i32>> = cache.get_value("key", None).await.unwrap();
/// assert_eq!(value, Some(vec![1, 2, 3]));
/// # });
/// ```
#[derive(Clone)]
pub struct InMemoryCache {
    inner: MokaCache<String, Entry>,
    enabled: bool,
    default_ttl: Option<Duration>,
    name: Arc<str>,
    capacity: u64,
    counters: Arc<Counters>,
}

impl std::fmt::Debug for InMemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCache")
            .field("name", &self.name)
            .field("enabled", &self.enabled)
            .field("default_ttl", &self.default_ttl)
            .field("entries", &self.inner.entry_count())
            .finish_non_exhaustive()
    }
}

impl InMemoryCache {
    /// Creates a cache from deserialized settings.
    #[must_use]
    pub fn new(config: &MemoryConfig) -> Self {
        InMemoryCacheBuilder::from_config(config).build()
    }

    /// Creates a new builder for configuring an in-memory cache.
    #[must_use]
    pub fn builder() -> InMemoryCacheBuilder {
        InMemoryCacheBuilder::new()
    }

    pub(crate) fn from_builder(builder: InMemoryCacheBuilder) -> Self {
        let capacity = builder.max_bytes.max(MIN_CAPACITY_BYTES);
        let inner = MokaCache::builder()
            .name(&builder.name)
            .max_capacity(capacity)
            .weigher(|key: &String, entry: &Entry| u32::try_from(Entry::weight(key, &entry.payload)).unwrap_or(u32::MAX))
            .expire_after(EntryExpiry)
            .build();

        Self {
            inner,
            enabled: builder.enabled,
            default_ttl: builder.default_ttl,
            name: Arc::from(builder.name),
            capacity,
            counters: Arc::default(),
        }
    }

    /// Returns the hit and miss counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
        }
    }

    /// Returns the byte bound entries are evicted against.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Returns the name reported in logs.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn reset_stats(&self) {
        self.counters.hits.store(0, Ordering::Relaxed);
        self.counters.misses.store(0, Ordering::Relaxed);
    }

    fn record(&self, operation: CacheOperation, activity: CacheActivity) {
        telemetry::record(&self.name, operation, activity);
    }
}

impl Cache for InMemoryCache {
    async fn set(&self, key: &str, value: &dyn Payload, ttl: Ttl) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let payload = value.encode(Codec::Binary).inspect_err(|_| self.record(CacheOperation::Set, CacheActivity::Error))?;
        let weight = Entry::weight(key, &payload);
        if weight > self.capacity {
            self.record(CacheOperation::Set, CacheActivity::Error);
            return Err(Error::encoding(format!(
                "entry of {weight} bytes exceeds the cache capacity of {} bytes",
                self.capacity
            )));
        }

        let entry = Entry {
            payload: Arc::from(payload),
            ttl: ttl.expiry(self.default_ttl),
            stored_at: Instant::now(),
        };
        self.inner.insert(key.to_owned(), entry).await;
        self.record(CacheOperation::Set, CacheActivity::Stored);
        Ok(())
    }

    async fn get(&self, key: &str, slot: &mut dyn Slot, loader: Option<MissLoader<'_>>) -> Result<()> {
        if !self.enabled {
            return on_miss(loader).await;
        }

        match self.inner.get(key).await {
            Some(entry) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                self.record(CacheOperation::Get, CacheActivity::Hit);
                slot.fill(Codec::Binary, &entry.payload)
            }
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                self.record(CacheOperation::Get, CacheActivity::Miss);
                on_miss(loader).await
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        if !self.enabled {
            return Ok(false);
        }

        // An expired entry that has not been evicted yet still comes back from `remove`.
        let removed = self.inner.remove(key).await.is_some_and(|entry| entry.is_live());
        if removed {
            self.record(CacheOperation::Delete, CacheActivity::Removed);
        }
        Ok(removed)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.enabled && self.inner.contains_key(key))
    }

    async fn flush(&self) -> Result<u64> {
        if !self.enabled {
            return Ok(0);
        }

        let count = self.inner.iter().count() as u64;
        self.inner.invalidate_all();
        self.inner.run_pending_tasks().await;
        self.reset_stats();
        self.record(CacheOperation::Flush, CacheActivity::Flushed);
        Ok(count)
    }

    async fn is_ready(&self) -> bool {
        true
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ttl: Option<Duration>, age: Duration) -> Entry {
        Entry {
            payload: Arc::from(vec![1_u8]),
            ttl,
            stored_at: Instant::now() - age,
        }
    }

    #[test]
    fn liveness_follows_the_stored_ttl() {
        assert!(entry(None, Duration::from_secs(1)).is_live());
        assert!(entry(Some(Duration::from_secs(60)), Duration::ZERO).is_live());
        assert!(!entry(Some(Duration::from_millis(10)), Duration::from_secs(1)).is_live());
    }

    #[test]
    fn weight_counts_key_and_payload() {
        assert_eq!(Entry::weight("key", &[0; 5]), 8);
    }
}
