// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Multi-tier composite cache.
//!
//! A [`MultiTierCache`] chains an ordered list of caches. Reads walk the tiers in order and stop
//! at the first hit; writes go to every tier. The composite is itself a [`Cache`], so a tier may
//! be another composite.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tiercache_core::telemetry::{self, CacheActivity, CacheOperation};
use tiercache_core::{Cache, DynamicCache, DynamicCacheExt, Error, MissLoader, Payload, Result, Slot, Ttl, on_miss};

/// Name reported in logs when none is configured.
pub const DEFAULT_NAME: &str = "multi";

/// Reports a miss on the tier it is handed to, without running the caller's loader.
fn probe(found: &mut bool) -> MissLoader<'_> {
    MissLoader::new(move || async move {
        *found = false;
        Ok(())
    })
}

/// A cache composed of ordered tiers.
///
/// | operation    | behavior                                                             |
/// |--------------|----------------------------------------------------------------------|
/// | `set`        | every tier in order; stops at the first error, no rollback           |
/// | `get`        | tiers in order until one hits; the caller's loader runs only if all miss |
/// | `delete`     | every tier; `true` if any removed; stops at the first error, see [`Error::removed`] |
/// | `exists`     | tiers in order until one reports a live entry or fails               |
/// | `flush`      | every tier; sum of counts; stops at the first error, `NotSupported` included |
/// | `is_ready`   | all tiers ready                                                      |
/// | `is_enabled` | any tier enabled                                                     |
/// | `close`      | every tier; all failures joined into one aggregate error              |
///
/// A hit in a lower tier is not copied into the tiers above it. Use
/// [`MultiTierCache::get_and_promote`] where that is wanted.
///
/// # Examples
///
/// ```
/// use tiercache::{Cache, CacheExt, InMemoryCache, MultiTierCache, Ttl};
/// # futures::executor::block_on(async {
///
/// let cache = MultiTierCache::builder()
///     .tier(InMemoryCache::builder().name("l1").build())
///     .tier(InMemoryCache::builder().name("l2").build())
///     .build();
///
/// cache.set_value("answer", &42_u32, Ttl::from_seconds(60)).await.unwrap();
/// assert!(cache.exists("answer").await.unwrap());
/// assert_eq!(cache.flush().await.unwrap(), 2);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MultiTierCache {
    tiers: Arc<[DynamicCache]>,
    name: Arc<str>,
}

impl MultiTierCache {
    /// Creates a composite over `tiers`, first tier read first.
    #[must_use]
    pub fn new(tiers: Vec<DynamicCache>) -> Self {
        Self {
            tiers: tiers.into(),
            name: Arc::from(DEFAULT_NAME),
        }
    }

    /// Creates a builder with no tiers.
    #[must_use]
    pub fn builder() -> MultiTierCacheBuilder {
        MultiTierCacheBuilder::default()
    }

    /// Returns the number of tiers.
    #[must_use]
    pub fn tiers(&self) -> usize {
        self.tiers.len()
    }

    /// Returns the name reported in logs.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reads `key` like [`Cache::get`], then copies a lower-tier hit into every enabled tier
    /// above it.
    ///
    /// Promoted entries are written with `ttl`. A failed promotion is logged and does not affect
    /// the result.
    ///
    /// # Errors
    ///
    /// Returns the first tier error, or the loader's error when every tier misses.
    ///
    /// # Examples
    ///
    /// ```
    /// use tiercache::{CacheExt, InMemoryCache, MultiTierCache, Ttl};
    /// # futures::executor::block_on(async {
    ///
    /// let local = InMemoryCache::builder().build();
    /// let shared = InMemoryCache::builder().build();
    /// shared.set_value("k", &7_u8, Ttl::Never).await.unwrap();
    ///
    /// let cache = MultiTierCache::builder().tier(local.clone()).tier(shared).build();
    /// let value = cache.get_and_promote::<u8>("k", Ttl::Never, None).await.unwrap();
    ///
    /// assert_eq!(value, Some(7));
    /// assert_eq!(local.get_value::<u8>("k", None).await.unwrap(), Some(7));
    /// # });
    /// ```
    pub async fn get_and_promote<T>(&self, key: &str, ttl: impl Into<Ttl>, loader: Option<MissLoader<'_>>) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        let ttl = ttl.into();
        let mut slot: Option<T> = None;

        for (index, tier) in self.tiers.iter().enumerate() {
            let mut found = true;
            tier.get(key, &mut slot, Some(probe(&mut found))).await?;
            if !found {
                continue;
            }

            self.record(CacheOperation::Get, CacheActivity::Hit);
            if let Some(value) = &slot {
                self.promote(key, value, ttl, &self.tiers[..index]).await;
            }
            return Ok(slot);
        }

        self.record(CacheOperation::Get, CacheActivity::Miss);
        on_miss(loader).await?;
        Ok(slot)
    }

    async fn promote(&self, key: &str, value: &dyn Payload, ttl: Ttl, tiers: &[DynamicCache]) {
        for tier in tiers.iter().filter(|tier| tier.is_enabled()) {
            match tier.set(key, value, ttl).await {
                Ok(()) => self.record(CacheOperation::Set, CacheActivity::Promoted),
                Err(error) => {
                    tracing::warn!(cache.name = &*self.name, cache.key = key, error = %error, "promotion failed");
                }
            }
        }
    }

    fn record(&self, operation: CacheOperation, activity: CacheActivity) {
        telemetry::record(&self.name, operation, activity);
    }
}

impl Cache for MultiTierCache {
    async fn set(&self, key: &str, value: &dyn Payload, ttl: Ttl) -> Result<()> {
        for tier in self.tiers.iter() {
            tier.set(key, value, ttl).await.inspect_err(|_| self.record(CacheOperation::Set, CacheActivity::Error))?;
        }
        self.record(CacheOperation::Set, CacheActivity::Stored);
        Ok(())
    }

    async fn get(&self, key: &str, slot: &mut dyn Slot, loader: Option<MissLoader<'_>>) -> Result<()> {
        for tier in self.tiers.iter() {
            let mut found = true;
            tier.get(key, &mut *slot, Some(probe(&mut found)))
                .await
                .inspect_err(|_| self.record(CacheOperation::Get, CacheActivity::Error))?;
            if found {
                self.record(CacheOperation::Get, CacheActivity::Hit);
                return Ok(());
            }
        }

        self.record(CacheOperation::Get, CacheActivity::Miss);
        on_miss(loader).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut removed = false;
        for tier in self.tiers.iter() {
            match tier.delete(key).await {
                Ok(hit) => removed |= hit,
                Err(error) => {
                    // Tiers before the failing one keep their deletions.
                    self.record(CacheOperation::Delete, CacheActivity::Error);
                    return Err(error.with_removed(removed));
                }
            }
        }

        if removed {
            self.record(CacheOperation::Delete, CacheActivity::Removed);
        }
        Ok(removed)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        for tier in self.tiers.iter() {
            if tier.exists(key).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn flush(&self) -> Result<u64> {
        let mut total = 0_u64;
        for tier in self.tiers.iter() {
            let result = tier.flush().await;
            telemetry::record_result(&self.name, CacheOperation::Flush, &result, |_| CacheActivity::Flushed);
            total = total.saturating_add(result?);
        }
        Ok(total)
    }

    async fn is_ready(&self) -> bool {
        for tier in self.tiers.iter() {
            if !tier.is_ready().await {
                return false;
            }
        }
        true
    }

    fn is_enabled(&self) -> bool {
        self.tiers.iter().any(Cache::is_enabled)
    }

    async fn close(&self) -> Result<()> {
        let mut errors = Vec::new();
        for tier in self.tiers.iter() {
            if let Err(error) = tier.close().await {
                errors.push(error);
            }
        }

        if errors.is_empty() {
            self.record(CacheOperation::Close, CacheActivity::Ok);
            Ok(())
        } else {
            self.record(CacheOperation::Close, CacheActivity::Error);
            Err(Error::aggregate(errors))
        }
    }
}

/// Builder for a [`MultiTierCache`].
///
/// Tiers are read in the order they are added.
#[derive(Debug, Default)]
pub struct MultiTierCacheBuilder {
    tiers: Vec<DynamicCache>,
    name: Option<String>,
}

impl MultiTierCacheBuilder {
    /// Appends a tier.
    #[must_use]
    pub fn tier<C>(mut self, cache: C) -> Self
    where
        C: Cache + 'static,
    {
        self.tiers.push(cache.into_dynamic());
        self
    }

    /// Sets the name reported in logs.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builds the composite.
    #[must_use]
    pub fn build(self) -> MultiTierCache {
        let mut cache = MultiTierCache::new(self.tiers);
        if let Some(name) = self.name {
            cache.name = Arc::from(name);
        }
        cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiercache_core::testing::{CacheOp, MockCache};

    #[test]
    fn probe_clears_flag() {
        let mut found = true;
        futures::executor::block_on(probe(&mut found).invoke()).expect("probe never fails");
        assert!(!found);
    }

    #[test]
    fn builder_keeps_order_and_name() {
        let first = MockCache::new();
        let second = MockCache::new();
        let cache = MultiTierCache::builder().tier(first.clone()).tier(second.clone()).name("edge").build();

        assert_eq!(cache.tiers(), 2);
        assert_eq!(cache.name(), "edge");

        futures::executor::block_on(async {
            let _ = cache.exists("k").await.expect("exists");
        });
        assert_eq!(first.operations(), vec![CacheOp::Exists("k".to_owned())]);
        assert_eq!(second.operations(), vec![CacheOp::Exists("k".to_owned())]);
    }

    #[test]
    fn wrapping_a_wrapper_nests() {
        let inner = MultiTierCache::builder().tier(MockCache::new()).build();
        let outer = MultiTierCache::new(vec![inner.into_dynamic(), MockCache::disabled().into_dynamic()]);
        assert_eq!(outer.tiers(), 2);
        assert!(outer.is_enabled());
        assert_eq!(outer.name(), DEFAULT_NAME);
    }
}
