// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Dynamic cache wrapper for type erasure.

use std::{fmt::Debug, sync::Arc};

use crate::tier::DynCache;
use crate::{Cache, MissLoader, Payload, Result, Slot, Ttl};

/// Extension trait for converting any [`Cache`] into a [`DynamicCache`].
///
/// This trait is automatically implemented for all types that implement `Cache`.
///
/// # Examples
///
/// ```
/// use tiercache_core::{Cache, DynamicCache, DynamicCacheExt};
///
/// fn erase<C>(cache: C) -> DynamicCache
/// where
///     C: Cache + 'static,
/// {
///     cache.into_dynamic()
/// }
/// ```
pub trait DynamicCacheExt: Sized {
    /// Converts this cache into a `DynamicCache`.
    fn into_dynamic(self) -> DynamicCache;
}

impl<C> DynamicCacheExt for C
where
    C: Cache + 'static,
{
    fn into_dynamic(self) -> DynamicCache {
        DynamicCache::new(self)
    }
}

/// A clonable cache with type erasure.
///
/// `DynamicCache` wraps a trait object in an `Arc` to enable cloning while keeping dynamic
/// dispatch. Use it to hold structurally unrelated backends in one collection, such as the
/// tiers of a composite. Clones share the same underlying cache.
pub struct DynamicCache(Arc<DynCache<'static>>);

impl DynamicCache {
    /// Creates a new dynamic cache from any [`Cache`] implementation.
    pub fn new<C>(cache: C) -> Self
    where
        C: Cache + 'static,
    {
        Self(DynCache::new_arc(cache))
    }
}

impl Debug for DynamicCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicCache").finish()
    }
}

impl Clone for DynamicCache {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl Cache for DynamicCache {
    async fn set(&self, key: &str, value: &dyn Payload, ttl: Ttl) -> Result<()> {
        self.0.set(key, value, ttl).await
    }

    async fn get(&self, key: &str, slot: &mut dyn Slot, loader: Option<MissLoader<'_>>) -> Result<()> {
        self.0.get(key, slot, loader).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.0.delete(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.0.exists(key).await
    }

    async fn flush(&self) -> Result<u64> {
        self.0.flush().await
    }

    async fn is_ready(&self) -> bool {
        self.0.is_ready().await
    }

    fn is_enabled(&self) -> bool {
        self.0.is_enabled()
    }

    async fn close(&self) -> Result<()> {
        self.0.close().await
    }
}
