// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The contract every cache backend implements.
//!
//! [`Cache`] is implemented by storage backends and by composites over other caches, so a
//! caller never needs to know which one it holds.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{MissLoader, Payload, Result, Slot, Ttl};

/// Trait for cache implementations.
///
/// All methods except [`Cache::is_enabled`] are asynchronous. A backend that is disabled
/// treats every write as a successful no-op, every read as a miss, reports `false` from
/// [`Cache::delete`] and [`Cache::exists`], and is always ready.
#[dynosaur::dynosaur(pub(crate) DynCache = dyn(box) Cache, bridge(none))]
pub trait Cache: Send + Sync {
    /// Stores `value` under `key`.
    ///
    /// Fails with [`crate::ErrorKind::Encoding`] when the value cannot be serialized by the
    /// backend's codec.
    fn set(&self, key: &str, value: &dyn Payload, ttl: Ttl) -> impl Future<Output = Result<()>> + Send;

    /// Looks up `key` and decodes a hit into `slot`.
    ///
    /// On a miss (absent, expired, or a disabled backend) the loader is invoked and its result
    /// is returned verbatim; without a loader the call succeeds and `slot` is left untouched. A
    /// hit whose payload does not decode into `slot` fails with
    /// [`crate::ErrorKind::Decoding`] and the loader is not invoked.
    fn get(&self, key: &str, slot: &mut dyn Slot, loader: Option<MissLoader<'_>>) -> impl Future<Output = Result<()>> + Send;

    /// Removes `key`, returning whether an entry was actually removed.
    fn delete(&self, key: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Returns whether a live entry is stored under `key`.
    fn exists(&self, key: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Removes every entry and returns how many were removed.
    ///
    /// Backends for which enumerating entries is prohibitively expensive fail with
    /// [`crate::ErrorKind::NotSupported`]; callers should treat that as an expected outcome.
    fn flush(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Reports whether the backend is operationally healthy.
    fn is_ready(&self) -> impl Future<Output = bool> + Send;

    /// Reports the administrative on/off switch fixed at construction.
    fn is_enabled(&self) -> bool;

    /// Releases backend resources. Closing twice is not an error.
    fn close(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Typed helpers over [`Cache::set`] and [`Cache::get`].
///
/// This trait is automatically implemented for all types that implement [`Cache`].
pub trait CacheExt: Cache {
    /// Stores a typed value.
    fn set_value<T>(&self, key: &str, value: &T, ttl: impl Into<Ttl>) -> impl Future<Output = Result<()>> + Send
    where
        T: Serialize + Sync,
    {
        self.set(key, value, ttl.into())
    }

    /// Looks up a typed value, returning `None` on a miss.
    ///
    /// The loader, if any, runs on a miss exactly as for [`Cache::get`]. A loader that
    /// populates the cache does not change the returned value; read again to observe it.
    fn get_value<T>(&self, key: &str, loader: Option<MissLoader<'_>>) -> impl Future<Output = Result<Option<T>>> + Send
    where
        T: DeserializeOwned + Send,
    {
        async move {
            let mut slot: Option<T> = None;
            self.get(key, &mut slot, loader).await?;
            Ok(slot)
        }
    }
}

impl<C: Cache> CacheExt for C {}
