// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! The cache contract shared by every tiercache backend.
//!
//! This crate defines the [`Cache`] trait that in-process, remote and composite caches all
//! implement, along with the pieces of the contract they share: the three-state [`Ttl`], the
//! [`MissLoader`] protocol, the [`Codec`] used to turn values into stored bytes, and the
//! [`Error`] taxonomy.
//!
//! # Overview
//!
//! Callers only ever see [`Cache`]. A backend stores opaque payloads and reports whether it is
//! enabled (an administrative switch fixed at construction) and ready (operationally healthy).
//! A disabled backend behaves as an unconditional miss and always reports ready, so composite
//! health checks are never blocked by an intentionally switched-off tier.
//!
//! # Reading and writing values
//!
//! The object-safe [`Cache::set`] and [`Cache::get`] take a [`Payload`] and a [`Slot`]. The
//! [`CacheExt`] helpers wrap them for typed values:
//!
//! ```
//! use tiercache_core::{Cache, CacheExt, MissLoader, Result, Ttl, make_key};
//!
//! async fn remember_user<C: Cache>(cache: &C, id: u64, name: &str) -> Result<Option<String>> {
//!     let key = make_key(["user", &id.to_string()]);
//!     cache.set_value(&key, &name.to_string(), Ttl::from_seconds(300)).await?;
//!
//!     // On a miss the loader runs and its result is returned verbatim.
//!     cache.get_value(&key, Some(MissLoader::new(|| async { Ok(()) }))).await
//! }
//! ```
//!
//! # Dynamic Dispatch
//!
//! [`DynamicCache`] wraps any `Cache` in a cloneable, type-erased container. Composite caches
//! hold their tiers this way, which is what lets heterogeneous backends (and nested composites)
//! share one tier list.

pub mod codec;
mod dynamic;
pub mod error;
pub mod key;
pub mod loader;
pub mod telemetry;
#[cfg(any(feature = "test-util", test))]
pub mod testing;
pub(crate) mod tier;
pub mod ttl;

#[doc(inline)]
pub use codec::{Codec, Payload, Slot};
#[doc(inline)]
pub use dynamic::{DynamicCache, DynamicCacheExt};
#[doc(inline)]
pub use error::{Error, ErrorKind, Result};
#[doc(inline)]
pub use key::{KEY_SEPARATOR, make_key};
#[doc(inline)]
pub use loader::{MissLoader, on_miss};
#[doc(inline)]
pub use tier::{Cache, CacheExt};
#[doc(inline)]
pub use ttl::Ttl;
