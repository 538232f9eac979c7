// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Tiered caching behind one contract.
//!
//! Every cache in this crate family implements [`Cache`]: a small set of async operations with a
//! shared TTL convention, a miss-loader protocol and an enable switch. Backends live in their own
//! crates and are re-exported here behind features:
//!
//! - `memory` (default): [`InMemoryCache`], a bounded in-process store.
//! - `redis`: [`RedisCache`], a remote store that declines [`Cache::flush`].
//!
//! On top of the contract this crate adds:
//!
//! - [`MultiTierCache`], which reads tiers in order until one hits, writes every tier and
//!   reports aggregate health. It is itself a [`Cache`], so composites nest.
//! - [`IdCache`], which resolves a name to an identifier once and keeps the answer in any
//!   [`Cache`] under a namespace.
//!
//! # Example
//!
//! ```
//! use tiercache::{CacheExt, InMemoryCache, MultiTierCache, Ttl};
//! # futures::executor::block_on(async {
//!
//! let local = InMemoryCache::builder().name("local").build();
//! let shared = InMemoryCache::builder().name("shared").build();
//! shared.set_value("greeting", &"hello", Ttl::Never).await.unwrap();
//!
//! let cache = MultiTierCache::builder().tier(local).tier(shared).build();
//!
//! // Found in the second tier.
//! let value: Option<String> = cache.get_value("greeting", None).await.unwrap();
//! assert_eq!(value.as_deref(), Some("hello"));
//! # });
//! ```

pub mod id;
pub mod multi;

#[doc(inline)]
pub use id::{IdCache, IdCacheConfig};
#[doc(inline)]
pub use multi::{MultiTierCache, MultiTierCacheBuilder};
#[doc(inline)]
pub use tiercache_core::{
    Cache, CacheExt, Codec, DynamicCache, DynamicCacheExt, Error, ErrorKind, KEY_SEPARATOR, MissLoader, Result, Ttl, make_key, on_miss,
};
#[cfg(feature = "memory")]
#[cfg_attr(docsrs, doc(cfg(feature = "memory")))]
#[doc(inline)]
pub use tiercache_memory::{InMemoryCache, InMemoryCacheBuilder, MemoryConfig};
#[cfg(feature = "redis")]
#[cfg_attr(docsrs, doc(cfg(feature = "redis")))]
#[doc(inline)]
pub use tiercache_redis::{RedisCache, RedisConfig};

#[cfg(feature = "test-util")]
#[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
pub use tiercache_core::testing;
