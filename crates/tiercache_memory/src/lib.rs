// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Bounded in-process cache backed by moka.
//!
//! This crate provides [`InMemoryCache`], a [`tiercache_core::Cache`] that keeps values in a
//! concurrent moka store bounded by total payload bytes. Values are serialized with the compact
//! [`tiercache_core::Codec::Binary`] codec, entries carry their own TTL, and flush reports the
//! exact number of entries removed.
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//! use tiercache_core::{Cache, CacheExt, Ttl};
//! use tiercache_memory::InMemoryCache;
//!
//! # futures::executor::block_on(async {
//! let cache = InMemoryCache::builder()
//!     .max_bytes(4 * 1024 * 1024)
//!     .default_ttl(Duration::from_secs(300))
//!     .build();
//!
//! cache.set_value("key", &42, Ttl::Default).await?;
//! assert_eq!(cache.get_value::<i32>("key", None).await?, Some(42));
//! assert_eq!(cache.flush().await?, 1);
//! # Ok::<(), tiercache_core::Error>(())
//! # }).unwrap();
//! ```
//!
//! # Configuration
//!
//! [`MemoryConfig`] is the deserializable shape used when caches are described in
//! configuration; [`InMemoryCacheBuilder`] is the programmatic one. Both map onto the same
//! settings.

pub mod builder;
pub mod config;
pub mod tier;

#[doc(inline)]
pub use builder::InMemoryCacheBuilder;
#[doc(inline)]
pub use config::MemoryConfig;
#[doc(inline)]
pub use tier::{CacheStats, InMemoryCache};
