// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Remote cache tier backed by Redis.
//!
//! [`RedisCache`] implements [`tiercache_core::Cache`] over a single multiplexed Redis
//! connection. Values are stored as JSON so other processes and languages can read them, and
//! every key is scoped by an optional prefix.
//!
//! Two behaviors differ from an in-process cache:
//!
//! - [`tiercache_core::Cache::flush`] always fails with
//!   [`tiercache_core::ErrorKind::NotSupported`]. Enumerating a shared remote keyspace is too
//!   expensive and too destructive to offer.
//! - Network failures surface as [`tiercache_core::ErrorKind::BackendUnavailable`] instead of
//!   being treated as misses. Nothing is retried; the connection is redialed on the next call.
//!
//! # Example
//!
//! ```no_run
//! use tiercache_core::{CacheExt, Ttl};
//! use tiercache_redis::{RedisCache, RedisConfig};
//!
//! # async fn example() -> tiercache_core::Result<()> {
//! let cache = RedisCache::new(&RedisConfig {
//!     endpoint: "127.0.0.1:6379".to_string(),
//!     key_prefix: "billing:".to_string(),
//!     ..RedisConfig::default()
//! })?;
//!
//! // Stored under "billing:invoice:7".
//! cache.set_value("invoice:7", &1250_u32, Ttl::from_seconds(600)).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod tier;

#[doc(inline)]
pub use config::RedisConfig;
#[doc(inline)]
pub use tier::RedisCache;
