// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Redis cache implementation over a multiplexed connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, AsyncConnectionConfig, Client, RedisError};
use tiercache_core::telemetry::{self, CacheActivity, CacheOperation};
use tiercache_core::ttl::default_from_seconds;
use tiercache_core::{Cache, Codec, Error, MissLoader, Payload, Result, Slot, Ttl, on_miss};
use tokio::sync::Mutex;

use crate::config::RedisConfig;

/// Name reported in logs.
const NAME: &str = "redis";

/// A remote cache stored in Redis.
///
/// The connection is dialed on first use and shared by every call. When a call fails because
/// the connection broke, the connection is dropped and the next call dials again; the failed
/// call itself is not retried.
///
/// Values are JSON encoded. Writes with an expiry use `PSETEX`, writes that never expire use
/// `SET`.
///
/// # Examples
///
/// ```no_run
/// use tiercache_core::{Cache, CacheExt, Ttl};
/// use tiercache_redis::{RedisCache, RedisConfig};
///
/// # async fn example() -> tiercache_core::Result<()> {
/// let cache = RedisCache::new(&RedisConfig::default())?;
/// if cache.is_ready().await {
///     cache.set_value("greeting", &"hello", Ttl::Default).await?;
/// }
/// cache.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct RedisCache {
    client: Client,
    connection: Mutex<Option<MultiplexedConnection>>,
    closed: AtomicBool,
    enabled: bool,
    timeout: Duration,
    default_ttl: Option<Duration>,
    prefix: Arc<str>,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("enabled", &self.enabled)
            .field("prefix", &self.prefix)
            .field("timeout", &self.timeout)
            .field("default_ttl", &self.default_ttl)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl RedisCache {
    /// Creates a cache from settings without contacting the server.
    ///
    /// # Errors
    ///
    /// Returns [`tiercache_core::ErrorKind::BackendUnavailable`] when the endpoint is not a
    /// valid Redis address.
    pub fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.connection_url()).map_err(|e| Error::unavailable("redis: invalid endpoint", e))?;

        Ok(Self {
            client,
            connection: Mutex::new(None),
            closed: AtomicBool::new(false),
            enabled: config.enabled,
            timeout: config.timeout(),
            default_ttl: default_from_seconds(config.default_ttl_seconds),
            prefix: Arc::from(config.normalized_prefix()),
        })
    }

    /// Returns the key as stored on the server.
    ///
    /// # Examples
    ///
    /// ```
    /// use tiercache_redis::{RedisCache, RedisConfig};
    ///
    /// let cache = RedisCache::new(&RedisConfig {
    ///     key_prefix: "app:".to_string(),
    ///     ..RedisConfig::default()
    /// })
    /// .unwrap();
    /// assert_eq!(cache.full_key("user:1"), "app:user:1");
    /// ```
    #[must_use]
    pub fn full_key(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_owned()
        } else {
            format!("{}:{key}", self.prefix)
        }
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::unavailable("redis", "connection closed"));
        }

        let mut guard = self.connection.lock().await;
        if let Some(connection) = guard.as_ref() {
            return Ok(connection.clone());
        }

        let config = AsyncConnectionConfig::new()
            .set_connection_timeout(self.timeout)
            .set_response_timeout(self.timeout);
        let connection = self
            .client
            .get_multiplexed_async_connection_with_config(&config)
            .await
            .map_err(|e| Error::unavailable("redis: connect", e))?;
        *guard = Some(connection.clone());
        Ok(connection)
    }

    async fn failure(&self, context: &str, error: RedisError) -> Error {
        if error.is_io_error() || error.is_connection_dropped() || error.is_connection_refusal() || error.is_timeout() {
            tracing::debug!(cache.name = NAME, error = %error, "dropping redis connection");
            self.connection.lock().await.take();
        }
        Error::unavailable(context, error)
    }

    async fn store(&self, key: &str, value: &dyn Payload, ttl: Ttl) -> Result<()> {
        let payload = value.encode(Codec::Json)?;
        let key = self.full_key(key);
        let mut connection = self.connection().await?;

        let written = match ttl.expiry(self.default_ttl) {
            Some(expiry) => {
                let millis = u64::try_from(expiry.as_millis()).unwrap_or(u64::MAX).max(1);
                connection.pset_ex::<_, _, ()>(&key, payload.as_slice(), millis).await
            }
            None => connection.set::<_, _, ()>(&key, payload.as_slice()).await,
        };

        match written {
            Ok(()) => Ok(()),
            Err(e) => Err(self.failure("redis: set", e).await),
        }
    }

    async fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut connection = self.connection().await?;
        match connection.get::<_, Option<Vec<u8>>>(self.full_key(key)).await {
            Ok(payload) => Ok(payload),
            Err(e) => Err(self.failure("redis: get", e).await),
        }
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let mut connection = self.connection().await?;
        match connection.del::<_, u64>(self.full_key(key)).await {
            Ok(count) => Ok(count > 0),
            Err(e) => Err(self.failure("redis: delete", e).await),
        }
    }

    async fn contains(&self, key: &str) -> Result<bool> {
        let mut connection = self.connection().await?;
        match connection.exists::<_, bool>(self.full_key(key)).await {
            Ok(found) => Ok(found),
            Err(e) => Err(self.failure("redis: exists", e).await),
        }
    }

    async fn ping(&self) -> Result<()> {
        let mut connection = self.connection().await?;
        match redis::cmd("PING").query_async::<String>(&mut connection).await {
            Ok(_) => Ok(()),
            Err(e) => Err(self.failure("redis: ping", e).await),
        }
    }
}

impl Cache for RedisCache {
    async fn set(&self, key: &str, value: &dyn Payload, ttl: Ttl) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let result = self.store(key, value, ttl).await;
        telemetry::record_result(NAME, CacheOperation::Set, &result, |_| CacheActivity::Stored);
        result
    }

    async fn get(&self, key: &str, slot: &mut dyn Slot, loader: Option<MissLoader<'_>>) -> Result<()> {
        if !self.enabled {
            return on_miss(loader).await;
        }

        let fetched = self.fetch(key).await;
        telemetry::record_result(NAME, CacheOperation::Get, &fetched, |payload| {
            if payload.is_some() { CacheActivity::Hit } else { CacheActivity::Miss }
        });

        match fetched? {
            Some(payload) => slot.fill(Codec::Json, &payload),
            None => on_miss(loader).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        if !self.enabled {
            return Ok(false);
        }

        let result = self.remove(key).await;
        telemetry::record_result(NAME, CacheOperation::Delete, &result, |_| CacheActivity::Removed);
        result
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        if !self.enabled {
            return Ok(false);
        }

        let result = self.contains(key).await;
        telemetry::record_result(NAME, CacheOperation::Exists, &result, |_| CacheActivity::Ok);
        result
    }

    async fn flush(&self) -> Result<u64> {
        telemetry::record(NAME, CacheOperation::Flush, CacheActivity::NotSupported);
        Err(Error::not_supported("flush"))
    }

    async fn is_ready(&self) -> bool {
        if !self.enabled {
            return true;
        }

        let result = self.ping().await;
        telemetry::record_result(NAME, CacheOperation::Ready, &result, |_| CacheActivity::Ok);
        result.is_ok()
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        // Dropping the last handle shuts the multiplexed connection down.
        self.connection.lock().await.take();
        telemetry::record(NAME, CacheOperation::Close, CacheActivity::Ok);
        Ok(())
    }
}
