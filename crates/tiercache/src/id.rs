// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Load-once cache mapping names to identifiers.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde::Deserialize;
use tiercache_core::{Cache, CacheExt, DynamicCache, Error, MissLoader, Result, Ttl, make_key};

/// Expiry used for resolved identifiers when none is configured: one day.
pub const DEFAULT_TTL_SECONDS: u64 = 24 * 60 * 60;

type Resolver = Arc<dyn Fn(String) -> BoxFuture<'static, Result<String>> + Send + Sync>;

/// Settings for an [`IdCache`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IdCacheConfig {
    /// Segment prefixed to every name.
    pub namespace: String,
    /// Expiry of resolved identifiers, in seconds; `0` never expires.
    pub default_ttl_seconds: u64,
}

impl Default for IdCacheConfig {
    fn default() -> Self {
        Self {
            namespace: "id".to_owned(),
            default_ttl_seconds: DEFAULT_TTL_SECONDS,
        }
    }
}

type Outcome = std::result::Result<String, Arc<Error>>;

/// One resolution in progress. The leader holds the slot while it resolves; followers wait on
/// it and read the outcome it leaves behind.
#[derive(Debug, Default)]
struct Flight(tokio::sync::Mutex<Option<Outcome>>);

/// Coalesces concurrent resolutions of one key into a single call whose outcome every caller
/// receives.
#[derive(Debug, Default)]
struct Flights(Mutex<HashMap<String, Weak<Flight>>>);

impl Flights {
    fn join(&self, key: &str) -> Arc<Flight> {
        let mut flights = self.0.lock();
        if let Some(flight) = flights.get(key).and_then(Weak::upgrade) {
            return flight;
        }

        flights.retain(|_, flight| flight.strong_count() > 0);
        let flight = Arc::new(Flight::default());
        flights.insert(key.to_owned(), Arc::downgrade(&flight));
        flight
    }

    /// Callers arriving after this start a new flight.
    fn land(&self, key: &str, flight: &Arc<Flight>) {
        let mut flights = self.0.lock();
        if flights.get(key).is_some_and(|current| std::ptr::eq(current.as_ptr(), Arc::as_ptr(flight))) {
            flights.remove(key);
        }
    }

    async fn work<F, Fut>(&self, key: &str, resolve: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let flight = self.join(key);
        let mut slot = flight.0.lock().await;

        // An empty slot means no leader finished, including one that was cancelled.
        let outcome = match slot.as_ref() {
            Some(outcome) => outcome.clone(),
            None => {
                let outcome = resolve().await.map_err(Arc::new);
                *slot = Some(outcome.clone());
                self.land(key, &flight);
                outcome
            }
        };
        outcome.map_err(Error::from_shared)
    }
}

/// Resolves names to identifiers once and remembers the answers in a [`Cache`].
///
/// Every name is stored under `namespace:name`. On a miss the configured resolver runs and its
/// answer is written back with the configured TTL before it is returned. Without a resolver, a
/// miss fails with [`tiercache_core::ErrorKind::MissingLoader`].
///
/// Concurrent misses for one name each run the resolver unless [`IdCache::single_flight`] is
/// turned on, in which case they share one call and its outcome, error included.
///
/// # Examples
///
/// ```
/// use tiercache::{IdCache, InMemoryCache};
/// # futures::executor::block_on(async {
///
/// let ids = IdCache::new(InMemoryCache::builder().build(), "tenant")
///     .with_sync_resolver(|name| Ok(format!("id-{name}")));
///
/// assert_eq!(ids.get_or_set("contoso").await.unwrap(), "id-contoso");
/// assert!(ids.exists("contoso").await.unwrap());
/// # });
/// ```
pub struct IdCache<C = DynamicCache> {
    cache: C,
    namespace: String,
    ttl: Ttl,
    resolver: Option<Resolver>,
    flights: Option<Flights>,
}

impl<C: Debug> Debug for IdCache<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdCache")
            .field("cache", &self.cache)
            .field("namespace", &self.namespace)
            .field("ttl", &self.ttl)
            .field("resolver", &self.resolver.as_ref().map(|_| "<fn>"))
            .field("single_flight", &self.flights.is_some())
            .finish()
    }
}

impl<C: Cache> IdCache<C> {
    /// Creates an identifier cache over `cache` with the default one day TTL and no resolver.
    #[must_use]
    pub fn new(cache: C, namespace: impl Into<String>) -> Self {
        Self {
            cache,
            namespace: namespace.into(),
            ttl: Ttl::After(Duration::from_secs(DEFAULT_TTL_SECONDS)),
            resolver: None,
            flights: None,
        }
    }

    /// Creates an identifier cache from deserialized settings.
    #[must_use]
    pub fn from_config(cache: C, config: &IdCacheConfig) -> Self {
        Self::new(cache, config.namespace.clone()).ttl(Duration::from_secs(config.default_ttl_seconds))
    }

    /// Sets the expiry of resolved identifiers. A zero duration never expires.
    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Ttl::from(ttl);
        self
    }

    /// Sets the async function called with the name on a miss.
    ///
    /// # Examples
    ///
    /// ```
    /// use tiercache::{Error, IdCache, InMemoryCache};
    ///
    /// let ids = IdCache::new(InMemoryCache::builder().build(), "user").with_resolver(|name| async move {
    ///     // Look the name up in the system of record.
    ///     Ok::<_, Error>(name.to_uppercase())
    /// });
    /// ```
    #[must_use]
    pub fn with_resolver<F, Fut>(mut self, resolver: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        self.resolver = Some(Arc::new(move |name: String| resolver(name).boxed()));
        self
    }

    /// Sets a blocking function called with the name on a miss.
    #[must_use]
    pub fn with_sync_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&str) -> Result<String> + Send + Sync + 'static,
    {
        self.resolver = Some(Arc::new(move |name: String| futures::future::ready(resolver(&name)).boxed()));
        self
    }

    /// Makes concurrent misses for the same name share one resolver call and its outcome.
    #[must_use]
    pub fn single_flight(mut self, enabled: bool) -> Self {
        self.flights = enabled.then(Flights::default);
        self
    }

    /// Returns the namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the underlying cache.
    #[must_use]
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Returns the key `name` is stored under.
    #[must_use]
    pub fn key(&self, name: &str) -> String {
        make_key([self.namespace.as_str(), name])
    }

    /// Returns the identifier for `name`, resolving and storing it on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`tiercache_core::ErrorKind::MissingLoader`] on a miss without a resolver, the
    /// resolver's error unchanged, or any error of the underlying cache.
    pub async fn get_or_set(&self, name: &str) -> Result<String> {
        let key = self.key(name);
        let mut cached: Option<String> = None;
        let mut resolved: Option<String> = None;

        let loader = {
            let resolved = &mut resolved;
            let key = key.as_str();
            MissLoader::new(move || async move { self.load(key, name).await.map(|id| *resolved = Some(id)) })
        };
        self.cache.get(&key, &mut cached, Some(loader)).await?;

        cached.or(resolved).ok_or_else(Error::missing_loader)
    }

    /// Reports whether an identifier for `name` is cached.
    ///
    /// # Errors
    ///
    /// Returns any error of the underlying cache.
    pub async fn exists(&self, name: &str) -> Result<bool> {
        self.cache.exists(&self.key(name)).await
    }

    /// Forgets the identifier for `name`, returning whether one was cached.
    ///
    /// # Errors
    ///
    /// Returns any error of the underlying cache.
    pub async fn delete(&self, name: &str) -> Result<bool> {
        self.cache.delete(&self.key(name)).await
    }

    async fn load(&self, key: &str, name: &str) -> Result<String> {
        let Some(resolver) = &self.resolver else {
            return Err(Error::missing_loader());
        };

        let Some(flights) = &self.flights else {
            return self.resolve(resolver, key, name).await;
        };

        flights.work(key, || self.resolve(resolver, key, name)).await
    }

    async fn resolve(&self, resolver: &Resolver, key: &str, name: &str) -> Result<String> {
        let id = resolver(name.to_owned()).await?;
        tracing::debug!(cache.namespace = %self.namespace, cache.key = key, "resolved identifier");
        self.cache.set_value(key, &id, self.ttl).await?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiercache_core::ErrorKind;
    use tiercache_core::testing::MockCache;

    #[test]
    fn config_defaults_to_one_day() {
        let config: IdCacheConfig = serde_json::from_str(r#"{"namespace": "tenant"}"#).expect("valid config");
        assert_eq!(config.namespace, "tenant");
        assert_eq!(config.default_ttl_seconds, 86_400);

        let ids = IdCache::from_config(MockCache::new(), &config);
        assert_eq!(ids.ttl, Ttl::After(Duration::from_secs(86_400)));
        assert_eq!(ids.key("contoso"), "tenant:contoso");
    }

    #[test]
    fn zero_ttl_never_expires() {
        let ids = IdCache::new(MockCache::new(), "n").ttl(Duration::ZERO);
        assert_eq!(ids.ttl, Ttl::Never);
    }

    #[test]
    fn flights_are_shared_per_key_until_they_land() {
        let flights = Flights::default();
        let first = flights.join("a");
        let second = flights.join("a");
        let other = flights.join("b");
        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &other));

        flights.land("a", &first);
        assert!(!Arc::ptr_eq(&first, &flights.join("a")));
    }

    #[test]
    fn followers_receive_the_stored_outcome() {
        futures::executor::block_on(async {
            let flights = Flights::default();
            let first = flights.work("a", || async { Err(Error::miss_triggered("unknown")) }).await;
            assert_eq!(first.expect_err("leader fails").to_string(), "unknown");

            // A landed flight is not reused.
            let second = flights.work("a", || async { Ok("id".to_owned()) }).await;
            assert_eq!(second.expect("new flight"), "id");
        });
    }

    #[test]
    fn miss_without_resolver_fails() {
        let ids = IdCache::new(MockCache::new(), "n");
        let err = futures::executor::block_on(ids.get_or_set("x")).expect_err("no resolver");
        assert_eq!(err.kind(), ErrorKind::MissingLoader);
        assert_eq!(err.to_string(), "missing loader");
    }
}
