// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Test utilities for cache implementations.
//!
//! This module provides:
//! - [`MockCache`], a configurable in-memory cache that records all operations and supports
//!   failure injection for testing error paths.
//! - [`assert_enabled_contract`] and [`assert_disabled_contract`], behavioral suites that any
//!   [`Cache`] implementation can run against itself.
//! - [`LogCapture`], for asserting on emitted `cache.event` logs.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing_subscriber::fmt::MakeWriter;

use crate::{Cache, CacheExt, Codec, Error, ErrorKind, MissLoader, Payload, Result, Slot, Ttl, on_miss};

/// Recorded cache operation with full context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOp {
    /// A set was performed with the given key and TTL.
    Set {
        /// The key that was written.
        key: String,
        /// The requested TTL.
        ttl: Ttl,
    },
    /// A get was performed with the given key.
    Get(String),
    /// A delete was performed with the given key.
    Delete(String),
    /// An existence check was performed with the given key.
    Exists(String),
    /// A flush was performed.
    Flush,
    /// A readiness probe was performed.
    Ready,
    /// A close was performed.
    Close,
}

impl CacheOp {
    fn name(&self) -> &'static str {
        match self {
            Self::Set { .. } => "set",
            Self::Get(_) => "get",
            Self::Delete(_) => "delete",
            Self::Exists(_) => "exists",
            Self::Flush => "flush",
            Self::Ready => "ready",
            Self::Close => "close",
        }
    }
}

type FailPredicate = Box<dyn Fn(&CacheOp) -> bool + Send + Sync>;

#[derive(Debug, Clone)]
struct Stored {
    bytes: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Stored {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// A configurable mock cache for testing.
///
/// Values are stored as JSON in a shared map. Every operation is recorded, and a predicate set
/// with [`MockCache::fail_when`] makes matching operations fail with
/// [`ErrorKind::BackendUnavailable`]. Clones share state.
///
/// # Examples
///
/// ```
/// use tiercache_core::{Cache, CacheExt, Ttl, testing::{CacheOp, MockCache}};
///
/// # futures::executor::block_on(async {
/// let cache = MockCache::new();
///
/// cache.set_value("key", &42, Ttl::Never).await.unwrap();
/// assert_eq!(cache.get_value::<i32>("key", None).await.unwrap(), Some(42));
///
/// cache.fail_when(|op| matches!(op, CacheOp::Get(k) if k == "forbidden"));
/// assert!(cache.get_value::<i32>("forbidden", None).await.is_err());
///
/// assert_eq!(cache.operations()[0], CacheOp::Set { key: "key".to_string(), ttl: Ttl::Never });
/// # });
/// ```
pub struct MockCache {
    data: Arc<Mutex<HashMap<String, Stored>>>,
    operations: Arc<Mutex<Vec<CacheOp>>>,
    fail_when: Arc<Mutex<Option<FailPredicate>>>,
    ready: Arc<AtomicBool>,
    enabled: bool,
    flush_supported: bool,
    default_ttl: Option<Duration>,
}

impl std::fmt::Debug for MockCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockCache")
            .field("entries", &self.data.lock().len())
            .field("operations", &self.operations)
            .field("fail_when", &self.fail_when.lock().is_some())
            .field("ready", &self.ready.load(Ordering::Relaxed))
            .field("enabled", &self.enabled)
            .field("flush_supported", &self.flush_supported)
            .finish_non_exhaustive()
    }
}

impl Clone for MockCache {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            operations: Arc::clone(&self.operations),
            fail_when: Arc::clone(&self.fail_when),
            ready: Arc::clone(&self.ready),
            enabled: self.enabled,
            flush_supported: self.flush_supported,
            default_ttl: self.default_ttl,
        }
    }
}

impl Default for MockCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCache {
    /// Creates a new empty, enabled mock cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
            ready: Arc::new(AtomicBool::new(true)),
            enabled: true,
            flush_supported: true,
            default_ttl: None,
        }
    }

    /// Creates a mock cache that is administratively disabled.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    /// Makes [`Cache::flush`] fail with [`ErrorKind::NotSupported`].
    #[must_use]
    pub fn without_flush(self) -> Self {
        Self {
            flush_supported: false,
            ..self
        }
    }

    /// Sets the expiry applied for [`Ttl::Default`].
    #[must_use]
    pub fn with_default_ttl(self, ttl: Duration) -> Self {
        Self {
            default_ttl: Some(ttl),
            ..self
        }
    }

    /// Sets what [`Cache::is_ready`] reports while the cache is enabled.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Relaxed);
    }

    /// Sets a predicate that determines when operations should fail.
    ///
    /// # Examples
    ///
    /// ```
    /// use tiercache_core::testing::{CacheOp, MockCache};
    ///
    /// let cache = MockCache::new();
    ///
    /// // Fail all operations
    /// cache.fail_when(|_| true);
    ///
    /// // Fail only closes
    /// cache.fail_when(|op| matches!(op, CacheOp::Close));
    /// ```
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&CacheOp) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all operations to succeed.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Returns a clone of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<CacheOp> {
        self.operations.lock().clone()
    }

    /// Clears all recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    /// Returns the number of live entries.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        let now = Instant::now();
        self.data.lock().values().filter(|stored| stored.is_live(now)).count()
    }

    /// Returns true if a live entry is stored under `key`, without recording an operation.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.load(key).is_some()
    }

    fn check(&self, op: CacheOp) -> Result<()> {
        let fail = self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(&op));
        let name = op.name();
        self.operations.lock().push(op);
        if fail {
            return Err(Error::new(ErrorKind::BackendUnavailable, format!("mock: {name} failed")));
        }
        Ok(())
    }

    fn load(&self, key: &str) -> Option<Vec<u8>> {
        let mut data = self.data.lock();
        match data.get(key) {
            Some(stored) if stored.is_live(Instant::now()) => Some(stored.bytes.clone()),
            Some(_) => {
                data.remove(key);
                None
            }
            None => None,
        }
    }
}

impl Cache for MockCache {
    async fn set(&self, key: &str, value: &dyn Payload, ttl: Ttl) -> Result<()> {
        self.check(CacheOp::Set { key: key.to_owned(), ttl })?;
        if !self.enabled {
            return Ok(());
        }
        let bytes = value.encode(Codec::Json)?;
        let expires_at = ttl.expiry(self.default_ttl).map(|d| Instant::now() + d);
        self.data.lock().insert(key.to_owned(), Stored { bytes, expires_at });
        Ok(())
    }

    async fn get(&self, key: &str, slot: &mut dyn Slot, loader: Option<MissLoader<'_>>) -> Result<()> {
        self.check(CacheOp::Get(key.to_owned()))?;
        if !self.enabled {
            return on_miss(loader).await;
        }
        match self.load(key) {
            Some(bytes) => slot.fill(Codec::Json, &bytes),
            None => on_miss(loader).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.check(CacheOp::Delete(key.to_owned()))?;
        if !self.enabled {
            return Ok(false);
        }
        let removed = self.data.lock().remove(key);
        Ok(removed.is_some_and(|stored| stored.is_live(Instant::now())))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.check(CacheOp::Exists(key.to_owned()))?;
        Ok(self.enabled && self.load(key).is_some())
    }

    async fn flush(&self) -> Result<u64> {
        self.check(CacheOp::Flush)?;
        if !self.flush_supported {
            return Err(Error::not_supported("flush"));
        }
        if !self.enabled {
            return Ok(0);
        }
        let count = self.entry_count() as u64;
        self.data.lock().clear();
        Ok(count)
    }

    async fn is_ready(&self) -> bool {
        if self.check(CacheOp::Ready).is_err() {
            return false;
        }
        !self.enabled || self.ready.load(Ordering::Relaxed)
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn close(&self) -> Result<()> {
        self.check(CacheOp::Close)
    }
}

/// The message of the error returned by [`failing_loader`].
pub const MISS_LOADER_MESSAGE: &str = "missing cache hit";

/// A loader that fails with [`ErrorKind::MissTriggered`] and [`MISS_LOADER_MESSAGE`].
#[must_use]
pub fn failing_loader() -> MissLoader<'static> {
    MissLoader::fail(Error::miss_triggered(MISS_LOADER_MESSAGE))
}

/// Asserts that `result` is exactly the failure produced by [`failing_loader`].
///
/// # Panics
///
/// Panics when `result` is a success or a different error.
pub fn assert_loader_error<T: std::fmt::Debug>(result: Result<T>) {
    let err = result.expect_err("the miss loader should have run");
    assert_eq!(err.kind(), ErrorKind::MissTriggered, "unexpected error: {err}");
    assert_eq!(err.to_string(), MISS_LOADER_MESSAGE);
}

/// Runs the behavior every enabled [`Cache`] must show.
///
/// Flush may report [`ErrorKind::NotSupported`]; any other flush failure fails the suite. The
/// suite sleeps for two seconds to observe expiration.
///
/// # Panics
///
/// Panics on the first violated expectation.
pub async fn assert_enabled_contract<C: Cache>(cache: &C) {
    assert!(cache.is_enabled());

    // Writes with each TTL form are readable immediately.
    cache.set_value("", &String::new(), Ttl::Never).await.expect("set empty key");
    for (key, ttl) in [
        ("test:set:ttl=0", Ttl::Never),
        ("test:set:ttl=-1", Ttl::Default),
        ("test:set:ttl=10", Ttl::from_seconds(10)),
    ] {
        cache.set_value(key, &1_i32, ttl).await.expect("set");
        let value = cache.get_value::<i32>(key, Some(failing_loader())).await.expect("get");
        assert_eq!(value, Some(1), "{key}");
    }

    // Structured values keep their shape.
    let nested = BTreeMap::from([("primes".to_string(), vec![2_u32, 3, 5]), ("empty".to_string(), Vec::new())]);
    cache.set_value("test:set:nested", &nested, Ttl::Never).await.expect("set nested");
    let read = cache
        .get_value::<BTreeMap<String, Vec<u32>>>("test:set:nested", Some(failing_loader()))
        .await
        .expect("get nested");
    assert_eq!(read, Some(nested));

    // Misses defer to the loader, or succeed without one.
    assert_loader_error(cache.get_value::<i32>("test:get:missing", Some(failing_loader())).await);
    let value = cache
        .get_value::<i32>("test:get:missing", Some(MissLoader::new(|| async { Ok(()) })))
        .await
        .expect("succeeding loader");
    assert_eq!(value, None);
    let mut slot = Some(7_i32);
    cache.get("test:get:missing", &mut slot, None).await.expect("miss without loader");
    assert_eq!(slot, Some(7), "a miss must leave the slot untouched");

    // Reading a stored integer as a string is a decoding error, not a miss.
    cache.set_value("test:set:invalid", &1_i32, Ttl::Never).await.expect("set");
    let err = cache
        .get_value::<String>("test:set:invalid", Some(failing_loader()))
        .await
        .expect_err("shape mismatch");
    assert_eq!(err.kind(), ErrorKind::Decoding, "unexpected error: {err}");

    // Delete reports whether something was removed.
    assert!(!cache.delete("test:delete:not-found").await.expect("delete"));
    cache.set_value("test:delete", &1_i32, Ttl::Never).await.expect("set");
    assert!(cache.delete("test:delete").await.expect("delete"));
    assert!(!cache.exists("test:delete").await.expect("exists"));

    // Existence tracks live entries.
    assert!(!cache.exists("test:is-exist:not-found").await.expect("exists"));
    cache.set_value("test:is-exist", &1_i32, Ttl::Never).await.expect("set");
    assert!(cache.exists("test:is-exist").await.expect("exists"));

    // Entries expire after their TTL.
    cache.set_value("test:set:ttl=1", &1_i32, Ttl::from_seconds(1)).await.expect("set");
    cache.set_value("test:is-exist:ttl=1", &1_i32, Ttl::from_seconds(1)).await.expect("set");
    assert_eq!(
        cache.get_value::<i32>("test:set:ttl=1", Some(failing_loader())).await.expect("get"),
        Some(1)
    );
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_loader_error(cache.get_value::<i32>("test:set:ttl=1", Some(failing_loader())).await);
    assert!(!cache.exists("test:is-exist:ttl=1").await.expect("exists"));

    // Flush empties the cache, unless the backend declines.
    cache.set_value("test:flush", &1_i32, Ttl::Never).await.expect("set");
    match cache.flush().await {
        Ok(count) => {
            assert!(count >= 1, "flush removed {count} entries");
            assert!(!cache.exists("test:flush").await.expect("exists"));
        }
        Err(err) => assert!(err.is_not_supported(), "unexpected flush error: {err}"),
    }
}

/// Runs the behavior every disabled [`Cache`] must show.
///
/// # Panics
///
/// Panics on the first violated expectation.
pub async fn assert_disabled_contract<C: Cache>(cache: &C) {
    assert!(!cache.is_enabled());
    assert!(cache.is_ready().await, "a disabled cache is always ready");

    cache.set_value("test:set:disable", &"123", Ttl::Never).await.expect("set is a no-op");
    assert_loader_error(cache.get_value::<String>("test:set:disable", Some(failing_loader())).await);

    let mut slot = Some(7_i32);
    cache.get("test:get:disable", &mut slot, None).await.expect("miss without loader");
    assert_eq!(slot, Some(7));

    assert!(!cache.delete("test:delete:disable").await.expect("delete"));
    assert!(!cache.exists("test:is-exist:disable").await.expect("exists"));

    match cache.flush().await {
        Ok(count) => assert_eq!(count, 0),
        Err(err) => assert!(err.is_not_supported(), "unexpected flush error: {err}"),
    }

    cache.close().await.expect("close");
    cache.close().await.expect("close twice");
}

/// Captures formatted log output for assertions.
///
/// Uses `tracing_subscriber::fmt::MakeWriter` to capture log lines into a shared buffer; install
/// it with `tracing::subscriber::set_default(capture.subscriber())`.
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Creates an empty capture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the captured log output as a string.
    #[must_use]
    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).to_string()
    }

    /// Asserts that the captured log output contains the given string.
    ///
    /// # Panics
    ///
    /// Panics when the output does not contain `expected`.
    pub fn assert_contains(&self, expected: &str) {
        let output = self.output();
        assert!(output.contains(expected), "log output does not contain '{expected}', got:\n{output}");
    }

    /// Creates a `tracing` subscriber that writes to this capture buffer.
    #[must_use]
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync {
        use tracing_subscriber::layer::SubscriberExt;
        tracing_subscriber::registry().with(tracing_subscriber::fmt::layer().with_writer(self.clone()).with_ansi(false))
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogCaptureWriter {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

/// Writer that appends to a [`LogCapture`] buffer.
#[derive(Debug)]
pub struct LogCaptureWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl Write for LogCaptureWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
