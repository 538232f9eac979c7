// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for implementing `Cache` outside the crate.

use std::collections::HashMap;
use std::sync::Mutex;

use tiercache_core::{Cache, CacheExt, Codec, DynamicCacheExt, Error, ErrorKind, MissLoader, Payload, Result, Slot, Ttl, make_key, on_miss};

/// Minimal implementation that ignores TTLs and cannot flush.
struct MinimalCache {
    data: Mutex<HashMap<String, Vec<u8>>>,
}

impl MinimalCache {
    fn new() -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
        }
    }
}

impl Cache for MinimalCache {
    async fn set(&self, key: &str, value: &dyn Payload, _ttl: Ttl) -> Result<()> {
        let bytes = value.encode(Codec::Binary)?;
        self.data.lock().expect("lock poisoned").insert(key.to_owned(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str, slot: &mut dyn Slot, loader: Option<MissLoader<'_>>) -> Result<()> {
        let bytes = self.data.lock().expect("lock poisoned").get(key).cloned();
        match bytes {
            Some(bytes) => slot.fill(Codec::Binary, &bytes),
            None => on_miss(loader).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.data.lock().expect("lock poisoned").remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.data.lock().expect("lock poisoned").contains_key(key))
    }

    async fn flush(&self) -> Result<u64> {
        Err(Error::not_supported("flush"))
    }

    async fn is_ready(&self) -> bool {
        true
    }

    fn is_enabled(&self) -> bool {
        true
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn minimal_cache_get_miss() {
    let cache = MinimalCache::new();
    let value: Option<i32> = cache.get_value("key", None).await.expect("error on get");
    assert!(value.is_none());
}

#[tokio::test]
async fn minimal_cache_get_hit() {
    let cache = MinimalCache::new();
    cache.set_value("key", &42_i64, Ttl::Never).await.expect("error on set");
    let value: Option<i64> = cache.get_value("key", None).await.expect("error on get");
    assert_eq!(value, Some(42));
}

#[tokio::test]
async fn loader_can_populate_the_cache() {
    let cache = MinimalCache::new();
    let key = make_key(["user", "1"]);

    let (cache_ref, key_ref) = (&cache, &key);
    let loader = MissLoader::new(move || async move { cache_ref.set_value(key_ref, &"loaded".to_string(), Ttl::Default).await });
    let first: Option<String> = cache.get_value(&key, Some(loader)).await.expect("error on get");
    assert_eq!(first, None);

    let second: Option<String> = cache.get_value(&key, None).await.expect("error on get");
    assert_eq!(second.as_deref(), Some("loaded"));
}

#[tokio::test]
async fn hit_does_not_run_loader() {
    let cache = MinimalCache::new();
    cache.set_value("key", &1_u16, Ttl::Never).await.expect("error on set");

    let value: Option<u16> = cache
        .get_value("key", Some(MissLoader::fail(Error::miss_triggered("should not run"))))
        .await
        .expect("error on get");
    assert_eq!(value, Some(1));
}

#[tokio::test]
async fn decoding_error_is_not_a_miss() {
    let cache = MinimalCache::new();
    cache.set_value("key", &1_i32, Ttl::Never).await.expect("error on set");

    let err = cache
        .get_value::<String>("key", Some(MissLoader::fail(Error::miss_triggered("should not run"))))
        .await
        .expect_err("decoding should fail");
    assert_eq!(err.kind(), ErrorKind::Decoding);
}

#[tokio::test]
async fn flush_not_supported_is_distinguishable() {
    let cache = MinimalCache::new().into_dynamic();
    let err = cache.flush().await.expect_err("flush is unsupported");
    assert!(err.is_not_supported());
}
