// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for `InMemoryCache`.

use std::collections::BTreeMap;
use std::time::Duration;

use tiercache_core::testing::{assert_disabled_contract, assert_enabled_contract, assert_loader_error, failing_loader};
use tiercache_core::{Cache, CacheExt, ErrorKind, Ttl};
use tiercache_memory::{CacheStats, InMemoryCache, InMemoryCacheBuilder, MemoryConfig};

fn block_on<F: std::future::Future>(f: F) -> F::Output {
    futures::executor::block_on(f)
}

#[tokio::test]
async fn enabled_cache_satisfies_contract() {
    let cache = InMemoryCache::builder().default_ttl(Duration::from_secs(60)).build();
    assert_enabled_contract(&cache).await;
}

#[tokio::test]
async fn disabled_cache_satisfies_contract() {
    let cache = InMemoryCache::new(&MemoryConfig {
        enabled: false,
        ..MemoryConfig::default()
    });
    assert_disabled_contract(&cache).await;
}

#[test]
fn default_builder_creates_enabled_cache() {
    let cache = InMemoryCacheBuilder::default().build();
    assert!(cache.is_enabled());
    assert_eq!(cache.name(), "memory");
}

#[test]
fn set_and_get_returns_value() {
    block_on(async {
        let cache = InMemoryCache::builder().build();
        cache.set_value("key", &42_i32, Ttl::Never).await.expect("set failed");

        let value: Option<i32> = cache.get_value("key", None).await.expect("get failed");
        assert_eq!(value, Some(42));
    });
}

#[test]
fn set_overwrites_existing_value() {
    block_on(async {
        let cache = InMemoryCache::builder().build();
        cache.set_value("key", &42_i32, Ttl::Never).await.expect("set failed");
        cache.set_value("key", &100_i32, Ttl::Never).await.expect("set failed");

        let value: Option<i32> = cache.get_value("key", None).await.expect("get failed");
        assert_eq!(value, Some(100));
    });
}

#[test]
fn keyed_mappings_round_trip() {
    block_on(async {
        let cache = InMemoryCache::builder().build();
        let map = BTreeMap::from([(1_u8, "one".to_string()), (2, "two".to_string())]);
        cache.set_value("map", &map, Ttl::Never).await.expect("set failed");

        let value: Option<BTreeMap<u8, String>> = cache.get_value("map", None).await.expect("get failed");
        assert_eq!(value, Some(map));
    });
}

#[test]
fn string_read_of_integer_is_decoding_error() {
    block_on(async {
        let cache = InMemoryCache::builder().build();
        cache.set_value("key", &1_i32, Ttl::Never).await.expect("set failed");

        let err = cache
            .get_value::<String>("key", Some(failing_loader()))
            .await
            .expect_err("shape mismatch should fail");
        assert_eq!(err.kind(), ErrorKind::Decoding);
    });
}

#[tokio::test]
async fn default_ttl_applies_to_default_entries_only() {
    let cache = InMemoryCache::builder().default_ttl(Duration::from_secs(1)).build();
    cache.set_value("default", &1_i32, Ttl::Default).await.expect("set failed");
    cache.set_value("never", &1_i32, Ttl::Never).await.expect("set failed");

    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert_loader_error(cache.get_value::<i32>("default", Some(failing_loader())).await);
    assert_eq!(cache.get_value::<i32>("never", None).await.expect("get failed"), Some(1));
}

#[tokio::test]
async fn delete_of_expired_entry_reports_no_removal() {
    let cache = InMemoryCache::builder().build();
    cache.set_value("short", &1_i32, Ttl::After(Duration::from_millis(200))).await.expect("set failed");

    tokio::time::sleep(Duration::from_millis(400)).await;

    assert!(!cache.delete("short").await.expect("delete failed"));
}

#[test]
fn flush_returns_exact_count_and_resets_stats() {
    block_on(async {
        let cache = InMemoryCache::builder().build();
        for key in ["a", "b", "c"] {
            cache.set_value(key, &key, Ttl::Never).await.expect("set failed");
        }
        let _ = cache.get_value::<String>("a", None).await.expect("get failed");
        let _ = cache.get_value::<String>("missing", None).await.expect("get failed");
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });

        assert_eq!(cache.flush().await.expect("flush failed"), 3);
        assert_eq!(cache.stats(), CacheStats::default());
        assert!(!cache.exists("a").await.expect("exists failed"));
        assert_eq!(cache.flush().await.expect("flush failed"), 0);
    });
}

#[test]
fn clones_share_the_store() {
    block_on(async {
        let cache = InMemoryCache::builder().build();
        let clone = cache.clone();
        cache.set_value("key", &"shared", Ttl::Never).await.expect("set failed");

        assert!(clone.exists("key").await.expect("exists failed"));
    });
}

#[test]
fn always_ready_and_close_is_idempotent() {
    block_on(async {
        let cache = InMemoryCache::builder().build();
        assert!(cache.is_ready().await);
        cache.close().await.expect("close failed");
        cache.close().await.expect("close failed");
    });
}

#[test]
fn entry_larger_than_capacity_is_rejected() {
    block_on(async {
        let cache = InMemoryCache::builder().max_bytes(1024).build();
        assert_eq!(cache.capacity(), 512 * 1024);

        let large = vec![7_u8; 2 * 1024 * 1024];
        let err = cache.set_value("large", &large, Ttl::Never).await.expect_err("entry too large");
        assert_eq!(err.kind(), ErrorKind::Encoding);
        assert!(err.to_string().contains("exceeds the cache capacity"));

        assert_eq!(cache.get_value::<Vec<u8>>("large", None).await.expect("get failed"), None);
        assert_eq!(cache.flush().await.expect("flush failed"), 0);
    });
}

#[test]
fn delete_reports_removal_of_overwritten_entry() {
    block_on(async {
        let cache = InMemoryCache::builder().build();
        cache.set_value("key", &1_i32, Ttl::After(Duration::from_secs(60))).await.expect("set failed");
        cache.set_value("key", &2_i32, Ttl::Never).await.expect("set failed");

        assert!(cache.delete("key").await.expect("delete failed"));
        assert!(!cache.delete("key").await.expect("delete failed"));
    });
}
