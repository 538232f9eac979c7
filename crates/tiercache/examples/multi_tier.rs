// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Example demonstrating a two-tier cache.
//!
//! A small, short-lived local tier sits in front of a larger shared tier. Reads stop at the
//! first tier that has the value; writes reach both.

use std::time::Duration;

use tiercache::{Cache, CacheExt, InMemoryCache, MissLoader, MultiTierCache, Ttl, make_key};

#[tokio::main]
async fn main() -> tiercache::Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let local = InMemoryCache::builder().name("local").default_ttl(Duration::from_secs(5)).build();
    let shared = InMemoryCache::builder().name("shared").max_bytes(16 * 1024 * 1024).build();
    let cache = MultiTierCache::builder().tier(local.clone()).tier(shared.clone()).name("profiles").build();

    let key = make_key(["profile", "42"]);

    // Miss everywhere: the loader fetches the value and stores it in every tier.
    let loader = {
        let (cache, key) = (&cache, key.as_str());
        MissLoader::new(move || async move { cache.set_value(key, &"Ada Lovelace", Ttl::Default).await })
    };
    let loaded: Option<String> = cache.get_value(&key, Some(loader)).await?;
    // The loader only fills the cache, so the first read still returns nothing.
    println!("first read: {loaded:?}");

    let profile: Option<String> = cache.get_value(&key, None).await?;
    println!("second read: {profile:?}");

    // Drop the local copy; the shared tier still answers.
    local.delete(&key).await?;
    let profile: Option<String> = cache.get_value(&key, None).await?;
    println!("after local eviction: {profile:?}");

    // Copy the shared hit back into the local tier.
    let promoted = cache.get_and_promote::<String>(&key, Ttl::Default, None).await?;
    println!("promoted: {promoted:?}, local has it again: {}", local.exists(&key).await?);

    println!("flushed {} entries", cache.flush().await?);
    cache.close().await
}
