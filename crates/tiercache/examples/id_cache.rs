// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Example demonstrating a load-once identifier cache.
//!
//! Tenant names are resolved to identifiers by a slow lookup the first time they are seen and
//! served from memory afterwards.

use std::time::Duration;

use tiercache::{Error, IdCache, IdCacheConfig, InMemoryCache};

async fn lookup_tenant(name: String) -> tiercache::Result<String> {
    tokio::time::sleep(Duration::from_millis(100)).await;
    match name.as_str() {
        "contoso" => Ok("7c9e6679".to_owned()),
        "fabrikam" => Ok("1b4e28ba".to_owned()),
        _ => Err(Error::miss_triggered(format!("unknown tenant {name}"))),
    }
}

#[tokio::main]
async fn main() -> tiercache::Result<()> {
    let config = IdCacheConfig {
        namespace: "tenant".to_owned(),
        ..IdCacheConfig::default()
    };
    let ids = IdCache::from_config(InMemoryCache::builder().build(), &config)
        .with_resolver(lookup_tenant)
        .single_flight(true);

    for name in ["contoso", "fabrikam", "contoso"] {
        println!("{name} -> {}", ids.get_or_set(name).await?);
    }

    match ids.get_or_set("northwind").await {
        Ok(id) => println!("northwind -> {id}"),
        Err(error) => println!("northwind failed: {error}"),
    }

    println!("contoso cached: {}", ids.exists("contoso").await?);
    Ok(())
}
