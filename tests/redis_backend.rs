// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Integration tests against real Redis Stack (cache + RediSearch index).
//!
//! Tests use testcontainers for portability - no external docker-compose
//! required.
//!
//! # Running Tests
//! ```bash
//! # Requires Docker
//! cargo test --test redis_backend -- --ignored
//! ```

use std::time::Duration;

use catalog_sync::{
    cache_key, ProductCache, ProductRecord, QuerySpec, RediSearchIndex, RedisCache,
    SearchIndexStore,
};

use testcontainers::{clients::Cli, core::WaitFor, Container, GenericImage};

/// Redis Stack ships RedisJSON and RediSearch, which the index needs.
fn redis_stack_container(docker: &Cli) -> Container<'_, GenericImage> {
    let image = GenericImage::new("redis/redis-stack-server", "latest")
        .with_exposed_port(6379)
        .with_wait_for(WaitFor::message_on_stdout("Ready to accept connections"));
    docker.run(image)
}

fn record(id: &str, name: &str, price: f64, category: &str) -> ProductRecord {
    ProductRecord {
        id: id.to_string(),
        name: name.to_string(),
        description: Some(format!("{} in stock", name)),
        price,
        category: Some(category.to_string()),
        tags: vec![],
        quantity: 5,
        images: vec![],
    }
}

#[tokio::test]
#[ignore] // Requires Docker
async fn happy_cache_roundtrip_with_ttl() {
    let docker = Cli::default();
    let redis = redis_stack_container(&docker);
    let url = format!("redis://127.0.0.1:{}", redis.get_host_port_ipv4(6379));

    let cache = RedisCache::connect(&url, Duration::from_secs(2))
        .await
        .expect("connect");

    assert!(cache.get("P1").await.unwrap().is_none());
    cache.set(&record("P1", "Widget", 9.99, "tools")).await.unwrap();
    assert_eq!(cache.get("P1").await.unwrap().unwrap().name, "Widget");
    assert_eq!(cache_key("P1"), "product:P1");

    cache.invalidate("P1").await.unwrap();
    assert!(cache.get("P1").await.unwrap().is_none());

    // TTL expiry
    cache.set(&record("P2", "Gadget", 4.99, "tools")).await.unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(cache.get("P2").await.unwrap().is_none());
}

#[tokio::test]
#[ignore] // Requires Docker
async fn happy_index_search_with_filters_and_sort() {
    let docker = Cli::default();
    let redis = redis_stack_container(&docker);
    let url = format!("redis://127.0.0.1:{}", redis.get_host_port_ipv4(6379));

    let index = RediSearchIndex::connect(&url, "products").await.expect("connect");
    index.ensure_index().await.unwrap();
    // Idempotent on re-run
    index.ensure_index().await.unwrap();

    index.upsert(&record("P1", "Blue Widget", 9.99, "tools")).await.unwrap();
    index.upsert(&record("P2", "Red Widget", 19.99, "tools")).await.unwrap();
    index.upsert(&record("P3", "Garden Hose", 24.99, "garden")).await.unwrap();

    let results = index
        .search(
            &QuerySpec {
                q: Some("widget".to_string()),
                sort: Some("price:desc".to_string()),
                ..Default::default()
            }
            .into_request(10, 100)
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(results.total, 2);
    assert_eq!(results.items[0].id, "P2");

    let results = index
        .search(
            &QuerySpec {
                category: Some("garden".to_string()),
                ..Default::default()
            }
            .into_request(10, 100)
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(results.total, 1);
    assert_eq!(results.items[0].id, "P3");

    let results = index
        .search(
            &QuerySpec {
                min_price: Some(15.0),
                max_price: Some(30.0),
                ..Default::default()
            }
            .into_request(10, 100)
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(results.total, 2);
}

#[tokio::test]
#[ignore] // Requires Docker
async fn happy_index_apply_is_idempotent() {
    let docker = Cli::default();
    let redis = redis_stack_container(&docker);
    let url = format!("redis://127.0.0.1:{}", redis.get_host_port_ipv4(6379));

    let index = RediSearchIndex::connect(&url, "products").await.expect("connect");
    index.ensure_index().await.unwrap();

    let doc = record("P1", "Widget", 9.99, "tools");
    index.upsert(&doc).await.unwrap();
    index.upsert(&doc).await.unwrap();
    assert_eq!(index.count().await.unwrap(), 1);

    index.remove("P1").await.unwrap();
    index.remove("P1").await.unwrap();
    assert_eq!(index.count().await.unwrap(), 0);
}

#[tokio::test]
#[ignore] // Requires Docker
async fn failure_connect_to_dead_redis_fails_fast() {
    // Nothing listens here; startup retry budget should fail in seconds
    let result = RedisCache::connect("redis://127.0.0.1:1", Duration::from_secs(60)).await;
    assert!(result.is_err());
}
