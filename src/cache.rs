// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Read-through product cache.
//!
//! Keys are `product:<id>`, values the JSON-serialized record, expiring
//! after the configured TTL. The cache is strictly an accelerator: callers
//! treat every failure as a miss and fall through to the primary store.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use thiserror::Error;

use crate::product::ProductRecord;
use crate::resilience::{retry, RetryConfig};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error("cached value corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Cache key for a product identity.
pub fn cache_key(id: &str) -> String {
    format!("product:{}", id)
}

#[async_trait]
pub trait ProductCache: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<ProductRecord>, CacheError>;
    async fn set(&self, record: &ProductRecord) -> Result<(), CacheError>;
    /// Invalidating an absent key is not an error.
    async fn invalidate(&self, id: &str) -> Result<(), CacheError>;
}

/// Redis-backed cache with per-key TTL (`SET EX`).
pub struct RedisCache {
    connection: ConnectionManager,
    ttl: Duration,
}

impl RedisCache {
    pub async fn connect(url: &str, ttl: Duration) -> Result<Self, CacheError> {
        let client = Client::open(url).map_err(|e| CacheError::Backend(e.to_string()))?;
        let connection = retry("cache_connect", &RetryConfig::startup(), || async {
            ConnectionManager::new(client.clone()).await
        })
        .await
        .map_err(|e: redis::RedisError| CacheError::Backend(e.to_string()))?;

        Ok(Self { connection, ttl })
    }
}

#[async_trait]
impl ProductCache for RedisCache {
    async fn get(&self, id: &str) -> Result<Option<ProductRecord>, CacheError> {
        let key = cache_key(id);
        let cached: Option<String> = retry("cache_get", &RetryConfig::query(), || {
            let mut conn = self.connection.clone();
            let key = key.clone();
            async move { conn.get(&key).await }
        })
        .await
        .map_err(|e: redis::RedisError| CacheError::Backend(e.to_string()))?;

        match cached {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, record: &ProductRecord) -> Result<(), CacheError> {
        let key = cache_key(&record.id);
        let json = serde_json::to_string(record)?;
        let ttl_secs = self.ttl.as_secs();
        retry("cache_set", &RetryConfig::query(), || {
            let mut conn = self.connection.clone();
            let key = key.clone();
            let json = json.clone();
            async move { conn.set_ex(&key, &json, ttl_secs).await }
        })
        .await
        .map_err(|e: redis::RedisError| CacheError::Backend(e.to_string()))
    }

    async fn invalidate(&self, id: &str) -> Result<(), CacheError> {
        let key = cache_key(id);
        retry("cache_invalidate", &RetryConfig::query(), || {
            let mut conn = self.connection.clone();
            let key = key.clone();
            async move { conn.del::<_, i64>(&key).await }
        })
        .await
        .map(|_| ())
        .map_err(|e: redis::RedisError| CacheError::Backend(e.to_string()))
    }
}

/// Process-local cache with lazy TTL expiry. Used in tests and when no
/// Redis URL is configured.
pub struct MemoryCache {
    entries: DashMap<String, (ProductRecord, Instant)>,
    ttl: Duration,
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }
}

#[async_trait]
impl ProductCache for MemoryCache {
    async fn get(&self, id: &str) -> Result<Option<ProductRecord>, CacheError> {
        let key = cache_key(id);
        if let Some(entry) = self.entries.get(&key) {
            let (record, expires_at) = entry.value();
            if Instant::now() < *expires_at {
                return Ok(Some(record.clone()));
            }
        }
        // Expired entries are dropped on the next lookup
        self.entries
            .remove_if(&key, |_, (_, expires_at)| Instant::now() >= *expires_at);
        Ok(None)
    }

    async fn set(&self, record: &ProductRecord) -> Result<(), CacheError> {
        self.entries.insert(
            cache_key(&record.id),
            (record.clone(), Instant::now() + self.ttl),
        );
        Ok(())
    }

    async fn invalidate(&self, id: &str) -> Result<(), CacheError> {
        self.entries.remove(&cache_key(id));
        Ok(())
    }
}
