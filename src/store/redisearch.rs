// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! RediSearch-backed product index (Redis Stack).
//!
//! Documents are stored as RedisJSON under `catalog:product:<id>` and indexed
//! with FT.CREATE ON JSON:
//!
//! ```text
//! FT.CREATE idx:products ON JSON PREFIX 1 catalog:product: SCHEMA
//!   $.name AS name TEXT WEIGHT 2.0
//!   $.name AS name_sort TAG SORTABLE
//!   $.description AS description TEXT
//!   $.price AS price NUMERIC SORTABLE
//!   $.category AS category TAG
//!   $.quantity AS quantity NUMERIC SORTABLE
//! ```
//!
//! `name` is indexed twice: tokenized with a 2.0 weight for relevance, and as
//! a sortable tag (`name_sort`) so ordering by name compares whole strings.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{cmd, from_redis_value, Client, Value};
use tracing::debug;

use super::traits::{SearchIndexStore, StorageError};
use crate::product::ProductRecord;
use crate::resilience::{retry, RetryConfig};
use crate::search::{RediSearchTranslator, SearchRequest, SearchResults};

/// Key prefix for index documents. Distinct from the cache's `product:`
/// namespace so both can share one Redis instance.
const DOC_PREFIX: &str = "catalog:product:";

pub struct RediSearchIndex {
    connection: ConnectionManager,
    index_name: String,
}

impl RediSearchIndex {
    /// Connect with the startup retry budget, so a bad URL fails in seconds
    /// rather than hanging.
    pub async fn connect(url: &str, index_name: &str) -> Result<Self, StorageError> {
        let client = Client::open(url).map_err(|e| StorageError::Backend(e.to_string()))?;
        let connection = retry("redisearch_connect", &RetryConfig::startup(), || async {
            ConnectionManager::new(client.clone()).await
        })
        .await
        .map_err(|e: redis::RedisError| StorageError::Backend(e.to_string()))?;

        Ok(Self {
            connection,
            index_name: index_name.to_string(),
        })
    }

    fn ft_index(&self) -> String {
        format!("idx:{}", self.index_name)
    }

    fn doc_key(id: &str) -> String {
        format!("{}{}", DOC_PREFIX, id)
    }

    fn schema_args() -> Vec<&'static str> {
        vec![
            "ON", "JSON", "PREFIX", "1", DOC_PREFIX, "SCHEMA",
            "$.name", "AS", "name", "TEXT", "WEIGHT", "2.0",
            "$.name", "AS", "name_sort", "TAG", "SORTABLE",
            "$.description", "AS", "description", "TEXT",
            "$.price", "AS", "price", "NUMERIC", "SORTABLE",
            "$.category", "AS", "category", "TAG",
            "$.quantity", "AS", "quantity", "NUMERIC", "SORTABLE",
        ]
    }

    fn parse_search_reply(reply: &Value) -> Result<SearchResults, StorageError> {
        let Value::Array(items) = reply else {
            return Err(StorageError::Backend("unexpected FT.SEARCH reply".into()));
        };
        let Some(total_value) = items.first() else {
            return Err(StorageError::Backend("empty FT.SEARCH reply".into()));
        };
        let total: usize =
            from_redis_value(total_value).map_err(|e| StorageError::Backend(e.to_string()))?;

        // Reply shape: total, then (key, [path, json]) pairs.
        let mut records = Vec::new();
        for chunk in items[1..].chunks(2) {
            let [_key, fields] = chunk else { continue };
            let Value::Array(fields) = fields else {
                return Err(StorageError::Backend("unexpected document shape".into()));
            };
            for pair in fields.chunks(2) {
                let [path, value] = pair else { continue };
                let path: String =
                    from_redis_value(path).map_err(|e| StorageError::Backend(e.to_string()))?;
                if path == "$" {
                    let json: String = from_redis_value(value)
                        .map_err(|e| StorageError::Backend(e.to_string()))?;
                    records.push(serde_json::from_str::<ProductRecord>(&json)?);
                    break;
                }
            }
        }
        Ok(SearchResults {
            total,
            items: records,
        })
    }
}

#[async_trait]
impl SearchIndexStore for RediSearchIndex {
    async fn ensure_index(&self) -> Result<(), StorageError> {
        let mut conn = self.connection.clone();
        let mut create = cmd("FT.CREATE");
        create.arg(self.ft_index());
        for arg in Self::schema_args() {
            create.arg(arg);
        }
        let created: Result<(), redis::RedisError> = create.query_async(&mut conn).await;
        match created {
            Ok(()) => {
                debug!(index = %self.ft_index(), "search index created");
                Ok(())
            }
            // Re-running FT.CREATE against an existing index is fine
            Err(e) if e.to_string().contains("already exists") => Ok(()),
            Err(e) => Err(StorageError::Backend(e.to_string())),
        }
    }

    async fn upsert(&self, record: &ProductRecord) -> Result<(), StorageError> {
        let doc = serde_json::to_string(record)?;
        let key = Self::doc_key(&record.id);
        retry("index_upsert", &RetryConfig::query(), || {
            let mut conn = self.connection.clone();
            let doc = doc.clone();
            let key = key.clone();
            async move {
                let set: Result<(), redis::RedisError> = cmd("JSON.SET")
                    .arg(&key)
                    .arg("$")
                    .arg(&doc)
                    .query_async(&mut conn)
                    .await;
                set
            }
        })
        .await
        .map_err(|e: redis::RedisError| StorageError::Backend(e.to_string()))
    }

    async fn remove(&self, id: &str) -> Result<(), StorageError> {
        let key = Self::doc_key(id);
        retry("index_remove", &RetryConfig::query(), || {
            let mut conn = self.connection.clone();
            let key = key.clone();
            async move {
                let deleted: Result<i64, redis::RedisError> =
                    cmd("DEL").arg(&key).query_async(&mut conn).await;
                deleted
            }
        })
        .await
        .map(|_| ())
        .map_err(|e: redis::RedisError| StorageError::Backend(e.to_string()))
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchResults, StorageError> {
        let mut conn = self.connection.clone();
        let mut search = cmd("FT.SEARCH");
        search
            .arg(self.ft_index())
            .arg(RediSearchTranslator::filter(request));
        if let Some((field, direction)) = RediSearchTranslator::sort_by(&request.sort) {
            search.arg("SORTBY").arg(field).arg(direction);
        }
        search
            .arg("LIMIT")
            .arg(request.skip)
            .arg(request.limit)
            .arg("DIALECT")
            .arg(2);

        let reply: Value = search
            .query_async(&mut conn)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Self::parse_search_reply(&reply)
    }

    async fn count(&self) -> Result<usize, StorageError> {
        let mut conn = self.connection.clone();
        let reply: Value = cmd("FT.SEARCH")
            .arg(self.ft_index())
            .arg("*")
            .arg("LIMIT")
            .arg(0)
            .arg(0)
            .query_async(&mut conn)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        let Value::Array(items) = reply else {
            return Err(StorageError::Backend("unexpected FT.SEARCH reply".into()));
        };
        items
            .first()
            .map(|v| from_redis_value(v).map_err(|e| StorageError::Backend(e.to_string())))
            .unwrap_or(Ok(0))
    }
}
