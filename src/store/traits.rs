// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use async_trait::async_trait;
use thiserror::Error;

use crate::product::ProductRecord;
use crate::search::{SearchRequest, SearchResults};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("product not found: {0}")]
    NotFound(String),
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// System of record for products. The cache and the search index hold
/// disposable copies derived from this store.
#[async_trait]
pub trait PrimaryStore: Send + Sync {
    async fn insert(&self, record: ProductRecord) -> Result<(), StorageError>;
    async fn get(&self, id: &str) -> Result<Option<ProductRecord>, StorageError>;
    /// Replace an existing record. `NotFound` if the identity is absent.
    async fn update(&self, record: ProductRecord) -> Result<(), StorageError>;
    /// Returns whether a record was actually removed.
    async fn delete(&self, id: &str) -> Result<bool, StorageError>;
    async fn list(&self, skip: usize, limit: usize) -> Result<Vec<ProductRecord>, StorageError>;
    async fn list_by_category(
        &self,
        category: &str,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<ProductRecord>, StorageError>;
}

/// Derived search index over the product catalog.
///
/// `upsert` and `remove` are idempotent by identity: applying the same event
/// twice converges to the same index state, which is what makes at-least-once
/// delivery safe.
#[async_trait]
pub trait SearchIndexStore: Send + Sync {
    /// Create the index if it does not exist. Safe to call on every startup.
    async fn ensure_index(&self) -> Result<(), StorageError>;
    async fn upsert(&self, record: &ProductRecord) -> Result<(), StorageError>;
    /// Removing an absent document is not an error.
    async fn remove(&self, id: &str) -> Result<(), StorageError>;
    async fn search(&self, request: &SearchRequest) -> Result<SearchResults, StorageError>;
    async fn count(&self) -> Result<usize, StorageError>;
}
