// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Write-side catalog service.
//!
//! Every mutation follows the same shape: validate, commit to the primary
//! store, then schedule cache maintenance and event publication in the
//! background. The caller's response never waits on the cache or the broker,
//! and a failure in either leaves the system of record untouched.
//!
//! Reads are cache-aside: cache hit wins, a miss (or a cache backend
//! failure, which degrades to a miss) falls through to the primary store and
//! refills the cache in the background.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::ProductCache;
use crate::event::ChangeOp;
use crate::metrics;
use crate::product::{NewProduct, ProductPatch, ProductRecord, ValidationError};
use crate::publisher::EventPublisher;
use crate::store::{PrimaryStore, StorageError};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("product not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub struct CatalogService {
    store: Arc<dyn PrimaryStore>,
    cache: Arc<dyn ProductCache>,
    publisher: EventPublisher,
}

impl CatalogService {
    pub fn new(
        store: Arc<dyn PrimaryStore>,
        cache: Arc<dyn ProductCache>,
        publisher: EventPublisher,
    ) -> Self {
        Self {
            store,
            cache,
            publisher,
        }
    }

    /// Create a product: assign an identity, commit, then fan out.
    pub async fn create(&self, draft: NewProduct) -> Result<ProductRecord, CatalogError> {
        draft.validate()?;
        let record = draft.into_record(Uuid::new_v4().to_string());
        self.store.insert(record.clone()).await?;
        debug!(product_id = %record.id, "product created");

        self.spawn_cache_set(record.clone());
        self.publisher.spawn_publish(ChangeOp::Created, record.clone());
        Ok(record)
    }

    /// Fetch a product, cache first.
    pub async fn get(&self, id: &str) -> Result<ProductRecord, CatalogError> {
        match self.cache.get(id).await {
            Ok(Some(record)) => {
                metrics::record_cache_lookup("hit");
                return Ok(record);
            }
            Ok(None) => metrics::record_cache_lookup("miss"),
            Err(e) => {
                // Cache trouble never fails a read
                warn!(product_id = %id, error = %e, "cache lookup failed, treating as miss");
                metrics::record_cache_lookup("degraded");
            }
        }

        let record = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))?;
        self.spawn_cache_set(record.clone());
        Ok(record)
    }

    /// Apply a sparse patch over the stored record.
    pub async fn update(&self, id: &str, patch: ProductPatch) -> Result<ProductRecord, CatalogError> {
        patch.validate()?;
        let existing = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))?;
        let updated = patch.apply(existing);
        self.store.update(updated.clone()).await?;
        debug!(product_id = %id, "product updated");

        self.spawn_cache_set(updated.clone());
        self.publisher.spawn_publish(ChangeOp::Updated, updated.clone());
        Ok(updated)
    }

    /// Delete a product. The event carries the last-known record so
    /// downstream consumers see what was removed.
    pub async fn delete(&self, id: &str) -> Result<(), CatalogError> {
        let existing = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))?;
        if !self.store.delete(id).await? {
            return Err(CatalogError::NotFound(id.to_string()));
        }
        debug!(product_id = %id, "product deleted");

        self.spawn_cache_invalidate(id.to_string());
        self.publisher.spawn_publish(ChangeOp::Deleted, existing);
        Ok(())
    }

    pub async fn list(&self, skip: usize, limit: usize) -> Result<Vec<ProductRecord>, CatalogError> {
        Ok(self.store.list(skip, limit).await?)
    }

    pub async fn list_by_category(
        &self,
        category: &str,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<ProductRecord>, CatalogError> {
        Ok(self.store.list_by_category(category, skip, limit).await?)
    }

    fn spawn_cache_set(&self, record: ProductRecord) {
        let cache = Arc::clone(&self.cache);
        tokio::spawn(async move {
            match cache.set(&record).await {
                Ok(()) => metrics::record_cache_write("set", "success"),
                Err(e) => {
                    warn!(product_id = %record.id, error = %e, "cache write failed");
                    metrics::record_cache_write("set", "error");
                }
            }
        });
    }

    fn spawn_cache_invalidate(&self, id: String) {
        let cache = Arc::clone(&self.cache);
        tokio::spawn(async move {
            match cache.invalidate(&id).await {
                Ok(()) => metrics::record_cache_write("invalidate", "success"),
                Err(e) => {
                    warn!(product_id = %id, error = %e, "cache invalidation failed");
                    metrics::record_cache_write("invalidate", "error");
                }
            }
        });
    }
}
