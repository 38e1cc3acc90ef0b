// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! In-memory backends, used in tests and as a fallback when no Redis URL is
//! configured.
//!
//! [`MemoryIndex`] interprets the same [`SearchRequest`] the RediSearch
//! backend translates, with a simple relevance model: a document matches the
//! text filter when any query term occurs in its name or description, and
//! name occurrences score double.

use async_trait::async_trait;
use dashmap::DashMap;

use super::traits::{PrimaryStore, SearchIndexStore, StorageError};
use crate::product::ProductRecord;
use crate::search::{SearchRequest, SearchResults, SortDirection, SortField};

/// DashMap-backed system of record.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<String, ProductRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PrimaryStore for MemoryStore {
    async fn insert(&self, record: ProductRecord) -> Result<(), StorageError> {
        self.records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<ProductRecord>, StorageError> {
        Ok(self.records.get(id).map(|entry| entry.clone()))
    }

    async fn update(&self, record: ProductRecord) -> Result<(), StorageError> {
        if !self.records.contains_key(&record.id) {
            return Err(StorageError::NotFound(record.id));
        }
        self.records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self.records.remove(id).is_some())
    }

    async fn list(&self, skip: usize, limit: usize) -> Result<Vec<ProductRecord>, StorageError> {
        let mut records: Vec<ProductRecord> =
            self.records.iter().map(|entry| entry.clone()).collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records.into_iter().skip(skip).take(limit).collect())
    }

    async fn list_by_category(
        &self,
        category: &str,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<ProductRecord>, StorageError> {
        let mut records: Vec<ProductRecord> = self
            .records
            .iter()
            .filter(|entry| entry.category.as_deref() == Some(category))
            .map(|entry| entry.clone())
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records.into_iter().skip(skip).take(limit).collect())
    }
}

/// In-memory search index.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    documents: DashMap<String, ProductRecord>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn score(record: &ProductRecord, terms: &[String]) -> f64 {
        let name = record.name.to_lowercase();
        let description = record
            .description
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_default();

        let mut score = 0.0;
        for term in terms {
            if name.contains(term.as_str()) {
                score += 2.0;
            }
            if description.contains(term.as_str()) {
                score += 1.0;
            }
        }
        score
    }

    fn matches_filters(record: &ProductRecord, request: &SearchRequest) -> bool {
        if let Some(min) = request.min_price {
            if record.price < min {
                return false;
            }
        }
        if let Some(max) = request.max_price {
            if record.price > max {
                return false;
            }
        }
        if let Some(ref category) = request.category {
            if record.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl SearchIndexStore for MemoryIndex {
    async fn ensure_index(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn upsert(&self, record: &ProductRecord) -> Result<(), StorageError> {
        self.documents.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), StorageError> {
        self.documents.remove(id);
        Ok(())
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchResults, StorageError> {
        let terms: Vec<String> = request
            .text
            .as_deref()
            .map(|text| text.split_whitespace().map(str::to_lowercase).collect())
            .unwrap_or_default();

        let mut scored: Vec<(f64, ProductRecord)> = self
            .documents
            .iter()
            .filter(|entry| Self::matches_filters(entry.value(), request))
            .filter_map(|entry| {
                if terms.is_empty() {
                    Some((0.0, entry.clone()))
                } else {
                    let score = Self::score(entry.value(), &terms);
                    (score > 0.0).then(|| (score, entry.clone()))
                }
            })
            .collect();

        scored.sort_by(|(score_a, a), (score_b, b)| {
            let ordering = match request.sort.field {
                // Ties broken by id so pagination is stable
                SortField::Relevance => score_a.total_cmp(score_b),
                SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
                SortField::Price => a.price.total_cmp(&b.price),
                SortField::Quantity => a.quantity.cmp(&b.quantity),
            };
            let ordering = match request.sort.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            ordering.then_with(|| a.id.cmp(&b.id))
        });

        let total = scored.len();
        let items = scored
            .into_iter()
            .skip(request.skip)
            .take(request.limit)
            .map(|(_, record)| record)
            .collect();
        Ok(SearchResults { total, items })
    }

    async fn count(&self) -> Result<usize, StorageError> {
        Ok(self.documents.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{QuerySpec, Sort};

    fn record(id: &str, name: &str, price: f64, category: &str) -> ProductRecord {
        ProductRecord {
            id: id.to_string(),
            name: name.to_string(),
            description: Some(format!("{} for everyday use", name)),
            price,
            category: Some(category.to_string()),
            tags: vec![],
            quantity: 10,
            images: vec![],
        }
    }

    async fn seeded_index() -> MemoryIndex {
        let index = MemoryIndex::new();
        index
            .upsert(&record("P1", "Blue Widget", 9.99, "tools"))
            .await
            .unwrap();
        index
            .upsert(&record("P2", "Red Widget", 14.99, "tools"))
            .await
            .unwrap();
        index
            .upsert(&record("P3", "Garden Hose", 24.99, "garden"))
            .await
            .unwrap();
        index
    }

    fn request(q: &str) -> SearchRequest {
        QuerySpec {
            q: Some(q.to_string()),
            ..Default::default()
        }
        .into_request(10, 100)
        .unwrap()
    }

    #[tokio::test]
    async fn test_primary_store_crud() {
        let store = MemoryStore::new();
        store
            .insert(record("P1", "Widget", 1.0, "tools"))
            .await
            .unwrap();
        assert!(store.get("P1").await.unwrap().is_some());

        let mut updated = record("P1", "Widget", 2.0, "tools");
        updated.price = 2.0;
        store.update(updated).await.unwrap();
        assert_eq!(store.get("P1").await.unwrap().unwrap().price, 2.0);

        assert!(store.delete("P1").await.unwrap());
        assert!(!store.delete("P1").await.unwrap());
        assert!(store.get("P1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_record_fails() {
        let store = MemoryStore::new();
        let err = store
            .update(record("ghost", "Nope", 1.0, "tools"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(id) if id == "ghost"));
    }

    #[tokio::test]
    async fn test_list_by_category() {
        let store = MemoryStore::new();
        store.insert(record("P1", "A", 1.0, "tools")).await.unwrap();
        store.insert(record("P2", "B", 1.0, "garden")).await.unwrap();
        store.insert(record("P3", "C", 1.0, "tools")).await.unwrap();

        let tools = store.list_by_category("tools", 0, 100).await.unwrap();
        assert_eq!(tools.len(), 2);
        assert!(tools.iter().all(|r| r.category.as_deref() == Some("tools")));

        // Pagination applies after the category filter
        let page = store.list_by_category("tools", 1, 100).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(store.list(0, 2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_text_match_with_total() {
        let index = seeded_index().await;
        let results = index.search(&request("widget")).await.unwrap();
        assert_eq!(results.total, 2);
        assert_eq!(results.items.len(), 2);
    }

    #[tokio::test]
    async fn test_name_match_outranks_description_match() {
        let index = seeded_index().await;
        index
            .upsert(&ProductRecord {
                id: "P4".to_string(),
                name: "Spanner".to_string(),
                description: Some("pairs well with any widget".to_string()),
                price: 5.0,
                category: Some("tools".to_string()),
                tags: vec![],
                quantity: 1,
                images: vec![],
            })
            .await
            .unwrap();

        let results = index.search(&request("widget")).await.unwrap();
        assert_eq!(results.total, 3);
        // Name matches first, description-only match last
        assert_eq!(results.items.last().unwrap().id, "P4");
    }

    #[tokio::test]
    async fn test_filters_combine() {
        let index = seeded_index().await;
        let mut req = request("widget");
        req.min_price = Some(10.0);
        let results = index.search(&req).await.unwrap();
        assert_eq!(results.total, 1);
        assert_eq!(results.items[0].id, "P2");
    }

    #[tokio::test]
    async fn test_category_without_text() {
        let index = seeded_index().await;
        let req = QuerySpec {
            category: Some("garden".to_string()),
            ..Default::default()
        }
        .into_request(10, 100)
        .unwrap();
        let results = index.search(&req).await.unwrap();
        assert_eq!(results.total, 1);
        assert_eq!(results.items[0].id, "P3");
    }

    #[tokio::test]
    async fn test_sort_by_price() {
        let index = seeded_index().await;
        let mut req = request("widget");
        req.sort = Sort {
            field: SortField::Price,
            direction: SortDirection::Desc,
        };
        let results = index.search(&req).await.unwrap();
        assert_eq!(results.items[0].id, "P2");
        assert_eq!(results.items[1].id, "P1");
    }

    #[tokio::test]
    async fn test_pagination_window() {
        let index = seeded_index().await;
        let mut req = request("widget");
        req.sort = Sort {
            field: SortField::Price,
            direction: SortDirection::Asc,
        };
        req.limit = 1;
        req.skip = 1;
        let results = index.search(&req).await.unwrap();
        // Total reflects all matches, items only the page
        assert_eq!(results.total, 2);
        assert_eq!(results.items.len(), 1);
        assert_eq!(results.items[0].id, "P2");
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let index = seeded_index().await;
        let doc = record("P1", "Blue Widget", 9.99, "tools");
        index.upsert(&doc).await.unwrap();
        index.upsert(&doc).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_remove_absent_is_ok() {
        let index = seeded_index().await;
        index.remove("P1").await.unwrap();
        index.remove("P1").await.unwrap();
        assert_eq!(index.count().await.unwrap(), 2);
    }
}
