// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Validated search request, independent of any backend syntax.

use serde::Serialize;

use crate::product::ProductRecord;

/// Fields a result set can be ordered by.
///
/// `Name` orders by the non-tokenized variant of the product name, so
/// "Blue Widget" sorts as one string rather than by its best-scoring term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Relevance,
    Name,
    Price,
    Quantity,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Relevance => "relevance",
            SortField::Name => "name",
            SortField::Price => "price",
            SortField::Quantity => "quantity",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// A sort directive. The default is relevance, best match first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for Sort {
    fn default() -> Self {
        Self {
            field: SortField::Relevance,
            direction: SortDirection::Desc,
        }
    }
}

/// A fully validated search request.
///
/// Constructed from a [`QuerySpec`](super::QuerySpec); by the time a value of
/// this type exists, at least one filter is present and the pagination window
/// is in range.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Free-text query matched against name (boosted) and description.
    pub text: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// Exact category match.
    pub category: Option<String>,
    pub sort: Sort,
    pub limit: usize,
    pub skip: usize,
}

impl SearchRequest {
    pub fn has_filters(&self) -> bool {
        self.text.is_some()
            || self.min_price.is_some()
            || self.max_price.is_some()
            || self.category.is_some()
    }
}

/// A page of search results with the total match count.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    /// Total matches across all pages, not the page size.
    pub total: usize,
    pub items: Vec<ProductRecord>,
}

impl SearchResults {
    pub fn empty() -> Self {
        Self {
            total: 0,
            items: Vec::new(),
        }
    }
}
