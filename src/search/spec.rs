// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Raw search parameters as they arrive from a caller.
//!
//! [`QuerySpec`] is the unvalidated surface: every field optional, sort as a
//! `field:direction` string. Validation happens once, in
//! [`QuerySpec::into_request`], which either yields a [`SearchRequest`] or a
//! client error the caller can map to a 400.

use serde::Deserialize;
use thiserror::Error;

use super::query::{SearchRequest, Sort, SortDirection, SortField};

pub const MIN_LIMIT: usize = 1;

#[derive(Error, Debug, PartialEq)]
pub enum SearchError {
    /// No filter at all: refuse rather than return the whole catalog.
    #[error("at least one of q, min_price, max_price, category is required")]
    NoFilters,
    #[error("unknown sort field in directive '{0}'")]
    InvalidSort(String),
    #[error("{field} must be non-negative, got {value}")]
    NegativePrice { field: &'static str, value: f64 },
    #[error("limit must be between {MIN_LIMIT} and {max}, got {got}")]
    LimitOutOfRange { got: usize, max: usize },
    #[error("search backend error: {0}")]
    Backend(String),
}

impl SearchError {
    /// Caller-correctable errors, as opposed to backend failures.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, SearchError::Backend(_))
    }
}

/// Unvalidated search parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuerySpec {
    /// Free-text query.
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    /// `field:direction`, e.g. `price:asc`. No directive means relevance,
    /// best match first; a missing or unrecognized direction means
    /// descending.
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub skip: Option<usize>,
}

impl QuerySpec {
    /// Validate and resolve into a [`SearchRequest`].
    ///
    /// Blank-only text and empty strings count as absent. Price bounds must
    /// be non-negative, and at least one filter must survive normalization.
    pub fn into_request(self, default_limit: usize, max_limit: usize) -> Result<SearchRequest, SearchError> {
        let text = self.q.and_then(normalize);
        let category = self.category.and_then(normalize);

        for (field, bound) in [("min_price", self.min_price), ("max_price", self.max_price)] {
            if let Some(value) = bound {
                if value < 0.0 {
                    return Err(SearchError::NegativePrice { field, value });
                }
            }
        }

        let limit = self.limit.unwrap_or(default_limit);
        if limit < MIN_LIMIT || limit > max_limit {
            return Err(SearchError::LimitOutOfRange {
                got: limit,
                max: max_limit,
            });
        }

        let sort = match self.sort.as_deref().map(str::trim) {
            None | Some("") => Sort::default(),
            Some(directive) => parse_sort(directive)?,
        };

        let request = SearchRequest {
            text,
            min_price: self.min_price,
            max_price: self.max_price,
            category,
            sort,
            limit,
            skip: self.skip.unwrap_or(0),
        };
        if !request.has_filters() {
            return Err(SearchError::NoFilters);
        }
        Ok(request)
    }
}

fn normalize(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_sort(directive: &str) -> Result<Sort, SearchError> {
    let (field, direction) = match directive.split_once(':') {
        Some((field, direction)) => (field, Some(direction)),
        None => (directive, None),
    };
    let field = match field {
        "relevance" | "_score" => SortField::Relevance,
        "name" => SortField::Name,
        "price" => SortField::Price,
        "quantity" => SortField::Quantity,
        _ => return Err(SearchError::InvalidSort(directive.to_string())),
    };
    // A missing or unrecognized direction falls back to descending
    let direction = match direction {
        Some("asc") => SortDirection::Asc,
        _ => SortDirection::Desc,
    };
    Ok(Sort { field, direction })
}
