// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Read-side search service: validation, execution, instrumentation.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use super::query::SearchResults;
use super::spec::{QuerySpec, SearchError};
use crate::config::PipelineConfig;
use crate::metrics;
use crate::store::SearchIndexStore;

/// Executes validated queries against the search index.
pub struct SearchService {
    index: Arc<dyn SearchIndexStore>,
    backend_label: &'static str,
    default_limit: usize,
    max_limit: usize,
}

impl SearchService {
    pub fn new(
        index: Arc<dyn SearchIndexStore>,
        backend_label: &'static str,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            index,
            backend_label,
            default_limit: config.default_search_limit,
            max_limit: config.max_search_limit,
        }
    }

    /// Validate `spec` and run it.
    ///
    /// Client errors (no filters, unknown sort field, negative price bound,
    /// limit out of range) surface
    /// before the index is touched; only backend failures count against the
    /// error metric.
    pub async fn search(&self, spec: QuerySpec) -> Result<SearchResults, SearchError> {
        let request = spec.into_request(self.default_limit, self.max_limit)?;
        let start = Instant::now();

        let outcome = self.index.search(&request).await;
        metrics::record_search_latency(self.backend_label, start.elapsed());
        match outcome {
            Ok(results) => {
                metrics::record_search_query(self.backend_label, "success");
                metrics::record_search_results(results.items.len());
                debug!(
                    total = results.total,
                    returned = results.items.len(),
                    sort = %request.sort.field.as_str(),
                    "search executed"
                );
                Ok(results)
            }
            Err(e) => {
                metrics::record_search_query(self.backend_label, "error");
                Err(SearchError::Backend(e.to_string()))
            }
        }
    }
}
