// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Catalog search: query model, validation, and backend translation.

mod engine;
mod query;
mod redis_translator;
mod spec;

pub use engine::SearchService;
pub use query::{SearchRequest, SearchResults, Sort, SortDirection, SortField};
pub use redis_translator::RediSearchTranslator;
pub use spec::{QuerySpec, SearchError, MIN_LIMIT};
