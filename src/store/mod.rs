// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Storage backends: the primary record store and the derived search index.

mod memory;
mod redisearch;
mod traits;

pub use memory::{MemoryIndex, MemoryStore};
pub use redisearch::RediSearchIndex;
pub use traits::{PrimaryStore, SearchIndexStore, StorageError};
