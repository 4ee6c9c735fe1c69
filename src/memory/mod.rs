// src/memory/mod.rs — Embedding memory: vector math, LRU cache, persisted table

pub mod cache;
pub mod embeddings;
pub mod schema;
pub mod store;

use std::path::Path;
use std::sync::Arc;

use crate::infra::config::{DiscoveryConfig, StoreConfig};
use crate::infra::paths;

pub use cache::{CacheStats, EmbeddingCache};
pub use store::{SqliteVectorStore, VectorStore};

/// Open the configured backing store. Failure to open degrades to a cache
/// without persistence rather than failing the run.
pub fn open_vector_store(config: &StoreConfig) -> Option<Arc<dyn VectorStore>> {
    if !config.enabled {
        return None;
    }

    let opened = match config.path.as_deref() {
        Some(":memory:") => SqliteVectorStore::in_memory(),
        Some(path) => SqliteVectorStore::open(Path::new(path)),
        None => SqliteVectorStore::open(&paths::vector_store_path()),
    };

    match opened {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            tracing::warn!("Vector store unavailable, continuing without persistence: {e}");
            None
        }
    }
}

/// Build the run's cache sized from the discovery config.
pub fn build_cache(discovery: &DiscoveryConfig, store: &StoreConfig) -> EmbeddingCache {
    EmbeddingCache::new(discovery.embedding_cache_mb, open_vector_store(store))
}
