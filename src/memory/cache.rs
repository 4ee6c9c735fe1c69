// src/memory/cache.rs — Bounded LRU cache of embedding vectors
//
// Vectors are shared as Arc<[f32]> and never edited in place: a refresh
// replaces the whole entry. Misses fall through to the optional backing
// store. Every write is best-effort; a poisoned lock or a failed store
// write degrades to a miss and never surfaces as an error.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use super::store::VectorStore;

/// Fixed per-entry bookkeeping cost on top of key and vector bytes.
const ENTRY_OVERHEAD_BYTES: usize = 64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub store_hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub failed_writes: u64,
    pub preloaded: u64,
}

struct Entry {
    vector: Arc<[f32]>,
    tick: u64,
    bytes: usize,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, Entry>,
    /// tick → key, oldest first
    recency: BTreeMap<u64, String>,
    tick: u64,
    used_bytes: usize,
    stats: CacheStats,
}

impl CacheInner {
    fn touch(&mut self, key: &str) -> Option<Arc<[f32]>> {
        self.tick += 1;
        let tick = self.tick;
        let entry = self.entries.get_mut(key)?;
        self.recency.remove(&entry.tick);
        entry.tick = tick;
        self.recency.insert(tick, key.to_string());
        Some(entry.vector.clone())
    }

    fn remove(&mut self, key: &str) {
        if let Some(old) = self.entries.remove(key) {
            self.recency.remove(&old.tick);
            self.used_bytes -= old.bytes;
        }
    }

    fn evict_oldest(&mut self) -> bool {
        let Some((_, key)) = self.recency.pop_first() else {
            return false;
        };
        if let Some(old) = self.entries.remove(&key) {
            self.used_bytes -= old.bytes;
            self.stats.evictions += 1;
        }
        true
    }

    fn insert(&mut self, key: &str, vector: Arc<[f32]>, capacity: usize) {
        let bytes = entry_bytes(key, vector.len());
        self.remove(key);
        if bytes > capacity {
            return;
        }
        while self.used_bytes + bytes > capacity {
            if !self.evict_oldest() {
                break;
            }
        }
        self.tick += 1;
        self.recency.insert(self.tick, key.to_string());
        self.entries.insert(
            key.to_string(),
            Entry {
                vector,
                tick: self.tick,
                bytes,
            },
        );
        self.used_bytes += bytes;
    }
}

fn entry_bytes(key: &str, dim: usize) -> usize {
    key.len() + dim * std::mem::size_of::<f32>() + ENTRY_OVERHEAD_BYTES
}

pub struct EmbeddingCache {
    inner: Mutex<CacheInner>,
    capacity_bytes: usize,
    store: Option<Arc<dyn VectorStore>>,
}

impl EmbeddingCache {
    pub fn new(capacity_mb: usize, store: Option<Arc<dyn VectorStore>>) -> Self {
        Self::with_capacity_bytes(capacity_mb.saturating_mul(1024 * 1024), store)
    }

    pub fn with_capacity_bytes(capacity_bytes: usize, store: Option<Arc<dyn VectorStore>>) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            capacity_bytes,
            store,
        }
    }

    fn lock(&self) -> Option<MutexGuard<'_, CacheInner>> {
        self.inner.lock().ok()
    }

    /// Look up a vector: memory first, then the backing store.
    pub fn get(&self, key: &str) -> Option<Arc<[f32]>> {
        if let Some(mut inner) = self.lock() {
            if let Some(v) = inner.touch(key) {
                inner.stats.hits += 1;
                return Some(v);
            }
        }

        let from_store = match &self.store {
            Some(store) => match store.get(key) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(key, "Vector store read failed: {e}");
                    None
                }
            },
            None => None,
        };

        let mut inner = self.lock()?;
        match from_store {
            Some(v) => {
                let v: Arc<[f32]> = Arc::from(v);
                inner.stats.store_hits += 1;
                inner.insert(key, v.clone(), self.capacity_bytes);
                Some(v)
            }
            None => {
                inner.stats.misses += 1;
                None
            }
        }
    }

    /// Cache a freshly computed vector and write it through to the store.
    pub fn insert(&self, key: &str, area_id: Option<&str>, vector: Vec<f32>) -> Arc<[f32]> {
        let v: Arc<[f32]> = Arc::from(vector);

        let stored = match &self.store {
            Some(store) => match store.put(key, area_id, &v) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(key, "Vector store write failed: {e}");
                    false
                }
            },
            None => true,
        };

        match self.lock() {
            Some(mut inner) => {
                if !stored {
                    inner.stats.failed_writes += 1;
                }
                inner.insert(key, v.clone(), self.capacity_bytes);
            }
            None => tracing::warn!(key, "Embedding cache lock poisoned, skipping write"),
        }
        v
    }

    /// Pull every stored vector for an area into memory in one query.
    pub fn preload_area(&self, area_id: &str) -> usize {
        let Some(store) = &self.store else {
            return 0;
        };
        let rows = match store.load_area(area_id) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(area_id, "Area preload failed: {e}");
                return 0;
            }
        };

        let Some(mut inner) = self.lock() else {
            return 0;
        };
        let n = rows.len();
        for (key, vector) in rows {
            inner.insert(&key, Arc::from(vector), self.capacity_bytes);
        }
        inner.stats.preloaded += n as u64;
        n
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock()
            .map(|inner| inner.entries.contains_key(key))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.lock().map(|inner| inner.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn used_bytes(&self) -> usize {
        self.lock().map(|inner| inner.used_bytes).unwrap_or(0)
    }

    pub fn capacity_bytes(&self) -> usize {
        self.capacity_bytes
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().map(|inner| inner.stats).unwrap_or_default()
    }
}
