// src/memory/store.rs — Persisted vector table (SQLite)

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::embeddings::{from_blob, to_blob};
use super::schema;

/// Persisted key → vector lookup backing the in-memory cache.
pub trait VectorStore: Send + Sync {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<f32>>>;

    /// Insert or wholesale-replace the vector stored under `key`.
    fn put(&self, key: &str, area_id: Option<&str>, vector: &[f32]) -> anyhow::Result<()>;

    /// All vectors tagged with `area_id`, in key order.
    fn load_area(&self, area_id: &str) -> anyhow::Result<Vec<(String, Vec<f32>)>>;
}

/// SQLite-backed vector store. The connection is serialized behind a mutex.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    pub fn new(conn: Connection) -> anyhow::Result<Self> {
        schema::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::new(conn)
    }

    /// Create an in-memory database (for testing and ephemeral runs).
    pub fn in_memory() -> anyhow::Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    fn conn(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("vector store connection poisoned"))
    }

    pub fn count(&self) -> anyhow::Result<usize> {
        let n: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM embeddings", [], |r| r.get(0))?;
        Ok(n as usize)
    }
}

impl VectorStore for SqliteVectorStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<f32>>> {
        let blob: Option<Vec<u8>> = self
            .conn()?
            .query_row(
                "SELECT vector FROM embeddings WHERE key = ?1",
                params![key],
                |r| r.get(0),
            )
            .optional()?;
        match blob {
            Some(bytes) => match from_blob(&bytes) {
                Some(v) => Ok(Some(v)),
                None => anyhow::bail!("corrupt vector blob for '{key}'"),
            },
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, area_id: Option<&str>, vector: &[f32]) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn()?.execute(
            "INSERT INTO embeddings (key, area_id, dim, vector, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(key) DO UPDATE SET
                area_id = excluded.area_id,
                dim = excluded.dim,
                vector = excluded.vector,
                updated_at = excluded.updated_at",
            params![key, area_id, vector.len() as i64, to_blob(vector), now],
        )?;
        Ok(())
    }

    fn load_area(&self, area_id: &str) -> anyhow::Result<Vec<(String, Vec<f32>)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT key, vector FROM embeddings WHERE area_id = ?1 ORDER BY key",
        )?;

        let rows = stmt.query_map(params![area_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
        })?;

        let mut result = Vec::new();
        for row in rows {
            let (key, bytes) = row?;
            // Skip corrupt rows rather than failing the whole preload
            if let Some(v) = from_blob(&bytes) {
                result.push((key, v));
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_replaces_wholesale() {
        let store = SqliteVectorStore::in_memory().unwrap();
        store.put("chain:a>b", Some("hall"), &[1.0, 2.0]).unwrap();
        store.put("chain:a>b", Some("hall"), &[3.0]).unwrap();
        assert_eq!(store.get("chain:a>b").unwrap(), Some(vec![3.0]));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_get_missing_key() {
        let store = SqliteVectorStore::in_memory().unwrap();
        assert!(store.get("nope").unwrap().is_none());
    }

    #[test]
    fn test_load_area_filters_and_orders() {
        let store = SqliteVectorStore::in_memory().unwrap();
        store.put("b", Some("kitchen"), &[0.5]).unwrap();
        store.put("a", Some("kitchen"), &[0.25]).unwrap();
        store.put("c", Some("garage"), &[1.0]).unwrap();
        store.put("d", None, &[1.0]).unwrap();

        let loaded = store.load_area("kitchen").unwrap();
        let keys: Vec<&str> = loaded.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
