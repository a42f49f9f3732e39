use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StoreError;

pub const STREAK_KEY: &str = "devtype-streak";
pub const LAST_PRACTICE_KEY: &str = "devtype-last-practice";
pub const PERSONAL_BEST_KEY: &str = "devtype-personal-best";
pub const DURATION_KEY: &str = "devtype-duration";
pub const LANGUAGE_KEY: &str = "devtype-language";
pub const MODE_KEY: &str = "devtype-mode";

/// Key-value port the session persists progress and settings through
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// Parse the value stored under `key`, reporting [`StoreError::Corrupt`] when
/// it does not parse.
pub fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T, StoreError> {
    raw.trim()
        .parse()
        .map_err(|_| StoreError::corrupt(key, raw))
}

/// Volatile store, useful for tests and embedding
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.values.remove(key);
        Ok(())
    }
}

/// SQLite-backed store holding a single `kv` table
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database at `path`, creating parent directories as needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;

        Ok(SqliteStore { conn })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO kv (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_value_reports_corrupt_values() {
        assert_eq!(parse_value::<u32>(STREAK_KEY, " 12 ").unwrap(), 12);
        match parse_value::<u32>(STREAK_KEY, "twelve") {
            Err(StoreError::Corrupt { key, value }) => {
                assert_eq!(key, STREAK_KEY);
                assert_eq!(value, "twelve");
            }
            other => panic!("expected corrupt value, got {other:?}"),
        }
    }

    #[test]
    fn memory_store_set_get_remove() {
        let mut store = MemoryStore::new();
        assert!(store.get(STREAK_KEY).unwrap().is_none());

        store.set(STREAK_KEY, "3").unwrap();
        assert_eq!(store.get(STREAK_KEY).unwrap().as_deref(), Some("3"));
        assert_eq!(store.len(), 1);

        store.remove(STREAK_KEY).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn sqlite_store_overwrites_existing_key() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.set(PERSONAL_BEST_KEY, "60").unwrap();
        store.set(PERSONAL_BEST_KEY, "80").unwrap();
        assert_eq!(store.get(PERSONAL_BEST_KEY).unwrap().as_deref(), Some("80"));

        store.remove(PERSONAL_BEST_KEY).unwrap();
        assert!(store.get(PERSONAL_BEST_KEY).unwrap().is_none());
    }

    #[test]
    fn sqlite_store_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("devtype.db");

        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.set(MODE_KEY, "practice").unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get(MODE_KEY).unwrap().as_deref(), Some("practice"));
    }
}
