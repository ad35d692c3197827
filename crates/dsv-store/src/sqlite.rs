//! SQLite backend using [`rusqlite`](https://docs.rs/rusqlite).
//!
//! All namespaces share one `WITHOUT ROWID` table keyed by
//! `(namespace, key)`, so `list_keys` is an ordered index scan. File-backed
//! databases run in WAL mode. Enable with `features = ["sqlite"]`.
//!
//! ```no_run
//! use dsv_store::{SqliteStore, StateStore};
//!
//! let mut store = SqliteStore::open("sensors.db").unwrap();
//! store.put("1", "s1", b"temp=22.5").unwrap();
//! assert_eq!(store.list_keys("1").unwrap(), vec!["s1"]);
//! ```

use std::path::Path;

use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use crate::traits::StateStore;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS dsv_records (
    namespace TEXT NOT NULL,
    key       TEXT NOT NULL,
    value     BLOB NOT NULL,
    PRIMARY KEY (namespace, key)
) WITHOUT ROWID;";

/// Error returned by [`SqliteStore`].
#[derive(Debug, Error)]
#[error("sqlite: {0}")]
pub struct SqliteError(#[from] rusqlite::Error);

/// A [`StateStore`] in one SQLite database.
///
/// Each call is a single statement, so every write is atomic for its key and
/// nothing more.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open or create the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SqliteError> {
        let conn = Connection::open(path.as_ref())?;
        // journal_mode returns the resulting mode as a row.
        let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        debug!("opened sqlite store {} ({mode})", path.as_ref().display());
        Self::init(conn)
    }

    /// A private in-memory database, gone when the store is dropped.
    pub fn open_in_memory() -> Result<Self, SqliteError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, SqliteError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }
}

impl StateStore for SqliteStore {
    type Error = SqliteError;

    fn put(&mut self, namespace: &str, key: &str, value: &[u8]) -> Result<(), SqliteError> {
        self.conn
            .prepare_cached(
                "INSERT INTO dsv_records (namespace, key, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT (namespace, key) DO UPDATE SET value = excluded.value",
            )?
            .execute(params![namespace, key, value])?;
        Ok(())
    }

    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, SqliteError> {
        let value = self
            .conn
            .prepare_cached("SELECT value FROM dsv_records WHERE namespace = ?1 AND key = ?2")?
            .query_row(params![namespace, key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), SqliteError> {
        self.conn
            .prepare_cached("DELETE FROM dsv_records WHERE namespace = ?1 AND key = ?2")?
            .execute(params![namespace, key])?;
        Ok(())
    }

    fn list_keys(&self, namespace: &str) -> Result<Vec<String>, SqliteError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT key FROM dsv_records WHERE namespace = ?1 ORDER BY key")?;
        let keys = stmt
            .query_map(params![namespace], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    fn exists(&self, namespace: &str, key: &str) -> Result<bool, SqliteError> {
        let found = self
            .conn
            .prepare_cached("SELECT 1 FROM dsv_records WHERE namespace = ?1 AND key = ?2")?
            .exists(params![namespace, key])?;
        Ok(found)
    }
}
