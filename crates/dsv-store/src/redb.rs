//! Pure-Rust backend using [`redb`](https://docs.rs/redb).
//!
//! Each namespace is its own redb table (`dsv:<namespace>`), so namespaces
//! never share a key range and a namespace that was never written reads as
//! empty. Enable with `features = ["redb"]`.
//!
//! ```no_run
//! use dsv_store::{RedbStore, StateStore};
//!
//! let mut store = RedbStore::open("sensors.redb").unwrap();
//! store.put("1", "s1", b"hello").unwrap();
//! ```

use std::path::Path;

use log::debug;
use redb::{Database, TableDefinition, TableError};
use thiserror::Error;

use crate::traits::StateStore;

/// Error returned by [`RedbStore`].
#[derive(Debug, Error)]
#[error("redb: {0}")]
pub struct RedbError(#[from] redb::Error);

fn db_err(e: impl Into<redb::Error>) -> RedbError {
    RedbError(e.into())
}

fn table_name(namespace: &str) -> String {
    format!("dsv:{namespace}")
}

/// A [`StateStore`] in one redb database file.
///
/// Every write commits its own transaction.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open or create the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RedbError> {
        let db = Database::create(path.as_ref()).map_err(db_err)?;
        debug!("opened redb store {}", path.as_ref().display());
        Ok(Self { db })
    }

    /// A database that lives only in memory.
    pub fn open_in_memory() -> Result<Self, RedbError> {
        let db = Database::builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())
            .map_err(db_err)?;
        Ok(Self { db })
    }
}

impl StateStore for RedbStore {
    type Error = RedbError;

    fn put(&mut self, namespace: &str, key: &str, value: &[u8]) -> Result<(), RedbError> {
        let name = table_name(namespace);
        let def: TableDefinition<&str, &[u8]> = TableDefinition::new(&name);
        let txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = txn.open_table(def).map_err(db_err)?;
            table.insert(key, value).map_err(db_err)?;
        }
        txn.commit().map_err(db_err)
    }

    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, RedbError> {
        let name = table_name(namespace);
        let def: TableDefinition<&str, &[u8]> = TableDefinition::new(&name);
        let txn = self.db.begin_read().map_err(db_err)?;
        let table = match txn.open_table(def) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(db_err(e)),
        };
        let value = table.get(key).map_err(db_err)?;
        Ok(value.map(|guard| guard.value().to_vec()))
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), RedbError> {
        let name = table_name(namespace);
        let def: TableDefinition<&str, &[u8]> = TableDefinition::new(&name);
        let txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = txn.open_table(def).map_err(db_err)?;
            table.remove(key).map_err(db_err)?;
        }
        txn.commit().map_err(db_err)
    }

    fn list_keys(&self, namespace: &str) -> Result<Vec<String>, RedbError> {
        let name = table_name(namespace);
        let def: TableDefinition<&str, &[u8]> = TableDefinition::new(&name);
        let txn = self.db.begin_read().map_err(db_err)?;
        let table = match txn.open_table(def) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(db_err(e)),
        };
        let mut keys = Vec::new();
        for entry in table.range::<&str>(..).map_err(db_err)? {
            let (key, _) = entry.map_err(db_err)?;
            keys.push(key.value().to_string());
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_delete() {
        let mut store = RedbStore::open_in_memory().unwrap();
        assert_eq!(store.get("1", "k").unwrap(), None);

        store.put("1", "k", b"v").unwrap();
        assert_eq!(store.get("1", "k").unwrap(), Some(b"v".to_vec()));
        assert!(store.exists("1", "k").unwrap());

        store.delete("1", "k").unwrap();
        assert!(!store.exists("1", "k").unwrap());
    }

    #[test]
    fn unwritten_namespace_is_empty() {
        let store = RedbStore::open_in_memory().unwrap();
        assert!(store.list_keys("never").unwrap().is_empty());
    }

    #[test]
    fn namespaces_sharing_a_prefix_stay_apart() {
        let mut store = RedbStore::open_in_memory().unwrap();
        store.put("a", "k1", b"1").unwrap();
        store.put("a\0b", "k2", b"2").unwrap();
        store.put("ab", "k3", b"3").unwrap();

        assert_eq!(store.list_keys("a").unwrap(), vec!["k1"]);
        assert_eq!(store.list_keys("a\0b").unwrap(), vec!["k2"]);
        assert_eq!(store.get("a", "k2").unwrap(), None);
    }

    #[test]
    fn list_keys_is_sorted() {
        let mut store = RedbStore::open_in_memory().unwrap();
        for key in ["b", "", "c", "a"] {
            store.put("1", key, b"").unwrap();
        }
        assert_eq!(store.list_keys("1").unwrap(), vec!["", "a", "b", "c"]);
    }

    #[test]
    fn reopen_keeps_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.redb");
        {
            let mut store = RedbStore::open(&path).unwrap();
            store.put("versions", "current", b"3").unwrap();
        }
        let store = RedbStore::open(&path).unwrap();
        assert_eq!(
            store.get("versions", "current").unwrap(),
            Some(b"3".to_vec())
        );
    }
}
