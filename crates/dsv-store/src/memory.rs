use std::collections::BTreeMap;

use thiserror::Error;

use crate::traits::StateStore;

/// In-memory storage backend.
///
/// All data is stored in a `BTreeMap`, so keys enumerate in sorted order and
/// nothing touches disk. Ideal for testing and prototyping.
///
/// # Example
///
/// ```
/// use dsv_store::{MemoryStore, StateStore};
///
/// let mut store = MemoryStore::new();
/// store.put("v1", "s1", b"temp=22.5").unwrap();
///
/// let data = store.get("v1", "s1").unwrap().unwrap();
/// assert_eq!(data, b"temp=22.5");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    /// (namespace, key) -> value
    state: BTreeMap<(String, String), Vec<u8>>,
    /// Successful put/delete calls since creation.
    writes: u64,
}

/// Error type for the in-memory backend.
///
/// This backend never actually fails, but the trait requires an error type.
#[derive(Debug, Clone, Error)]
#[error("MemoryStore error: {0}")]
pub struct MemoryError(String);

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of entries across all namespaces.
    pub fn state_count(&self) -> usize {
        self.state.len()
    }

    /// Returns the number of `put` and `delete` calls that have been applied.
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    /// Lists the namespaces that currently hold at least one entry.
    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.keys().map(|(ns, _)| ns.clone()).collect();
        names.dedup();
        names
    }

    fn ns_key(namespace: &str, key: &str) -> (String, String) {
        (namespace.to_string(), key.to_string())
    }
}

impl StateStore for MemoryStore {
    type Error = MemoryError;

    fn put(&mut self, namespace: &str, key: &str, value: &[u8]) -> Result<(), Self::Error> {
        self.state
            .insert(Self::ns_key(namespace, key), value.to_vec());
        self.writes += 1;
        Ok(())
    }

    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.state.get(&Self::ns_key(namespace, key)).cloned())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), Self::Error> {
        self.state.remove(&Self::ns_key(namespace, key));
        self.writes += 1;
        Ok(())
    }

    fn list_keys(&self, namespace: &str) -> Result<Vec<String>, Self::Error> {
        // Entries are ordered by namespace first, so one namespace is a
        // contiguous run starting at `(namespace, "")`.
        let keys = self
            .state
            .range(Self::ns_key(namespace, "")..)
            .map(|((ns, key), _)| (ns, key))
            .take_while(|(ns, _)| *ns == namespace)
            .map(|(_, key)| key.clone())
            .collect();
        Ok(keys)
    }

    fn exists(&self, namespace: &str, key: &str) -> Result<bool, Self::Error> {
        Ok(self.state.contains_key(&Self::ns_key(namespace, key)))
    }
}
