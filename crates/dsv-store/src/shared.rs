use std::sync::{Arc, Mutex, MutexGuard};

use crate::traits::StateStore;

/// A cloneable handle to one backend.
///
/// Clones share the same underlying store, so a migration runner and a
/// record accessor can both operate on it. Every call holds the lock only for
/// the duration of that single operation. A poisoned lock is recovered: the
/// backend's own writes are single-key and leave no torn state behind.
///
/// ```
/// use dsv_store::{MemoryStore, SharedStore, StateStore};
///
/// let mut a = SharedStore::new(MemoryStore::new());
/// let b = a.clone();
/// a.put("ns", "k", b"v").unwrap();
/// assert!(b.exists("ns", "k").unwrap());
/// ```
#[derive(Debug, Default)]
pub struct SharedStore<S> {
    inner: Arc<Mutex<S>>,
}

impl<S> Clone for SharedStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> SharedStore<S> {
    /// Wrap a backend.
    pub fn new(store: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// Lock the backend for direct access.
    pub fn lock(&self) -> MutexGuard<'_, S> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<S: StateStore> StateStore for SharedStore<S> {
    type Error = S::Error;

    fn put(&mut self, namespace: &str, key: &str, value: &[u8]) -> Result<(), Self::Error> {
        self.lock().put(namespace, key, value)
    }

    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, Self::Error> {
        self.lock().get(namespace, key)
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), Self::Error> {
        self.lock().delete(namespace, key)
    }

    fn list_keys(&self, namespace: &str) -> Result<Vec<String>, Self::Error> {
        self.lock().list_keys(namespace)
    }

    fn exists(&self, namespace: &str, key: &str) -> Result<bool, Self::Error> {
        self.lock().exists(namespace, key)
    }
}
