//! Typed record access over one namespace of a [`StateStore`].

use core::marker::PhantomData;

use dsv_store::StateStore;
use log::debug;

use crate::error::{BoxError, Error, Result};
use crate::kind::Record;

/// Operations on the records of one kind.
///
/// Implemented by [`RecordStore`] for direct access and by
/// [`GatedStore`](crate::GatedStore) for access that waits for migrations.
pub trait RecordAccess<T> {
    /// Handle returned by [`RecordAccess::get`].
    type Entry<'a>: StoredRecord<T>
    where
        Self: 'a;

    /// Create the record at `key`. Fails with [`Error::AlreadyExists`] if one
    /// is there.
    fn begin(&mut self, key: &str, value: &T) -> Result<()>;

    /// Handle on the record at `key`. The record need not exist yet.
    fn get(&mut self, key: &str) -> Self::Entry<'_>;

    fn has(&self, key: &str) -> Result<bool>;

    /// Every record, in the store's key order.
    fn list(&self) -> Result<Vec<T>>;
}

/// Handle on a single stored record.
pub trait StoredRecord<T> {
    /// Decode the record. Fails with [`Error::NotFound`] if it is absent.
    fn read(&self) -> Result<T>;

    /// Read, modify in place, and write back.
    fn mutate<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut T) -> Result<(), BoxError>;

    /// Remove the record.
    fn end(self) -> Result<()>;
}

/// [`RecordAccess`] over `namespace` of a backing store.
pub struct RecordStore<S, T> {
    store: S,
    namespace: String,
    _record: PhantomData<fn() -> T>,
}

impl<S, T> RecordStore<S, T> {
    pub fn new(store: S, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            _record: PhantomData,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S: StateStore, T: Record> RecordAccess<T> for RecordStore<S, T> {
    type Entry<'a> = RecordEntry<'a, S, T>
    where
        Self: 'a;

    fn begin(&mut self, key: &str, value: &T) -> Result<()> {
        if self.has(key)? {
            return Err(Error::AlreadyExists(key.to_string()));
        }
        let bytes = value.encode().map_err(|source| Error::RecordEncode {
            key: key.to_string(),
            source,
        })?;
        write(&mut self.store, &self.namespace, key, &bytes)?;
        debug!("began {} record {key} in {}", T::KIND, self.namespace);
        Ok(())
    }

    fn get(&mut self, key: &str) -> Self::Entry<'_> {
        RecordEntry {
            store: &mut self.store,
            namespace: &self.namespace,
            key: key.to_string(),
            _record: PhantomData,
        }
    }

    fn has(&self, key: &str) -> Result<bool> {
        self.store
            .exists(&self.namespace, key)
            .map_err(|e| Error::Read {
                key: key.to_string(),
                source: e.into(),
            })
    }

    fn list(&self) -> Result<Vec<T>> {
        let keys = self
            .store
            .list_keys(&self.namespace)
            .map_err(|e| Error::Enumerate {
                namespace: self.namespace.clone(),
                source: e.into(),
            })?;
        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(record) = read(&self.store, &self.namespace, &key)? {
                records.push(record);
            }
        }
        Ok(records)
    }
}

/// Handle on one key of a [`RecordStore`].
pub struct RecordEntry<'a, S, T> {
    store: &'a mut S,
    namespace: &'a str,
    key: String,
    _record: PhantomData<fn() -> T>,
}

impl<S, T> RecordEntry<'_, S, T> {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl<S: StateStore, T: Record> StoredRecord<T> for RecordEntry<'_, S, T> {
    fn read(&self) -> Result<T> {
        read(&*self.store, self.namespace, &self.key)?
            .ok_or_else(|| Error::NotFound(self.key.clone()))
    }

    fn mutate<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut T) -> Result<(), BoxError>,
    {
        let mut record = self.read()?;
        f(&mut record).map_err(|source| Error::Mutate {
            key: self.key.clone(),
            source,
        })?;
        let bytes = record.encode().map_err(|source| Error::RecordEncode {
            key: self.key.clone(),
            source,
        })?;
        write(&mut *self.store, self.namespace, &self.key, &bytes)
    }

    fn end(self) -> Result<()> {
        let present = self
            .store
            .exists(self.namespace, &self.key)
            .map_err(|e| Error::Read {
                key: self.key.clone(),
                source: e.into(),
            })?;
        if !present {
            return Err(Error::NotFound(self.key));
        }
        self.store
            .delete(self.namespace, &self.key)
            .map_err(|e| Error::Write {
                key: self.key.clone(),
                source: e.into(),
            })?;
        debug!("ended record {} in {}", self.key, self.namespace);
        Ok(())
    }
}

fn read<S: StateStore, T: Record>(store: &S, namespace: &str, key: &str) -> Result<Option<T>> {
    let raw = store.get(namespace, key).map_err(|e| Error::Read {
        key: key.to_string(),
        source: e.into(),
    })?;
    raw.map(|bytes| {
        T::decode(&bytes).map_err(|source| Error::RecordDecode {
            key: key.to_string(),
            source,
        })
    })
    .transpose()
}

fn write<S: StateStore>(store: &mut S, namespace: &str, key: &str, bytes: &[u8]) -> Result<()> {
    store.put(namespace, key, bytes).map_err(|e| Error::Write {
        key: key.to_string(),
        source: e.into(),
    })
}
