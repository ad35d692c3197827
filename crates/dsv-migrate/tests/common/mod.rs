//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashSet;

use dsv_migrate::{record, BoxError, Migration, MigrationBuilder, Record, VersionedMigrationList};
use dsv_store::{MemoryStore, StateStore};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ── Record kinds ─────────────────────────────────────────────────────

#[record(kind = "counter.v1")]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct V1 {
    pub val: i64,
}

#[record(kind = "counter.v2")]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct V2 {
    pub val: i64,
}

#[record(kind = "counter.v3")]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct V3 {
    pub val: i64,
    pub label: String,
}

// ── Migrations ───────────────────────────────────────────────────────

/// `val * 10`, reversed by `val / 10`.
pub fn times_ten() -> Migration {
    MigrationBuilder::new(|v: V1| Ok::<_, BoxError>(V2 { val: v.val * 10 }))
        .reversible(|v: V2| Ok::<_, BoxError>(V1 { val: v.val / 10 }))
        .build()
        .expect("times_ten builds")
}

/// Adds a label, reversed by dropping it.
pub fn labelled() -> Migration {
    MigrationBuilder::new(|v: V2| {
        Ok::<_, BoxError>(V3 {
            label: format!("#{}", v.val),
            val: v.val,
        })
    })
    .reversible(|v: V3| Ok::<_, BoxError>(V2 { val: v.val }))
    .build()
    .expect("labelled builds")
}

/// Adds a label with no way back.
pub fn labelled_one_way() -> Migration {
    MigrationBuilder::new(|v: V2| {
        Ok::<_, BoxError>(V3 {
            label: String::new(),
            val: v.val,
        })
    })
    .build()
    .expect("labelled_one_way builds")
}

/// `"1" -> "2" -> "3"`, fully reversible.
pub fn chain() -> VersionedMigrationList {
    VersionedMigrationList::new("1")
        .step("2", times_ten())
        .step("3", labelled())
}

/// Store with `{a: 1, b: 2, c: 3}` of kind V1 in namespace `"1"`.
pub fn seeded() -> MemoryStore {
    let mut store = MemoryStore::new();
    seed(&mut store, "1", &[("a", 1), ("b", 2), ("c", 3)]);
    store
}

pub fn seed<S: StateStore>(store: &mut S, namespace: &str, values: &[(&str, i64)]) {
    for (key, val) in values {
        store
            .put(namespace, key, &V1 { val: *val }.encode().unwrap())
            .unwrap();
    }
}

pub fn read<S: StateStore, T: Record>(store: &S, namespace: &str, key: &str) -> T {
    let bytes = store
        .get(namespace, key)
        .unwrap()
        .unwrap_or_else(|| panic!("{namespace}/{key} missing"));
    T::decode(&bytes).unwrap()
}

// ── A store that fails on demand ─────────────────────────────────────

#[derive(Debug, Error)]
#[error("injected failure: {0}")]
pub struct Injected(pub String);

/// Wraps a [`MemoryStore`], failing the first `put` or `get` of each armed
/// `(namespace, key)` and the first `list_keys` of each armed namespace.
/// Counts the reads and writes that reach it.
#[derive(Debug, Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    armed: HashSet<(String, String)>,
    armed_gets: RefCell<HashSet<(String, String)>>,
    armed_lists: RefCell<HashSet<String>>,
    pub writes: usize,
    pub reads: Cell<usize>,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    /// The next `put` to `namespace/key` fails.
    pub fn fail_put_once(&mut self, namespace: &str, key: &str) {
        self.armed.insert((namespace.to_string(), key.to_string()));
    }

    /// The next `get` of `namespace/key` fails.
    pub fn fail_get_once(&mut self, namespace: &str, key: &str) {
        self.armed_gets
            .get_mut()
            .insert((namespace.to_string(), key.to_string()));
    }

    /// The next `list_keys` of `namespace` fails.
    pub fn fail_list_once(&mut self, namespace: &str) {
        self.armed_lists.get_mut().insert(namespace.to_string());
    }
}

impl StateStore for FlakyStore {
    type Error = Injected;

    fn put(&mut self, namespace: &str, key: &str, value: &[u8]) -> Result<(), Injected> {
        self.writes += 1;
        if self.armed.remove(&(namespace.to_string(), key.to_string())) {
            return Err(Injected(format!("put {namespace}/{key}")));
        }
        self.inner
            .put(namespace, key, value)
            .map_err(|e| Injected(e.to_string()))
    }

    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, Injected> {
        self.reads.set(self.reads.get() + 1);
        let slot = (namespace.to_string(), key.to_string());
        if self.armed_gets.borrow_mut().remove(&slot) {
            return Err(Injected(format!("get {namespace}/{key}")));
        }
        self.inner
            .get(namespace, key)
            .map_err(|e| Injected(e.to_string()))
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), Injected> {
        self.writes += 1;
        self.inner
            .delete(namespace, key)
            .map_err(|e| Injected(e.to_string()))
    }

    fn list_keys(&self, namespace: &str) -> Result<Vec<String>, Injected> {
        self.reads.set(self.reads.get() + 1);
        if self.armed_lists.borrow_mut().remove(namespace) {
            return Err(Injected(format!("list {namespace}")));
        }
        self.inner
            .list_keys(namespace)
            .map_err(|e| Injected(e.to_string()))
    }
}
