//! Record access that stays closed until the store is migrated.

use std::sync::Arc;

use dsv_store::{SharedStore, StateStore};
use log::debug;

use crate::cancel::CancelToken;
use crate::error::{BoxError, Error, NotMigrated, Result};
use crate::kind::{Kind, Record};
use crate::runner::{Readiness, Runner, RunnerConfig};
use crate::statestore::{RecordAccess, RecordEntry, RecordStore, StoredRecord};
use crate::version::{VersionKey, VersionedMigrationList};

/// Wraps a [`RecordAccess`] so every operation first asks `readiness`.
///
/// While not ready, `begin`, `has` and `list` fail with
/// [`Error::NotMigrated`], and `get` hands back [`GatedEntry::Blocked`]. The
/// wrapped accessor is not touched at all in that state.
pub struct GatedStore<A, R> {
    inner: A,
    readiness: R,
}

impl<A, R: Readiness> GatedStore<A, R> {
    pub fn new(inner: A, readiness: R) -> Self {
        Self { inner, readiness }
    }

    pub fn readiness(&self) -> &R {
        &self.readiness
    }

    /// Bypass the gate.
    pub fn inner(&self) -> &A {
        &self.inner
    }

    pub fn into_inner(self) -> A {
        self.inner
    }

    fn check(&self, op: &str) -> Result<(), NotMigrated> {
        self.readiness.ready_error().map_err(|e| {
            debug!("refused {op}: {e}");
            e
        })
    }
}

impl<T, A, R> RecordAccess<T> for GatedStore<A, R>
where
    A: RecordAccess<T>,
    R: Readiness,
{
    type Entry<'a> = GatedEntry<A::Entry<'a>>
    where
        Self: 'a;

    fn begin(&mut self, key: &str, value: &T) -> Result<()> {
        self.check("begin")?;
        self.inner.begin(key, value)
    }

    fn get(&mut self, key: &str) -> Self::Entry<'_> {
        match self.check("get") {
            Ok(()) => GatedEntry::Live(self.inner.get(key)),
            Err(e) => GatedEntry::Blocked(e),
        }
    }

    fn has(&self, key: &str) -> Result<bool> {
        self.check("has")?;
        self.inner.has(key)
    }

    fn list(&self) -> Result<Vec<T>> {
        self.check("list")?;
        self.inner.list()
    }
}

/// Record handle returned by a [`GatedStore`].
#[derive(Debug)]
pub enum GatedEntry<E> {
    /// The store was ready; operations go to the real handle.
    Live(E),
    /// The store was not ready; every operation fails with this error.
    Blocked(NotMigrated),
}

impl<E> GatedEntry<E> {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked(_))
    }
}

impl<T, E: StoredRecord<T>> StoredRecord<T> for GatedEntry<E> {
    fn read(&self) -> Result<T> {
        match self {
            Self::Live(entry) => entry.read(),
            Self::Blocked(e) => Err(e.clone().into()),
        }
    }

    fn mutate<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut T) -> Result<(), BoxError>,
    {
        match self {
            Self::Live(entry) => entry.mutate(f),
            Self::Blocked(e) => Err(e.clone().into()),
        }
    }

    fn end(self) -> Result<()> {
        match self {
            Self::Live(entry) => entry.end(),
            Self::Blocked(e) => Err(e.into()),
        }
    }
}

/// The gated accessor inside a [`VersionedStore`].
pub type VersionedRecords<S, T> = GatedStore<RecordStore<SharedStore<S>, T>, Arc<Runner>>;

/// A store that tracks its own version.
///
/// Records of kind `T` are read and written in the namespace of the target
/// version, behind a gate driven by the runner. Until [`VersionedStore::migrate`]
/// (or [`VersionedStore::load`] on an already migrated store) succeeds, every
/// record operation fails with [`Error::NotMigrated`].
///
/// ```
/// use dsv_migrate::{
///     record, CancelToken, MigrationBuilder, RecordAccess, VersionedMigrationList,
///     VersionedStore,
/// };
/// use dsv_store::{MemoryStore, SharedStore};
/// use serde::{Deserialize, Serialize};
///
/// #[record(kind = "note.v1")]
/// #[derive(Serialize, Deserialize)]
/// struct NoteV1 { text: String }
///
/// #[record(kind = "note.v2")]
/// #[derive(Debug, PartialEq, Serialize, Deserialize)]
/// struct NoteV2 { text: String, pinned: bool }
///
/// let upgrade = MigrationBuilder::new(|n: NoteV1| {
///     Ok::<_, String>(NoteV2 { text: n.text, pinned: false })
/// })
/// .build()
/// .unwrap();
/// let list = VersionedMigrationList::new("1").step("2", upgrade);
///
/// let mut store: VersionedStore<MemoryStore, NoteV2> =
///     VersionedStore::open(SharedStore::new(MemoryStore::new()), list, "2").unwrap();
/// assert!(store.has("n1").is_err());
///
/// store.migrate(&CancelToken::new()).unwrap();
/// store.begin("n1", &NoteV2 { text: "hi".into(), pinned: true }).unwrap();
/// assert!(store.has("n1").unwrap());
/// ```
pub struct VersionedStore<S, T> {
    store: SharedStore<S>,
    runner: Arc<Runner>,
    records: VersionedRecords<S, T>,
}

impl<S: StateStore, T: Record> VersionedStore<S, T> {
    /// Build the runner and the gated accessor over one shared store.
    ///
    /// Fails if the list is invalid, `target` is not in it, or `T` is not the
    /// record kind the list holds at `target`.
    pub fn open(
        store: SharedStore<S>,
        list: VersionedMigrationList,
        target: impl Into<VersionKey>,
    ) -> Result<Self> {
        Self::with_config(store, list, target, RunnerConfig::default())
    }

    pub fn with_config(
        store: SharedStore<S>,
        list: VersionedMigrationList,
        target: impl Into<VersionKey>,
        config: RunnerConfig,
    ) -> Result<Self> {
        let target = target.into();
        let index = list.position(&target)?;
        if let Some(kind) = list.kind_at(index) {
            let wanted = Kind::of::<T>();
            if !kind.is_assignable_to(&wanted) {
                return Err(Error::Construction(format!(
                    "version `{target}` holds {kind}, not {wanted}"
                )));
            }
        }

        let runner = Arc::new(Runner::with_config(list, target.clone(), config)?);
        let records = GatedStore::new(
            RecordStore::new(store.clone(), target.as_str()),
            Arc::clone(&runner),
        );
        Ok(Self {
            store,
            runner,
            records,
        })
    }

    /// Run the migrations up to the target version.
    pub fn migrate(&self, cancel: &CancelToken) -> Result<()> {
        let mut store = self.store.clone();
        self.runner.migrate(cancel, &mut store)
    }

    /// Pick up the persisted version without migrating.
    pub fn load(&self) -> Result<VersionKey> {
        self.runner.load(&self.store)
    }

    pub fn runner(&self) -> &Arc<Runner> {
        &self.runner
    }

    pub fn records(&self) -> &VersionedRecords<S, T> {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut VersionedRecords<S, T> {
        &mut self.records
    }

    pub fn shared(&self) -> &SharedStore<S> {
        &self.store
    }
}

impl<S: StateStore, T: Record> RecordAccess<T> for VersionedStore<S, T> {
    type Entry<'a> = GatedEntry<RecordEntry<'a, SharedStore<S>, T>>
    where
        Self: 'a;

    fn begin(&mut self, key: &str, value: &T) -> Result<()> {
        self.records.begin(key, value)
    }

    fn get(&mut self, key: &str) -> Self::Entry<'_> {
        self.records.get(key)
    }

    fn has(&self, key: &str) -> Result<bool> {
        self.records.has(key)
    }

    fn list(&self) -> Result<Vec<T>> {
        self.records.list()
    }
}
