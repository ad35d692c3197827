//! Walks a store from its persisted version to a target version.

use std::sync::{Arc, Mutex, MutexGuard};

use dsv_store::StateStore;
use log::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::error::{Error, NotMigrated, Result};
use crate::version::{check_label, VersionKey, VersionedMigration, VersionedMigrationList};

/// Where the runner keeps the current-version marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Namespace holding the marker. Must not collide with a version key.
    pub marker_namespace: String,
    /// Key of the marker inside `marker_namespace`.
    pub marker_key: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            marker_namespace: "versions".to_string(),
            marker_key: "current".to_string(),
        }
    }
}

/// Snapshot of what the runner knows about a store.
///
/// `current` is `None` until the marker has been read by
/// [`Runner::load`] or [`Runner::migrate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationState {
    pub current: Option<VersionKey>,
    pub target: VersionKey,
    pub ready: bool,
    pub last_error: Option<String>,
}

/// Reports whether a store may be accessed.
pub trait Readiness {
    /// `Ok` once the store sits at its target version.
    fn ready_error(&self) -> Result<(), NotMigrated>;
}

impl<T: Readiness + ?Sized> Readiness for Arc<T> {
    fn ready_error(&self) -> Result<(), NotMigrated> {
        (**self).ready_error()
    }
}

impl<T: Readiness + ?Sized> Readiness for &T {
    fn ready_error(&self) -> Result<(), NotMigrated> {
        (**self).ready_error()
    }
}

/// Sequences the steps of a [`VersionedMigrationList`].
///
/// Each version's records live in the namespace named by its key. After every
/// completed step the runner persists the version it reached, so a failed or
/// cancelled run resumes from the last finished step.
///
/// The runner does not serialize concurrent `migrate` calls. Run at most one
/// at a time.
pub struct Runner {
    list: VersionedMigrationList,
    config: RunnerConfig,
    state: Mutex<MigrationState>,
}

impl Runner {
    /// Validate `list` and aim it at `target` with the default marker location.
    pub fn new(list: VersionedMigrationList, target: impl Into<VersionKey>) -> Result<Self> {
        Self::with_config(list, target, RunnerConfig::default())
    }

    pub fn with_config(
        list: VersionedMigrationList,
        target: impl Into<VersionKey>,
        config: RunnerConfig,
    ) -> Result<Self> {
        list.validate()?;
        check_label("marker namespace", &config.marker_namespace)?;
        if list.versions().any(|v| v.as_str() == config.marker_namespace) {
            return Err(Error::Construction(format!(
                "version `{}` collides with the marker namespace",
                config.marker_namespace
            )));
        }
        Ok(Self {
            list,
            config,
            state: Mutex::new(MigrationState {
                current: None,
                target: target.into(),
                ready: false,
                last_error: None,
            }),
        })
    }

    pub fn list(&self) -> &VersionedMigrationList {
        &self.list
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn target(&self) -> VersionKey {
        self.lock().target.clone()
    }

    pub fn state(&self) -> MigrationState {
        self.lock().clone()
    }

    /// Retarget the runner.
    ///
    /// Readiness is recomputed against the last known version: moving the
    /// target away closes access at once, and moving it back to the version
    /// the store already holds reopens it without another `migrate`.
    pub fn set_target(&self, target: impl Into<VersionKey>) {
        let target = target.into();
        let mut state = self.lock();
        if state.target != target {
            debug!("target changed {} -> {}", state.target, target);
            state.target = target;
            state.ready = state.current.as_ref() == Some(&state.target);
        }
    }

    /// Read the persisted marker and refresh readiness without migrating.
    pub fn load<S: StateStore>(&self, store: &S) -> Result<VersionKey> {
        let current = self.read_marker(store)?;
        let mut state = self.lock();
        state.ready = current == state.target;
        state.current = Some(current.clone());
        Ok(current)
    }

    /// Bring `store` to the target version.
    ///
    /// Walks forward with each step's `up`, or backward with `down` when the
    /// target precedes the current version. A backward walk is refused with
    /// [`Error::NonReversibleMigration`] before any write if a traversed step
    /// has no down-function. Already being at the target performs no writes.
    pub fn migrate<S: StateStore>(&self, cancel: &CancelToken, store: &mut S) -> Result<()> {
        let result = self.walk(cancel, store);
        let mut state = self.lock();
        match &result {
            Ok(()) => {
                state.ready = state.current.as_ref() == Some(&state.target);
                state.last_error = None;
            }
            Err(e) => {
                warn!("migration to {} stopped: {e}", state.target);
                state.ready = false;
                state.last_error = Some(e.to_string());
            }
        }
        result
    }

    fn walk<S: StateStore>(&self, cancel: &CancelToken, store: &mut S) -> Result<()> {
        let target = self.target();
        let current = self.read_marker(store)?;
        self.lock().current = Some(current.clone());

        let from = self.list.position(&current)?;
        let to = self.list.position(&target)?;
        if from == to {
            debug!("already at version {target}");
            return Ok(());
        }

        if to > from {
            for index in from + 1..=to {
                let step = self.step(index)?;
                let prev = self.version(index - 1)?;
                self.check_cancel(cancel)?;
                info!("migrating {prev} -> {}", step.version);
                let touched = step.migration.up(
                    cancel,
                    store,
                    prev.as_str(),
                    step.version.as_str(),
                )?;
                self.persist(store, &step.version)?;
                info!("reached version {} ({} records)", step.version, touched.len());
            }
        } else {
            for index in to + 1..=from {
                let step = self.step(index)?;
                if !step.migration.is_reversible() {
                    return Err(Error::NonReversibleMigration {
                        version: step.version.clone(),
                    });
                }
            }
            for index in (to + 1..=from).rev() {
                let step = self.step(index)?;
                let prev = self.version(index - 1)?;
                self.check_cancel(cancel)?;
                info!("reverting {} -> {prev}", step.version);
                let touched = step.migration.down(
                    cancel,
                    store,
                    step.version.as_str(),
                    prev.as_str(),
                )?;
                self.persist(store, prev)?;
                info!("reached version {prev} ({} records)", touched.len());
            }
        }
        info!("store at target version {target}");
        Ok(())
    }

    fn step(&self, index: usize) -> Result<&VersionedMigration> {
        self.list
            .step_into(index)
            .ok_or_else(|| Error::Construction(format!("no migration at position {index}")))
    }

    fn version(&self, index: usize) -> Result<&VersionKey> {
        self.list
            .version_at(index)
            .ok_or_else(|| Error::Construction(format!("no version at position {index}")))
    }

    fn check_cancel(&self, cancel: &CancelToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled { touched: Vec::new() });
        }
        Ok(())
    }

    fn read_marker<S: StateStore>(&self, store: &S) -> Result<VersionKey> {
        let raw = store
            .get(&self.config.marker_namespace, &self.config.marker_key)
            .map_err(|e| Error::Read {
                key: self.config.marker_key.clone(),
                source: e.into(),
            })?;
        match raw {
            None => Ok(self.list.base().clone()),
            Some(bytes) => String::from_utf8(bytes)
                .map(VersionKey::from)
                .map_err(|_| Error::CorruptMarker),
        }
    }

    fn persist<S: StateStore>(&self, store: &mut S, version: &VersionKey) -> Result<()> {
        if let Err(e) = store.put(
            &self.config.marker_namespace,
            &self.config.marker_key,
            version.as_bytes(),
        ) {
            warn!("failed to persist marker {version}: {e}");
            return Err(Error::RunnerPersist {
                version: version.clone(),
                source: e.into(),
            });
        }
        self.lock().current = Some(version.clone());
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, MigrationState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Readiness for Runner {
    fn ready_error(&self) -> Result<(), NotMigrated> {
        let state = self.lock();
        if state.ready {
            return Ok(());
        }
        Err(NotMigrated {
            current: state.current.clone(),
            target: state.target.clone(),
        })
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("list", &self.list)
            .field("config", &self.config)
            .field("state", &*self.lock())
            .finish()
    }
}
