//! # dsv-migrate
//!
//! Versioned key-value stores: records evolve through an ordered list of
//! schema generations, and ordinary access is refused until the store has
//! reached the generation the application expects.
//!
//! ## How It Works
//!
//! 1. Each record type implements [`Record`], usually via `#[record(kind = "...")]`.
//! 2. A [`MigrationBuilder`] turns a typed function `Fn(Old) -> Result<New, E>`
//!    (and optionally its inverse) into a [`Migration`].
//! 3. Migrations are chained in a [`VersionedMigrationList`]. Each version's
//!    records live in the store namespace named by its [`VersionKey`].
//! 4. A [`Runner`] walks the store from its persisted version to the target,
//!    forward with `up` or backward with `down`, persisting the version
//!    reached after every step.
//! 5. A [`GatedStore`] (or the all-in-one [`VersionedStore`]) refuses record
//!    access with [`NotMigrated`] until the runner reports the target version.
//!
//! ## Key Concepts
//!
//! - **Resumable**: a failed or cancelled run restarts from the last finished step.
//! - **Not atomic across keys**: a failing step keeps the records it already wrote.
//! - **Sequential**: keys and steps are processed one at a time, in store order.
//! - **Cancellable**: a [`CancelToken`] is honoured between keys and between steps.

extern crate self as dsv_migrate;

mod builder;
mod cancel;
pub mod codec;
mod error;
mod executor;
mod filter;
mod gate;
mod kind;
mod runner;
mod statestore;
mod version;

pub use builder::{Migration, MigrationBuilder};
pub use cancel::CancelToken;
pub use error::{BoxError, Error, NotMigrated, Result};
pub use executor::{execute, FnTransform, Transform, TransformFailure};
pub use filter::{Clause, KeyFilter};
pub use gate::{GatedEntry, GatedStore, VersionedRecords, VersionedStore};
pub use kind::{CodecError, Kind, Record};
pub use runner::{MigrationState, Readiness, Runner, RunnerConfig};
pub use statestore::{RecordAccess, RecordEntry, RecordStore, StoredRecord};
pub use version::{VersionKey, VersionedMigration, VersionedMigrationList};

// Re-export the attribute macro when the `macros` feature is enabled.
#[cfg(feature = "macros")]
pub use dsv_migrate_macros::record;
