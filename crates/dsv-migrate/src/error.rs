use thiserror::Error;

use crate::kind::CodecError;
use crate::version::VersionKey;

/// Boxed error used for store failures and user transform failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error raised by building, executing or running migrations, and by the
/// record accessors.
#[derive(Debug, Error)]
pub enum Error {
    /// A migration function or migration list has an invalid shape.
    #[error("invalid migration: {0}")]
    Construction(String),

    /// A down-function whose kinds do not invert the up-function's kinds.
    #[error(
        "reversible function does not have inverse types: up is {up_source} -> {up_destination}, \
         down is {down_source} -> {down_destination}"
    )]
    IncompatibleInverse {
        up_source: &'static str,
        up_destination: &'static str,
        down_source: &'static str,
        down_destination: &'static str,
    },

    /// A stored payload could not be decoded as the expected record kind.
    #[error("failed to decode record at `{key}`: {source}")]
    RecordDecode { key: String, source: CodecError },

    /// The user transform rejected a record.
    #[error("transform failed at `{key}`: {source}")]
    Transform { key: String, source: BoxError },

    /// A transformed record could not be encoded.
    #[error("failed to encode record at `{key}`: {source}")]
    RecordEncode { key: String, source: CodecError },

    /// Reading a key from the backing store failed.
    #[error("failed to read `{key}`: {source}")]
    Read { key: String, source: BoxError },

    /// Writing a key to the backing store failed.
    #[error("failed to write `{key}`: {source}")]
    Write { key: String, source: BoxError },

    /// Enumerating the keys of a namespace failed.
    #[error("failed to enumerate namespace `{namespace}`: {source}")]
    Enumerate { namespace: String, source: BoxError },

    /// The run was cancelled. `touched` lists the keys written before the
    /// cancellation was observed.
    #[error("migration cancelled after {} keys", .touched.len())]
    Cancelled { touched: Vec<String> },

    /// A version key is not part of the migration list.
    #[error("version `{0}` not found in migration list")]
    VersionNotFound(VersionKey),

    /// Walking backward would cross a step that has no down-function.
    #[error("migration to version `{version}` is not reversible")]
    NonReversibleMigration { version: VersionKey },

    /// `down` was called on a migration built without a down-function.
    #[error("migration has no down function")]
    NotReversible,

    /// The store has not reached its target version.
    #[error(transparent)]
    NotMigrated(#[from] NotMigrated),

    /// A step succeeded but recording the new version marker failed.
    #[error("failed to persist version marker `{version}`: {source}")]
    RunnerPersist { version: VersionKey, source: BoxError },

    /// The persisted version marker is not valid UTF-8.
    #[error("version marker is corrupt")]
    CorruptMarker,

    /// `begin` on a key that already holds a record.
    #[error("record `{0}` already exists")]
    AlreadyExists(String),

    /// Reading or mutating a key that holds no record.
    #[error("record `{0}` not found")]
    NotFound(String),

    /// A mutator passed to `StoredRecord::mutate` failed.
    #[error("mutation of `{key}` failed: {source}")]
    Mutate { key: String, source: BoxError },
}

/// The store is not at its target version yet.
///
/// Returned by every gated operation until the runner reports readiness.
/// `current` is `None` until the persisted marker has been read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "store not migrated: current version {}, target version {target}",
    .current.as_ref().map_or("<unknown>", VersionKey::as_str)
)]
pub struct NotMigrated {
    pub current: Option<VersionKey>,
    pub target: VersionKey,
}

impl Error {
    /// Whether this error means "not ready yet" rather than a store failure.
    pub fn is_not_migrated(&self) -> bool {
        matches!(self, Self::NotMigrated(_))
    }
}
