//! Builds [`Migration`]s from typed transform functions.

use std::sync::Arc;

use dsv_store::StateStore;

use crate::cancel::CancelToken;
use crate::error::{BoxError, Error, Result};
use crate::executor::{execute, FnTransform, Transform};
use crate::filter::KeyFilter;
use crate::kind::{Kind, Record};

/// Fluent builder for a [`Migration`].
///
/// The first failure (an invalid record kind or a down-function that does not
/// invert the up-function) is captured. Later calls leave it untouched and it
/// is returned by [`MigrationBuilder::build`].
///
/// ```
/// use dsv_migrate::{record, MigrationBuilder};
/// use serde::{Deserialize, Serialize};
///
/// #[record(kind = "doc.v1")]
/// #[derive(Serialize, Deserialize)]
/// struct V1 { val: i64 }
///
/// #[record(kind = "doc.v2")]
/// #[derive(Serialize, Deserialize)]
/// struct V2 { val: i64 }
///
/// let migration = MigrationBuilder::new(|v: V1| Ok::<_, String>(V2 { val: v.val * 10 }))
///     .reversible(|v: V2| Ok::<_, String>(V1 { val: v.val / 10 }))
///     .filter_keys(["skip-me"])
///     .build()
///     .unwrap();
/// assert!(migration.is_reversible());
/// ```
#[must_use = "a builder does nothing until `build` is called"]
pub struct MigrationBuilder {
    draft: Result<Draft>,
}

struct Draft {
    up: Arc<dyn Transform>,
    down: Option<Arc<dyn Transform>>,
    filter: KeyFilter,
}

impl MigrationBuilder {
    /// Start from an up-function taking one `S` and producing a `D` or a failure.
    pub fn new<S, D, E, F>(up: F) -> Self
    where
        S: Record,
        D: Record,
        E: Into<BoxError> + 'static,
        F: Fn(S) -> Result<D, E> + Send + Sync + 'static,
    {
        let draft = check_shape::<S, D>().map(|()| Draft {
            up: Arc::new(FnTransform::new(up)),
            down: None,
            filter: KeyFilter::new(),
        });
        Self { draft }
    }

    /// Attach a down-function.
    ///
    /// Its input kind must accept the up-function's output kind and its output
    /// kind must be the up-function's input kind, otherwise the builder
    /// captures [`Error::IncompatibleInverse`].
    pub fn reversible<S, D, E, F>(self, down: F) -> Self
    where
        S: Record,
        D: Record,
        E: Into<BoxError> + 'static,
        F: Fn(S) -> Result<D, E> + Send + Sync + 'static,
    {
        self.and_then(|mut draft| {
            check_shape::<S, D>()?;
            let (up_source, up_dest) = (draft.up.source_kind(), draft.up.destination_kind());
            let (down_source, down_dest) = (Kind::of::<S>(), Kind::of::<D>());
            if !up_dest.is_assignable_to(&down_source) || !down_dest.is_assignable_to(&up_source)
            {
                return Err(Error::IncompatibleInverse {
                    up_source: up_source.name(),
                    up_destination: up_dest.name(),
                    down_source: down_source.name(),
                    down_destination: down_dest.name(),
                });
            }
            draft.down = Some(Arc::new(FnTransform::new(down)));
            Ok(draft)
        })
    }

    /// Skip `keys`. Adds one exclude clause.
    pub fn filter_keys<I, K>(self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.and_then(|mut draft| {
            draft.filter = draft.filter.exclude(keys);
            Ok(draft)
        })
    }

    /// Restrict to `keys`. Adds one include-only clause that ANDs with the rest.
    pub fn only<I, K>(self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.and_then(|mut draft| {
            draft.filter = draft.filter.only(keys);
            Ok(draft)
        })
    }

    /// Finish, surfacing the first captured error if any.
    pub fn build(self) -> Result<Migration> {
        let draft = self.draft?;
        Ok(Migration {
            up: draft.up,
            down: draft.down,
            filter: draft.filter,
        })
    }

    fn and_then(self, f: impl FnOnce(Draft) -> Result<Draft>) -> Self {
        Self {
            draft: self.draft.and_then(f),
        }
    }
}

fn check_shape<S: Record, D: Record>() -> Result<()> {
    Kind::of::<S>().validate()?;
    Kind::of::<D>().validate()
}

/// An immutable, built migration step.
///
/// Cheap to clone; clones share the transforms.
#[derive(Clone)]
pub struct Migration {
    up: Arc<dyn Transform>,
    down: Option<Arc<dyn Transform>>,
    filter: KeyFilter,
}

impl Migration {
    /// Migrate every filtered record in `source_ns` into `dest_ns`.
    ///
    /// Returns the touched keys. See [`execute`] for failure semantics.
    pub fn up<St: StateStore>(
        &self,
        cancel: &CancelToken,
        store: &mut St,
        source_ns: &str,
        dest_ns: &str,
    ) -> Result<Vec<String>> {
        execute(cancel, &self.filter, store, source_ns, dest_ns, self.up.as_ref())
    }

    /// Revert every filtered record in `dest_ns` back into `source_ns`.
    ///
    /// Fails with [`Error::NotReversible`] when no down-function was attached.
    pub fn down<St: StateStore>(
        &self,
        cancel: &CancelToken,
        store: &mut St,
        dest_ns: &str,
        source_ns: &str,
    ) -> Result<Vec<String>> {
        let down = self.down.as_ref().ok_or(Error::NotReversible)?;
        execute(cancel, &self.filter, store, dest_ns, source_ns, down.as_ref())
    }

    pub fn is_reversible(&self) -> bool {
        self.down.is_some()
    }

    /// Kind consumed by `up`.
    pub fn source_kind(&self) -> Kind {
        self.up.source_kind()
    }

    /// Kind produced by `up`.
    pub fn destination_kind(&self) -> Kind {
        self.up.destination_kind()
    }

    pub fn filter(&self) -> &KeyFilter {
        &self.filter
    }
}

impl std::fmt::Debug for Migration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migration")
            .field("source_kind", &self.source_kind().name())
            .field("destination_kind", &self.destination_kind().name())
            .field("reversible", &self.is_reversible())
            .field("filter", &self.filter)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::kind::CodecError;
    use dsv_store::MemoryStore;
    use serde::{Deserialize, Serialize};

    macro_rules! postcard_record {
        ($ty:ident, $kind:literal) => {
            impl Record for $ty {
                const KIND: &'static str = $kind;
                fn encode(&self) -> Result<Vec<u8>, CodecError> {
                    codec::encode(self)
                }
                fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
                    codec::decode(bytes)
                }
            }
        };
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct V1 {
        val: i64,
    }
    postcard_record!(V1, "builder.v1");

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct V2 {
        val: i64,
    }
    postcard_record!(V2, "builder.v2");

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Other {
        val: i64,
    }
    postcard_record!(Other, "builder.other");

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Unnamed {
        val: i64,
    }
    postcard_record!(Unnamed, "");

    fn times_ten(v: V1) -> Result<V2, BoxError> {
        Ok(V2 { val: v.val * 10 })
    }

    fn div_ten(v: V2) -> Result<V1, BoxError> {
        Ok(V1 { val: v.val / 10 })
    }

    fn seeded() -> MemoryStore {
        let mut store = MemoryStore::new();
        for (key, val) in [("a", 1), ("b", 2), ("c", 3)] {
            store.put("old", key, &V1 { val }.encode().unwrap()).unwrap();
        }
        store
    }

    #[test]
    fn builds_irreversible_migration() {
        let migration = MigrationBuilder::new(times_ten).build().unwrap();
        assert!(!migration.is_reversible());
        assert_eq!(migration.source_kind().name(), "builder.v1");
        assert_eq!(migration.destination_kind().name(), "builder.v2");
        assert!(migration.filter().is_empty());
    }

    #[test]
    fn down_without_inverse_fails() {
        let migration = MigrationBuilder::new(times_ten).build().unwrap();
        let mut store = seeded();
        let err = migration
            .down(&CancelToken::new(), &mut store, "new", "old")
            .unwrap_err();
        assert!(matches!(err, Error::NotReversible));
    }

    #[test]
    fn invalid_kind_is_construction_error() {
        let result = MigrationBuilder::new(|v: Unnamed| Ok::<_, BoxError>(V2 { val: v.val }))
            .build();
        assert!(matches!(result, Err(Error::Construction(_))));
    }

    #[test]
    fn mismatched_inverse_is_rejected() {
        let result = MigrationBuilder::new(times_ten)
            .reversible(|v: V2| Ok::<_, BoxError>(Other { val: v.val }))
            .build();
        match result {
            Err(Error::IncompatibleInverse {
                up_source,
                down_destination,
                ..
            }) => {
                assert_eq!(up_source, "builder.v1");
                assert_eq!(down_destination, "builder.other");
            }
            other => panic!("expected IncompatibleInverse, got {other:?}"),
        }

        let result = MigrationBuilder::new(times_ten)
            .reversible(|v: Other| Ok::<_, BoxError>(V1 { val: v.val }))
            .build();
        assert!(matches!(result, Err(Error::IncompatibleInverse { .. })));
    }

    #[test]
    fn first_error_is_preserved() {
        let result = MigrationBuilder::new(|v: Unnamed| Ok::<_, BoxError>(V2 { val: v.val }))
            .reversible(|v: V2| Ok::<_, BoxError>(Other { val: v.val }))
            .only(["a"])
            .filter_keys(["b"])
            .build();
        assert!(matches!(result, Err(Error::Construction(_))));

        let result = MigrationBuilder::new(times_ten)
            .reversible(|v: V2| Ok::<_, BoxError>(Other { val: v.val }))
            .reversible(div_ten)
            .build();
        assert!(matches!(result, Err(Error::IncompatibleInverse { .. })));
    }

    #[test]
    fn up_then_down_restores_records() {
        let migration = MigrationBuilder::new(times_ten)
            .reversible(div_ten)
            .build()
            .unwrap();
        let mut store = seeded();
        let cancel = CancelToken::new();

        let touched = migration.up(&cancel, &mut store, "old", "new").unwrap();
        assert_eq!(touched, vec!["a", "b", "c"]);
        let a = V2::decode(&store.get("new", "a").unwrap().unwrap()).unwrap();
        assert_eq!(a, V2 { val: 10 });

        // Revert into a fresh namespace to compare with the originals.
        let touched = migration.down(&cancel, &mut store, "new", "restored").unwrap();
        assert_eq!(touched, vec!["a", "b", "c"]);
        for key in ["a", "b", "c"] {
            assert_eq!(
                store.get("restored", key).unwrap(),
                store.get("old", key).unwrap()
            );
        }
    }

    #[test]
    fn filters_compose() {
        let migration = MigrationBuilder::new(times_ten)
            .only(["a", "b"])
            .filter_keys(["b"])
            .build()
            .unwrap();
        let mut store = seeded();

        let touched = migration
            .up(&CancelToken::new(), &mut store, "old", "new")
            .unwrap();
        assert_eq!(touched, vec!["a"]);
        assert_eq!(store.list_keys("new").unwrap(), vec!["a"]);
    }
}
