//! Version keys and the ordered list of migration steps between them.

use std::collections::HashSet;
use std::fmt;

use crate::builder::Migration;
use crate::error::{Error, Result};
use crate::kind::Kind;

/// Opaque label for one schema generation.
///
/// Keys are compared for equality only. Their order comes from their position
/// in a [`VersionedMigrationList`], never from the label itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionKey(String);

impl VersionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VersionKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for VersionKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Version keys double as store namespaces, so they must be non-empty and
/// free of control characters (NUL included).
pub(crate) fn check_label(what: &str, label: &str) -> Result<()> {
    if label.is_empty() {
        return Err(Error::Construction(format!("{what} must not be empty")));
    }
    if label.chars().any(char::is_control) {
        return Err(Error::Construction(format!(
            "{what} {label:?} contains a control character"
        )));
    }
    Ok(())
}

/// One entry of a [`VersionedMigrationList`]: the migration that produces
/// `version` from the entry before it.
#[derive(Debug, Clone)]
pub struct VersionedMigration {
    pub version: VersionKey,
    pub migration: Migration,
}

/// Ordered path of versions.
///
/// The base version has no migration. Every later entry carries the migration
/// from the previous version to itself, so position `i` is reached from
/// position `i - 1` by `steps[i - 1].migration.up`.
///
/// ```
/// use dsv_migrate::{record, MigrationBuilder, VersionedMigrationList};
/// use serde::{Deserialize, Serialize};
///
/// #[record(kind = "doc.celsius")]
/// #[derive(Serialize, Deserialize)]
/// struct Celsius(f64);
///
/// #[record(kind = "doc.kelvin")]
/// #[derive(Serialize, Deserialize)]
/// struct Kelvin(f64);
///
/// #[record(kind = "doc.reading")]
/// #[derive(Serialize, Deserialize)]
/// struct Reading { kelvin: f64 }
///
/// let to_kelvin = MigrationBuilder::new(|c: Celsius| Ok::<_, String>(Kelvin(c.0 + 273.15)))
///     .build()
///     .unwrap();
/// let to_reading = MigrationBuilder::new(|k: Kelvin| Ok::<_, String>(Reading { kelvin: k.0 }))
///     .build()
///     .unwrap();
///
/// let list = VersionedMigrationList::new("1")
///     .step("2", to_kelvin)
///     .step("3", to_reading);
/// list.validate().unwrap();
/// assert_eq!(list.position(&"3".into()).unwrap(), 2);
/// assert_eq!(list.kind_at(1).unwrap().name(), "doc.kelvin");
/// ```
#[derive(Debug, Clone)]
pub struct VersionedMigrationList {
    base: VersionKey,
    steps: Vec<VersionedMigration>,
}

impl VersionedMigrationList {
    pub fn new(base: impl Into<VersionKey>) -> Self {
        Self {
            base: base.into(),
            steps: Vec::new(),
        }
    }

    /// Append `version`, reached from the current last version by `migration`.
    pub fn step(mut self, version: impl Into<VersionKey>, migration: Migration) -> Self {
        self.steps.push(VersionedMigration {
            version: version.into(),
            migration,
        });
        self
    }

    /// The first version. A store without a marker is at this version.
    pub fn base(&self) -> &VersionKey {
        &self.base
    }

    pub fn steps(&self) -> &[VersionedMigration] {
        &self.steps
    }

    /// Number of versions, including the base.
    pub fn len(&self) -> usize {
        self.steps.len() + 1
    }

    /// Always false: a list holds at least its base version.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Versions in list order.
    pub fn versions(&self) -> impl Iterator<Item = &VersionKey> {
        std::iter::once(&self.base).chain(self.steps.iter().map(|s| &s.version))
    }

    /// Position of `version`, or [`Error::VersionNotFound`].
    pub fn position(&self, version: &VersionKey) -> Result<usize> {
        self.versions()
            .position(|v| v == version)
            .ok_or_else(|| Error::VersionNotFound(version.clone()))
    }

    pub fn version_at(&self, index: usize) -> Option<&VersionKey> {
        self.versions().nth(index)
    }

    /// Record kind held at position `index`. `None` when the list has no steps
    /// to infer it from or `index` is out of range.
    pub fn kind_at(&self, index: usize) -> Option<Kind> {
        match index {
            0 => self.steps.first().map(|s| s.migration.source_kind()),
            i => self.steps.get(i - 1).map(|s| s.migration.destination_kind()),
        }
    }

    /// The step that reaches position `index`. `None` for the base.
    pub(crate) fn step_into(&self, index: usize) -> Option<&VersionedMigration> {
        index.checked_sub(1).and_then(|i| self.steps.get(i))
    }

    /// Reject malformed or duplicate keys and steps whose kinds do not chain.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for version in self.versions() {
            check_label("version", version.as_str())?;
            if !seen.insert(version) {
                return Err(Error::Construction(format!(
                    "duplicate version `{version}` in migration list"
                )));
            }
        }

        for pair in self.steps.windows(2) {
            let produced = pair[0].migration.destination_kind();
            let consumed = pair[1].migration.source_kind();
            if !produced.is_assignable_to(&consumed) {
                return Err(Error::Construction(format!(
                    "migration to `{}` expects {consumed}, but version `{}` holds {produced}",
                    pair[1].version, pair[0].version
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::MigrationBuilder;
    use crate::codec;
    use crate::error::BoxError;
    use crate::kind::{CodecError, Record};
    use serde::{Deserialize, Serialize};

    macro_rules! list_record {
        ($ty:ident, $kind:literal) => {
            #[derive(Debug, Serialize, Deserialize)]
            struct $ty(i64);

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

    list_record!(A, "list.a");
    list_record!(B, "list.b");
    list_record!(C, "list.c");

    fn a_to_b() -> Migration {
        MigrationBuilder::new(|a: A| Ok::<_, BoxError>(B(a.0)))
            .build()
            .unwrap()
    }

    fn b_to_c() -> Migration {
        MigrationBuilder::new(|b: B| Ok::<_, BoxError>(C(b.0)))
            .build()
            .unwrap()
    }

    #[test]
    fn positions_follow_insertion_order() {
        // Labels sort differently from their list order.
        let list = VersionedMigrationList::new("z")
            .step("m", a_to_b())
            .step("a", b_to_c());
        list.validate().unwrap();

        assert_eq!(list.len(), 3);
        assert_eq!(list.position(&"z".into()).unwrap(), 0);
        assert_eq!(list.position(&"a".into()).unwrap(), 2);
        assert_eq!(list.version_at(1), Some(&VersionKey::from("m")));
        assert_eq!(list.version_at(3), None);
        assert!(list.step_into(0).is_none());
        assert_eq!(list.kind_at(0).unwrap().name(), "list.a");
        assert_eq!(list.kind_at(2).unwrap().name(), "list.c");
        assert!(list.kind_at(3).is_none());
        assert_eq!(list.step_into(2).unwrap().version.as_str(), "a");
    }

    #[test]
    fn unknown_version_is_reported() {
        let list = VersionedMigrationList::new("1");
        let err = list.position(&"9".into()).unwrap_err();
        assert!(matches!(err, Error::VersionNotFound(v) if v.as_str() == "9"));
    }

    #[test]
    fn duplicate_version_is_rejected() {
        let list = VersionedMigrationList::new("1")
            .step("2", a_to_b())
            .step("1", b_to_c());
        assert!(matches!(list.validate(), Err(Error::Construction(_))));
    }

    #[test]
    fn unchained_kinds_are_rejected() {
        let list = VersionedMigrationList::new("1")
            .step("2", a_to_b())
            .step("3", a_to_b());
        let err = list.validate().unwrap_err();
        assert!(err.to_string().contains("list.a"));
    }

    #[test]
    fn malformed_version_keys_are_rejected() {
        for bad in ["", "a\0b", "line\nbreak", "tab\there"] {
            let list = VersionedMigrationList::new("1").step(bad, a_to_b());
            let err = list.validate().unwrap_err();
            assert!(matches!(err, Error::Construction(_)), "{bad:?}: {err}");
        }

        let err = VersionedMigrationList::new("\0").validate().unwrap_err();
        assert!(err.to_string().contains("control character"));
    }

    #[test]
    fn labels_with_spaces_and_punctuation_are_fine() {
        let list = VersionedMigrationList::new("v 1.0/beta").step("2024-01-01", a_to_b());
        list.validate().unwrap();
    }

    #[test]
    fn version_key_displays_raw_label() {
        let key = VersionKey::new(String::from("2024-01"));
        assert_eq!(key.to_string(), "2024-01");
        assert_eq!(key.as_bytes(), b"2024-01");
    }
}
