//! Record kinds: named, typed shapes with an encode/decode contract.

use core::fmt;

use thiserror::Error;

use crate::error::{Error, Result};

/// A named record shape stored in a versioned store.
///
/// `KIND` is the record's stable wire identity. Two Rust types with the same
/// `KIND` are considered assignable to each other, which is what lets a
/// down-function declared against its own types invert an up-function.
///
/// Most types get this impl from `#[record(kind = "...")]`, which encodes
/// with postcard through [`codec`](crate::codec).
///
/// # Example
///
/// ```
/// use dsv_migrate::{codec, CodecError, Record};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, PartialEq, Serialize, Deserialize)]
/// struct SensorV1 { val: i64 }
///
/// impl Record for SensorV1 {
///     const KIND: &'static str = "sensor.v1";
///     fn encode(&self) -> Result<Vec<u8>, CodecError> { codec::encode(self) }
///     fn decode(bytes: &[u8]) -> Result<Self, CodecError> { codec::decode(bytes) }
/// }
///
/// let bytes = SensorV1 { val: 1 }.encode().unwrap();
/// assert_eq!(SensorV1::decode(&bytes).unwrap(), SensorV1 { val: 1 });
/// ```
pub trait Record: Sized + 'static {
    /// Stable name of this record kind.
    const KIND: &'static str;

    /// Serialize the record. Must be deterministic.
    fn encode(&self) -> Result<Vec<u8>, CodecError>;

    /// Deserialize a record previously produced by [`Record::encode`].
    fn decode(bytes: &[u8]) -> Result<Self, CodecError>;
}

/// Encode/decode failure for a record kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Serialization failed.
    #[error("cannot encode {kind}: {message}")]
    Encode { kind: &'static str, message: String },
    /// Deserialization failed.
    #[error("cannot decode {kind}: {message}")]
    Decode { kind: &'static str, message: String },
}

/// Runtime descriptor of a record kind.
///
/// Carries the kind name alongside the Rust type name so mismatches can be
/// reported precisely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Kind {
    name: &'static str,
    type_name: &'static str,
}

impl Kind {
    /// Descriptor for record type `T`.
    pub fn of<T: Record>() -> Self {
        Self {
            name: T::KIND,
            type_name: core::any::type_name::<T>(),
        }
    }

    /// The kind name (`Record::KIND`).
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The Rust type backing this kind.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether a value of this kind may be used where `other` is expected.
    pub fn is_assignable_to(&self, other: &Kind) -> bool {
        self.name == other.name
    }

    /// Reject kinds that cannot be registered: empty names and names with
    /// whitespace or control characters.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::Construction(format!(
                "record type `{}` has an empty kind name",
                self.type_name
            )));
        }
        if self
            .name
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(Error::Construction(format!(
                "kind name `{}` of `{}` contains whitespace or control characters",
                self.name.escape_debug(),
                self.type_name
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
