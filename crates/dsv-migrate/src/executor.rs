//! Applies one transform across a filtered key range.

use core::marker::PhantomData;

use dsv_store::StateStore;
use log::{debug, info};

use crate::cancel::CancelToken;
use crate::error::{BoxError, Error, Result};
use crate::filter::KeyFilter;
use crate::kind::{CodecError, Kind, Record};

/// A byte-level record transform between two record kinds.
///
/// Each call must be deterministic and pure: the executor may re-apply it to
/// the same source bytes when a partially failed step is retried.
pub trait Transform: Send + Sync {
    /// Kind the transform decodes its input as.
    fn source_kind(&self) -> Kind;
    /// Kind the transform encodes its output as.
    fn destination_kind(&self) -> Kind;
    /// Decode `data`, transform it, and encode the result.
    fn apply(&self, data: &[u8]) -> Result<Vec<u8>, TransformFailure>;
}

/// Why a [`Transform`] failed, before a key is attached to it.
#[derive(Debug)]
pub enum TransformFailure {
    /// The input did not decode as the source kind.
    Decode(CodecError),
    /// The user function returned an error.
    Transform(BoxError),
    /// The output did not encode.
    Encode(CodecError),
}

impl TransformFailure {
    /// Attach the key being processed.
    pub fn at(self, key: &str) -> Error {
        let key = key.to_string();
        match self {
            Self::Decode(source) => Error::RecordDecode { key, source },
            Self::Transform(source) => Error::Transform { key, source },
            Self::Encode(source) => Error::RecordEncode { key, source },
        }
    }
}

/// [`Transform`] backed by a typed function `Fn(S) -> Result<D, E>`.
pub struct FnTransform<S, D, F> {
    f: F,
    _kinds: PhantomData<fn(S) -> D>,
}

impl<S, D, F> FnTransform<S, D, F> {
    pub fn new<E>(f: F) -> Self
    where
        F: Fn(S) -> Result<D, E>,
    {
        Self {
            f,
            _kinds: PhantomData,
        }
    }
}

impl<S, D, E, F> Transform for FnTransform<S, D, F>
where
    S: Record,
    D: Record,
    E: Into<BoxError>,
    F: Fn(S) -> Result<D, E> + Send + Sync,
{
    fn source_kind(&self) -> Kind {
        Kind::of::<S>()
    }

    fn destination_kind(&self) -> Kind {
        Kind::of::<D>()
    }

    fn apply(&self, data: &[u8]) -> Result<Vec<u8>, TransformFailure> {
        let input = S::decode(data).map_err(TransformFailure::Decode)?;
        let output = (self.f)(input).map_err(|e| TransformFailure::Transform(e.into()))?;
        output.encode().map_err(TransformFailure::Encode)
    }
}

/// Apply `transform` to every key of `source_ns` that passes `filter`,
/// writing each result to the same key in `dest_ns`.
///
/// Keys are processed one at a time in the store's native order. The first
/// failing key aborts the run; writes already made for earlier keys stay in
/// `dest_ns`. Cancellation is checked before each key and yields
/// [`Error::Cancelled`] carrying the keys written so far.
///
/// Returns the touched keys in processing order.
pub fn execute<St: StateStore>(
    cancel: &CancelToken,
    filter: &KeyFilter,
    store: &mut St,
    source_ns: &str,
    dest_ns: &str,
    transform: &dyn Transform,
) -> Result<Vec<String>> {
    let keys = store.list_keys(source_ns).map_err(|e| Error::Enumerate {
        namespace: source_ns.to_string(),
        source: e.into(),
    })?;

    let mut touched = Vec::new();
    for key in keys.into_iter().filter(|k| filter.matches(k)) {
        if cancel.is_cancelled() {
            info!(
                "cancelled {} -> {} after {} keys",
                source_ns,
                dest_ns,
                touched.len()
            );
            return Err(Error::Cancelled { touched });
        }

        let raw = match store.get(source_ns, &key) {
            Ok(Some(raw)) => raw,
            // Removed between enumeration and read.
            Ok(None) => continue,
            Err(e) => {
                return Err(Error::Read {
                    key,
                    source: e.into(),
                })
            }
        };

        let migrated = transform.apply(&raw).map_err(|failure| failure.at(&key))?;

        if let Err(e) = store.put(dest_ns, &key, &migrated) {
            return Err(Error::Write {
                key,
                source: e.into(),
            });
        }
        debug!(
            "migrated {key}: {} -> {}",
            transform.source_kind(),
            transform.destination_kind()
        );
        touched.push(key);
    }

    info!(
        "migrated {} records {} ({}) -> {} ({})",
        touched.len(),
        source_ns,
        transform.source_kind(),
        dest_ns,
        transform.destination_kind()
    );
    Ok(touched)
}
