//! Default postcard codec for [`Record`] implementations.

use serde::{de::DeserializeOwned, Serialize};

use crate::kind::{CodecError, Record};

/// Serialize a record with postcard.
pub fn encode<T: Record + Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    postcard::to_allocvec(value).map_err(|e| CodecError::Encode {
        kind: T::KIND,
        message: e.to_string(),
    })
}

/// Deserialize a record with postcard.
pub fn decode<T: Record + DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    postcard::from_bytes(bytes).map_err(|e| CodecError::Decode {
        kind: T::KIND,
        message: e.to_string(),
    })
}
