//! MsgPack codec using `rmp-serde`.
//!
//! Structs are written with `to_vec_named` (struct-as-map) so that a server
//! built against another MsgPack library can read them by field name.
//! Tuples, sequences and maps are unaffected by the choice and stay
//! positional arrays / maps.

use crate::error::Result;

/// MessagePack codec for argument tuples and response payloads.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a value to MsgPack bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ChronologError::Serialization`](crate::ChronologError::Serialization)
    /// if the value cannot be serialized.
    #[inline]
    pub fn encode<T: serde::Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Decode MsgPack bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns [`ChronologError::Serialization`](crate::ChronologError::Serialization)
    /// if the bytes do not have the shape of `T`.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}
