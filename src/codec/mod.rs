//! Codec module - serialization of argument tuples and response payloads.
//!
//! - [`MsgPackCodec`] - MessagePack using `rmp-serde`
//!
//! Argument tuples are encoded as MsgPack arrays in declared order, so
//! `(client_id, name, attrs, flags)` becomes a 4-element array whose third
//! element is a map. Response shapes decode the same way: a bare status is
//! an integer, a status pair is a 2-element array, a listing is an array of
//! strings.
//!
//! # Example
//!
//! ```
//! use chronolog_client::codec::MsgPackCodec;
//!
//! let encoded = MsgPackCodec::encode(&(7u32, "TestChronicle")).unwrap();
//! let decoded: (u32, String) = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, (7, "TestChronicle".to_string()));
//! ```

mod msgpack;

pub use msgpack::MsgPackCodec;
