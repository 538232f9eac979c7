// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Conversion between values and stored payloads.
//!
//! Backends never see caller types. A value crosses the [`crate::Cache`] boundary as a
//! [`Payload`] that knows how to encode itself, and comes back through a [`Slot`] that knows
//! how to decode into the caller's type. Which byte format is used is the backend's choice of
//! [`Codec`].

use bincode::Options;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{Error, Result};

/// The byte format a backend stores values in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Codec {
    /// A compact private binary format, for payloads that never leave the process.
    Binary,
    /// JSON, for payloads that must be readable by other processes or languages.
    Json,
}

impl Codec {
    /// Serializes `value`, failing with [`crate::ErrorKind::Encoding`].
    pub fn encode<T: Serialize + ?Sized>(self, value: &T) -> Result<Vec<u8>> {
        match self {
            Self::Binary => binary().serialize(value).map_err(Error::encoding),
            Self::Json => serde_json::to_vec(value).map_err(Error::encoding),
        }
    }

    /// Deserializes `bytes`, failing with [`crate::ErrorKind::Decoding`] when the payload does
    /// not have the shape of `T`.
    pub fn decode<T: DeserializeOwned>(self, bytes: &[u8]) -> Result<T> {
        match self {
            Self::Binary => binary().deserialize(bytes).map_err(Error::decoding),
            Self::Json => serde_json::from_slice(bytes).map_err(Error::decoding),
        }
    }
}

// Trailing bytes are rejected so that a shorter type cannot silently decode a prefix of a
// longer payload.
fn binary() -> impl Options {
    bincode::DefaultOptions::new().reject_trailing_bytes()
}

/// A value that can be written to a cache.
///
/// Implemented for every `Serialize + Sync` type.
pub trait Payload: Sync {
    /// Encodes the value with the backend's codec.
    fn encode(&self, codec: Codec) -> Result<Vec<u8>>;
}

impl<T: Serialize + Sync> Payload for T {
    fn encode(&self, codec: Codec) -> Result<Vec<u8>> {
        codec.encode(self)
    }
}

/// A destination that a cache hit is decoded into.
///
/// Implemented for `Option<T>`: a successful decode stores `Some(value)`, while a miss or a
/// decoding failure leaves the slot as it was.
pub trait Slot: Send {
    /// Decodes `bytes` into this slot.
    fn fill(&mut self, codec: Codec, bytes: &[u8]) -> Result<()>;
}

impl<T: DeserializeOwned + Send> Slot for Option<T> {
    fn fill(&mut self, codec: Codec, bytes: &[u8]) -> Result<()> {
        *self = Some(codec.decode(bytes)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde::Deserialize;

    use super::*;
    use crate::ErrorKind;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        tags: Vec<String>,
        scores: BTreeMap<String, u32>,
    }

    fn profile() -> Profile {
        Profile {
            name: "ada".to_string(),
            tags: vec!["admin".to_string()],
            scores: BTreeMap::from([("chess".to_string(), 9)]),
        }
    }

    #[test]
    fn structured_values_survive_both_codecs() {
        for codec in [Codec::Binary, Codec::Json] {
            let bytes = codec.encode(&profile()).expect("encode");
            let decoded: Profile = codec.decode(&bytes).expect("decode");
            assert_eq!(decoded, profile(), "{codec:?}");
        }
    }

    #[test]
    fn integer_cannot_be_read_as_string() {
        for codec in [Codec::Binary, Codec::Json] {
            let bytes = codec.encode(&1_i32).expect("encode");
            let err = codec.decode::<String>(&bytes).expect_err("shape mismatch");
            assert_eq!(err.kind(), ErrorKind::Decoding, "{codec:?}");
        }
    }

    #[test]
    fn binary_rejects_trailing_bytes() {
        let bytes = Codec::Binary.encode(&(7_u8, 8_u8)).expect("encode");
        let err = Codec::Binary.decode::<u8>(&bytes).expect_err("trailing byte");
        assert_eq!(err.kind(), ErrorKind::Decoding);
    }

    #[test]
    fn json_payload_is_text() {
        let bytes = Codec::Json.encode(&vec![1, 2]).expect("encode");
        assert_eq!(bytes, b"[1,2]");
    }

    #[test]
    fn unserializable_value_is_an_encoding_error() {
        let mut map = BTreeMap::new();
        map.insert((1, 2), "tuple keys are not valid JSON object keys");
        let err = Codec::Json.encode(&map).expect_err("json keys must be strings");
        assert_eq!(err.kind(), ErrorKind::Encoding);
    }

    #[test]
    fn slot_is_untouched_on_decoding_failure() {
        let mut slot = Some("previous".to_string());
        let bytes = Codec::Json.encode(&42).expect("encode");
        slot.fill(Codec::Json, &bytes).expect_err("shape mismatch");
        assert_eq!(slot.as_deref(), Some("previous"));
    }

    #[test]
    fn payload_encodes_through_trait_object() {
        let value: &dyn Payload = &"hello";
        let bytes = value.encode(Codec::Json).expect("encode");
        assert_eq!(bytes, b"\"hello\"");
    }
}
