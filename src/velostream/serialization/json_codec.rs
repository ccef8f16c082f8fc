//! JSON codec for any serde-enabled element type
//!
//! This is the default serde for datasets created from literal values, so the expected
//! side of an assertion and the actual side share an encoding unless the caller picks
//! another one.

use super::{Serde, SerializationError, SharedSerde};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// JSON codec backed by serde_json
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new JsonCodec
    pub fn new() -> Self {
        JsonCodec
    }

    /// JsonCodec as a shared serde for `T`
    pub fn shared<T>() -> SharedSerde<T>
    where
        T: Serialize + DeserializeOwned,
    {
        Arc::new(JsonCodec)
    }
}

impl<T> Serde<T> for JsonCodec
where
    T: Serialize + DeserializeOwned,
{
    fn serialize(&self, value: &T) -> Result<Vec<u8>, SerializationError> {
        serde_json::to_vec(value)
            .map_err(|e| SerializationError::json_encode_error("Failed to serialize JSON", e))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<T, SerializationError> {
        serde_json::from_slice(bytes)
            .map_err(|e| SerializationError::json_decode_error("Failed to parse JSON", e))
    }

    fn format_name(&self) -> &'static str {
        "JSON"
    }
}
