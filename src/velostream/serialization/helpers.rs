//! Serde round-trip helper used to isolate checked values

use super::{Serde, SerializationError};

/// Deep-copy a value by encoding and decoding it
///
/// The copy never aliases the original, and a serde that cannot round-trip the value
/// reports the failure here rather than downstream.
pub fn clone_via<T>(serde: &dyn Serde<T>, value: &T) -> Result<T, SerializationError> {
    let bytes = serde.serialize(value)?;
    serde.deserialize(&bytes)
}
