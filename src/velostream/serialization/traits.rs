//! Serialization traits

use super::SerializationError;
use std::sync::Arc;

/// Trait for serdes that can convert between values and bytes
///
/// Every value a pipeline moves across a worker boundary goes through one of these.
/// Implementations must round-trip exactly: `deserialize(serialize(v)) == v`.
pub trait Serde<T>: Send + Sync {
    /// Serialize a value to bytes
    fn serialize(&self, value: &T) -> Result<Vec<u8>, SerializationError>;

    /// Deserialize bytes to a value
    fn deserialize(&self, bytes: &[u8]) -> Result<T, SerializationError>;

    /// Get the format identifier
    fn format_name(&self) -> &'static str {
        "custom"
    }
}

/// Serde shared between a dataset, the assertions built on it and the worker tasks
pub type SharedSerde<T> = Arc<dyn Serde<T>>;
