//! Error types for serialization

/// Serialization error type
///
/// Messages are captured as strings so the error can be cloned into every reader of a
/// materialized view that failed to build.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SerializationError {
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    #[error("Invalid framing: {0}")]
    InvalidFraming(String),

    #[error("Unsupported type: {0}")]
    UnsupportedType(String),
}

impl SerializationError {
    /// Wrap a serde_json encoding error with context
    pub fn json_encode_error(context: &str, err: serde_json::Error) -> Self {
        SerializationError::SerializationFailed(format!("{}: {}", context, err))
    }

    /// Wrap a serde_json decoding error with context
    pub fn json_decode_error(context: &str, err: serde_json::Error) -> Self {
        SerializationError::DeserializationFailed(format!("{}: {}", context, err))
    }

    /// Truncated or malformed length-prefixed payload
    pub fn framing(message: impl Into<String>) -> Self {
        SerializationError::InvalidFraming(message.into())
    }
}
