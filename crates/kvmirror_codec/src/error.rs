//! Error types for the codec crate.

use std::fmt::Display;
use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during encoding or decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Failed to encode a value into a payload.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode payload bytes into the expected shape.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },

    /// A float had no JSON spelling under the active strategy.
    #[error("encoding failed: non-conforming float {value}")]
    NonConformingFloat {
        /// The rendered value (`inf`, `-inf` or `NaN`).
        value: String,
    },

    /// Key conversion produced the same key twice within one object.
    #[error("key conversion produced duplicate key {key:?}")]
    DuplicateKey {
        /// The converted key that collided.
        key: String,
    },
}

impl CodecError {
    /// Create an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Create a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }

    /// Returns true if this error came from the decoding side.
    pub fn is_decode(&self) -> bool {
        matches!(self, CodecError::DecodingFailed { .. })
    }
}

impl serde::ser::Error for CodecError {
    fn custom<T: Display>(msg: T) -> Self {
        CodecError::encoding_failed(msg.to_string())
    }
}

impl serde::de::Error for CodecError {
    fn custom<T: Display>(msg: T) -> Self {
        CodecError::decoding_failed(msg.to_string())
    }
}
