//! Payload decoder.

use crate::context;
use crate::de::TreeDeserializer;
use crate::encoder::rewrite_keys;
use crate::error::{CodecError, CodecResult};
use crate::keys::from_snake_case;
use crate::options::{DecodingOptions, KeyDecodingStrategy};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Decode payload bytes into a value using the given options.
///
/// # Errors
///
/// Returns [`CodecError::DecodingFailed`] if the bytes are not a valid
/// payload or do not match the shape of `T`.
pub fn from_payload<T: DeserializeOwned>(bytes: &[u8], options: &DecodingOptions) -> CodecResult<T> {
    let tree: Value =
        serde_json::from_slice(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))?;
    from_tree(tree, options)
}

/// Decode a JSON tree into a value using the given options.
///
/// # Errors
///
/// Same conditions as [`from_payload`].
pub fn from_tree<T: DeserializeOwned>(tree: Value, options: &DecodingOptions) -> CodecResult<T> {
    let tree = match options.keys {
        KeyDecodingStrategy::UseDefaultKeys => tree,
        KeyDecodingStrategy::ConvertFromSnakeCase => rewrite_keys(tree, &from_snake_case)
            .map_err(|e| CodecError::decoding_failed(e.to_string()))?,
    };
    context::scoped(&options.user_info, || {
        T::deserialize(TreeDeserializer::new(tree, options))
    })
}
