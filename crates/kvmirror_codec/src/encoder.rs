//! Payload encoder.

use crate::context;
use crate::error::{CodecError, CodecResult};
use crate::keys::to_snake_case;
use crate::options::{EncodingOptions, KeyEncodingStrategy};
use crate::ser::TreeSerializer;
use serde::Serialize;
use serde_json::{Map, Value};

/// Encode a value into payload bytes using the given options.
///
/// The value is first serialized into a JSON tree so that key rewriting can
/// be applied uniformly, then written out compactly.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized, if it holds a
/// non-finite float while [`NonConformingFloatEncodingStrategy::Throw`] is
/// active, or if key rewriting maps two keys of the same object onto one.
///
/// [`NonConformingFloatEncodingStrategy::Throw`]: crate::NonConformingFloatEncodingStrategy::Throw
pub fn to_payload<T: Serialize + ?Sized>(
    value: &T,
    options: &EncodingOptions,
) -> CodecResult<Vec<u8>> {
    let tree = to_tree(value, options)?;
    serde_json::to_vec(&tree).map_err(|e| CodecError::encoding_failed(e.to_string()))
}

/// Encode a value into a JSON tree using the given options.
///
/// # Errors
///
/// Same conditions as [`to_payload`].
pub fn to_tree<T: Serialize + ?Sized>(value: &T, options: &EncodingOptions) -> CodecResult<Value> {
    let tree = context::scoped(&options.user_info, || {
        value.serialize(TreeSerializer::new(options))
    })?;
    match options.keys {
        KeyEncodingStrategy::UseDefaultKeys => Ok(tree),
        KeyEncodingStrategy::ConvertToSnakeCase => rewrite_keys(tree, &to_snake_case),
    }
}

/// Rewrites every object key in the tree, depth first.
pub(crate) fn rewrite_keys(value: Value, convert: &dyn Fn(&str) -> String) -> CodecResult<Value> {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, child) in map {
                let converted = convert(&key);
                let child = rewrite_keys(child, convert)?;
                if out.insert(converted.clone(), child).is_some() {
                    return Err(CodecError::DuplicateKey { key: converted });
                }
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => items
            .into_iter()
            .map(|item| rewrite_keys(item, convert))
            .collect::<CodecResult<Vec<_>>>()
            .map(Value::Array),
        other => Ok(other),
    }
}
