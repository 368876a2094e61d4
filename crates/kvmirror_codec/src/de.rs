//! Deserializer reading a JSON tree under the decoding options.
//!
//! Leaves are handed to `serde_json::Value`; arrays, objects and enums are
//! walked here so that every nested float, [`Timestamp`](crate::Timestamp)
//! and [`Blob`](crate::Blob) sees the strategies.

use crate::base64;
use crate::error::{CodecError, CodecResult};
use crate::options::{
    DataDecodingStrategy, DateDecodingStrategy, DecodingOptions, NonConformingFloatDecodingStrategy,
};
use crate::types::{Timestamp, BLOB_TOKEN, TIMESTAMP_TOKEN};
use serde::de::{
    self, DeserializeSeed, Deserializer, EnumAccess, IntoDeserializer, MapAccess, SeqAccess,
    VariantAccess, Visitor,
};
use serde::de::value::StringDeserializer;
use serde::forward_to_deserialize_any;
use serde_json::{map, Value};
use std::vec;

fn json_error(err: serde_json::Error) -> CodecError {
    CodecError::decoding_failed(err.to_string())
}

pub(crate) struct TreeDeserializer<'o> {
    value: Value,
    options: &'o DecodingOptions,
}

impl<'o> TreeDeserializer<'o> {
    pub(crate) fn new(value: Value, options: &'o DecodingOptions) -> Self {
        Self { value, options }
    }

    fn sentinel(&self) -> Option<f64> {
        let (Value::String(text), NonConformingFloatDecodingStrategy::ConvertFromString {
            positive_infinity,
            negative_infinity,
            nan,
        }) = (&self.value, &self.options.floats)
        else {
            return None;
        };
        if text == positive_infinity {
            Some(f64::INFINITY)
        } else if text == negative_infinity {
            Some(f64::NEG_INFINITY)
        } else if text == nan {
            Some(f64::NAN)
        } else {
            None
        }
    }

    /// Rewrites a stored timestamp into its RFC 3339 form.
    fn canonical_timestamp(&self) -> CodecResult<Value> {
        let stamp = match (self.options.dates, &self.value) {
            (DateDecodingStrategy::Iso8601, Value::String(text)) => {
                return Ok(Value::String(text.clone()))
            }
            (DateDecodingStrategy::SecondsSince1970, Value::Number(n)) => {
                n.as_f64().and_then(Timestamp::from_unix_seconds)
            }
            (DateDecodingStrategy::MillisecondsSince1970, Value::Number(n)) => n
                .as_f64()
                .and_then(|millis| Timestamp::from_unix_seconds(millis / 1000.0)),
            (strategy, other) => {
                return Err(CodecError::decoding_failed(format!(
                    "expected a {strategy:?} timestamp, found {other}"
                )))
            }
        };
        stamp
            .map(|stamp| Value::String(stamp.to_rfc3339()))
            .ok_or_else(|| CodecError::decoding_failed(format!("timestamp out of range: {}", self.value)))
    }

    /// Rewrites stored binary into its base64 form.
    fn canonical_blob(&self) -> CodecResult<Value> {
        match (self.options.data, &self.value) {
            (DataDecodingStrategy::Base64, Value::String(text)) => Ok(Value::String(text.clone())),
            (DataDecodingStrategy::Bytes, Value::Array(items)) => {
                let bytes = items
                    .iter()
                    .map(|item| {
                        item.as_u64()
                            .and_then(|byte| u8::try_from(byte).ok())
                            .ok_or_else(|| CodecError::decoding_failed(format!("not a byte: {item}")))
                    })
                    .collect::<CodecResult<Vec<u8>>>()?;
                Ok(Value::String(base64::encode(&bytes)))
            }
            (strategy, other) => Err(CodecError::decoding_failed(format!(
                "expected {strategy:?} binary, found {other}"
            ))),
        }
    }

    fn float<'de, V: Visitor<'de>>(self, visitor: V) -> CodecResult<V::Value> {
        match self.sentinel() {
            Some(v) => visitor.visit_f64(v),
            None => self.deserialize_any(visitor),
        }
    }
}

impl<'de> Deserializer<'de> for TreeDeserializer<'_> {
    type Error = CodecError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> CodecResult<V::Value> {
        match self.value {
            Value::Array(items) => visitor.visit_seq(SeqDeserializer {
                items: items.into_iter(),
                options: self.options,
            }),
            Value::Object(entries) => visitor.visit_map(MapDeserializer {
                entries: entries.into_iter(),
                pending: None,
                options: self.options,
            }),
            leaf => leaf.deserialize_any(visitor).map_err(json_error),
        }
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> CodecResult<V::Value> {
        self.float(visitor)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> CodecResult<V::Value> {
        self.float(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> CodecResult<V::Value> {
        match self.value {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> CodecResult<V::Value> {
        let value = match name {
            TIMESTAMP_TOKEN => self.canonical_timestamp()?,
            BLOB_TOKEN => self.canonical_blob()?,
            _ => self.value,
        };
        visitor.visit_newtype_struct(TreeDeserializer::new(value, self.options))
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> CodecResult<V::Value> {
        match self.value {
            Value::String(variant) => visitor.visit_enum(variant.into_deserializer()),
            Value::Object(entries) if entries.len() == 1 => {
                let mut entries = entries.into_iter();
                match entries.next() {
                    Some((variant, value)) => visitor.visit_enum(EnumDeserializer {
                        variant,
                        value,
                        options: self.options,
                    }),
                    None => Err(CodecError::decoding_failed("empty enum object")),
                }
            }
            other => Err(CodecError::decoding_failed(format!(
                "expected an enum variant, found {other}"
            ))),
        }
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map struct
        identifier ignored_any
    }
}

struct SeqDeserializer<'o> {
    items: vec::IntoIter<Value>,
    options: &'o DecodingOptions,
}

impl<'de> SeqAccess<'de> for SeqDeserializer<'_> {
    type Error = CodecError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> CodecResult<Option<T::Value>> {
        match self.items.next() {
            Some(item) => seed
                .deserialize(TreeDeserializer::new(item, self.options))
                .map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

struct MapDeserializer<'o> {
    entries: map::IntoIter,
    pending: Option<Value>,
    options: &'o DecodingOptions,
}

impl<'de> MapAccess<'de> for MapDeserializer<'_> {
    type Error = CodecError;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> CodecResult<Option<K::Value>> {
        match self.entries.next() {
            Some((key, value)) => {
                self.pending = Some(value);
                seed.deserialize(KeyDeserializer { key }).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> CodecResult<V::Value> {
        let value = self
            .pending
            .take()
            .ok_or_else(|| CodecError::decoding_failed("map value requested before its key"))?;
        seed.deserialize(TreeDeserializer::new(value, self.options))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

struct EnumDeserializer<'o> {
    variant: String,
    value: Value,
    options: &'o DecodingOptions,
}

impl<'de, 'o> EnumAccess<'de> for EnumDeserializer<'o> {
    type Error = CodecError;
    type Variant = TreeDeserializer<'o>;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> CodecResult<(V::Value, TreeDeserializer<'o>)> {
        let name: StringDeserializer<CodecError> = self.variant.into_deserializer();
        let variant = seed.deserialize(name)?;
        Ok((variant, TreeDeserializer::new(self.value, self.options)))
    }
}

impl<'de> VariantAccess<'de> for TreeDeserializer<'_> {
    type Error = CodecError;

    fn unit_variant(self) -> CodecResult<()> {
        match self.value {
            Value::Null => Ok(()),
            other => Err(CodecError::decoding_failed(format!(
                "expected a unit variant, found {other}"
            ))),
        }
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> CodecResult<T::Value> {
        seed.deserialize(self)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> CodecResult<V::Value> {
        self.deserialize_any(visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> CodecResult<V::Value> {
        self.deserialize_any(visitor)
    }
}

/// Object keys are strings; numeric key types parse them.
struct KeyDeserializer {
    key: String,
}

macro_rules! deserialize_parsed_key {
    ($($method:ident => $visit:ident),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> CodecResult<V::Value> {
                match self.key.parse() {
                    Ok(parsed) => visitor.$visit(parsed),
                    Err(_) => Err(de::Error::invalid_value(
                        de::Unexpected::Str(&self.key),
                        &visitor,
                    )),
                }
            }
        )*
    };
}

impl<'de> Deserializer<'de> for KeyDeserializer {
    type Error = CodecError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> CodecResult<V::Value> {
        visitor.visit_string(self.key)
    }

    deserialize_parsed_key! {
        deserialize_bool => visit_bool,
        deserialize_i8 => visit_i8,
        deserialize_i16 => visit_i16,
        deserialize_i32 => visit_i32,
        deserialize_i64 => visit_i64,
        deserialize_u8 => visit_u8,
        deserialize_u16 => visit_u16,
        deserialize_u32 => visit_u32,
        deserialize_u64 => visit_u64,
        deserialize_f32 => visit_f32,
        deserialize_f64 => visit_f64,
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> CodecResult<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> CodecResult<V::Value> {
        visitor.visit_enum(self.key.into_deserializer())
    }

    forward_to_deserialize_any! {
        i128 u128 char str string bytes byte_buf option unit unit_struct seq
        tuple tuple_struct map struct identifier ignored_any
    }
}
