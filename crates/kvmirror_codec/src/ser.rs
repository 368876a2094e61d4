//! Serializer producing a JSON tree under the encoding options.
//!
//! Works like `serde_json::to_value` except where JSON has no direct
//! spelling: non-finite floats follow the float strategy instead of
//! silently becoming `null`, and [`Timestamp`](crate::Timestamp) and
//! [`Blob`](crate::Blob) follow the date and data strategies.

use crate::base64;
use crate::error::{CodecError, CodecResult};
use crate::options::{
    DataEncodingStrategy, DateEncodingStrategy, EncodingOptions, NonConformingFloatEncodingStrategy,
};
use crate::types::{Timestamp, BLOB_TOKEN, TIMESTAMP_TOKEN};
use serde::ser::{self, Impossible, Serialize};
use serde_json::{Map, Number, Value};

#[derive(Clone, Copy)]
pub(crate) struct TreeSerializer<'o> {
    options: &'o EncodingOptions,
}

impl<'o> TreeSerializer<'o> {
    pub(crate) fn new(options: &'o EncodingOptions) -> Self {
        Self { options }
    }

    fn tree<T: Serialize + ?Sized>(self, value: &T) -> CodecResult<Value> {
        value.serialize(self)
    }

    fn float(self, v: f64) -> CodecResult<Value> {
        if let Some(number) = Number::from_f64(v) {
            return Ok(Value::Number(number));
        }
        match &self.options.floats {
            NonConformingFloatEncodingStrategy::Throw => Err(CodecError::NonConformingFloat {
                value: v.to_string(),
            }),
            NonConformingFloatEncodingStrategy::ConvertToString {
                positive_infinity,
                negative_infinity,
                nan,
            } => {
                let sentinel = if v.is_nan() {
                    nan
                } else if v > 0.0 {
                    positive_infinity
                } else {
                    negative_infinity
                };
                Ok(Value::String(sentinel.clone()))
            }
        }
    }

    fn timestamp(self, canonical: Value) -> CodecResult<Value> {
        let Value::String(text) = canonical else {
            return Err(CodecError::encoding_failed("timestamp must serialize as a string"));
        };
        let stamp = Timestamp::parse_rfc3339(&text).map_err(CodecError::encoding_failed)?;
        match self.options.dates {
            DateEncodingStrategy::Iso8601 => Ok(Value::String(stamp.to_rfc3339())),
            DateEncodingStrategy::SecondsSince1970 => self.float(stamp.unix_seconds()),
            DateEncodingStrategy::MillisecondsSince1970 => self.float(stamp.unix_millis()),
        }
    }

    fn blob(self, canonical: Value) -> CodecResult<Value> {
        match self.options.data {
            DataEncodingStrategy::Base64 => Ok(canonical),
            DataEncodingStrategy::Bytes => {
                let Value::String(text) = canonical else {
                    return Err(CodecError::encoding_failed("blob must serialize as a string"));
                };
                let bytes = base64::decode(&text).map_err(CodecError::encoding_failed)?;
                Ok(Value::Array(bytes.into_iter().map(Value::from).collect()))
            }
        }
    }
}

impl<'o> ser::Serializer for TreeSerializer<'o> {
    type Ok = Value;
    type Error = CodecError;

    type SerializeSeq = SeqSerializer<'o>;
    type SerializeTuple = SeqSerializer<'o>;
    type SerializeTupleStruct = SeqSerializer<'o>;
    type SerializeTupleVariant = VariantSeqSerializer<'o>;
    type SerializeMap = MapSerializer<'o>;
    type SerializeStruct = MapSerializer<'o>;
    type SerializeStructVariant = VariantMapSerializer<'o>;

    fn serialize_bool(self, v: bool) -> CodecResult<Value> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> CodecResult<Value> {
        Ok(Value::from(v))
    }

    fn serialize_i16(self, v: i16) -> CodecResult<Value> {
        Ok(Value::from(v))
    }

    fn serialize_i32(self, v: i32) -> CodecResult<Value> {
        Ok(Value::from(v))
    }

    fn serialize_i64(self, v: i64) -> CodecResult<Value> {
        Ok(Value::from(v))
    }

    fn serialize_u8(self, v: u8) -> CodecResult<Value> {
        Ok(Value::from(v))
    }

    fn serialize_u16(self, v: u16) -> CodecResult<Value> {
        Ok(Value::from(v))
    }

    fn serialize_u32(self, v: u32) -> CodecResult<Value> {
        Ok(Value::from(v))
    }

    fn serialize_u64(self, v: u64) -> CodecResult<Value> {
        Ok(Value::from(v))
    }

    fn serialize_f32(self, v: f32) -> CodecResult<Value> {
        self.float(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> CodecResult<Value> {
        self.float(v)
    }

    fn serialize_char(self, v: char) -> CodecResult<Value> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> CodecResult<Value> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> CodecResult<Value> {
        Ok(Value::Array(v.iter().copied().map(Value::from).collect()))
    }

    fn serialize_none(self) -> CodecResult<Value> {
        Ok(Value::Null)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> CodecResult<Value> {
        self.tree(value)
    }

    fn serialize_unit(self) -> CodecResult<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> CodecResult<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> CodecResult<Value> {
        Ok(Value::String(variant.to_string()))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        value: &T,
    ) -> CodecResult<Value> {
        let inner = self.tree(value)?;
        match name {
            TIMESTAMP_TOKEN => self.timestamp(inner),
            BLOB_TOKEN => self.blob(inner),
            _ => Ok(inner),
        }
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> CodecResult<Value> {
        let mut map = Map::new();
        map.insert(variant.to_string(), self.tree(value)?);
        Ok(Value::Object(map))
    }

    fn serialize_seq(self, len: Option<usize>) -> CodecResult<SeqSerializer<'o>> {
        Ok(SeqSerializer {
            serializer: self,
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> CodecResult<SeqSerializer<'o>> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> CodecResult<SeqSerializer<'o>> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> CodecResult<VariantSeqSerializer<'o>> {
        Ok(VariantSeqSerializer {
            variant,
            seq: self.serialize_seq(Some(len))?,
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> CodecResult<MapSerializer<'o>> {
        Ok(MapSerializer {
            serializer: self,
            map: Map::new(),
            next_key: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> CodecResult<MapSerializer<'o>> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> CodecResult<VariantMapSerializer<'o>> {
        Ok(VariantMapSerializer {
            variant,
            map: self.serialize_map(Some(len))?,
        })
    }
}

pub(crate) struct SeqSerializer<'o> {
    serializer: TreeSerializer<'o>,
    items: Vec<Value>,
}

impl SeqSerializer<'_> {
    fn push<T: Serialize + ?Sized>(&mut self, value: &T) -> CodecResult<()> {
        self.items.push(self.serializer.tree(value)?);
        Ok(())
    }
}

impl ser::SerializeSeq for SeqSerializer<'_> {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> CodecResult<()> {
        self.push(value)
    }

    fn end(self) -> CodecResult<Value> {
        Ok(Value::Array(self.items))
    }
}

impl ser::SerializeTuple for SeqSerializer<'_> {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> CodecResult<()> {
        self.push(value)
    }

    fn end(self) -> CodecResult<Value> {
        Ok(Value::Array(self.items))
    }
}

impl ser::SerializeTupleStruct for SeqSerializer<'_> {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> CodecResult<()> {
        self.push(value)
    }

    fn end(self) -> CodecResult<Value> {
        Ok(Value::Array(self.items))
    }
}

pub(crate) struct VariantSeqSerializer<'o> {
    variant: &'static str,
    seq: SeqSerializer<'o>,
}

impl ser::SerializeTupleVariant for VariantSeqSerializer<'_> {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> CodecResult<()> {
        self.seq.push(value)
    }

    fn end(self) -> CodecResult<Value> {
        let mut map = Map::new();
        map.insert(self.variant.to_string(), Value::Array(self.seq.items));
        Ok(Value::Object(map))
    }
}

pub(crate) struct MapSerializer<'o> {
    serializer: TreeSerializer<'o>,
    map: Map<String, Value>,
    next_key: Option<String>,
}

impl MapSerializer<'_> {
    fn field<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> CodecResult<()> {
        let value = self.serializer.tree(value)?;
        self.map.insert(key.to_string(), value);
        Ok(())
    }
}

impl ser::SerializeMap for MapSerializer<'_> {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> CodecResult<()> {
        self.next_key = Some(key.serialize(KeySerializer)?);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> CodecResult<()> {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| CodecError::encoding_failed("map value without a key"))?;
        self.field(&key, value)
    }

    fn end(self) -> CodecResult<Value> {
        Ok(Value::Object(self.map))
    }
}

impl ser::SerializeStruct for MapSerializer<'_> {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> CodecResult<()> {
        self.field(key, value)
    }

    fn end(self) -> CodecResult<Value> {
        Ok(Value::Object(self.map))
    }
}

pub(crate) struct VariantMapSerializer<'o> {
    variant: &'static str,
    map: MapSerializer<'o>,
}

impl ser::SerializeStructVariant for VariantMapSerializer<'_> {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> CodecResult<()> {
        self.map.field(key, value)
    }

    fn end(self) -> CodecResult<Value> {
        let mut outer = Map::new();
        outer.insert(self.variant.to_string(), Value::Object(self.map.map));
        Ok(Value::Object(outer))
    }
}

/// Renders map keys as strings; JSON objects have no other key type.
struct KeySerializer;

fn key_must_be_a_string() -> CodecError {
    CodecError::encoding_failed("key must be a string")
}

impl ser::Serializer for KeySerializer {
    type Ok = String;
    type Error = CodecError;

    type SerializeSeq = Impossible<String, CodecError>;
    type SerializeTuple = Impossible<String, CodecError>;
    type SerializeTupleStruct = Impossible<String, CodecError>;
    type SerializeTupleVariant = Impossible<String, CodecError>;
    type SerializeMap = Impossible<String, CodecError>;
    type SerializeStruct = Impossible<String, CodecError>;
    type SerializeStructVariant = Impossible<String, CodecError>;

    fn serialize_bool(self, v: bool) -> CodecResult<String> {
        Ok(v.to_string())
    }

    fn serialize_i8(self, v: i8) -> CodecResult<String> {
        Ok(v.to_string())
    }

    fn serialize_i16(self, v: i16) -> CodecResult<String> {
        Ok(v.to_string())
    }

    fn serialize_i32(self, v: i32) -> CodecResult<String> {
        Ok(v.to_string())
    }

    fn serialize_i64(self, v: i64) -> CodecResult<String> {
        Ok(v.to_string())
    }

    fn serialize_u8(self, v: u8) -> CodecResult<String> {
        Ok(v.to_string())
    }

    fn serialize_u16(self, v: u16) -> CodecResult<String> {
        Ok(v.to_string())
    }

    fn serialize_u32(self, v: u32) -> CodecResult<String> {
        Ok(v.to_string())
    }

    fn serialize_u64(self, v: u64) -> CodecResult<String> {
        Ok(v.to_string())
    }

    fn serialize_f32(self, v: f32) -> CodecResult<String> {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> CodecResult<String> {
        if v.is_finite() {
            Ok(v.to_string())
        } else {
            Err(CodecError::NonConformingFloat {
                value: v.to_string(),
            })
        }
    }

    fn serialize_char(self, v: char) -> CodecResult<String> {
        Ok(v.to_string())
    }

    fn serialize_str(self, v: &str) -> CodecResult<String> {
        Ok(v.to_string())
    }

    fn serialize_bytes(self, _v: &[u8]) -> CodecResult<String> {
        Err(key_must_be_a_string())
    }

    fn serialize_none(self) -> CodecResult<String> {
        Err(key_must_be_a_string())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, _value: &T) -> CodecResult<String> {
        Err(key_must_be_a_string())
    }

    fn serialize_unit(self) -> CodecResult<String> {
        Err(key_must_be_a_string())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> CodecResult<String> {
        Err(key_must_be_a_string())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> CodecResult<String> {
        Ok(variant.to_string())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> CodecResult<String> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> CodecResult<String> {
        Err(key_must_be_a_string())
    }

    fn serialize_seq(self, _len: Option<usize>) -> CodecResult<Self::SerializeSeq> {
        Err(key_must_be_a_string())
    }

    fn serialize_tuple(self, _len: usize) -> CodecResult<Self::SerializeTuple> {
        Err(key_must_be_a_string())
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> CodecResult<Self::SerializeTupleStruct> {
        Err(key_must_be_a_string())
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> CodecResult<Self::SerializeTupleVariant> {
        Err(key_must_be_a_string())
    }

    fn serialize_map(self, _len: Option<usize>) -> CodecResult<Self::SerializeMap> {
        Err(key_must_be_a_string())
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> CodecResult<Self::SerializeStruct> {
        Err(key_must_be_a_string())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> CodecResult<Self::SerializeStructVariant> {
        Err(key_must_be_a_string())
    }
}
