//! Encode/decode options carried by every path configuration.

use std::collections::BTreeMap;

/// How object keys are rewritten before a payload is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyEncodingStrategy {
    /// Keep the keys produced by the type's `Serialize` impl.
    #[default]
    UseDefaultKeys,
    /// Rewrite `camelCaseKeys` to `snake_case_keys`.
    ConvertToSnakeCase,
}

/// How object keys are rewritten before a payload is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyDecodingStrategy {
    /// Keep the keys exactly as stored.
    #[default]
    UseDefaultKeys,
    /// Rewrite `snake_case_keys` to `camelCaseKeys`.
    ConvertFromSnakeCase,
}

/// How a [`Timestamp`](crate::Timestamp) is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DateEncodingStrategy {
    /// RFC 3339 string in UTC.
    #[default]
    Iso8601,
    /// Fractional seconds since the Unix epoch.
    SecondsSince1970,
    /// Fractional milliseconds since the Unix epoch.
    MillisecondsSince1970,
}

/// How a [`Timestamp`](crate::Timestamp) is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DateDecodingStrategy {
    /// RFC 3339 string with any offset.
    #[default]
    Iso8601,
    /// Fractional seconds since the Unix epoch.
    SecondsSince1970,
    /// Fractional milliseconds since the Unix epoch.
    MillisecondsSince1970,
}

/// How a [`Blob`](crate::Blob) is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataEncodingStrategy {
    /// Standard padded base64 string.
    #[default]
    Base64,
    /// Array of byte values.
    Bytes,
}

/// How a [`Blob`](crate::Blob) is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataDecodingStrategy {
    /// Standard padded base64 string.
    #[default]
    Base64,
    /// Array of byte values.
    Bytes,
}

/// What to do with infinite and NaN floats on the write path.
///
/// Payloads are JSON, which has no spelling for these values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum NonConformingFloatEncodingStrategy {
    /// Fail the encode.
    #[default]
    Throw,
    /// Write the matching sentinel string instead.
    ConvertToString {
        /// Written for `f64::INFINITY`.
        positive_infinity: String,
        /// Written for `f64::NEG_INFINITY`.
        negative_infinity: String,
        /// Written for any NaN.
        nan: String,
    },
}

impl NonConformingFloatEncodingStrategy {
    /// `ConvertToString` with the sentinels `"+inf"`, `"-inf"` and `"nan"`.
    pub fn convert_to_string() -> Self {
        NonConformingFloatEncodingStrategy::ConvertToString {
            positive_infinity: "+inf".into(),
            negative_infinity: "-inf".into(),
            nan: "nan".into(),
        }
    }
}

/// What to do with sentinel strings where a float is expected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum NonConformingFloatDecodingStrategy {
    /// A string is never a float.
    #[default]
    Throw,
    /// Read the matching sentinel string back as a non-finite float.
    ConvertFromString {
        /// Read as `f64::INFINITY`.
        positive_infinity: String,
        /// Read as `f64::NEG_INFINITY`.
        negative_infinity: String,
        /// Read as NaN.
        nan: String,
    },
}

impl NonConformingFloatDecodingStrategy {
    /// `ConvertFromString` with the sentinels `"+inf"`, `"-inf"` and `"nan"`.
    pub fn convert_from_string() -> Self {
        NonConformingFloatDecodingStrategy::ConvertFromString {
            positive_infinity: "+inf".into(),
            negative_infinity: "-inf".into(),
            nan: "nan".into(),
        }
    }
}

/// Caller context made visible to `Serialize`/`Deserialize` impls through
/// [`user_info`](crate::user_info) while a codec call runs.
pub type UserInfo = BTreeMap<String, String>;

/// Options applied when encoding a value into a payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct EncodingOptions {
    /// Key rewriting strategy.
    pub keys: KeyEncodingStrategy,
    /// Timestamp representation.
    pub dates: DateEncodingStrategy,
    /// Binary representation.
    pub data: DataEncodingStrategy,
    /// Handling of infinite and NaN floats.
    pub floats: NonConformingFloatEncodingStrategy,
    /// Context for custom `Serialize` impls.
    pub user_info: UserInfo,
}

impl EncodingOptions {
    /// Sets the key encoding strategy.
    pub fn with_keys(mut self, keys: KeyEncodingStrategy) -> Self {
        self.keys = keys;
        self
    }

    /// Sets the timestamp strategy.
    pub fn with_dates(mut self, dates: DateEncodingStrategy) -> Self {
        self.dates = dates;
        self
    }

    /// Sets the binary strategy.
    pub fn with_data(mut self, data: DataEncodingStrategy) -> Self {
        self.data = data;
        self
    }

    /// Sets the non-finite float strategy.
    pub fn with_floats(mut self, floats: NonConformingFloatEncodingStrategy) -> Self {
        self.floats = floats;
        self
    }

    /// Adds one user info entry.
    pub fn with_user_info(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.user_info.insert(key.into(), value.into());
        self
    }
}

/// Options applied when decoding a payload into a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DecodingOptions {
    /// Key rewriting strategy.
    pub keys: KeyDecodingStrategy,
    /// Timestamp representation.
    pub dates: DateDecodingStrategy,
    /// Binary representation.
    pub data: DataDecodingStrategy,
    /// Handling of sentinel strings in float position.
    pub floats: NonConformingFloatDecodingStrategy,
    /// Context for custom `Deserialize` impls.
    pub user_info: UserInfo,
}

impl DecodingOptions {
    /// Sets the key decoding strategy.
    pub fn with_keys(mut self, keys: KeyDecodingStrategy) -> Self {
        self.keys = keys;
        self
    }

    /// Sets the timestamp strategy.
    pub fn with_dates(mut self, dates: DateDecodingStrategy) -> Self {
        self.dates = dates;
        self
    }

    /// Sets the binary strategy.
    pub fn with_data(mut self, data: DataDecodingStrategy) -> Self {
        self.data = data;
        self
    }

    /// Sets the non-finite float strategy.
    pub fn with_floats(mut self, floats: NonConformingFloatDecodingStrategy) -> Self {
        self.floats = floats;
        self
    }

    /// Adds one user info entry.
    pub fn with_user_info(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.user_info.insert(key.into(), value.into());
        self
    }
}

/// The pair of options a backend configuration forwards to the codec.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CodecOptions {
    /// Options used on the write path.
    pub encoding: EncodingOptions,
    /// Options used on the read path.
    pub decoding: DecodingOptions,
}

impl CodecOptions {
    /// Defaults used by document-store paths: binary as byte arrays.
    pub fn document_store_default() -> Self {
        Self {
            encoding: EncodingOptions::default().with_data(DataEncodingStrategy::Bytes),
            decoding: DecodingOptions::default().with_data(DataDecodingStrategy::Bytes),
        }
    }

    /// Defaults used by tree-store paths.
    pub fn tree_store_default() -> Self {
        Self::default()
    }

    /// Options that store keys in snake case and read them back in camel case.
    pub fn snake_case() -> Self {
        Self {
            encoding: EncodingOptions::default().with_keys(KeyEncodingStrategy::ConvertToSnakeCase),
            decoding: DecodingOptions::default()
                .with_keys(KeyDecodingStrategy::ConvertFromSnakeCase),
        }
    }

    /// Returns these options with non-finite floats written and read as
    /// the default sentinel strings.
    pub fn with_string_floats(mut self) -> Self {
        self.encoding.floats = NonConformingFloatEncodingStrategy::convert_to_string();
        self.decoding.floats = NonConformingFloatDecodingStrategy::convert_from_string();
        self
    }
}
