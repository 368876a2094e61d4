//! Values whose payload representation is chosen by the codec options.
//!
//! Outside the codec both types serialize to their default form: an
//! RFC 3339 string and a base64 string.

use crate::base64;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

pub(crate) const TIMESTAMP_TOKEN: &str = "$kvmirror::Timestamp";
pub(crate) const BLOB_TOKEN: &str = "$kvmirror::Blob";

/// A point in time, written per [`DateEncodingStrategy`](crate::DateEncodingStrategy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// The current time.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Milliseconds since the Unix epoch, or `None` when out of range.
    pub fn from_unix_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(Self)
    }

    /// Fractional seconds since the Unix epoch, or `None` when out of range.
    pub fn from_unix_seconds(seconds: f64) -> Option<Self> {
        if !seconds.is_finite() {
            return None;
        }
        let whole = seconds.floor();
        let nanos = (((seconds - whole) * 1e9).round() as u32).min(999_999_999);
        DateTime::from_timestamp(whole as i64, nanos).map(Self)
    }

    /// Fractional seconds since the Unix epoch.
    pub fn unix_seconds(&self) -> f64 {
        self.0.timestamp() as f64 + f64::from(self.0.timestamp_subsec_nanos()) / 1e9
    }

    /// Fractional milliseconds since the Unix epoch.
    pub fn unix_millis(&self) -> f64 {
        self.0.timestamp_millis() as f64
            + f64::from(self.0.timestamp_subsec_nanos() % 1_000_000) / 1e6
    }

    pub(crate) fn to_rfc3339(self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    pub(crate) fn parse_rfc3339(text: &str) -> Result<Self, String> {
        DateTime::parse_from_rfc3339(text)
            .map(|parsed| Self(parsed.with_timezone(&Utc)))
            .map_err(|err| format!("invalid timestamp {text:?}: {err}"))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(TIMESTAMP_TOKEN, &self.to_rfc3339())
    }
}

struct TimestampVisitor;

impl<'de> Visitor<'de> for TimestampVisitor {
    type Value = Timestamp;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an RFC 3339 timestamp")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Timestamp, E> {
        Timestamp::parse_rfc3339(v).map_err(E::custom)
    }

    fn visit_newtype_struct<D: Deserializer<'de>>(self, d: D) -> Result<Timestamp, D::Error> {
        let text = String::deserialize(d)?;
        self.visit_str(&text)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_newtype_struct(TIMESTAMP_TOKEN, TimestampVisitor)
    }
}

/// Opaque binary, written per [`DataEncodingStrategy`](crate::DataEncodingStrategy).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Blob(pub Vec<u8>);

impl Blob {
    /// Returns the bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Blob {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl Serialize for Blob {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(BLOB_TOKEN, &base64::encode(&self.0))
    }
}

struct BlobVisitor;

impl<'de> Visitor<'de> for BlobVisitor {
    type Value = Blob;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("base64 encoded bytes")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Blob, E> {
        base64::decode(v).map(Blob).map_err(E::custom)
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Blob, E> {
        Ok(Blob(v.to_vec()))
    }

    fn visit_newtype_struct<D: Deserializer<'de>>(self, d: D) -> Result<Blob, D::Error> {
        let text = String::deserialize(d)?;
        self.visit_str(&text)
    }
}

impl<'de> Deserialize<'de> for Blob {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_newtype_struct(BLOB_TOKEN, BlobVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_serde_json_uses_default_forms() {
        let stamp = Timestamp::from_unix_millis(1_700_000_000_250).unwrap();
        let text = serde_json::to_string(&stamp).unwrap();
        assert_eq!(text, "\"2023-11-14T22:13:20.250Z\"");
        assert_eq!(serde_json::from_str::<Timestamp>(&text).unwrap(), stamp);

        let blob = Blob(b"hi".to_vec());
        assert_eq!(serde_json::to_string(&blob).unwrap(), "\"aGk=\"");
        assert_eq!(serde_json::from_str::<Blob>("\"aGk=\"").unwrap(), blob);
    }

    #[test]
    fn unix_conversions() {
        let stamp = Timestamp::from_unix_seconds(1.5).unwrap();
        assert_eq!(stamp.unix_seconds(), 1.5);
        assert_eq!(stamp.unix_millis(), 1500.0);
        assert!(Timestamp::from_unix_seconds(f64::NAN).is_none());
    }

    #[test]
    fn offsets_normalize_to_utc() {
        let stamp = Timestamp::parse_rfc3339("2024-03-01T12:00:00+02:00").unwrap();
        assert_eq!(stamp.to_rfc3339(), "2024-03-01T10:00:00Z");
        assert!(Timestamp::parse_rfc3339("yesterday").is_err());
    }
}
