//! # kvmirror Codec
//!
//! Payload encoding/decoding for kvmirror.
//!
//! Payloads are compact JSON documents. Every path configuration carries a
//! [`CodecOptions`] pair which is forwarded here untouched; the sync engine
//! never looks inside a payload beyond whether it decodes.
//!
//! ## Key strategies
//!
//! - [`KeyEncodingStrategy::ConvertToSnakeCase`] rewrites `camelCase` object
//!   keys to `snake_case` on the way out
//! - [`KeyDecodingStrategy::ConvertFromSnakeCase`] reverses it on the way in
//!
//! ## Value strategies
//!
//! JSON has no spelling for infinities, NaN, dates or binary, so the
//! options decide:
//!
//! - [`NonConformingFloatEncodingStrategy`] fails the encode by default or
//!   writes sentinel strings; the decoding twin reads them back
//! - [`DateEncodingStrategy`] writes a [`Timestamp`] as RFC 3339 or as
//!   seconds/milliseconds since the epoch
//! - [`DataEncodingStrategy`] writes a [`Blob`] as base64 or a byte array
//! - `user_info` entries are readable through [`user_info`] from custom
//!   `Serialize`/`Deserialize` impls while the call runs
//!
//! ## Usage
//!
//! ```
//! use kvmirror_codec::{from_payload, to_payload, CodecOptions};
//!
//! let options = CodecOptions::default();
//! let bytes = to_payload(&vec![1, 2, 3], &options.encoding).unwrap();
//! let decoded: Vec<i32> = from_payload(&bytes, &options.decoding).unwrap();
//! assert_eq!(decoded, vec![1, 2, 3]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod base64;
mod context;
mod de;
mod decoder;
mod encoder;
mod error;
mod keys;
mod options;
mod ser;
mod types;

pub use context::user_info;
pub use decoder::{from_payload, from_tree};
pub use encoder::{to_payload, to_tree};
pub use error::{CodecError, CodecResult};
pub use keys::{from_snake_case, to_snake_case};
pub use options::{
    CodecOptions, DataDecodingStrategy, DataEncodingStrategy, DateDecodingStrategy,
    DateEncodingStrategy, DecodingOptions, EncodingOptions, KeyDecodingStrategy,
    KeyEncodingStrategy, NonConformingFloatDecodingStrategy, NonConformingFloatEncodingStrategy,
    UserInfo,
};
pub use types::{Blob, Timestamp};
