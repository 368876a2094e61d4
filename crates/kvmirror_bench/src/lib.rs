//! Benchmark support for kvmirror.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod utils;
