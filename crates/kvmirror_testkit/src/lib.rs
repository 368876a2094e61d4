//! # kvmirror Testkit
//!
//! Test utilities for kvmirror.
//!
//! This crate provides:
//! - A recording storage port for asserting issued remote operations
//! - Fixtures pairing a recording port with a manual clock
//! - Property-based generators for keys, paths and collection states
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kvmirror_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_recording() {
//!     let fixture = ManualFixture::ephemeral();
//!     // ... drive a synchronizer over fixture.port()
//!     fixture.advance(Duration::from_millis(250));
//!     assert_eq!(fixture.storage.writes().len(), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod recording;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::recording::*;
}

pub use fixtures::*;
pub use generators::*;
pub use recording::*;
