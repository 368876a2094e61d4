//! CLI command implementations.

pub mod push_id;
pub mod simulate;
pub mod sort_keys;
