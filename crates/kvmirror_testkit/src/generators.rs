//! Property-based test generators using proptest.
//!
//! Strategies here produce remote keys of every shape the tree ordering
//! distinguishes, path segments, and collection states for reconciliation.

use proptest::prelude::*;
use std::collections::BTreeMap;

/// Strategy for keys that parse as 32-bit integers.
pub fn int_key_strategy() -> impl Strategy<Value = String> {
    any::<i32>().prop_map(|n| n.to_string())
}

/// Strategy for numeric keys with leading zeros, which tie numerically
/// with their unpadded form.
pub fn zero_padded_key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("0[0-9]{1,6}").expect("Invalid regex")
}

/// Strategy for numeric keys outside the 32-bit range.
pub fn out_of_range_key_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        (i64::from(i32::MAX) + 1..i64::MAX).prop_map(|n| n.to_string()),
        (i64::MIN..i64::from(i32::MIN)).prop_map(|n| n.to_string()),
    ]
}

/// Strategy for short alphanumeric keys.
pub fn string_key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z_-][a-zA-Z0-9_-]{0,11}").expect("Invalid regex")
}

/// Strategy for any remote key shape.
pub fn tree_key_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => int_key_strategy(),
        1 => zero_padded_key_strategy(),
        1 => out_of_range_key_strategy(),
        3 => string_key_strategy(),
        1 => Just("-".to_string()),
    ]
}

/// Strategy for a single path segment.
pub fn path_segment_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for a collection state: remote keys mapped to small values.
///
/// Values are drawn from a narrow range so that successive states share
/// keys with equal and with different values.
pub fn collection_state_strategy() -> impl Strategy<Value = BTreeMap<String, u8>> {
    prop::collection::btree_map("[a-e][0-9]?", 0u8..4, 0..12)
}

/// Strategy for a pair of collection states to reconcile between.
pub fn collection_transition_strategy(
) -> impl Strategy<Value = (BTreeMap<String, u8>, BTreeMap<String, u8>)> {
    (collection_state_strategy(), collection_state_strategy())
}
