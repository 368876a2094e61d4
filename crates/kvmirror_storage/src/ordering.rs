//! Native key ordering of the tree store.
//!
//! The tree store sorts child keys with integer-looking keys first (by
//! numeric value), followed by every other key in lexicographic order. Keys
//! only count as integers when they fit a 32-bit signed integer; anything
//! larger sorts as a plain string.
//!
//! Collections delivered by a tree-store listener are ordered with
//! [`tree_key_cmp`] so that local recomputation matches the server's own
//! materialized order.

use crate::port::RemoteRecord;
use std::cmp::Ordering;

/// Parses a key as a tree-store integer key.
///
/// Returns `None` unless the key is a base-10 signed integer within
/// `[-2147483648, 2147483647]`.
pub fn try_int_key(key: &str) -> Option<i64> {
    let value: i64 = key.parse().ok()?;
    if (i64::from(i32::MIN)..=i64::from(i32::MAX)).contains(&value) {
        Some(value)
    } else {
        None
    }
}

/// Returns true if `a` sorts strictly before `b` in tree-store order.
pub fn tree_key_is_less_than(a: &str, b: &str) -> bool {
    tree_key_cmp(a, b) == Ordering::Less
}

/// Total order over keys matching the tree store's native ordering.
pub fn tree_key_cmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    match (try_int_key(a), try_int_key(b)) {
        // Equal values ("7", "007") are ordered by length, shorter first.
        (Some(x), Some(y)) => x
            .cmp(&y)
            .then_with(|| a.len().cmp(&b.len()))
            .then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Sorts keys in place into tree-store order.
pub fn sort_tree_keys<S: AsRef<str>>(keys: &mut [S]) {
    keys.sort_by(|a, b| tree_key_cmp(a.as_ref(), b.as_ref()));
}

/// Sorts records in place by key into tree-store order.
pub fn sort_records(records: &mut [RemoteRecord]) {
    records.sort_by(|a, b| tree_key_cmp(&a.key, &b.key));
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn integers_compare_numerically() {
        assert!(tree_key_is_less_than("2", "10"));
        assert!(!tree_key_is_less_than("10", "2"));
        assert!(tree_key_is_less_than("-5", "3"));
    }

    #[test]
    fn equal_values_shorter_first() {
        assert!(!tree_key_is_less_than("007", "7"));
        assert!(tree_key_is_less_than("7", "007"));
    }

    #[test]
    fn integers_before_strings() {
        assert!(tree_key_is_less_than("10", "a"));
        assert!(!tree_key_is_less_than("a", "10"));
        assert!(tree_key_is_less_than("999", "-"));
    }

    #[test]
    fn lexicographic_fallback() {
        assert!(tree_key_is_less_than("a", "b"));
        assert!(!tree_key_is_less_than("b", "a"));
        assert!(tree_key_is_less_than("B", "a"));
    }

    #[test]
    fn equal_keys_are_not_less() {
        assert!(!tree_key_is_less_than("x", "x"));
        assert!(!tree_key_is_less_than("42", "42"));
    }

    #[test]
    fn out_of_range_integers_are_strings() {
        assert_eq!(try_int_key("2147483647"), Some(2_147_483_647));
        assert_eq!(try_int_key("-2147483648"), Some(-2_147_483_648));
        assert_eq!(try_int_key("2147483648"), None);
        assert_eq!(try_int_key("-2147483649"), None);
        assert_eq!(try_int_key("99999999999999999999999"), None);

        // Out of range keys sort after every integer key.
        assert!(tree_key_is_less_than("3", "2147483648"));
        assert!(tree_key_is_less_than("2147483648", "a"));
    }

    #[test]
    fn non_numeric_forms_are_strings() {
        assert_eq!(try_int_key(""), None);
        assert_eq!(try_int_key("-"), None);
        assert_eq!(try_int_key("1.5"), None);
        assert_eq!(try_int_key(" 1"), None);
        assert_eq!(try_int_key("0x10"), None);
    }

    #[test]
    fn sort_mixed_keys() {
        let mut keys = vec!["b", "10", "a", "007", "2", "7", "-1", "2147483648"];
        sort_tree_keys(&mut keys);
        assert_eq!(keys, vec!["-1", "2", "7", "007", "10", "2147483648", "a", "b"]);
    }

    #[test]
    fn sort_records_by_key() {
        let mut records = vec![
            RemoteRecord::new("z", b"1".to_vec()),
            RemoteRecord::new("3", b"2".to_vec()),
            RemoteRecord::new("12", b"3".to_vec()),
        ];
        sort_records(&mut records);
        let keys: Vec<&str> = records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["3", "12", "z"]);
    }

    fn key_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            any::<i32>().prop_map(|n| n.to_string()),
            "-?0{0,3}[0-9]{1,4}",
            "[0-9]{10,12}",
            "[a-zA-Z0-9_-]{0,8}",
        ]
    }

    proptest! {
        #[test]
        fn strict_ordering(a in key_strategy(), b in key_strategy()) {
            if a != b {
                prop_assert_eq!(tree_key_is_less_than(&a, &b), !tree_key_is_less_than(&b, &a));
            } else {
                prop_assert!(!tree_key_is_less_than(&a, &b));
            }
        }

        #[test]
        fn transitive(a in key_strategy(), b in key_strategy(), c in key_strategy()) {
            if tree_key_is_less_than(&a, &b) && tree_key_is_less_than(&b, &c) {
                prop_assert!(tree_key_is_less_than(&a, &c));
            }
        }

        #[test]
        fn sorting_is_insertion_order_independent(mut keys in prop::collection::vec(key_strategy(), 0..20)) {
            let mut forward = keys.clone();
            sort_tree_keys(&mut forward);
            keys.reverse();
            sort_tree_keys(&mut keys);
            prop_assert_eq!(forward, keys);
        }
    }
}
