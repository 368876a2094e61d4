//! Identifier-set difference between two collection states.

use super::{IdentifiedVec, Identifiable};

/// How a new collection state differs from the last applied one.
///
/// `added` and `updated` follow the order of the new state; `removed`
/// follows the order of the old state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionDiff<Id> {
    /// Ids only present in the new state.
    pub added: Vec<Id>,
    /// Ids only present in the old state.
    pub removed: Vec<Id>,
    /// Ids present in both whose elements differ.
    pub updated: Vec<Id>,
    /// Ids present in both whose elements are equal.
    pub unchanged: Vec<Id>,
}

impl<Id> CollectionDiff<Id> {
    /// Computes the difference from `old` to `new`.
    pub fn between<E>(old: &IdentifiedVec<E>, new: &IdentifiedVec<E>) -> Self
    where
        E: Identifiable<Id = Id> + PartialEq,
    {
        let mut diff = Self {
            added: Vec::new(),
            removed: Vec::new(),
            updated: Vec::new(),
            unchanged: Vec::new(),
        };
        for element in new {
            let id = element.id();
            match old.get(&id) {
                None => diff.added.push(id),
                Some(previous) if previous == element => diff.unchanged.push(id),
                Some(_) => diff.updated.push(id),
            }
        }
        diff.removed = old.ids().filter(|id| !new.contains(id)).collect();
        diff
    }

    /// Returns true if applying the new state needs no remote operation.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }

    /// Number of remote operations the difference implies.
    pub fn operation_count(&self) -> usize {
        self.added.len() + self.removed.len() + self.updated.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Keyed;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn state(pairs: &[(&str, &str)]) -> IdentifiedVec<Keyed<String>> {
        pairs
            .iter()
            .map(|(key, value)| Keyed::new(*key, value.to_string()))
            .collect()
    }

    #[test]
    fn classic_example() {
        let old = state(&[("1", "x"), ("2", "y")]);
        let new = state(&[("2", "y"), ("3", "z")]);
        let diff = CollectionDiff::between(&old, &new);

        assert_eq!(diff.added, vec!["3"]);
        assert_eq!(diff.removed, vec!["1"]);
        assert!(diff.updated.is_empty());
        assert_eq!(diff.unchanged, vec!["2"]);
        assert_eq!(diff.operation_count(), 2);
    }

    #[test]
    fn value_change_is_an_update() {
        let old = state(&[("1", "x")]);
        let new = state(&[("1", "w")]);
        let diff = CollectionDiff::between(&old, &new);
        assert_eq!(diff.updated, vec!["1"]);
        assert!(diff.added.is_empty() && diff.removed.is_empty());
    }

    #[test]
    fn reordering_alone_is_empty() {
        let old = state(&[("1", "x"), ("2", "y")]);
        let new = state(&[("2", "y"), ("1", "x")]);
        assert!(CollectionDiff::between(&old, &new).is_empty());
    }

    fn map_strategy() -> impl Strategy<Value = BTreeMap<String, u8>> {
        prop::collection::btree_map("[a-e]", 0u8..3, 0..6)
    }

    fn to_state(map: &BTreeMap<String, u8>) -> IdentifiedVec<Keyed<u8>> {
        map.iter().map(|(key, value)| Keyed::new(key.clone(), *value)).collect()
    }

    proptest! {
        #[test]
        fn diff_is_minimal(old in map_strategy(), new in map_strategy()) {
            let diff = CollectionDiff::between(&to_state(&old), &to_state(&new));

            let expected_added = new.keys().filter(|k| !old.contains_key(*k)).count();
            let expected_removed = old.keys().filter(|k| !new.contains_key(*k)).count();
            let expected_updated = new
                .iter()
                .filter(|(k, v)| old.get(*k).is_some_and(|previous| previous != *v))
                .count();

            prop_assert_eq!(diff.added.len(), expected_added);
            prop_assert_eq!(diff.removed.len(), expected_removed);
            prop_assert_eq!(diff.updated.len(), expected_updated);
        }

        #[test]
        fn diff_with_self_is_empty(map in map_strategy()) {
            let state = to_state(&map);
            prop_assert!(CollectionDiff::between(&state, &state).is_empty());
        }
    }
}
