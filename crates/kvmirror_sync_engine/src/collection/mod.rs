//! Collection synchronizers and the identified collection they operate on.

mod diff;
mod identified;
mod keyed;
mod list;

pub use diff::CollectionDiff;
pub use identified::IdentifiedSync;
pub use keyed::KeyedSync;
pub use list::ListSync;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::ops::Index;

/// A value with a stable identifier.
pub trait Identifiable {
    /// Identifier type.
    type Id: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    /// Returns the identifier.
    fn id(&self) -> Self::Id;
}

/// Key that asks the backend to generate one on save.
pub const UNASSIGNED_KEY: &str = "";

/// A value paired with its remote key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Keyed<T> {
    /// Remote key, or [`UNASSIGNED_KEY`].
    pub key: String,
    /// The value.
    pub value: T,
}

impl<T> Keyed<T> {
    /// Pairs `value` with `key`.
    pub fn new(key: impl Into<String>, value: T) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// A value that has not been stored yet.
    pub fn unassigned(value: T) -> Self {
        Self::new(UNASSIGNED_KEY, value)
    }

    /// Returns true if the key is the unassigned sentinel.
    pub fn is_unassigned(&self) -> bool {
        self.key == UNASSIGNED_KEY
    }
}

impl<T> Identifiable for Keyed<T> {
    type Id = String;

    fn id(&self) -> String {
        self.key.clone()
    }
}

/// An ordered collection of identifiable elements with unique ids.
///
/// Insertion order is preserved. Inserting an element whose id is already
/// present replaces the existing element in place.
pub struct IdentifiedVec<E: Identifiable> {
    items: Vec<E>,
    index: HashMap<E::Id, usize>,
}

impl<E: Identifiable> IdentifiedVec<E> {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if there are no elements.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Appends `element`, or replaces the element with the same id.
    ///
    /// Returns the replaced element, if any.
    pub fn upsert(&mut self, element: E) -> Option<E> {
        let id = element.id();
        match self.index.get(&id) {
            Some(&position) => Some(std::mem::replace(&mut self.items[position], element)),
            None => {
                self.index.insert(id, self.items.len());
                self.items.push(element);
                None
            }
        }
    }

    /// Removes and returns the element with `id`.
    pub fn remove(&mut self, id: &E::Id) -> Option<E> {
        let position = self.index.remove(id)?;
        let removed = self.items.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    /// Returns the element with `id`.
    pub fn get(&self, id: &E::Id) -> Option<&E> {
        self.index.get(id).map(|&position| &self.items[position])
    }

    /// Returns true if an element with `id` exists.
    pub fn contains(&self, id: &E::Id) -> bool {
        self.index.contains_key(id)
    }

    /// Iterates over ids in order.
    pub fn ids(&self) -> impl Iterator<Item = E::Id> + '_ {
        self.items.iter().map(Identifiable::id)
    }

    /// Iterates over elements in order.
    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.items.iter()
    }

    /// Returns the elements as a slice.
    pub fn as_slice(&self) -> &[E] {
        &self.items
    }

    /// Consumes the collection, returning the elements in order.
    pub fn into_vec(self) -> Vec<E> {
        self.items
    }
}

impl<E: Identifiable> Default for IdentifiedVec<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Identifiable + Clone> Clone for IdentifiedVec<E> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            index: self.index.clone(),
        }
    }
}

impl<E: Identifiable + fmt::Debug> fmt::Debug for IdentifiedVec<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.items).finish()
    }
}

impl<E: Identifiable + PartialEq> PartialEq for IdentifiedVec<E> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<E: Identifiable + Eq> Eq for IdentifiedVec<E> {}

impl<E: Identifiable> FromIterator<E> for IdentifiedVec<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        let mut collection = Self::new();
        collection.extend(iter);
        collection
    }
}

impl<E: Identifiable> Extend<E> for IdentifiedVec<E> {
    fn extend<I: IntoIterator<Item = E>>(&mut self, iter: I) {
        for element in iter {
            self.upsert(element);
        }
    }
}

impl<E: Identifiable> IntoIterator for IdentifiedVec<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, E: Identifiable> IntoIterator for &'a IdentifiedVec<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<E: Identifiable> Index<usize> for IdentifiedVec<E> {
    type Output = E;

    fn index(&self, position: usize) -> &E {
        &self.items[position]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed(pairs: &[(&str, &str)]) -> IdentifiedVec<Keyed<String>> {
        pairs
            .iter()
            .map(|(key, value)| Keyed::new(*key, value.to_string()))
            .collect()
    }

    #[test]
    fn preserves_insertion_order() {
        let items = keyed(&[("b", "1"), ("a", "2"), ("c", "3")]);
        let ids: Vec<String> = items.ids().collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn duplicate_ids_replace_in_place() {
        let mut items = keyed(&[("a", "1"), ("b", "2")]);
        let replaced = items.upsert(Keyed::new("a", "3".to_string()));
        assert_eq!(replaced.map(|k| k.value), Some("1".to_string()));
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].value, "3");
    }

    #[test]
    fn remove_reindexes() {
        let mut items = keyed(&[("a", "1"), ("b", "2"), ("c", "3")]);
        assert!(items.remove(&"a".to_string()).is_some());
        assert!(!items.contains(&"a".to_string()));
        assert_eq!(items.get(&"c".to_string()).map(|k| k.value.as_str()), Some("3"));
        assert_eq!(items[1].key, "c");
        assert!(items.remove(&"missing".to_string()).is_none());
    }

    #[test]
    fn equality_is_ordered() {
        let a = keyed(&[("a", "1"), ("b", "2")]);
        let b = keyed(&[("b", "2"), ("a", "1")]);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn unassigned_sentinel() {
        let item = Keyed::unassigned(5);
        assert!(item.is_unassigned());
        assert_eq!(item.id(), UNASSIGNED_KEY);
        assert!(!Keyed::new("k", 5).is_unassigned());
    }
}
