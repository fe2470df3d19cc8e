//! Multi-valued map from a key to a set of values
//!
//! A key is present only while its set is non-empty.

use indexmap::IndexSet;
use rustc_hash::{FxBuildHasher, FxHashMap};
use std::borrow::Borrow;
use std::hash::Hash;

/// Insertion-ordered value set stored per key
pub type ValueSet<V> = IndexSet<V, FxBuildHasher>;

/// Map of key -> non-empty set of values
#[derive(Clone, Debug)]
pub struct SetMap<K: Eq + Hash, V: Eq + Hash> {
    map: FxHashMap<K, ValueSet<V>>,
}

impl<K: Eq + Hash, V: Eq + Hash> SetMap<K, V> {
    /// Create an empty map
    pub fn new() -> Self {
        Self {
            map: FxHashMap::default(),
        }
    }

    /// Add `value` under `key`, creating the set if needed.
    /// Returns `false` if the value was already present.
    pub fn add(&mut self, key: K, value: V) -> bool {
        self.map.entry(key).or_default().insert(value)
    }

    /// Remove `value` from `key`'s set, dropping the key once its set is empty.
    ///
    /// Returns `false` if the key is absent or did not hold the value.
    pub fn delete<Q>(&mut self, key: &Q, value: &V) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let Some(set) = self.map.get_mut(key) else {
            return false;
        };

        let removed = set.shift_remove(value);
        if set.is_empty() {
            self.map.remove(key);
        }
        removed
    }

    /// The set for `key`, if any
    pub fn get<Q>(&self, key: &Q) -> Option<&ValueSet<V>>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.get(key)
    }

    /// Check if `value` is stored under `key`
    pub fn has<Q>(&self, key: &Q, value: &V) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.get(key).is_some_and(|set| set.contains(value))
    }

    /// Check if `key` has any values
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.contains_key(key)
    }

    /// Remove a key and return its set
    pub fn remove_key<Q>(&mut self, key: &Q) -> Option<ValueSet<V>>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.remove(key)
    }

    /// Iterate keys
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.map.keys()
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<K: Eq + Hash, V: Eq + Hash> Default for SetMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> SetMap<&'static str, &'static str> {
        let mut map = SetMap::new();
        map.add("foo", "foobar");
        map.add("foo", "foobat");
        map.add("foo", "foobaz");
        map.delete("foo", &"foobar");
        map.add("removed", "foobar");
        map.delete("removed", &"foobar");
        map
    }

    #[test]
    fn test_creates_set_for_key() {
        let map = setup();
        let set = map.get("foo").unwrap();
        assert!(set.contains("foobat"));
        assert!(set.contains("foobaz"));
    }

    #[test]
    fn test_removes_value() {
        let map = setup();
        assert!(!map.has("foo", &"foobar"));
        assert_eq!(map.get("foo").map(|s| s.len()), Some(2));
    }

    #[test]
    fn test_removes_empty_sets() {
        let map = setup();
        assert!(map.get("removed").is_none());
        assert!(!map.contains_key("removed"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_delete_missing_key() {
        let mut map = setup();
        assert!(!map.delete("x", &"anything"));
    }

    #[test]
    fn test_delete_missing_value_keeps_key() {
        let mut map = setup();
        assert!(!map.delete("foo", &"nope"));
        assert!(map.contains_key("foo"));
    }

    #[test]
    fn test_add_reports_duplicates() {
        let mut map = SetMap::new();
        assert!(map.add(1u32, 'a'));
        assert!(!map.add(1u32, 'a'));
        assert_eq!(map.remove_key(&1).map(|s| s.len()), Some(1));
        assert!(map.is_empty());
    }
}
