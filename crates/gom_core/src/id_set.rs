//! Sets of identified items with O(1) lookup by id
//!
//! Items keep their insertion order. An item without an id is given a fresh
//! UUID v4 when it is added.
//!
//! ```rust
//! use gom_core::id_set::{IdSet, Identified};
//!
//! #[derive(Clone, PartialEq, Eq, Hash)]
//! struct Item { id: Option<String> }
//!
//! impl Identified for Item {
//!     fn id(&self) -> Option<&str> { self.id.as_deref() }
//!     fn set_id(&mut self, id: String) { self.id = Some(id); }
//! }
//!
//! let mut set = IdSet::new();
//! set.add(Item { id: Some("player".into()) });
//! assert!(set.get_by_id("player").is_some());
//! ```

use indexmap::IndexSet;
use rustc_hash::{FxBuildHasher, FxHashMap};
use std::hash::Hash;
use uuid::Uuid;

/// Items that carry a string identifier
pub trait Identified {
    /// The current identifier, if one has been assigned
    fn id(&self) -> Option<&str>;

    /// Assign an identifier. Called by [`IdSet::add`] only when [`id`](Self::id) is `None`.
    fn set_id(&mut self, id: String);
}

/// Generate a fresh random identifier
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// A set whose members are additionally indexed by id
///
/// Colliding ids overwrite the index entry (last write wins); both items stay
/// members of the set but only the most recent is reachable through
/// [`get_by_id`](Self::get_by_id).
#[derive(Clone, Debug)]
pub struct IdSet<T: Identified + Eq + Hash + Clone> {
    items: IndexSet<T, FxBuildHasher>,
    index: FxHashMap<String, T>,
}

impl<T: Identified + Eq + Hash + Clone> IdSet<T> {
    /// Create an empty set
    pub fn new() -> Self {
        Self {
            items: IndexSet::default(),
            index: FxHashMap::default(),
        }
    }

    /// Add an item, assigning an id if it has none
    pub fn add(&mut self, mut item: T) -> &mut Self {
        if item.id().is_none() {
            item.set_id(generate_id());
        }

        if let Some(id) = item.id() {
            self.index.insert(id.to_owned(), item.clone());
        }
        self.items.insert(item);
        self
    }

    /// Remove an item. Returns `false` if it was not a member.
    pub fn delete(&mut self, item: &T) -> bool {
        if !self.items.shift_remove(item) {
            return false;
        }

        if let Some(id) = item.id() {
            // Only drop the entry if a colliding item has not replaced it
            if self.index.get(id) == Some(item) {
                self.index.remove(id);
            }
        }
        true
    }

    /// Look up an item by id
    pub fn get_by_id(&self, id: &str) -> Option<&T> {
        self.index.get(id)
    }

    /// Check membership
    pub fn has(&self, item: &T) -> bool {
        self.items.contains(item)
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate members in insertion order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        self.items.iter()
    }

    /// Remove every member
    pub fn clear(&mut self) {
        self.items.clear();
        self.index.clear();
    }
}

impl<T: Identified + Eq + Hash + Clone> Default for IdSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Identified + Eq + Hash + Clone> Extend<T> for IdSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.add(item);
        }
    }
}

impl<T: Identified + Eq + Hash + Clone> FromIterator<T> for IdSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    struct Item {
        id: Option<String>,
        tag: u32,
    }

    impl Item {
        fn new(id: Option<&str>, tag: u32) -> Self {
            Self {
                id: id.map(str::to_owned),
                tag,
            }
        }
    }

    impl Identified for Item {
        fn id(&self) -> Option<&str> {
            self.id.as_deref()
        }

        fn set_id(&mut self, id: String) {
            self.id = Some(id);
        }
    }

    fn setup() -> (Item, Item, IdSet<Item>) {
        let a = Item::new(Some("itemA"), 1);
        let b = Item::new(Some("itemB"), 2);
        let mut set = IdSet::new();
        set.add(a.clone()).add(b.clone());
        (a, b, set)
    }

    #[test]
    fn test_add_and_lookup() {
        let (a, b, set) = setup();

        assert!(set.has(&a));
        assert!(set.has(&b));
        assert_eq!(set.get_by_id("itemA"), Some(&a));
        assert_eq!(set.get_by_id("itemB"), Some(&b));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_delete() {
        let (a, b, mut set) = setup();

        assert!(set.delete(&a));
        assert!(!set.has(&a));
        assert_eq!(set.get_by_id("itemA"), None);
        assert_eq!(set.get_by_id("itemB"), Some(&b));
    }

    #[test]
    fn test_delete_absent_is_noop() {
        let (_, _, mut set) = setup();
        let stranger = Item::new(Some("stranger"), 9);

        assert!(!set.delete(&stranger));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_generates_uuid_when_missing() {
        let (_, _, mut set) = setup();
        set.add(Item::new(None, 3));

        let last = set.iter().next_back().unwrap();
        assert_eq!(last.tag, 3);
        let id = last.id().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
        assert_eq!(set.get_by_id(id), Some(last));
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        let mut set = IdSet::new();
        set.add(Item::new(None, 1)).add(Item::new(None, 2));

        let ids: Vec<_> = set.iter().map(|i| i.id().unwrap().to_owned()).collect();
        assert_ne!(ids[0], ids[1]);
        for (item, id) in set.iter().zip(&ids) {
            assert_eq!(set.get_by_id(id), Some(item));
        }
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_id_collision_last_write_wins() {
        let first = Item::new(Some("dup"), 1);
        let second = Item::new(Some("dup"), 2);
        let mut set = IdSet::new();
        set.add(first.clone()).add(second.clone());

        assert_eq!(set.len(), 2);
        assert_eq!(set.get_by_id("dup"), Some(&second));

        // Removing the shadowed item keeps the newer index entry
        set.delete(&first);
        assert_eq!(set.get_by_id("dup"), Some(&second));
    }

    #[test]
    fn test_from_iter_keeps_order() {
        let set: IdSet<Item> = (0..4).map(|n| Item::new(None, n)).collect();
        let tags: Vec<_> = set.iter().map(|i| i.tag).collect();
        assert_eq!(tags, vec![0, 1, 2, 3]);
    }
}
