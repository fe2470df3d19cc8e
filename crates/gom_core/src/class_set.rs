//! Sets indexed by class
//!
//! Each member reports an explicit class discriminant. The index remembers the
//! most recently added member of every class.

use indexmap::IndexSet;
use rustc_hash::{FxBuildHasher, FxHashMap};
use std::any::TypeId;
use std::fmt;
use std::hash::Hash;

/// Class discriminant backed by a Rust type
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId {
    type_id: TypeId,
    name: &'static str,
}

impl ClassId {
    /// The class of `T`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The underlying type id
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Type name for debugging
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({})", self.name)
    }
}

/// Items that report a class discriminant
pub trait Classified {
    /// Discriminant type (an enum tag, or [`ClassId`])
    type Class: Copy + Eq + Hash;

    /// The class of this item
    fn class(&self) -> Self::Class;
}

/// A set with an additional class -> item index
#[derive(Clone, Debug)]
pub struct ClassSet<T: Classified + Eq + Hash + Clone> {
    items: IndexSet<T, FxBuildHasher>,
    index: FxHashMap<T::Class, T>,
}

impl<T: Classified + Eq + Hash + Clone> ClassSet<T> {
    /// Create an empty set
    pub fn new() -> Self {
        Self {
            items: IndexSet::default(),
            index: FxHashMap::default(),
        }
    }

    /// Add an item; it becomes the indexed instance of its class
    pub fn add(&mut self, item: T) -> &mut Self {
        self.index.insert(item.class(), item.clone());
        self.items.insert(item);
        self
    }

    /// Remove an item. Returns `false` if it was not a member.
    ///
    /// The class entry is cleared only when it points at `item`; it does not
    /// fall back to an older surviving instance of the same class.
    pub fn delete(&mut self, item: &T) -> bool {
        if !self.items.shift_remove(item) {
            return false;
        }

        let class = item.class();
        if self.index.get(&class) == Some(item) {
            self.index.remove(&class);
        }
        true
    }

    /// Look up the indexed instance of a class
    pub fn get_by_class(&self, class: T::Class) -> Option<&T> {
        self.index.get(&class)
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
}

impl<T: Classified<Class = ClassId> + Eq + Hash + Clone> ClassSet<T> {
    /// Look up the indexed instance whose class is `C`
    pub fn get<C: ?Sized + 'static>(&self) -> Option<&T> {
        self.get_by_class(ClassId::of::<C>())
    }
}

impl<T: Classified + Eq + Hash + Clone> Default for ClassSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    enum Kind {
        A,
        B,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    struct Item {
        kind: Kind,
        serial: u32,
    }

    impl Classified for Item {
        type Class = Kind;

        fn class(&self) -> Kind {
            self.kind
        }
    }

    fn item(kind: Kind, serial: u32) -> Item {
        Item { kind, serial }
    }

    #[test]
    fn test_lookup_by_class() {
        let a = item(Kind::A, 1);
        let b = item(Kind::B, 2);
        let mut set = ClassSet::new();
        set.add(a.clone()).add(b.clone());

        assert!(set.has(&a));
        assert!(set.has(&b));
        assert_eq!(set.get_by_class(Kind::A), Some(&a));
        assert_eq!(set.get_by_class(Kind::B), Some(&b));
    }

    #[test]
    fn test_delete_clears_class() {
        let a = item(Kind::A, 1);
        let mut set = ClassSet::new();
        set.add(a.clone());

        assert!(set.delete(&a));
        assert!(!set.has(&a));
        assert_eq!(set.get_by_class(Kind::A), None);
        assert!(!set.delete(&a));
    }

    #[test]
    fn test_last_added_wins() {
        let first = item(Kind::A, 1);
        let second = item(Kind::A, 2);
        let mut set = ClassSet::new();
        set.add(first.clone()).add(second.clone());

        assert_eq!(set.len(), 2);
        assert_eq!(set.get_by_class(Kind::A), Some(&second));

        // Deleting the older instance leaves the index alone
        set.delete(&first);
        assert_eq!(set.get_by_class(Kind::A), Some(&second));
    }

    #[test]
    fn test_no_fallback_to_surviving_instance() {
        let first = item(Kind::A, 1);
        let second = item(Kind::A, 2);
        let mut set = ClassSet::new();
        set.add(first.clone()).add(second.clone());

        set.delete(&second);
        assert!(set.has(&first));
        assert_eq!(set.get_by_class(Kind::A), None);
    }

    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    enum Shape {
        Circle(u32),
        Square(u32),
    }

    struct Circle;
    struct Square;

    impl Classified for Shape {
        type Class = ClassId;

        fn class(&self) -> ClassId {
            match self {
                Shape::Circle(_) => ClassId::of::<Circle>(),
                Shape::Square(_) => ClassId::of::<Square>(),
            }
        }
    }

    #[test]
    fn test_type_backed_classes() {
        let mut set = ClassSet::new();
        set.add(Shape::Circle(3)).add(Shape::Square(4));

        assert_eq!(set.get::<Circle>(), Some(&Shape::Circle(3)));
        assert_eq!(set.get::<Square>(), Some(&Shape::Square(4)));
        assert_eq!(set.get::<u8>(), None);
        assert!(ClassId::of::<Circle>().name().ends_with("Circle"));
    }
}
