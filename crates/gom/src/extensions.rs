//! Shared extensions
//!
//! One [`Extensions`] registry exists per thread. Every [`Game`](crate::Game)
//! on that thread sees the same registry, so an extension installed through
//! one game (or through [`extensions()`]) is visible to all of them.
//! Entries are keyed by type, one value per type.

use rustc_hash::FxHashMap;
use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

thread_local! {
    static SHARED: Extensions = Extensions(Rc::default());
}

/// The registry shared by every game on this thread
pub fn extensions() -> Extensions {
    SHARED.with(Extensions::clone)
}

/// Handle to the shared, type-keyed extension registry
///
/// Handles compare equal when they refer to the same registry.
#[derive(Clone)]
pub struct Extensions(Rc<RefCell<FxHashMap<TypeId, Rc<dyn Any>>>>);

impl Extensions {
    /// Install an extension, returning the one it replaces
    pub fn insert<T: 'static>(&self, extension: T) -> Option<Rc<T>> {
        debug!(extension = type_name::<T>(), "installed extension");
        self.0
            .borrow_mut()
            .insert(TypeId::of::<T>(), Rc::new(extension))
            .and_then(|previous| previous.downcast().ok())
    }

    pub fn get<T: 'static>(&self) -> Option<Rc<T>> {
        self.0
            .borrow()
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|extension| extension.downcast().ok())
    }

    pub fn remove<T: 'static>(&self) -> Option<Rc<T>> {
        self.0
            .borrow_mut()
            .remove(&TypeId::of::<T>())
            .and_then(|extension| extension.downcast().ok())
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.0.borrow().contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

impl PartialEq for Extensions {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Extensions {}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions")
            .field("len", &self.len())
            .finish()
    }
}
