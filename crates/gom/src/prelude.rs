//! Prelude module for common imports
//!
//! ```rust
//! use gom::prelude::*;
//! ```

// Hierarchy
pub use crate::child_set::GameNodeChildSet;
pub use crate::node::{GameNode, NodeBehavior, NodeEvent, WeakGameNode, NODE_ADD, NODE_DELETE};

// Composition
pub use crate::extensions::{extensions, Extensions};
pub use crate::game::Game;
pub use crate::stage::Stage;
pub use crate::system::SystemExt;

// Core primitives
pub use gom_core::{
    microtask, CancellationToken, ClassId, EventType, ObjectPath, WatchError, WatchId,
    WatchOptions, Watchable,
};
