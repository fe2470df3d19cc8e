//! GOM Core
//!
//! Foundational primitives for the game object model:
//!
//! - **Indexed sets**: [`IdSet`] (lookup by id), [`ClassSet`] (lookup by class)
//!   and [`SetMap`] (key to non-empty value set)
//! - **Microtasks**: a thread-local deferred-work queue drained at explicit
//!   checkpoints
//! - **Object paths**: [`ObjectPath`] reads and creates nested values in a
//!   `serde_json::Value` tree
//! - **Watchable**: batched, explicit change notification with immediate,
//!   deferred and wildcard watchers, one-shot and cancellable watches, and a
//!   `wait_for` future
//!
//! # Example
//!
//! ```rust
//! use gom_core::{microtask, Watchable};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let health = Watchable::<u32>::new();
//! let log = Rc::new(RefCell::new(Vec::new()));
//!
//! let sink = log.clone();
//! health.watch_batch(move |batch| {
//!     sink.borrow_mut().push(batch.len());
//! });
//!
//! health.notify("damage", 10);
//! health.notify("heal", 4);
//! microtask::checkpoint();
//!
//! assert_eq!(*log.borrow(), vec![2]);
//! ```

pub mod class_set;
pub mod error;
pub mod id_set;
pub mod microtask;
pub mod object_path;
pub mod set_map;
pub mod watchable;

pub use class_set::{ClassId, ClassSet, Classified};
pub use error::{PathError, Result, WatchError};
pub use id_set::{generate_id, IdSet, Identified};
pub use object_path::{ObjectPath, PathKey};
pub use set_map::{SetMap, ValueSet};
pub use watchable::{
    EventBatch, EventType, Handler, WaitFor, WatchId, WatchOptions, Watchable, Watched,
};

// Cancellation signal accepted by watches and `wait_for`
pub use tokio_util::sync::CancellationToken;
