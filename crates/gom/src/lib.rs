//! # GOM
//!
//! A game object model built on [`gom_core`].
//!
//! This crate provides:
//! - **Nodes**: [`GameNode`] handles with pluggable [`NodeBehavior`] hooks
//! - **Child sets**: owned, id-indexed children with lifecycle cascades
//! - **Stages and systems**: per-scene systems looked up by class, plus entities
//! - **Game**: the live root that connects its tree and drives each frame
//! - **Extensions**: a type-keyed registry shared by every game on a thread
//!
//! ## Quick Start
//!
//! ```rust
//! use gom::prelude::*;
//!
//! struct Spin;
//!
//! impl NodeBehavior for Spin {
//!     fn update(&self, _node: &GameNode, _dt: f64) {}
//! }
//!
//! let game = Game::new();
//! let stage = Stage::new();
//! stage.systems().add(GameNode::new(Spin));
//! game.add_stage(&stage);
//!
//! game.tick(1.0 / 60.0);
//! assert!(stage.system::<Spin>().is_some());
//! ```

// Node handles and behaviors
pub mod node;

// Owned child sets
pub mod child_set;

// Scene composition
pub mod extensions;
pub mod game;
pub mod stage;
pub mod system;

// Prelude for common imports
pub mod prelude;

pub use child_set::GameNodeChildSet;
pub use extensions::{extensions, Extensions};
pub use game::{Game, GameState};
pub use node::{GameNode, NodeBehavior, NodeEvent, WeakGameNode, NODE_ADD, NODE_DELETE};
pub use stage::{Stage, StageState};
pub use system::SystemExt;

pub use gom_core;
