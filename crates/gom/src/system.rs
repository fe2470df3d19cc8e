//! Systems
//!
//! A system is any node added to a stage's `systems()` set. [`SystemExt`]
//! navigates from such a node to its stage and game.

use crate::game::Game;
use crate::node::GameNode;
use crate::stage::Stage;

/// Navigation helpers for system nodes
pub trait SystemExt {
    /// The stage this node is a system (or entity) of
    fn stage(&self) -> Option<Stage>;

    /// The game running that stage
    fn game(&self) -> Option<Game>;
}

impl SystemExt for GameNode {
    fn stage(&self) -> Option<Stage> {
        self.parent().as_ref().and_then(Stage::from_node)
    }

    fn game(&self) -> Option<Game> {
        self.stage().and_then(|stage| stage.game())
    }
}
