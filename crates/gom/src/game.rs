//! Game root
//!
//! A [`Game`] is the root that makes a tree live: nodes beneath it receive
//! `connected` / `disconnected` as they join and leave. Its children are
//! stages, driven once per [`Game::tick`].

use crate::extensions::{extensions, Extensions};
use crate::node::{GameNode, NodeBehavior};
use crate::stage::Stage;
use crate::GameNodeChildSet;
use gom_core::microtask;
use std::cell::Cell;
use std::ops::Deref;
use std::rc::Rc;
use tracing::debug;

/// Behavior backing a game node
#[derive(Default)]
pub struct GameState {
    frame: Cell<u64>,
    elapsed: Cell<f64>,
}

impl NodeBehavior for GameState {
    fn update(&self, node: &GameNode, dt: f64) {
        for stage in node.children().snapshot() {
            if !stage.is_disabled() {
                stage.update(dt);
            }
        }
    }

    fn render(&self, node: &GameNode) {
        for stage in node.children().snapshot() {
            if !stage.is_disabled() {
                stage.render();
            }
        }
    }
}

/// Handle to a game root
#[derive(Clone)]
pub struct Game {
    node: GameNode,
    state: Rc<GameState>,
}

impl Game {
    pub fn new() -> Self {
        let (node, state) = GameNode::build(None, true, |_| GameState::default());
        Self { node, state }
    }

    /// View an existing node as a game
    pub fn from_node(node: &GameNode) -> Option<Self> {
        if !node.is_game() {
            return None;
        }
        node.behavior_rc::<GameState>().map(|state| Self {
            node: node.clone(),
            state,
        })
    }

    pub fn node(&self) -> &GameNode {
        &self.node
    }

    pub fn stages(&self) -> &GameNodeChildSet {
        self.node.children()
    }

    pub fn add_stage(&self, stage: &Stage) -> &Self {
        self.stages().add(stage.node().clone());
        self
    }

    /// Update every enabled stage
    pub fn update(&self, dt: f64) {
        self.node.update(dt);
    }

    /// Render every enabled stage
    pub fn render(&self) {
        self.node.render();
    }

    /// Advance one frame: update, render, then flush deferred work
    pub fn tick(&self, dt: f64) {
        let frame = self.state.frame.get() + 1;
        self.state.frame.set(frame);
        self.state.elapsed.set(self.state.elapsed.get() + dt);

        self.update(dt);
        self.render();
        let flushed = microtask::checkpoint();
        debug!(frame, flushed, "tick");
    }

    /// The extension registry shared by every game on this thread
    pub fn extensions(&self) -> Extensions {
        extensions()
    }

    /// Frames completed by [`Game::tick`]
    pub fn frame(&self) -> u64 {
        self.state.frame.get()
    }

    /// Total `dt` passed to [`Game::tick`]
    pub fn elapsed(&self) -> f64 {
        self.state.elapsed.get()
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for Game {
    type Target = GameNode;

    fn deref(&self) -> &GameNode {
        &self.node
    }
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("stages", &self.stages().len())
            .field("frame", &self.frame())
            .finish()
    }
}
