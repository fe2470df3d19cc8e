//! Stages
//!
//! A [`Stage`] groups the systems and entities that make up one scene. Its
//! `children` are its systems; entities live in a second child set. Both sets
//! are part of the subtree, so connecting a stage connects everything in it.

use crate::game::Game;
use crate::node::{GameNode, NodeBehavior, NodeEvent, WeakGameNode, NODE_ADD, NODE_DELETE};
use crate::GameNodeChildSet;
use gom_core::ClassSet;
use std::cell::RefCell;
use std::ops::Deref;
use std::rc::{Rc, Weak};
use tracing::trace;

/// Behavior backing a stage node
pub struct StageState {
    entities: GameNodeChildSet,
    systems: RefCell<ClassSet<GameNode>>,
}

impl StageState {
    fn new(node: &WeakGameNode) -> Self {
        Self {
            entities: GameNodeChildSet::new(node),
            systems: RefCell::new(ClassSet::new()),
        }
    }

    fn visit(&self, node: &GameNode, mut f: impl FnMut(&GameNode)) {
        let systems = node.children().snapshot();
        let entities = self.entities.snapshot();
        for child in systems.iter().chain(entities.iter()) {
            if !child.is_disabled() {
                f(child);
            }
        }
    }
}

impl NodeBehavior for StageState {
    fn update(&self, node: &GameNode, dt: f64) {
        self.visit(node, |child| child.update(dt));
    }

    fn render(&self, node: &GameNode) {
        self.visit(node, GameNode::render);
    }

    fn extra_children(&self) -> Vec<GameNode> {
        self.entities.snapshot()
    }
}

/// Handle to a stage node
///
/// A stage watches its own `node:add` and `node:delete` to index systems by
/// class, so `stage.watchable().is_watched(..)` is always true for those
/// types and for `None`.
#[derive(Clone)]
pub struct Stage {
    node: GameNode,
    state: Rc<StageState>,
}

impl Stage {
    pub fn new() -> Self {
        Self::build(None)
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self::build(Some(id.into()))
    }

    fn build(id: Option<String>) -> Self {
        let (node, state) = GameNode::build(id, false, StageState::new);
        let stage = Self { node, state };
        stage.track_systems();
        stage
    }

    /// Keep the class index in step with the system set
    fn track_systems(&self) {
        let node = self.node.downgrade();
        let state = Rc::downgrade(&self.state);
        self.node.watchable().on(NODE_ADD, move |event| {
            with_system(&node, &state, event, |stage, state, system| {
                if stage.children().has(system) {
                    trace!(class = system.class().name(), "registered system");
                    state.systems.borrow_mut().add(system.clone());
                }
            });
        });

        let node = self.node.downgrade();
        let state = Rc::downgrade(&self.state);
        self.node.watchable().on(NODE_DELETE, move |event| {
            with_system(&node, &state, event, |_, state, system| {
                state.systems.borrow_mut().delete(system);
            });
        });
    }

    /// View an existing node as a stage
    pub fn from_node(node: &GameNode) -> Option<Self> {
        node.behavior_rc::<StageState>().map(|state| Self {
            node: node.clone(),
            state,
        })
    }

    pub fn node(&self) -> &GameNode {
        &self.node
    }

    /// The systems of this stage (its `children`)
    pub fn systems(&self) -> &GameNodeChildSet {
        self.node.children()
    }

    pub fn entities(&self) -> &GameNodeChildSet {
        &self.state.entities
    }

    /// The most recently added system whose behavior is `B`
    pub fn system<B: NodeBehavior>(&self) -> Option<GameNode> {
        self.state.systems.borrow().get::<B>().cloned()
    }

    /// The game this stage belongs to
    pub fn game(&self) -> Option<Game> {
        self.node.parent().as_ref().and_then(Game::from_node)
    }

    /// Update enabled systems, then enabled entities
    pub fn update(&self, dt: f64) {
        self.node.update(dt);
    }

    /// Render enabled systems, then enabled entities
    pub fn render(&self) {
        self.node.render();
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for Stage {
    type Target = GameNode;

    fn deref(&self) -> &GameNode {
        &self.node
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("id", &self.node.id())
            .field("systems", &self.systems().len())
            .field("entities", &self.entities().len())
            .finish()
    }
}

fn with_system(
    node: &WeakGameNode,
    state: &Weak<StageState>,
    event: &NodeEvent,
    f: impl FnOnce(&GameNode, &StageState, &GameNode),
) {
    if let (Some(stage), Some(state), Some(system)) = (node.upgrade(), state.upgrade(), event.node())
    {
        f(&stage, &state, system);
    }
}
