//! Game nodes
//!
//! A [`GameNode`] is a cheap, clonable handle to a node in the hierarchy. The
//! parent owns its children through a [`GameNodeChildSet`]; the child only
//! keeps a weak back-reference, so trees never form reference cycles.
//!
//! Node-specific logic lives in a [`NodeBehavior`], whose hooks are all no-ops
//! by default.
//!
//! ```rust
//! use gom::prelude::*;
//!
//! let parent = GameNode::empty();
//! let child = GameNode::with_id("child", ());
//!
//! parent.children().add(child.clone());
//! assert_eq!(child.parent(), Some(parent.clone()));
//! assert_eq!(parent.children().get_by_id("child"), Some(child));
//! ```

use crate::child_set::{ChildSetInner, GameNodeChildSet};
use gom_core::{ClassId, Classified, EventType, Identified, Watchable};
use std::any::Any;
use std::cell::{Cell, OnceCell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

/// Emitted on the owner after a node joins one of its child sets
pub const NODE_ADD: &str = "node:add";
/// Emitted on the owner after a node leaves one of its child sets
pub const NODE_DELETE: &str = "node:delete";

/// Payload of node notifications
#[derive(Clone, Debug, Default)]
pub enum NodeEvent {
    #[default]
    Empty,
    /// A node, e.g. the subject of `node:add` / `node:delete`
    Node(GameNode),
    /// Arbitrary shared data
    Data(Rc<dyn Any>),
}

impl NodeEvent {
    pub fn node(&self) -> Option<&GameNode> {
        match self {
            NodeEvent::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn data<T: 'static>(&self) -> Option<&T> {
        match self {
            NodeEvent::Data(data) => data.downcast_ref(),
            _ => None,
        }
    }
}

/// Per-node logic and lifecycle hooks
///
/// Hooks take `&self`; behaviors that keep mutable state use `Cell`/`RefCell`.
/// Hooks may freely add, remove or notify nodes.
pub trait NodeBehavior: 'static {
    /// Runs once, before the first `connected` call
    fn init(&self, _node: &GameNode) {}

    /// The node became part of a live tree
    fn connected(&self, _node: &GameNode) {}

    /// The node left a live tree
    fn disconnected(&self, _node: &GameNode) {}

    /// The node was disposed
    fn dispose(&self, _node: &GameNode) {}

    fn update(&self, _node: &GameNode, _dt: f64) {}

    fn render(&self, _node: &GameNode) {}

    /// Nodes owned through child sets other than [`GameNode::children`]
    fn extra_children(&self) -> Vec<GameNode> {
        Vec::new()
    }
}

impl NodeBehavior for () {}

/// Where a node is mounted: its parent and the child set holding it
pub(crate) struct Slot {
    pub(crate) parent: Weak<NodeInner>,
    pub(crate) set: Weak<ChildSetInner>,
}

pub(crate) struct NodeInner {
    id: OnceCell<String>,
    is_game: bool,
    slot: RefCell<Option<Slot>>,
    children: GameNodeChildSet,
    watchable: Watchable<NodeEvent>,
    behavior: Rc<dyn NodeBehavior>,
    /// Same allocation as `behavior`, for downcasting
    state: Rc<dyn Any>,
    class: ClassId,
    disabled: Cell<bool>,
    initialized: Cell<bool>,
}

/// Handle to a node in the hierarchy
///
/// Equality and hashing are by identity.
#[derive(Clone)]
pub struct GameNode(pub(crate) Rc<NodeInner>);

/// Non-owning handle to a node
#[derive(Clone, Default)]
pub struct WeakGameNode(pub(crate) Weak<NodeInner>);

impl WeakGameNode {
    pub fn upgrade(&self) -> Option<GameNode> {
        self.0.upgrade().map(GameNode)
    }
}

impl fmt::Debug for WeakGameNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakGameNode")
    }
}

impl GameNode {
    // =========================================================================
    // CONSTRUCTION
    // =========================================================================

    /// Create a node driven by `behavior`
    pub fn new<B: NodeBehavior>(behavior: B) -> Self {
        Self::build(None, false, |_| behavior).0
    }

    /// Create a node with a caller-supplied id
    pub fn with_id<B: NodeBehavior>(id: impl Into<String>, behavior: B) -> Self {
        Self::build(Some(id.into()), false, |_| behavior).0
    }

    /// Create a node with no behavior
    pub fn empty() -> Self {
        Self::new(())
    }

    /// Create a node whose behavior needs a handle to the node itself,
    /// e.g. to own additional child sets
    pub fn new_cyclic<B: NodeBehavior>(f: impl FnOnce(&WeakGameNode) -> B) -> Self {
        Self::build(None, false, f).0
    }

    pub(crate) fn build<B: NodeBehavior>(
        id: Option<String>,
        is_game: bool,
        f: impl FnOnce(&WeakGameNode) -> B,
    ) -> (Self, Rc<B>) {
        let mut shared: Option<Rc<B>> = None;

        let inner = Rc::new_cyclic(|weak: &Weak<NodeInner>| {
            let handle = WeakGameNode(weak.clone());
            let behavior = Rc::new(f(&handle));
            shared = Some(behavior.clone());

            let id_cell = OnceCell::new();
            if let Some(id) = id {
                let _ = id_cell.set(id);
            }

            NodeInner {
                id: id_cell,
                is_game,
                slot: RefCell::new(None),
                children: GameNodeChildSet::new(&handle),
                watchable: Watchable::new(),
                behavior: behavior.clone(),
                state: behavior,
                class: ClassId::of::<B>(),
                disabled: Cell::new(false),
                initialized: Cell::new(false),
            }
        });

        match shared {
            Some(behavior) => (GameNode(inner), behavior),
            None => unreachable!("Rc::new_cyclic runs its initializer exactly once"),
        }
    }

    // =========================================================================
    // HIERARCHY
    // =========================================================================

    /// The node id, once assigned
    pub fn id(&self) -> Option<&str> {
        self.0.id.get().map(String::as_str)
    }

    pub fn parent(&self) -> Option<GameNode> {
        self.0
            .slot
            .borrow()
            .as_ref()
            .and_then(|slot| slot.parent.upgrade())
            .map(GameNode)
    }

    /// Topmost ancestor (the node itself when it has no parent)
    pub fn root(&self) -> GameNode {
        let mut node = self.clone();
        while let Some(parent) = node.parent() {
            node = parent;
        }
        node
    }

    /// Whether this node is a game root
    pub fn is_game(&self) -> bool {
        self.0.is_game
    }

    /// Whether this node's tree is rooted in a game
    pub fn is_live(&self) -> bool {
        self.root().is_game()
    }

    /// Whether `self` is `other` or one of its ancestors
    pub fn is_ancestor_of(&self, other: &GameNode) -> bool {
        let mut node = Some(other.clone());
        while let Some(current) = node {
            if current == *self {
                return true;
            }
            node = current.parent();
        }
        false
    }

    pub fn children(&self) -> &GameNodeChildSet {
        &self.0.children
    }

    /// Every directly owned node: `children` first, then behavior-owned sets
    pub fn child_nodes(&self) -> Vec<GameNode> {
        let mut nodes = self.0.children.snapshot();
        nodes.extend(self.0.behavior.extra_children());
        nodes
    }

    /// Remove this node from whichever child set holds it
    pub fn remove(&self) -> bool {
        match self.container() {
            Some(set) => set.delete(self),
            None => false,
        }
    }

    pub(crate) fn container(&self) -> Option<GameNodeChildSet> {
        self.0
            .slot
            .borrow()
            .as_ref()
            .and_then(|slot| slot.set.upgrade())
            .map(GameNodeChildSet::from_inner)
    }

    pub(crate) fn set_slot(&self, slot: Option<Slot>) {
        *self.0.slot.borrow_mut() = slot;
    }

    // =========================================================================
    // NOTIFICATION
    // =========================================================================

    pub fn watchable(&self) -> &Watchable<NodeEvent> {
        &self.0.watchable
    }

    pub fn notify(&self, ty: impl Into<EventType>, data: NodeEvent) {
        self.0.watchable.notify(ty, data);
    }

    // =========================================================================
    // BEHAVIOR
    // =========================================================================

    /// Borrow the behavior as its concrete type
    pub fn behavior<B: NodeBehavior>(&self) -> Option<&B> {
        self.0.state.downcast_ref::<B>()
    }

    /// Shared handle to the behavior as its concrete type
    pub fn behavior_rc<B: NodeBehavior>(&self) -> Option<Rc<B>> {
        self.0.state.clone().downcast::<B>().ok()
    }

    /// Class of the node's behavior
    pub fn class(&self) -> ClassId {
        self.0.class
    }

    pub fn is_disabled(&self) -> bool {
        self.0.disabled.get()
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.0.disabled.set(disabled);
    }

    pub fn downgrade(&self) -> WeakGameNode {
        WeakGameNode(Rc::downgrade(&self.0))
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Run `init` (first time only) then `connected`
    pub fn connected_callback(&self) {
        if !self.0.initialized.replace(true) {
            self.0.behavior.init(self);
        }
        self.0.behavior.connected(self);
    }

    pub fn disconnected_callback(&self) {
        self.0.behavior.disconnected(self);
    }

    pub fn update(&self, dt: f64) {
        self.0.behavior.update(self, dt);
    }

    pub fn render(&self) {
        self.0.behavior.render(self);
    }

    /// Detach from the parent, then dispose this node and its descendants
    /// depth-first. A disposed node runs `init` again if it is reconnected.
    pub fn dispose(&self) {
        self.remove();

        let mut stack = vec![self.clone()];
        while let Some(node) = stack.pop() {
            stack.extend(node.child_nodes());
            node.0.initialized.set(false);
            node.0.behavior.dispose(&node);
        }
    }
}

impl Identified for GameNode {
    fn id(&self) -> Option<&str> {
        GameNode::id(self)
    }

    fn set_id(&mut self, id: String) {
        let _ = self.0.id.set(id);
    }
}

impl Classified for GameNode {
    type Class = ClassId;

    fn class(&self) -> ClassId {
        self.0.class
    }
}

impl PartialEq for GameNode {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for GameNode {}

impl Hash for GameNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Rc::as_ptr(&self.0), state);
    }
}

impl fmt::Debug for GameNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameNode")
            .field("id", &self.id())
            .field("class", &self.0.class.name())
            .field("children", &self.0.children.len())
            .finish()
    }
}
