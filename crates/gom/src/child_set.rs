//! Child sets
//!
//! A [`GameNodeChildSet`] is an [`IdSet`] of nodes bound to an owner. Adding a
//! node wires its parent to the owner; when the owner's tree is live (rooted
//! in a game) the node and its subtree are connected. Removing reverses this.
//! Either way the owner is notified with `node:add` / `node:delete`.
//!
//! Lifecycle cascades visit the subtree snapshot taken when the cascade
//! starts: breadth-first on add, depth-first (stack order) on delete. A hook
//! that panics aborts the rest of its cascade.

use crate::node::{GameNode, NodeEvent, NodeInner, Slot, WeakGameNode, NODE_ADD, NODE_DELETE};
use gom_core::IdSet;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, warn};

pub(crate) struct ChildSetInner {
    owner: Weak<NodeInner>,
    items: RefCell<IdSet<GameNode>>,
}

/// Set of nodes owned by a node
pub struct GameNodeChildSet(Rc<ChildSetInner>);

impl GameNodeChildSet {
    /// Create an empty set owned by `owner`
    pub fn new(owner: &WeakGameNode) -> Self {
        Self(Rc::new(ChildSetInner {
            owner: owner.0.clone(),
            items: RefCell::new(IdSet::new()),
        }))
    }

    /// Create a set owned by `owner` and add `nodes` to it
    pub fn with_nodes(owner: &WeakGameNode, nodes: impl IntoIterator<Item = GameNode>) -> Self {
        let set = Self::new(owner);
        for node in nodes {
            set.add(node);
        }
        set
    }

    pub(crate) fn from_inner(inner: Rc<ChildSetInner>) -> Self {
        Self(inner)
    }

    /// The owning node
    pub fn owner(&self) -> Option<GameNode> {
        self.0.owner.upgrade().map(GameNode)
    }

    /// Add `node`, moving it out of any other set first
    ///
    /// Adding a current member is a no-op: no lifecycle hooks run and no
    /// second `node:add` is emitted. Adding the owner or one of its
    /// ancestors is refused, since it would make the tree cyclic.
    pub fn add(&self, node: GameNode) -> &Self {
        if self.has(&node) {
            return self;
        }

        if let Some(owner) = self.owner() {
            if node.is_ancestor_of(&owner) {
                warn!(node = ?node.id(), "refusing to add a node beneath itself");
                return self;
            }
        }

        node.remove();
        node.set_slot(Some(Slot {
            parent: self.0.owner.clone(),
            set: Rc::downgrade(&self.0),
        }));
        self.0.items.borrow_mut().add(node.clone());

        if node.is_live() {
            debug!(node = ?node.id(), "connecting subtree");
            node.connected_callback();

            let mut queue: VecDeque<GameNode> = node.child_nodes().into();
            while let Some(child) = queue.pop_front() {
                queue.extend(child.child_nodes());
                child.connected_callback();
            }
        }

        if let Some(owner) = self.owner() {
            owner.notify(NODE_ADD, NodeEvent::Node(node));
        }
        self
    }

    /// Remove `node`. Returns `false` (and does nothing) if it is not a member.
    pub fn delete(&self, node: &GameNode) -> bool {
        if !self.has(node) {
            return false;
        }
        // Liveness is decided before the node loses its parent
        let live = node.is_live();

        node.set_slot(None);
        self.0.items.borrow_mut().delete(node);

        if live {
            debug!(node = ?node.id(), "disconnecting subtree");
            node.disconnected_callback();

            let mut stack = node.child_nodes();
            while let Some(child) = stack.pop() {
                stack.extend(child.child_nodes());
                child.disconnected_callback();
            }
        }

        if let Some(owner) = self.owner() {
            owner.notify(NODE_DELETE, NodeEvent::Node(node.clone()));
        }
        true
    }

    pub fn has(&self, node: &GameNode) -> bool {
        self.0.items.borrow().has(node)
    }

    pub fn get_by_id(&self, id: &str) -> Option<GameNode> {
        self.0.items.borrow().get_by_id(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.0.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.items.borrow().is_empty()
    }

    /// Members in insertion order, as of now
    pub fn snapshot(&self) -> Vec<GameNode> {
        self.0.items.borrow().iter().cloned().collect()
    }
}

impl fmt::Debug for GameNodeChildSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.snapshot()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Game;
    use crate::node::NodeBehavior;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Probe {
        name: &'static str,
        log: Log,
    }

    impl NodeBehavior for Probe {
        fn connected(&self, _node: &GameNode) {
            self.log.borrow_mut().push(format!("connected:{}", self.name));
        }

        fn disconnected(&self, _node: &GameNode) {
            self.log.borrow_mut().push(format!("disconnected:{}", self.name));
        }
    }

    fn probe(name: &'static str, log: &Log) -> GameNode {
        GameNode::with_id(
            name,
            Probe {
                name,
                log: log.clone(),
            },
        )
    }

    fn watch_owner(owner: &GameNode, log: &Log) {
        for ty in [NODE_ADD, NODE_DELETE] {
            let log = log.clone();
            owner.watchable().on(ty, move |event| {
                let id = event.node().and_then(GameNode::id).unwrap_or("?");
                log.borrow_mut().push(format!("{ty}:{id}"));
            });
        }
    }

    /// n -> [c1 -> [g1], c2 -> [g2]]
    fn subtree(log: &Log) -> GameNode {
        let n = probe("n", log);
        let c1 = probe("c1", log);
        let c2 = probe("c2", log);
        c1.children().add(probe("g1", log));
        c2.children().add(probe("g2", log));
        n.children().add(c1).add(c2);
        n
    }

    #[test]
    fn test_add_sets_parent_and_notifies() {
        let owner = GameNode::empty();
        let log = Log::default();
        watch_owner(&owner, &log);
        let child = GameNode::with_id("child", ());

        owner.children().add(child.clone());

        assert_eq!(child.parent(), Some(owner.clone()));
        assert!(owner.children().has(&child));
        assert_eq!(*log.borrow(), vec!["node:add:child"]);
    }

    #[test]
    fn test_delete_clears_parent_and_notifies() {
        let owner = GameNode::empty();
        let child = GameNode::with_id("child", ());
        owner.children().add(child.clone());
        let log = Log::default();
        watch_owner(&owner, &log);

        assert!(owner.children().delete(&child));

        assert_eq!(child.parent(), None);
        assert!(!owner.children().has(&child));
        assert_eq!(owner.children().get_by_id("child"), None);
        assert_eq!(*log.borrow(), vec!["node:delete:child"]);
    }

    #[test]
    fn test_delete_non_member_has_no_side_effects() {
        let owner = GameNode::empty();
        let other = GameNode::empty();
        let child = GameNode::empty();
        other.children().add(child.clone());
        let log = Log::default();
        watch_owner(&owner, &log);

        assert!(!owner.children().delete(&child));
        assert_eq!(child.parent(), Some(other));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_no_cascade_outside_game() {
        let log = Log::default();
        let owner = GameNode::empty();

        owner.children().add(subtree(&log));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_add_cascades_breadth_first() {
        let log = Log::default();
        let game = Game::new();
        watch_owner(game.node(), &log);
        let n = subtree(&log);

        game.stages().add(n);

        assert_eq!(
            *log.borrow(),
            vec![
                "connected:n",
                "connected:c1",
                "connected:c2",
                "connected:g1",
                "connected:g2",
                "node:add:n",
            ]
        );
    }

    #[test]
    fn test_delete_cascades_depth_first() {
        let log = Log::default();
        let game = Game::new();
        let n = subtree(&log);
        game.stages().add(n.clone());
        watch_owner(game.node(), &log);
        log.borrow_mut().clear();

        assert!(game.stages().delete(&n));

        assert_eq!(
            *log.borrow(),
            vec![
                "disconnected:n",
                "disconnected:c2",
                "disconnected:g2",
                "disconnected:c1",
                "disconnected:g1",
                "node:delete:n",
            ]
        );
        assert!(!n.is_live());
    }

    #[test]
    fn test_adding_into_live_subtree_connects() {
        let log = Log::default();
        let game = Game::new();
        let n = subtree(&log);
        game.stages().add(n.clone());
        log.borrow_mut().clear();

        let late = probe("late", &log);
        n.children().add(late.clone());

        assert_eq!(*log.borrow(), vec!["connected:late"]);
        assert!(late.is_live());
    }

    #[test]
    fn test_reparenting_moves_between_sets() {
        let a = GameNode::empty();
        let b = GameNode::empty();
        let child = GameNode::empty();
        let log = Log::default();
        watch_owner(&a, &log);

        a.children().add(child.clone());
        b.children().add(child.clone());

        assert!(!a.children().has(&child));
        assert!(b.children().has(&child));
        assert_eq!(child.parent(), Some(b));
        let id = child.id().unwrap();
        assert_eq!(
            *log.borrow(),
            vec![format!("node:add:{id}"), format!("node:delete:{id}")]
        );
    }

    #[test]
    fn test_re_adding_member_is_noop() {
        let owner = GameNode::empty();
        let child = GameNode::empty();
        owner.children().add(child.clone());
        let log = Log::default();
        watch_owner(&owner, &log);

        owner.children().add(child.clone());
        assert_eq!(owner.children().len(), 1);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_re_adding_live_member_does_not_reconnect() {
        let log = Log::default();
        let game = Game::new();
        let n = probe("n", &log);
        game.stages().add(n.clone());
        watch_owner(game.node(), &log);
        log.borrow_mut().clear();

        game.stages().add(n.clone());

        assert!(log.borrow().is_empty());
        assert_eq!(game.stages().len(), 1);
        assert_eq!(n.parent(), Some(game.node().clone()));
    }

    #[test]
    fn test_refuses_cycles() {
        let a = GameNode::empty();
        let b = GameNode::empty();
        a.children().add(b.clone());

        b.children().add(a.clone());
        assert!(b.children().is_empty());
        assert_eq!(a.parent(), None);

        a.children().add(a.clone());
        assert_eq!(a.children().len(), 1);
    }

    #[test]
    fn test_with_nodes() {
        let owner = GameNode::empty();
        let set = GameNodeChildSet::with_nodes(
            &owner.downgrade(),
            [GameNode::empty(), GameNode::empty()],
        );

        assert_eq!(set.len(), 2);
        for node in set.snapshot() {
            assert_eq!(node.parent(), Some(owner.clone()));
            assert!(node.id().is_some());
        }
        assert_eq!(set.owner(), Some(owner));
    }
}
