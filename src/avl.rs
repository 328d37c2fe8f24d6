//! AvlTree: balanced ordered index over an arena of records.
//!
//! Records live in a slot map and are addressed by generational
//! [`NodeId`] handles; the tree itself is only the linkage between them
//! (two child links and a signed balance factor per node). No heights and
//! no parent links are stored. Recursive insert and remove report whether
//! the subtree below grew or shrank, and each frame folds that signal into
//! its own balance factor on the way back up.
//!
//! Handles are stable: rotations relink handles and never move records.
//! Removal detaches exactly one handle; when the removed node has
//! children its in-order neighbour takes over its position first.

use crate::error::TraverseError;
use crate::reentrancy::DebugReentrancy;
use crate::traverse::{self, BinaryLinks, TraversalOrder, Visit};
use core::cmp::Ordering;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Stable handle to a record linked into an [`AvlTree`].
    pub struct NodeId;
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Dir {
    Left = 0,
    Right = 1,
}

impl Dir {
    #[inline]
    fn index(self) -> usize {
        self as usize
    }

    #[inline]
    fn opposite(self) -> Dir {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }

    /// Balance contribution of a taller subtree on this side.
    #[inline]
    fn sign(self) -> i8 {
        match self {
            Dir::Left => -1,
            Dir::Right => 1,
        }
    }
}

#[derive(Debug)]
struct Node<T> {
    child: [Option<NodeId>; 2],
    // height(right) - height(left); in -1..=1 between operations.
    balance: i8,
    item: T,
}

impl<T> Node<T> {
    fn new(item: T) -> Self {
        Self {
            child: [None, None],
            balance: 0,
            item,
        }
    }
}

/// Structural half of the tree: everything rotations touch. The comparator
/// and the reentrancy guard stay borrowed while these links are rewritten.
struct Arena<T> {
    nodes: SlotMap<NodeId, Node<T>>,
}

impl<T> Arena<T> {
    #[inline]
    fn child(&self, at: NodeId, dir: Dir) -> Option<NodeId> {
        self.nodes[at].child[dir.index()]
    }

    #[inline]
    fn set_child(&mut self, at: NodeId, dir: Dir, to: Option<NodeId>) {
        self.nodes[at].child[dir.index()] = to;
    }

    /// Rotates `at` down toward `dir`; its child on the other side rises
    /// and is returned as the new subtree root. Only the balance factors of
    /// the two relinked nodes change.
    fn rotate(&mut self, at: NodeId, dir: Dir) -> NodeId {
        let up = dir.opposite();
        let Some(pivot) = self.child(at, up) else {
            return at;
        };
        let inner = self.child(pivot, dir);
        self.set_child(at, up, inner);
        self.set_child(pivot, dir, Some(at));

        let s = up.sign();
        let a = self.nodes[at].balance;
        let b = self.nodes[pivot].balance;
        let a2 = a - s - (s * b).max(0) * s;
        let b2 = b - s + (s * a2).min(0) * s;
        self.nodes[at].balance = a2;
        self.nodes[pivot].balance = b2;

        #[cfg(feature = "tracing")]
        tracing::trace!(?at, ?pivot, ?dir, "avl rotate");
        pivot
    }

    /// Restores a node at balance ±2 with one or two rotations.
    fn rebalance(&mut self, at: NodeId) -> NodeId {
        let heavy = if self.nodes[at].balance > 0 {
            Dir::Right
        } else {
            Dir::Left
        };
        let Some(child) = self.child(at, heavy) else {
            return at;
        };
        if self.nodes[child].balance * heavy.sign() < 0 {
            let raised = self.rotate(child, heavy);
            self.set_child(at, heavy, Some(raised));
        }
        self.rotate(at, heavy.opposite())
    }

    fn insert_below<C>(&mut self, cmp: &C, at: Option<NodeId>, new: NodeId) -> (NodeId, bool)
    where
        C: Fn(&T, &T) -> Ordering,
    {
        let Some(cur) = at else {
            return (new, true);
        };
        // Ties descend right so equal records keep insertion order in-order.
        let dir = match cmp(&self.nodes[new].item, &self.nodes[cur].item) {
            Ordering::Less => Dir::Left,
            Ordering::Equal | Ordering::Greater => Dir::Right,
        };
        let below = self.child(cur, dir);
        let (sub, grew) = self.insert_below(cmp, below, new);
        self.set_child(cur, dir, Some(sub));
        if !grew {
            return (cur, false);
        }

        let node = &mut self.nodes[cur];
        node.balance += dir.sign();
        let balance = node.balance;
        match balance {
            0 => (cur, false),
            -1 | 1 => (cur, true),
            _ => (self.rebalance(cur), false),
        }
    }

    /// Folds a one-level height loss on `side` into `at`. Returns the new
    /// subtree root and whether the subtree as a whole got shorter.
    fn shrink(&mut self, at: NodeId, side: Dir) -> (NodeId, bool) {
        let node = &mut self.nodes[at];
        node.balance -= side.sign();
        let balance = node.balance;
        match balance {
            0 => (at, true),
            -1 | 1 => (at, false),
            _ => {
                // A level heavy child absorbs the rotation without losing height.
                let level = self
                    .child(at, side.opposite())
                    .is_some_and(|c| self.nodes[c].balance == 0);
                (self.rebalance(at), !level)
            }
        }
    }

    /// Detaches the extreme node of the subtree at `at` on side `dir`
    /// (`Right` for the maximum). Returns the new subtree root, whether the
    /// subtree shrank, and the detached node.
    fn detach_extreme(&mut self, at: NodeId, dir: Dir) -> (Option<NodeId>, bool, NodeId) {
        let Some(next) = self.child(at, dir) else {
            return (self.child(at, dir.opposite()), true, at);
        };
        let (sub, shrank, found) = self.detach_extreme(next, dir);
        self.set_child(at, dir, sub);
        if !shrank {
            return (Some(at), false, found);
        }
        let (root, shrank) = self.shrink(at, dir);
        (Some(root), shrank, found)
    }

    /// Unlinks `cur`, handing its position and balance factor to the
    /// predecessor (left subtree maximum) or, without a left child, to the
    /// successor (right subtree minimum).
    fn unlink(&mut self, cur: NodeId) -> (Option<NodeId>, bool) {
        let (side, sub) = match self.nodes[cur].child {
            [Some(left), _] => (Dir::Left, left),
            [None, Some(right)] => (Dir::Right, right),
            [None, None] => return (None, true),
        };
        let (rest, shrank, heir) = self.detach_extreme(sub, side.opposite());

        let Node { child, balance, .. } = &mut self.nodes[cur];
        let (mut links, balance) = (core::mem::take(child), core::mem::take(balance));
        links[side.index()] = rest;
        let node = &mut self.nodes[heir];
        node.child = links;
        node.balance = balance;

        if !shrank {
            return (Some(heir), false);
        }
        let (root, shrank) = self.shrink(heir, side);
        (Some(root), shrank)
    }

    fn remove_below<C>(
        &mut self,
        cmp: &C,
        at: Option<NodeId>,
        probe: &T,
    ) -> (Option<NodeId>, bool, Option<NodeId>)
    where
        C: Fn(&T, &T) -> Ordering,
    {
        let Some(cur) = at else {
            return (None, false, None);
        };
        let dir = match cmp(probe, &self.nodes[cur].item) {
            Ordering::Equal => {
                let (root, shrank) = self.unlink(cur);
                return (root, shrank, Some(cur));
            }
            Ordering::Less => Dir::Left,
            Ordering::Greater => Dir::Right,
        };
        let below = self.child(cur, dir);
        let (sub, shrank, removed) = self.remove_below(cmp, below, probe);
        self.set_child(cur, dir, sub);
        if !shrank {
            return (Some(cur), false, removed);
        }
        let (root, shrank) = self.shrink(cur, dir);
        (Some(root), shrank, removed)
    }

    fn extreme(&self, root: Option<NodeId>, dir: Dir) -> Option<NodeId> {
        let mut cur = root?;
        while let Some(next) = self.child(cur, dir) {
            cur = next;
        }
        Some(cur)
    }
}

/// Balanced binary search tree ordered by a caller-supplied comparator.
///
/// The comparator must be a consistent total order. Records comparing
/// `Equal` are allowed (multiset semantics); callers wanting set semantics
/// should check [`find_equal`](Self::find_equal) before inserting.
pub struct AvlTree<T, C = fn(&T, &T) -> Ordering> {
    arena: Arena<T>,
    root: Option<NodeId>,
    cmp: C,
    reentrancy: DebugReentrancy,
}

impl<T: Ord> AvlTree<T> {
    pub fn new() -> Self {
        Self::with_comparator(T::cmp)
    }
}

impl<T: Ord> Default for AvlTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C> AvlTree<T, C>
where
    C: Fn(&T, &T) -> Ordering,
{
    pub fn with_comparator(cmp: C) -> Self {
        Self {
            arena: Arena {
                nodes: SlotMap::with_key(),
            },
            root: None,
            cmp,
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.arena.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.nodes.contains_key(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.arena.nodes.get(id).map(|n| &n.item)
    }

    /// Links `item` into the tree and returns its handle.
    pub fn insert(&mut self, item: T) -> NodeId {
        let _g = self.reentrancy.enter();
        let id = self.arena.nodes.insert(Node::new(item));
        let (root, _) = self.arena.insert_below(&self.cmp, self.root, id);
        self.root = Some(root);
        id
    }

    /// First node met on the search path that compares `Equal` to `probe`.
    pub fn find_equal(&self, probe: &T) -> Option<(NodeId, &T)> {
        let mut cur = self.root;
        while let Some(id) = cur {
            let node = &self.arena.nodes[id];
            cur = match (self.cmp)(probe, &node.item) {
                Ordering::Equal => return Some((id, &node.item)),
                Ordering::Less => node.child[Dir::Left.index()],
                Ordering::Greater => node.child[Dir::Right.index()],
            };
        }
        None
    }

    pub fn min(&self) -> Option<(NodeId, &T)> {
        let id = self.arena.extreme(self.root, Dir::Left)?;
        Some((id, &self.arena.nodes[id].item))
    }

    pub fn max(&self) -> Option<(NodeId, &T)> {
        let id = self.arena.extreme(self.root, Dir::Right)?;
        Some((id, &self.arena.nodes[id].item))
    }

    /// Unlinks a node comparing `Equal` to `probe` and hands back its
    /// handle (now stale) and record. Returns `None` and leaves the tree
    /// untouched when nothing matches.
    pub fn remove(&mut self, probe: &T) -> Option<(NodeId, T)> {
        let _g = self.reentrancy.enter();
        let (root, _, removed) = self.arena.remove_below(&self.cmp, self.root, probe);
        self.root = root;
        let id = removed?;
        let node = self.arena.nodes.remove(id)?;
        Some((id, node.item))
    }

    /// Visits every node in `order`. Returns the number of nodes visited,
    /// counting the node whose visitor returned [`Visit::Stop`].
    pub fn traverse<F>(&self, order: TraversalOrder, visit: F) -> Result<usize, TraverseError>
    where
        F: FnMut(NodeId, &T, usize) -> Visit,
    {
        traverse::traverse(self, order, visit)
    }
}

impl<T, C> BinaryLinks for AvlTree<T, C> {
    type Id = NodeId;
    type Item = T;

    fn root(&self) -> Option<NodeId> {
        self.root
    }

    fn children(&self, id: NodeId) -> [Option<NodeId>; 2] {
        self.arena.nodes[id].child
    }

    fn item(&self, id: NodeId) -> &T {
        &self.arena.nodes[id].item
    }
}

#[cfg(test)]
impl<T, C> AvlTree<T, C>
where
    C: Fn(&T, &T) -> Ordering,
{
    /// Recomputes every subtree height from the physical shape, asserting
    /// the stored balance factors match and stay within -1..=1. Returns the
    /// tree height.
    pub(crate) fn check_shape(&self) -> usize {
        fn height<T>(arena: &Arena<T>, at: Option<NodeId>, seen: &mut usize) -> usize {
            let Some(id) = at else { return 0 };
            *seen += 1;
            let node = &arena.nodes[id];
            let l = height(arena, node.child[0], seen);
            let r = height(arena, node.child[1], seen);
            let actual = r as isize - l as isize;
            assert_eq!(node.balance as isize, actual, "stale balance factor at {:?}", id);
            assert!(actual.abs() <= 1, "unbalanced node {:?}: {}", id, actual);
            1 + l.max(r)
        }
        let mut seen = 0;
        let h = height(&self.arena, self.root, &mut seen);
        assert_eq!(seen, self.len(), "every stored record must be linked exactly once");
        h
    }

    pub(crate) fn in_order(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.len());
        self.traverse(TraversalOrder::InOrder, |id, _, _| {
            out.push(id);
            Visit::Continue
        })
        .unwrap();
        out
    }
}
