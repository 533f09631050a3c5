// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Red-black tree keyed by `i64`.
//!
//! Nodes live in a slot table and link to each other by [`NodeId`]. The parent
//! link is a plain id used for rebalancing; ownership stays with the slot table.

pub mod node;
mod verify;

use crate::NodeArena;
use node::{Color, Node, NodeId};
use std::{cmp::Ordering, sync::Arc};

pub use verify::InvariantViolation;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Side {
    Left,
    Right,
}

impl Side {
    fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// An ordered map from `i64` keys to values, balanced as a red-black tree
///
/// Nodes are obtained from a [`NodeArena`] and given back to it on deletion
/// (and when the tree is cleared or dropped).
///
/// All operations are `O(log n)`, except for range scans which are `O(log n + k)`.
///
/// The tree is not synchronized; see the [`concurrency`](crate::concurrency) wrappers.
pub struct RbTree<V> {
    slots: Vec<Option<Box<Node<V>>>>,
    vacant: Vec<NodeId>,
    root: Option<NodeId>,
    len: usize,
    arena: Arc<NodeArena<V>>,
}

impl<V> Default for RbTree<V> {
    fn default() -> Self {
        Self::new(Arc::default())
    }
}

impl<V> Drop for RbTree<V> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<V> RbTree<V> {
    /// Creates an empty tree that allocates its nodes from `arena`.
    #[must_use]
    pub fn new(arena: Arc<NodeArena<V>>) -> Self {
        Self {
            slots: Vec::new(),
            vacant: Vec::new(),
            root: None,
            len: 0,
            arena,
        }
    }

    /// Returns the arena backing this tree.
    #[must_use]
    pub fn arena(&self) -> &Arc<NodeArena<V>> {
        &self.arena
    }

    /// Returns the number of items in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the tree is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Removes all items, returning their nodes to the arena.
    pub fn clear(&mut self) {
        for node in self.slots.drain(..).flatten() {
            self.arena.release(node);
        }
        self.vacant.clear();
        self.root = None;
        self.len = 0;
    }

    // ===== Slot table =====

    #[expect(
        clippy::expect_used,
        reason = "ids are only handed out for occupied slots"
    )]
    fn node(&self, id: NodeId) -> &Node<V> {
        self.slots
            .get(id.index())
            .and_then(Option::as_deref)
            .expect("node id should point to an occupied slot")
    }

    #[expect(
        clippy::expect_used,
        reason = "ids are only handed out for occupied slots"
    )]
    fn node_mut(&mut self, id: NodeId) -> &mut Node<V> {
        self.slots
            .get_mut(id.index())
            .and_then(Option::as_deref_mut)
            .expect("node id should point to an occupied slot")
    }

    fn attach(&mut self, node: Box<Node<V>>) -> NodeId {
        if let Some(id) = self.vacant.pop() {
            if let Some(slot) = self.slots.get_mut(id.index()) {
                *slot = Some(node);
                return id;
            }
        }

        let id = NodeId::new(self.slots.len());
        self.slots.push(Some(node));
        id
    }

    #[expect(
        clippy::expect_used,
        reason = "ids are only handed out for occupied slots"
    )]
    fn detach(&mut self, id: NodeId) -> Box<Node<V>> {
        let node = self
            .slots
            .get_mut(id.index())
            .and_then(Option::take)
            .expect("node id should point to an occupied slot");

        self.vacant.push(id);
        node
    }

    // ===== Field accessors =====

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    fn left(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).left
    }

    fn child(&self, id: NodeId, side: Side) -> Option<NodeId> {
        let node = self.node(id);
        match side {
            Side::Left => node.left,
            Side::Right => node.right,
        }
    }

    fn set_child(&mut self, id: NodeId, side: Side, child: Option<NodeId>) {
        let node = self.node_mut(id);
        match side {
            Side::Left => node.left = child,
            Side::Right => node.right = child,
        }
    }

    /// Returns on which side of `parent` the `child` hangs.
    fn side_of(&self, parent: NodeId, child: Option<NodeId>) -> Side {
        if self.left(parent) == child {
            Side::Left
        } else {
            Side::Right
        }
    }

    /// Absent nodes are black.
    fn color_of(&self, id: Option<NodeId>) -> Color {
        id.map_or(Color::Black, |id| self.node(id).color)
    }

    fn is_red(&self, id: NodeId) -> bool {
        self.node(id).color == Color::Red
    }

    fn set_color(&mut self, id: NodeId, color: Color) {
        self.node_mut(id).color = color;
    }

    fn entry(&self, id: NodeId) -> Option<(i64, &V)> {
        let node = self.node(id);
        node.value.as_ref().map(|value| (node.key, value))
    }

    fn find(&self, key: i64) -> Option<NodeId> {
        let mut cursor = self.root;

        while let Some(id) = cursor {
            let node = self.node(id);
            match key.cmp(&node.key) {
                Ordering::Less => cursor = node.left,
                Ordering::Greater => cursor = node.right,
                Ordering::Equal => return Some(id),
            }
        }

        None
    }

    fn minimum(&self, mut id: NodeId) -> NodeId {
        while let Some(left) = self.node(id).left {
            id = left;
        }
        id
    }

    fn maximum(&self, mut id: NodeId) -> NodeId {
        while let Some(right) = self.node(id).right {
            id = right;
        }
        id
    }

    // ===== Structural changes =====

    /// Points whatever referenced `old` (its parent, or the root) to `new`.
    fn replace_child(&mut self, parent: Option<NodeId>, old: NodeId, new: Option<NodeId>) {
        match parent {
            None => self.root = new,
            Some(parent) => {
                let side = self.side_of(parent, Some(old));
                self.set_child(parent, side, new);
            }
        }
    }

    /// Rotates `x` down to `side`; its child on the other side takes its place.
    ///
    /// Only the links of `x`, that child, the child's inner subtree and `x`'s parent change.
    #[expect(
        clippy::expect_used,
        reason = "rotation invariant: the child being rotated up must exist"
    )]
    fn rotate(&mut self, x: NodeId, side: Side) {
        let up = side.opposite();
        let y = self
            .child(x, up)
            .expect("rotation requires a child on the opposite side");

        let inner = self.child(y, side);
        self.set_child(x, up, inner);
        if let Some(inner) = inner {
            self.node_mut(inner).parent = Some(x);
        }

        let parent = self.parent(x);
        self.node_mut(y).parent = parent;
        self.replace_child(parent, x, Some(y));

        self.set_child(y, side, Some(x));
        self.node_mut(x).parent = Some(y);
    }

    /// Puts the subtree `v` where `u` was. `u` keeps its own links.
    fn transplant(&mut self, u: NodeId, v: Option<NodeId>) {
        let parent = self.parent(u);
        self.replace_child(parent, u, v);
        if let Some(v) = v {
            self.node_mut(v).parent = parent;
        }
    }

    // ===== Public API =====

    /// Inserts a key-value pair.
    ///
    /// If the key already exists, its value is replaced in place (the tree
    /// structure does not change) and the previous value is returned.
    pub fn insert(&mut self, key: i64, value: V) -> Option<V> {
        let mut parent = None;
        let mut side = Side::Left;
        let mut cursor = self.root;

        while let Some(id) = cursor {
            let node = self.node(id);
            match key.cmp(&node.key) {
                Ordering::Less => {
                    parent = Some(id);
                    side = Side::Left;
                    cursor = node.left;
                }
                Ordering::Greater => {
                    parent = Some(id);
                    side = Side::Right;
                    cursor = node.right;
                }
                Ordering::Equal => return self.node_mut(id).value.replace(value),
            }
        }

        let node = self.arena.acquire(key, value);
        let id = self.attach(node);
        self.node_mut(id).parent = parent;

        match parent {
            None => self.root = Some(id),
            Some(parent) => self.set_child(parent, side, Some(id)),
        }
        self.len += 1;

        self.insert_fixup(id);

        None
    }

    #[expect(
        clippy::expect_used,
        reason = "a red node is never the root, so it has a parent"
    )]
    fn insert_fixup(&mut self, mut z: NodeId) {
        while let Some(mut parent) = self.parent(z).filter(|&p| self.is_red(p)) {
            let grandparent = self
                .parent(parent)
                .expect("red parent should not be the root");

            let side = self.side_of(grandparent, Some(parent));
            let uncle = self.child(grandparent, side.opposite());

            if self.color_of(uncle) == Color::Red {
                self.set_color(parent, Color::Black);
                if let Some(uncle) = uncle {
                    self.set_color(uncle, Color::Black);
                }
                self.set_color(grandparent, Color::Red);
                z = grandparent;
                continue;
            }

            // Inner child: rotate it to the outside first
            if self.side_of(parent, Some(z)) != side {
                self.rotate(parent, side);
                std::mem::swap(&mut z, &mut parent);
            }

            self.set_color(parent, Color::Black);
            self.set_color(grandparent, Color::Red);
            self.rotate(grandparent, side.opposite());
            break;
        }

        if let Some(root) = self.root {
            self.set_color(root, Color::Black);
        }
    }

    /// Removes a key, returning its value if it existed.
    ///
    /// Removing a missing key does nothing.
    pub fn delete(&mut self, key: i64) -> Option<V> {
        let z = self.find(key)?;

        let mut removed_color = self.node(z).color;

        // Position where a black node may be missing now, tracked together with its
        // parent since the position itself may be empty
        let x;
        let x_parent;

        match (self.left(z), self.child(z, Side::Right)) {
            (None, right) => {
                x = right;
                x_parent = self.parent(z);
                self.transplant(z, right);
            }
            (left @ Some(_), None) => {
                x = left;
                x_parent = self.parent(z);
                self.transplant(z, left);
            }
            (Some(z_left), Some(z_right)) => {
                // In-order successor takes z's place
                let y = self.minimum(z_right);
                removed_color = self.node(y).color;
                x = self.child(y, Side::Right);

                if self.parent(y) == Some(z) {
                    x_parent = Some(y);
                } else {
                    x_parent = self.parent(y);
                    self.transplant(y, x);
                    self.set_child(y, Side::Right, Some(z_right));
                    self.node_mut(z_right).parent = Some(y);
                }

                self.transplant(z, Some(y));
                self.set_child(y, Side::Left, Some(z_left));
                self.node_mut(z_left).parent = Some(y);

                let z_color = self.node(z).color;
                self.set_color(y, z_color);
            }
        }

        if removed_color == Color::Black {
            self.delete_fixup(x, x_parent);
        }

        let mut node = self.detach(z);
        self.len -= 1;

        let value = node.value.take();
        self.arena.release(node);
        value
    }

    #[expect(
        clippy::expect_used,
        reason = "black-height invariant: a doubly-black position always has a sibling"
    )]
    fn delete_fixup(&mut self, mut x: Option<NodeId>, mut parent: Option<NodeId>) {
        while x != self.root && self.color_of(x) == Color::Black {
            let Some(p) = parent else {
                break;
            };

            let side = self.side_of(p, x);
            let mut sibling = self
                .child(p, side.opposite())
                .expect("sibling of a doubly-black position should exist");

            if self.is_red(sibling) {
                self.set_color(sibling, Color::Black);
                self.set_color(p, Color::Red);
                self.rotate(p, side);
                sibling = self
                    .child(p, side.opposite())
                    .expect("sibling of a doubly-black position should exist");
            }

            let near = self.child(sibling, side);
            let far = self.child(sibling, side.opposite());

            if self.color_of(near) == Color::Black && self.color_of(far) == Color::Black {
                self.set_color(sibling, Color::Red);
                x = Some(p);
                parent = self.parent(p);
                continue;
            }

            if self.color_of(far) == Color::Black {
                if let Some(near) = near {
                    self.set_color(near, Color::Black);
                }
                self.set_color(sibling, Color::Red);
                self.rotate(sibling, side.opposite());
                sibling = self
                    .child(p, side.opposite())
                    .expect("sibling of a doubly-black position should exist");
            }

            let parent_color = self.node(p).color;
            self.set_color(sibling, parent_color);
            self.set_color(p, Color::Black);
            if let Some(far) = self.child(sibling, side.opposite()) {
                self.set_color(far, Color::Black);
            }
            self.rotate(p, side);

            x = self.root;
            break;
        }

        if let Some(x) = x {
            self.set_color(x, Color::Black);
        }
    }

    /// Returns the value of a key.
    #[must_use]
    pub fn get(&self, key: i64) -> Option<&V> {
        self.find(key).and_then(|id| self.node(id).value.as_ref())
    }

    /// Returns `true` if the tree contains the key.
    #[must_use]
    pub fn contains_key(&self, key: i64) -> bool {
        self.find(key).is_some()
    }

    /// Returns the item with the smallest key.
    #[must_use]
    pub fn min(&self) -> Option<(i64, &V)> {
        self.root
            .map(|root| self.minimum(root))
            .and_then(|id| self.entry(id))
    }

    /// Returns the item with the largest key.
    #[must_use]
    pub fn max(&self) -> Option<(i64, &V)> {
        self.root
            .map(|root| self.maximum(root))
            .and_then(|id| self.entry(id))
    }

    /// Returns the item with the largest key strictly less than `key`.
    #[must_use]
    pub fn prev(&self, key: i64) -> Option<(i64, &V)> {
        let mut best = None;
        let mut cursor = self.root;

        while let Some(id) = cursor {
            let node = self.node(id);
            if node.key < key {
                best = Some(id);
                cursor = node.right;
            } else {
                cursor = node.left;
            }
        }

        best.and_then(|id| self.entry(id))
    }

    /// Returns the item with the smallest key strictly greater than `key`.
    #[must_use]
    pub fn next(&self, key: i64) -> Option<(i64, &V)> {
        let mut best = None;
        let mut cursor = self.root;

        while let Some(id) = cursor {
            let node = self.node(id);
            if node.key > key {
                best = Some(id);
                cursor = node.left;
            } else {
                cursor = node.right;
            }
        }

        best.and_then(|id| self.entry(id))
    }

    /// Visits all items with `start <= key <= end` in ascending key order.
    ///
    /// The visitor returns `false` to stop the scan.
    pub fn range<F: FnMut(i64, &V) -> bool>(&self, start: i64, end: i64, mut visitor: F) {
        for (key, value) in self.range_iter(start, end) {
            if !visitor(key, value) {
                return;
            }
        }
    }

    /// Returns an iterator over all items with `start <= key <= end` in ascending key order.
    #[must_use]
    pub fn range_iter(&self, start: i64, end: i64) -> Iter<'_, V> {
        let mut iter = Iter {
            tree: self,
            stack: Vec::new(),
            end,
        };
        iter.seek(self.root, start);
        iter
    }

    /// Returns an iterator over all items in ascending key order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, V> {
        self.range_iter(i64::MIN, i64::MAX)
    }

    /// Checks every structural invariant, returning the black height of the tree.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    #[doc(hidden)]
    pub fn verify(&self) -> Result<usize, InvariantViolation> {
        verify::verify(self)
    }
}

/// Ascending iterator over (a range of) the items of a [`RbTree`]
///
/// The stack holds the path of nodes whose left side is already done,
/// so memory stays proportional to the tree height.
pub struct Iter<'a, V> {
    tree: &'a RbTree<V>,
    stack: Vec<NodeId>,
    end: i64,
}

impl<V> Iter<'_, V> {
    /// Pushes the nodes with `key >= start` on the leftmost path below `cursor`.
    fn seek(&mut self, mut cursor: Option<NodeId>, start: i64) {
        while let Some(id) = cursor {
            let node = self.tree.node(id);

            if node.key < start {
                cursor = node.right;
            } else {
                self.stack.push(id);
                cursor = node.left;
            }
        }
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (i64, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;

        loop {
            let id = self.stack.pop()?;
            let node = tree.node(id);

            // Everything still on the stack is larger
            if node.key > self.end {
                self.stack.clear();
                return None;
            }

            self.seek(node.right, node.key);

            if let Some(value) = &node.value {
                return Some((node.key, value));
            }
        }
    }
}

impl<'a, V> IntoIterator for &'a RbTree<V> {
    type Item = (i64, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use std::collections::BTreeMap;
    use test_log::test;

    fn tree_with_keys(n: i64) -> RbTree<i64> {
        let mut tree = RbTree::default();
        for key in 0..n {
            tree.insert(key, key * 10);
        }
        tree
    }

    fn keys(tree: &RbTree<i64>) -> Vec<i64> {
        tree.iter().map(|(key, _)| key).collect()
    }

    #[test]
    fn tree_empty() {
        let tree = RbTree::<i64>::default();

        assert!(tree.is_empty());
        assert_eq!(0, tree.len());
        assert_eq!(None, tree.get(0));
        assert_eq!(None, tree.min());
        assert_eq!(None, tree.max());
        assert_eq!(None, tree.prev(0));
        assert_eq!(None, tree.next(0));
        assert_eq!(0, tree.iter().count());
        assert_eq!(0, tree.verify().unwrap());
    }

    #[test]
    fn tree_insert_get() {
        let mut tree = RbTree::default();

        assert_eq!(None, tree.insert(5, "a"));
        assert_eq!(None, tree.insert(3, "b"));
        assert_eq!(None, tree.insert(8, "c"));

        assert_eq!(Some(&"a"), tree.get(5));
        assert_eq!(Some(&"b"), tree.get(3));
        assert_eq!(Some(&"c"), tree.get(8));
        assert_eq!(None, tree.get(4));
        assert_eq!(3, tree.len());

        tree.verify().unwrap();
    }

    #[test]
    fn tree_insert_overwrite_in_place() {
        let mut tree = tree_with_keys(100);
        let slots_before = tree.slots.len();

        assert_eq!(Some(420), tree.insert(42, -1));
        assert_eq!(Some(&-1), tree.get(42));
        assert_eq!(100, tree.len());
        assert_eq!(slots_before, tree.slots.len());

        tree.verify().unwrap();
    }

    #[test]
    fn tree_delete_then_get() {
        let mut tree = tree_with_keys(10);

        assert_eq!(Some(30), tree.delete(3));
        assert_eq!(None, tree.get(3));
        assert_eq!(9, tree.len());

        tree.verify().unwrap();
    }

    #[test]
    fn tree_delete_missing_is_noop() {
        let mut tree = tree_with_keys(50);
        let before = keys(&tree);

        assert_eq!(None, tree.delete(1_000));
        assert_eq!(None, tree.delete(-1));

        assert_eq!(before, keys(&tree));
        assert_eq!(50, tree.len());
        tree.verify().unwrap();

        let mut empty = RbTree::<i64>::default();
        assert_eq!(None, empty.delete(0));
    }

    #[test]
    fn tree_delete_root_until_empty() {
        let mut tree = tree_with_keys(64);

        while let Some(key) = tree.root.map(|id| tree.node(id).key) {
            tree.delete(key);
            tree.verify().unwrap();
        }

        assert!(tree.is_empty());
        assert_eq!(0, tree.len());
    }

    #[test]
    fn tree_scenario_delete_even() {
        let mut tree = tree_with_keys(1_000);
        tree.verify().unwrap();

        for key in (0..1_000).step_by(2) {
            tree.delete(key);
        }

        assert_eq!(None, tree.get(0));
        assert_eq!(Some(&10), tree.get(1));

        let keys = keys(&tree);
        assert_eq!(500, keys.len());
        assert!(keys.windows(2).all(|w| w[0] < w[1]));

        for key in 0..1_000 {
            if key % 2 == 0 {
                assert_eq!(None, tree.get(key));
            } else {
                assert_eq!(Some(&(key * 10)), tree.get(key));
            }
        }

        tree.verify().unwrap();
    }

    #[test]
    fn tree_scenario_range_sum() {
        let tree = tree_with_keys(1_000);

        let mut sum = 0;
        let mut visited = vec![];
        tree.range(100, 199, |key, _| {
            sum += key;
            visited.push(key);
            true
        });

        assert_eq!(14_950, sum);
        assert_eq!((100..=199).collect::<Vec<_>>(), visited);
    }

    #[test]
    fn tree_scenario_prev_next() {
        let tree = tree_with_keys(1_000);

        assert_eq!(Some((499, &4_990)), tree.prev(500));
        assert_eq!(None, tree.next(999));
        assert_eq!(Some((500, &5_000)), tree.next(499));
        assert_eq!(None, tree.prev(0));
        assert_eq!(Some((0, &0)), tree.next(-100));
        assert_eq!(Some((999, &9_990)), tree.prev(5_000));
    }

    #[test]
    fn tree_prev_next_sparse() {
        let mut tree = RbTree::default();
        for key in [10, 20, 30, 40] {
            tree.insert(key, ());
        }

        assert_eq!(Some(20), tree.prev(25).map(|(k, _)| k));
        assert_eq!(Some(20), tree.prev(30).map(|(k, _)| k));
        assert_eq!(Some(30), tree.next(25).map(|(k, _)| k));
        assert_eq!(Some(40), tree.next(30).map(|(k, _)| k));
    }

    #[test]
    fn tree_min_max() {
        let mut tree = RbTree::default();
        for key in [5, -3, 12, 7, -20] {
            tree.insert(key, key);
        }

        assert_eq!(Some((-20, &-20)), tree.min());
        assert_eq!(Some((12, &12)), tree.max());

        tree.delete(-20);
        tree.delete(12);

        assert_eq!(Some((-3, &-3)), tree.min());
        assert_eq!(Some((7, &7)), tree.max());
    }

    #[test]
    fn tree_range_early_stop() {
        let tree = tree_with_keys(100);

        let mut visited = vec![];
        tree.range(10, 90, |key, _| {
            visited.push(key);
            visited.len() < 5
        });

        assert_eq!(vec![10, 11, 12, 13, 14], visited);
    }

    #[test]
    fn tree_range_bounds() {
        let tree = tree_with_keys(10);

        let collect = |start, end| {
            let mut visited = vec![];
            tree.range(start, end, |key, _| {
                visited.push(key);
                true
            });
            visited
        };

        assert_eq!(vec![3], collect(3, 3));
        assert_eq!(Vec::<i64>::new(), collect(5, 4));
        assert_eq!(Vec::<i64>::new(), collect(20, 30));
        assert_eq!(vec![0, 1, 2], collect(-10, 2));
        assert_eq!((0..10).collect::<Vec<_>>(), collect(i64::MIN, i64::MAX));
    }

    #[test]
    fn tree_range_iter_sparse() {
        let mut tree = RbTree::default();
        for key in (0..100).step_by(10) {
            tree.insert(key, key);
        }

        let keys = tree.range_iter(15, 55).map(|(k, _)| k).collect::<Vec<_>>();
        assert_eq!(vec![20, 30, 40, 50], keys);

        assert_eq!(0, tree.range_iter(91, 99).count());
        assert_eq!(0, tree.range_iter(50, 40).count());
        assert_eq!(Some((90, &90)), tree.range_iter(90, i64::MAX).last());
    }

    #[test]
    fn tree_negative_and_extreme_keys() {
        let mut tree = RbTree::default();
        for key in [i64::MIN, -1, 0, 1, i64::MAX] {
            tree.insert(key, key);
        }

        assert_eq!(
            vec![i64::MIN, -1, 0, 1, i64::MAX],
            tree.iter().map(|(k, _)| k).collect::<Vec<_>>()
        );
        assert_eq!(None, tree.next(i64::MAX));
        assert_eq!(None, tree.prev(i64::MIN));

        tree.verify().unwrap();
    }

    #[test]
    fn tree_recycles_nodes() {
        let arena = Arc::new(NodeArena::new());
        let mut tree = RbTree::new(arena.clone());

        for key in 0..100 {
            tree.insert(key, key);
        }
        for key in 0..100 {
            tree.delete(key);
        }
        assert_eq!(100, arena.free_count());

        for key in 0..50 {
            tree.insert(key, key);
        }
        assert_eq!(50, arena.recycled_count());
        assert_eq!(50, arena.free_count());

        // Slots of deleted nodes are reused too
        assert_eq!(100, tree.slots.len());
        tree.verify().unwrap();
    }

    #[test]
    fn tree_drop_returns_nodes() {
        let arena = Arc::new(NodeArena::new());

        {
            let mut tree = RbTree::new(arena.clone());
            for key in 0..10 {
                tree.insert(key, key);
            }
        }

        assert_eq!(10, arena.free_count());
    }

    #[test]
    fn tree_clear() {
        let mut tree = tree_with_keys(20);
        tree.clear();

        assert!(tree.is_empty());
        assert_eq!(0, tree.len());
        assert_eq!(None, tree.get(5));
        assert_eq!(20, tree.arena().free_count());

        tree.insert(1, 1);
        assert_eq!(Some(&1), tree.get(1));
        tree.verify().unwrap();
    }

    #[test]
    fn tree_sequential_insert_height() {
        let tree = tree_with_keys(1 << 12);

        // Black height bounds the height: h <= 2 * bh
        let black_height = tree.verify().unwrap();
        assert!(black_height <= 13);
    }

    #[test]
    fn tree_random_ops_match_model() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0x5EED);

        let mut tree = RbTree::default();
        let mut model = BTreeMap::new();

        for round in 0..20_000 {
            let key = rng.random_range(0..2_000);

            if rng.random_bool(0.6) {
                let value = rng.random::<i64>();
                assert_eq!(model.insert(key, value), tree.insert(key, value));
            } else {
                assert_eq!(model.remove(&key), tree.delete(key));
            }

            if round % 1_000 == 0 {
                tree.verify().unwrap();
            }
        }

        tree.verify().unwrap();
        assert_eq!(model.len(), tree.len());
        assert!(model
            .iter()
            .map(|(k, v)| (*k, v))
            .eq(tree.iter()));

        for probe in -5..2_005 {
            assert_eq!(
                model.range(..probe).next_back().map(|(k, v)| (*k, v)),
                tree.prev(probe)
            );
            assert_eq!(
                model.range(probe + 1..).next().map(|(k, v)| (*k, v)),
                tree.next(probe)
            );
        }
    }

    #[test]
    fn tree_random_insert_then_delete_half() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);

        let mut tree = RbTree::default();
        let mut model = BTreeMap::new();

        for _ in 0..5_000 {
            let key = rng.random_range(0..2_000);
            tree.insert(key, key * 100);
            model.insert(key, key * 100);
        }

        let to_delete = model.keys().copied().step_by(2).collect::<Vec<_>>();
        for key in to_delete {
            tree.delete(key);
            model.remove(&key);
        }

        for (key, value) in &model {
            assert_eq!(Some(value), tree.get(*key));
        }
        assert_eq!(model.len(), tree.len());
        tree.verify().unwrap();
    }
}
