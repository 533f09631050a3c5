// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Tree nodes

/// Node color
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Color {
    /// Red node
    Red,

    /// Black node (absent children count as black)
    Black,
}

/// Position of a node inside the slot table of the tree that owns it
///
/// Only meaningful for that one tree; parent links are plain ids and never keep a node alive.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub(crate) fn index(self) -> usize {
        self.0
    }
}

/// A red-black tree node
///
/// Nodes are handed out by a [`NodeArena`](crate::NodeArena) and returned to it on deletion.
pub struct Node<V> {
    pub(crate) key: i64,
    pub(crate) value: Option<V>,
    pub(crate) color: Color,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
    pub(crate) parent: Option<NodeId>,
}

impl<V> Node<V> {
    /// An unused slot, as stored in the arena's free pool.
    pub(crate) fn vacant() -> Self {
        Self {
            key: 0,
            value: None,
            color: Color::Black,
            left: None,
            right: None,
            parent: None,
        }
    }

    /// Resets the slot, dropping the payload and forgetting all links.
    pub(crate) fn clear(&mut self) {
        *self = Self::vacant();
    }

    /// Returns the node's key.
    #[must_use]
    pub fn key(&self) -> i64 {
        self.key
    }

    /// Returns the node's value, `None` if the slot is vacant.
    #[must_use]
    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    /// Returns the node's color.
    #[must_use]
    pub fn color(&self) -> Color {
        self.color
    }

    pub(crate) fn is_linked(&self) -> bool {
        self.left.is_some() || self.right.is_some() || self.parent.is_some()
    }
}

impl<V> std::fmt::Debug for Node<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Node({}, {:?})", self.key, self.color)
    }
}
