// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::tree::node::{Color, Node};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Mutex,
};

/// Upper bound of pooled nodes, beyond which released nodes are freed
const DEFAULT_FREE_LIMIT: usize = 64 * 1_024;

/// Pool of reusable tree nodes
///
/// The arena hands out boxed nodes and takes them back once they are detached from a tree,
/// so steady insert/delete workloads stop hitting the global allocator.
///
/// The free pool is behind its own lock, so one arena can be shared (through an `Arc`)
/// by many trees that are guarded by different locks, as the shards of a
/// [`ShardedTree`](crate::ShardedTree) are.
pub struct NodeArena<V> {
    free: Mutex<Vec<Box<Node<V>>>>,
    free_limit: usize,

    /// Number of acquisitions served from the pool
    recycled: AtomicU64,
}

impl<V> Default for NodeArena<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> NodeArena<V> {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self {
            free: Mutex::default(),
            free_limit: DEFAULT_FREE_LIMIT,
            recycled: AtomicU64::default(),
        }
    }

    /// Creates an arena with `count` pre-allocated nodes.
    #[must_use]
    pub fn with_capacity(count: usize) -> Self {
        let free = (0..count).map(|_| Box::new(Node::vacant())).collect();

        Self {
            free: Mutex::new(free),
            free_limit: DEFAULT_FREE_LIMIT.max(count),
            recycled: AtomicU64::default(),
        }
    }

    /// Sets the maximum number of nodes kept in the free pool.
    ///
    /// Defaults to 65536.
    #[must_use]
    pub fn free_limit(mut self, count: usize) -> Self {
        self.free_limit = count;
        self
    }

    /// Returns a red, unlinked node holding the given key and value.
    pub fn acquire(&self, key: i64, value: V) -> Box<Node<V>> {
        let pooled = self.free.lock().expect("lock is poisoned").pop();

        let mut node = match pooled {
            Some(node) => {
                self.recycled.fetch_add(1, Ordering::Relaxed);
                node
            }
            None => Box::new(Node::vacant()),
        };

        debug_assert!(node.value.is_none() && !node.is_linked());

        node.key = key;
        node.value = Some(value);
        node.color = Color::Red;
        node
    }

    /// Clears the node and returns it to the free pool.
    ///
    /// Takes the node by value, so a released node cannot be reached
    /// through the tree anymore, nor released twice.
    pub fn release(&self, mut node: Box<Node<V>>) {
        node.clear();

        let mut free = self.free.lock().expect("lock is poisoned");
        if free.len() < self.free_limit {
            free.push(node);
        }
    }

    /// Returns the number of nodes currently in the free pool.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.lock().expect("lock is poisoned").len()
    }

    /// Returns how many acquisitions were served by recycling a released node.
    #[must_use]
    pub fn recycled_count(&self) -> u64 {
        self.recycled.load(Ordering::Relaxed)
    }
}
