// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{AbstractIndex, NodeArena, OrderedIndex, RbTree};
use std::sync::{Arc, RwLock, RwLockReadGuard};

/// A tree behind a single reader-writer lock
///
/// Reads run in parallel, writes are exclusive.
pub struct RwLockedTree<V> {
    tree: RwLock<RbTree<V>>,
}

impl<V> Default for RwLockedTree<V> {
    fn default() -> Self {
        Self::new(Arc::default())
    }
}

impl<V> RwLockedTree<V> {
    /// Creates an empty index that allocates its nodes from `arena`.
    #[must_use]
    pub fn new(arena: Arc<NodeArena<V>>) -> Self {
        Self {
            tree: RwLock::new(RbTree::new(arena)),
        }
    }

    /// Returns the arena backing the tree.
    #[must_use]
    pub fn arena(&self) -> Arc<NodeArena<V>> {
        self.read().arena().clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, RbTree<V>> {
        self.tree.read().expect("lock is poisoned")
    }
}

impl<V: Clone> AbstractIndex<V> for RwLockedTree<V> {
    fn insert(&self, key: i64, value: V) {
        self.tree.write().expect("lock is poisoned").insert(key, value);
    }

    fn get(&self, key: i64) -> Option<V> {
        self.read().get(key).cloned()
    }

    fn delete(&self, key: i64) -> Option<V> {
        self.tree.write().expect("lock is poisoned").delete(key)
    }

    fn len(&self) -> usize {
        self.read().len()
    }
}

impl<V: Clone> OrderedIndex<V> for RwLockedTree<V> {
    fn min(&self) -> Option<(i64, V)> {
        self.read().min().map(|(key, value)| (key, value.clone()))
    }

    fn max(&self) -> Option<(i64, V)> {
        self.read().max().map(|(key, value)| (key, value.clone()))
    }

    fn prev(&self, key: i64) -> Option<(i64, V)> {
        self.read().prev(key).map(|(key, value)| (key, value.clone()))
    }

    fn next(&self, key: i64) -> Option<(i64, V)> {
        self.read().next(key).map(|(key, value)| (key, value.clone()))
    }

    fn range(&self, start: i64, end: i64, visitor: &mut dyn FnMut(i64, &V) -> bool) {
        self.read().range(start, end, visitor);
    }
}
