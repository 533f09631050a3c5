// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{AbstractIndex, NodeArena, OrderedIndex, RbTree};
use std::sync::{Arc, Mutex, MutexGuard};

/// A tree behind a single mutex
///
/// Every operation, including reads, is exclusive.
pub struct MutexLockedTree<V> {
    tree: Mutex<RbTree<V>>,
}

impl<V> Default for MutexLockedTree<V> {
    fn default() -> Self {
        Self::new(Arc::default())
    }
}

impl<V> MutexLockedTree<V> {
    /// Creates an empty index that allocates its nodes from `arena`.
    #[must_use]
    pub fn new(arena: Arc<NodeArena<V>>) -> Self {
        Self {
            tree: Mutex::new(RbTree::new(arena)),
        }
    }

    /// Returns the arena backing the tree.
    #[must_use]
    pub fn arena(&self) -> Arc<NodeArena<V>> {
        self.lock().arena().clone()
    }

    fn lock(&self) -> MutexGuard<'_, RbTree<V>> {
        self.tree.lock().expect("lock is poisoned")
    }
}

impl<V: Clone> AbstractIndex<V> for MutexLockedTree<V> {
    fn insert(&self, key: i64, value: V) {
        self.lock().insert(key, value);
    }

    fn get(&self, key: i64) -> Option<V> {
        self.lock().get(key).cloned()
    }

    fn delete(&self, key: i64) -> Option<V> {
        self.lock().delete(key)
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

impl<V: Clone> OrderedIndex<V> for MutexLockedTree<V> {
    fn min(&self) -> Option<(i64, V)> {
        self.lock().min().map(|(key, value)| (key, value.clone()))
    }

    fn max(&self) -> Option<(i64, V)> {
        self.lock().max().map(|(key, value)| (key, value.clone()))
    }

    fn prev(&self, key: i64) -> Option<(i64, V)> {
        self.lock().prev(key).map(|(key, value)| (key, value.clone()))
    }

    fn next(&self, key: i64) -> Option<(i64, V)> {
        self.lock().next(key).map(|(key, value)| (key, value.clone()))
    }

    fn range(&self, start: i64, end: i64, visitor: &mut dyn FnMut(i64, &V) -> bool) {
        self.lock().range(start, end, visitor);
    }
}
