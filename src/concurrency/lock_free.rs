// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{AbstractIndex, OrderedIndex};
use crossbeam_skiplist::SkipMap;
use std::ops::Bound;

/// A lock-free ordered map
///
/// Each single-key operation is atomic. Multi-key reads (range, len) walk the
/// map while writers keep going, so they do not observe one consistent state:
/// a scan may or may not see an item that is written concurrently.
///
/// This strategy does not use the red-black tree (nor the node arena).
pub struct LockFreeMap<V> {
    items: SkipMap<i64, V>,
}

impl<V: Send + 'static> Default for LockFreeMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Send + 'static> LockFreeMap<V> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: SkipMap::new(),
        }
    }
}

impl<V: Clone + Send + 'static> AbstractIndex<V> for LockFreeMap<V> {
    fn insert(&self, key: i64, value: V) {
        self.items.insert(key, value);
    }

    fn get(&self, key: i64) -> Option<V> {
        self.items.get(&key).map(|entry| entry.value().clone())
    }

    fn delete(&self, key: i64) -> Option<V> {
        self.items.remove(&key).map(|entry| entry.value().clone())
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

impl<V: Clone + Send + 'static> OrderedIndex<V> for LockFreeMap<V> {
    fn min(&self) -> Option<(i64, V)> {
        self.items
            .front()
            .map(|entry| (*entry.key(), entry.value().clone()))
    }

    fn max(&self) -> Option<(i64, V)> {
        self.items
            .back()
            .map(|entry| (*entry.key(), entry.value().clone()))
    }

    fn prev(&self, key: i64) -> Option<(i64, V)> {
        self.items
            .upper_bound(Bound::Excluded(&key))
            .map(|entry| (*entry.key(), entry.value().clone()))
    }

    fn next(&self, key: i64) -> Option<(i64, V)> {
        self.items
            .lower_bound(Bound::Excluded(&key))
            .map(|entry| (*entry.key(), entry.value().clone()))
    }

    fn range(&self, start: i64, end: i64, visitor: &mut dyn FnMut(i64, &V) -> bool) {
        if start > end {
            return;
        }

        for entry in self.items.range(start..=end) {
            if !visitor(*entry.key(), entry.value()) {
                return;
            }
        }
    }
}
