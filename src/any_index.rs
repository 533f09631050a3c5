// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    AbstractIndex, LockFreeMap, MutexLockedTree, OrderedIndex, RwLockedTree, ShardedTree,
    Strategy,
};

/// May be any of the concurrency strategies, selected at runtime
#[allow(clippy::module_name_repetitions)]
pub enum AnyIndex<V> {
    /// Single reader-writer lock, see [`RwLockedTree`]
    RwLock(RwLockedTree<V>),

    /// Single mutex, see [`MutexLockedTree`]
    Mutex(MutexLockedTree<V>),

    /// Lock-free skip list, see [`LockFreeMap`]
    LockFree(LockFreeMap<V>),

    /// Sharded trees, see [`ShardedTree`]
    Sharded(ShardedTree<V>),
}

macro_rules! dispatch {
    ($self:ident, $inner:ident => $expr:expr) => {
        match $self {
            Self::RwLock($inner) => $expr,
            Self::Mutex($inner) => $expr,
            Self::LockFree($inner) => $expr,
            Self::Sharded($inner) => $expr,
        }
    };
}

impl<V: Send + 'static> AnyIndex<V> {
    /// Creates an empty index using the given strategy.
    ///
    /// The shard count is only used by [`Strategy::Sharded`], where 0 picks a default.
    #[must_use]
    pub fn new(strategy: Strategy, shard_count: usize) -> Self {
        match strategy {
            Strategy::RwLock => Self::RwLock(RwLockedTree::default()),
            Strategy::Mutex => Self::Mutex(MutexLockedTree::default()),
            Strategy::LockFree => Self::LockFree(LockFreeMap::new()),
            Strategy::Sharded => Self::Sharded(ShardedTree::new(shard_count)),
        }
    }
}

impl<V> AnyIndex<V> {
    /// Returns the strategy of this index.
    #[must_use]
    pub fn strategy(&self) -> Strategy {
        match self {
            Self::RwLock(_) => Strategy::RwLock,
            Self::Mutex(_) => Strategy::Mutex,
            Self::LockFree(_) => Strategy::LockFree,
            Self::Sharded(_) => Strategy::Sharded,
        }
    }
}

impl<V: Clone + Send + 'static> AbstractIndex<V> for AnyIndex<V> {
    fn insert(&self, key: i64, value: V) {
        dispatch!(self, index => index.insert(key, value));
    }

    fn get(&self, key: i64) -> Option<V> {
        dispatch!(self, index => index.get(key))
    }

    fn delete(&self, key: i64) -> Option<V> {
        dispatch!(self, index => index.delete(key))
    }

    fn len(&self) -> usize {
        dispatch!(self, index => index.len())
    }
}

impl<V: Clone + Send + 'static> OrderedIndex<V> for AnyIndex<V> {
    fn min(&self) -> Option<(i64, V)> {
        dispatch!(self, index => index.min())
    }

    fn max(&self) -> Option<(i64, V)> {
        dispatch!(self, index => index.max())
    }

    fn prev(&self, key: i64) -> Option<(i64, V)> {
        dispatch!(self, index => index.prev(key))
    }

    fn next(&self, key: i64) -> Option<(i64, V)> {
        dispatch!(self, index => index.next(key))
    }

    fn range(&self, start: i64, end: i64, visitor: &mut dyn FnMut(i64, &V) -> bool) {
        dispatch!(self, index => index.range(start, end, visitor));
    }
}
