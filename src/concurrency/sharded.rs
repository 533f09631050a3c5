// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    merge::{BoxedIterator, Merger},
    AbstractIndex, NodeArena, OrderedIndex, RbTree,
};
use std::{
    num::NonZeroUsize,
    sync::{Arc, RwLock, RwLockReadGuard},
};

/// Number of shards per available CPU core, if no shard count is given
pub const DEFAULT_SHARDS_PER_CORE: usize = 8;

/// Returns the default number of shards for this machine.
#[must_use]
pub fn default_shard_count() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get) * DEFAULT_SHARDS_PER_CORE
}

/// An index partitioned over multiple independently locked trees
///
/// Each key lives in the shard `key mod N`, so writes to different shards do
/// not contend. All shards allocate from one shared [`NodeArena`].
///
/// Single-key operations are linearizable. Range scans hold the read locks of
/// all shards while they run and yield one globally ascending sequence.
pub struct ShardedTree<V> {
    shards: Box<[RwLock<RbTree<V>>]>,
    arena: Arc<NodeArena<V>>,
}

impl<V> Default for ShardedTree<V> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<V> ShardedTree<V> {
    /// Creates an empty index with `shard_count` shards.
    ///
    /// A shard count of 0 uses [`default_shard_count`].
    #[must_use]
    pub fn new(shard_count: usize) -> Self {
        Self::with_arena(shard_count, Arc::default())
    }

    /// Creates an empty index with `shard_count` shards, all allocating from `arena`.
    ///
    /// A shard count of 0 uses [`default_shard_count`].
    #[must_use]
    pub fn with_arena(shard_count: usize, arena: Arc<NodeArena<V>>) -> Self {
        let shard_count = if shard_count == 0 {
            default_shard_count()
        } else {
            shard_count
        };

        log::trace!("Creating sharded index with {shard_count} shards");

        let shards = (0..shard_count)
            .map(|_| RwLock::new(RbTree::new(arena.clone())))
            .collect();

        Self { shards, arena }
    }

    /// Returns the number of shards.
    #[must_use]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Returns the arena shared by all shards.
    #[must_use]
    pub fn arena(&self) -> &Arc<NodeArena<V>> {
        &self.arena
    }

    /// Returns the shard a key is routed to.
    #[must_use]
    #[allow(
        clippy::cast_possible_wrap,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn shard_of(&self, key: i64) -> usize {
        // NOTE: The shard count is tiny compared to i64::MAX,
        // and rem_euclid is never negative
        key.rem_euclid(self.shards.len() as i64) as usize
    }

    #[allow(clippy::indexing_slicing)]
    fn shard(&self, key: i64) -> &RwLock<RbTree<V>> {
        &self.shards[self.shard_of(key)]
    }

    fn read_all(&self) -> Vec<RwLockReadGuard<'_, RbTree<V>>> {
        self.shards
            .iter()
            .map(|shard| shard.read().expect("lock is poisoned"))
            .collect()
    }

    /// Asks every shard in turn, returning all found candidates.
    fn fan_out<'a, F>(&'a self, f: F) -> impl Iterator<Item = (i64, V)> + 'a
    where
        V: Clone,
        F: Fn(&RbTree<V>) -> Option<(i64, &V)> + 'a,
    {
        self.shards.iter().filter_map(move |shard| {
            let tree = shard.read().expect("lock is poisoned");
            f(&tree).map(|(key, value)| (key, value.clone()))
        })
    }
}

impl<V: Clone> AbstractIndex<V> for ShardedTree<V> {
    fn insert(&self, key: i64, value: V) {
        self.shard(key)
            .write()
            .expect("lock is poisoned")
            .insert(key, value);
    }

    fn get(&self, key: i64) -> Option<V> {
        self.shard(key)
            .read()
            .expect("lock is poisoned")
            .get(key)
            .cloned()
    }

    fn delete(&self, key: i64) -> Option<V> {
        self.shard(key)
            .write()
            .expect("lock is poisoned")
            .delete(key)
    }

    fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.read().expect("lock is poisoned").len())
            .sum()
    }
}

impl<V: Clone> OrderedIndex<V> for ShardedTree<V> {
    fn min(&self) -> Option<(i64, V)> {
        self.fan_out(RbTree::min).min_by_key(|(key, _)| *key)
    }

    fn max(&self) -> Option<(i64, V)> {
        self.fan_out(RbTree::max).max_by_key(|(key, _)| *key)
    }

    fn prev(&self, key: i64) -> Option<(i64, V)> {
        self.fan_out(move |tree| tree.prev(key))
            .max_by_key(|(key, _)| *key)
    }

    fn next(&self, key: i64) -> Option<(i64, V)> {
        self.fan_out(move |tree| tree.next(key))
            .min_by_key(|(key, _)| *key)
    }

    fn range(&self, start: i64, end: i64, visitor: &mut dyn FnMut(i64, &V) -> bool) {
        // Shards are always locked in the same order, and writers only ever hold one
        let guards = self.read_all();

        let iters = guards
            .iter()
            .map(|tree| Box::new(tree.range_iter(start, end)) as BoxedIterator<'_, &V>)
            .collect::<Vec<_>>();

        for (key, value) in Merger::new(iters) {
            if !visitor(key, value) {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn sharded_default_shard_count() {
        let index = ShardedTree::<()>::new(0);
        assert_eq!(default_shard_count(), index.shard_count());
        assert!(index.shard_count() >= DEFAULT_SHARDS_PER_CORE);
    }

    #[test]
    fn sharded_negative_keys_route() {
        let index = ShardedTree::new(4);

        assert_eq!(3, index.shard_of(-1));
        assert_eq!(0, index.shard_of(-4));
        assert_eq!(1, index.shard_of(i64::MIN + 1));

        for key in -20..0 {
            index.insert(key, key);
        }
        for key in -20..0 {
            assert_eq!(Some(key), index.get(key));
        }
        assert_eq!(20, index.len());
    }

    #[test]
    fn sharded_shares_arena() {
        let index = ShardedTree::new(8);

        for key in 0..64 {
            index.insert(key, key);
        }
        for key in 0..64 {
            index.delete(key);
        }
        assert_eq!(64, index.arena().free_count());

        for key in 100..164 {
            index.insert(key, key);
        }
        assert_eq!(64, index.arena().recycled_count());
    }

    #[test]
    fn sharded_range_is_globally_sorted() {
        let index = ShardedTree::new(7);
        let mut single = RbTree::default();

        for key in (-500..500).step_by(3) {
            index.insert(key, key * 2);
            single.insert(key, key * 2);
        }

        let mut expected = vec![];
        single.range(-100, 250, |key, value| {
            expected.push((key, *value));
            true
        });

        let mut actual = vec![];
        index.range(-100, 250, &mut |key, value| {
            actual.push((key, *value));
            true
        });

        assert!(!actual.is_empty());
        assert_eq!(expected, actual);
    }

    #[test]
    fn sharded_ordered_queries() {
        let index = ShardedTree::new(5);
        for key in [40, -7, 13, 99, 0, 58] {
            index.insert(key, key);
        }

        assert_eq!(Some((-7, -7)), index.min());
        assert_eq!(Some((99, 99)), index.max());
        assert_eq!(Some((13, 13)), index.prev(40));
        assert_eq!(Some((58, 58)), index.next(40));
        assert_eq!(None, index.prev(-7));
        assert_eq!(None, index.next(99));
    }
}
