// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

/// Point access to a concurrent index
///
/// This is the narrow capability set the [`PersistenceManager`](crate::PersistenceManager)
/// needs to apply and replay writes.
#[allow(clippy::module_name_repetitions)]
pub trait AbstractIndex<V> {
    /// Inserts a key-value pair, overwriting the value if the key exists.
    fn insert(&self, key: i64, value: V);

    /// Retrieves a copy of the value of a key.
    fn get(&self, key: i64) -> Option<V>;

    /// Removes a key, returning its value if it existed.
    fn delete(&self, key: i64) -> Option<V>;

    /// Returns the number of items.
    ///
    /// Under concurrent writes this is only a momentary value.
    fn len(&self) -> usize;

    /// Returns `true` if the index contains no items.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the index contains the key.
    fn contains_key(&self, key: i64) -> bool {
        self.get(key).is_some()
    }
}

/// Ordered access to a concurrent index
pub trait OrderedIndex<V>: AbstractIndex<V> {
    /// Returns the item with the smallest key.
    fn min(&self) -> Option<(i64, V)>;

    /// Returns the item with the largest key.
    fn max(&self) -> Option<(i64, V)>;

    /// Returns the item with the largest key strictly less than `key`.
    fn prev(&self, key: i64) -> Option<(i64, V)>;

    /// Returns the item with the smallest key strictly greater than `key`.
    fn next(&self, key: i64) -> Option<(i64, V)>;

    /// Visits all items with `start <= key <= end` in ascending key order.
    ///
    /// The visitor returns `false` to stop the scan.
    fn range(&self, start: i64, end: i64, visitor: &mut dyn FnMut(i64, &V) -> bool);

    /// Collects every item in ascending key order.
    ///
    /// Avoid using this on large indexes outside of snapshotting.
    fn scan(&self) -> Vec<(i64, V)>
    where
        V: Clone,
    {
        let mut items = Vec::with_capacity(self.len());
        self.range(i64::MIN, i64::MAX, &mut |key, value| {
            items.push((key, value.clone()));
            true
        });
        items
    }
}
