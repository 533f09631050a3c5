// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use interval_heap::IntervalHeap as Heap;

pub type BoxedIterator<'a, T> = Box<dyn Iterator<Item = (i64, T)> + 'a>;

struct HeapItem<T>(usize, i64, T);

impl<T> PartialEq for HeapItem<T> {
    fn eq(&self, other: &Self) -> bool {
        self.1 == other.1
    }
}

impl<T> Eq for HeapItem<T> {}

impl<T> Ord for HeapItem<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.1.cmp(&other.1)
    }
}

impl<T> PartialOrd for HeapItem<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Merges multiple ascending (key, value) iterators into one ascending iterator
///
/// The sources are expected to hold disjoint keys, as the shards of a
/// [`ShardedTree`](crate::ShardedTree) do.
pub struct Merger<'a, T> {
    iterators: Vec<BoxedIterator<'a, T>>,
    heap: Heap<HeapItem<T>>,
    initialized: bool,
}

impl<'a, T> Merger<'a, T> {
    #[must_use]
    pub fn new(iterators: Vec<BoxedIterator<'a, T>>) -> Self {
        let heap = Heap::with_capacity(iterators.len());

        Self {
            iterators,
            heap,
            initialized: false,
        }
    }

    fn initialize(&mut self) {
        for (idx, iter) in self.iterators.iter_mut().enumerate() {
            if let Some((key, value)) = iter.next() {
                self.heap.push(HeapItem(idx, key, value));
            }
        }
        self.initialized = true;
    }
}

impl<T> Iterator for Merger<'_, T> {
    type Item = (i64, T);

    fn next(&mut self) -> Option<Self::Item> {
        if !self.initialized {
            self.initialize();
        }

        let HeapItem(idx, key, value) = self.heap.pop_min()?;

        if let Some((next_key, next_value)) = self.iterators.get_mut(idx).and_then(Iterator::next) {
            debug_assert!(next_key > key, "merge source is not ascending");
            self.heap.push(HeapItem(idx, next_key, next_value));
        }

        Some((key, value))
    }
}
