// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Thread-safe wrappers around the tree
//!
//! Every wrapper implements [`AbstractIndex`](crate::AbstractIndex) and
//! [`OrderedIndex`](crate::OrderedIndex), so they can be swapped freely.

mod lock_free;
mod mutex_locked;
mod rw_locked;
mod sharded;

pub use lock_free::LockFreeMap;
pub use mutex_locked::MutexLockedTree;
pub use rw_locked::RwLockedTree;
pub use sharded::{default_shard_count, ShardedTree, DEFAULT_SHARDS_PER_CORE};
