// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! An in-memory ordered key-value index, built on a red-black tree.
//!
//! ##### About
//!
//! This crate exports an [`RbTree`] that maps `i64` keys to arbitrary values, and supports
//! point lookups, min/max, predecessor/successor queries and bounded range scans.
//!
//! Tree nodes are recycled through a [`NodeArena`], which can be shared by multiple trees.
//!
//! The tree itself is not synchronized. For concurrent use, pick one of the wrappers:
//!
//! - [`RwLockedTree`]: one reader-writer lock around one tree
//! - [`MutexLockedTree`]: one mutex around one tree
//! - [`LockFreeMap`]: a lock-free skip list (no tree involved)
//! - [`ShardedTree`]: many independently locked trees, keys are spread by `key mod N`
//!
//! All of them implement [`AbstractIndex`] and [`OrderedIndex`]; [`AnyIndex`] selects one at runtime.
//!
//! ##### Persistence
//!
//! A [`PersistenceManager`] appends every write to a write-ahead log (WAL) and can write
//! snapshots of the whole index. After a crash, [`load_from_snapshot_and_wal`] rebuilds
//! the index from the last snapshot and the log. A torn record at the end of the log
//! (a crash in the middle of an append) is ignored.
//!
//! ```
//! use rb_index::{AbstractIndex, Config, Strategy};
//! #
//! # let folder = tempfile::tempdir()?;
//!
//! let db = Config::new(folder.path())
//!     .strategy(Strategy::Sharded)
//!     .open::<u64>()?;
//!
//! db.insert(5, 50)?;
//! db.insert(-3, 30)?;
//! assert_eq!(Some(50), db.get(5));
//!
//! db.checkpoint(folder.path().join("snapshot"))?;
//! #
//! # Ok::<(), rb_index::Error>(())
//! ```

#![deny(clippy::all, missing_docs, clippy::cargo)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::indexing_slicing)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(clippy::expect_used)]
#![allow(clippy::missing_const_for_fn)]
#![warn(clippy::multiple_crate_versions)]
#![allow(clippy::option_if_let_else)]
#![warn(clippy::redundant_feature_names)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod any_index;

mod r#abstract;

mod arena;

#[doc(hidden)]
pub mod checksum;

#[doc(hidden)]
pub mod coding;

pub mod concurrency;

/// Configuration
pub mod config;

mod error;

#[doc(hidden)]
pub mod file;

#[doc(hidden)]
pub mod merge;

pub mod persistence;

pub mod tree;

#[doc(hidden)]
pub use {checksum::Checksum, merge::BoxedIterator, tree::InvariantViolation};

pub use {
    any_index::AnyIndex,
    arena::NodeArena,
    coding::{Decode, DecodeError, Encode, EncodeError},
    concurrency::{LockFreeMap, MutexLockedTree, RwLockedTree, ShardedTree},
    config::{Config, Strategy},
    error::{Error, Result},
    persistence::{load_from_snapshot_and_wal, PersistenceManager, RecoveryStats},
    r#abstract::{AbstractIndex, OrderedIndex},
    tree::{
        node::{Color, Node, NodeId},
        RbTree,
    },
};
