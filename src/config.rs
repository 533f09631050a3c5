// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    coding::{Decode, Encode},
    file::{SNAPSHOT_FILE, WAL_FILE},
    load_from_snapshot_and_wal,
    persistence::wal,
    AbstractIndex, AnyIndex, PersistenceManager,
};
use std::path::{Path, PathBuf};

/// Concurrency strategy of an index
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// One tree behind a reader-writer lock, see [`RwLockedTree`](crate::RwLockedTree)
    RwLock,

    /// One tree behind a mutex, see [`MutexLockedTree`](crate::MutexLockedTree)
    Mutex,

    /// Lock-free skip list, see [`LockFreeMap`](crate::LockFreeMap)
    LockFree,

    /// Independently locked shards, see [`ShardedTree`](crate::ShardedTree)
    #[default]
    Sharded,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::RwLock => "rwlock",
                Self::Mutex => "mutex",
                Self::LockFree => "lockfree",
                Self::Sharded => "sharded",
            }
        )
    }
}

const DEFAULT_FILE_FOLDER: &str = ".rb-index.data";

/// Index configuration builder
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Concurrency strategy
    pub strategy: Strategy,

    /// Number of shards of the sharded strategy, 0 derives it from the available parallelism
    pub shard_count: usize,

    /// Path of the write-ahead log
    pub wal_path: PathBuf,

    /// Path of the snapshot file
    pub snapshot_path: PathBuf,

    /// Whether every WAL append is synced to disk
    pub fsync_wal: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_FILE_FOLDER)
    }
}

impl Config {
    /// Initializes a new config, keeping the WAL and snapshot inside `folder`.
    pub fn new<P: AsRef<Path>>(folder: P) -> Self {
        let folder = folder.as_ref();

        Self {
            strategy: Strategy::default(),
            shard_count: 0,
            wal_path: folder.join(WAL_FILE),
            snapshot_path: folder.join(SNAPSHOT_FILE),
            fsync_wal: false,
        }
    }

    /// Sets the concurrency strategy.
    ///
    /// Defaults to [`Strategy::Sharded`].
    #[must_use]
    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the number of shards of the sharded strategy.
    ///
    /// Defaults to 0, which uses 8 shards per available CPU core.
    #[must_use]
    pub fn shard_count(mut self, count: usize) -> Self {
        self.shard_count = count;
        self
    }

    /// Sets the path of the write-ahead log.
    #[must_use]
    pub fn wal_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.wal_path = path.as_ref().into();
        self
    }

    /// Sets the path of the snapshot file.
    #[must_use]
    pub fn snapshot_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.snapshot_path = path.as_ref().into();
        self
    }

    /// If `true`, every WAL append is followed by `fsync`.
    ///
    /// Otherwise appends are only flushed to the OS, and may be lost on power loss.
    ///
    /// Defaults to `false`.
    #[must_use]
    pub fn fsync_wal(mut self, flag: bool) -> Self {
        self.fsync_wal = flag;
        self
    }

    /// Builds an empty, in-memory index.
    #[must_use]
    pub fn build_index<V: Send + 'static>(&self) -> AnyIndex<V> {
        AnyIndex::new(self.strategy, self.shard_count)
    }

    /// Wraps an existing index, appending to the configured WAL.
    ///
    /// No recovery takes place.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn open_persistence<I: AbstractIndex<V>, V>(
        &self,
        index: I,
    ) -> crate::Result<PersistenceManager<I, V>> {
        create_parent_folder(&self.wal_path)?;
        PersistenceManager::open(index, &self.wal_path, self.fsync_wal)
    }

    /// Builds an index, recovers it from the configured snapshot and WAL,
    /// and opens the WAL for new writes.
    ///
    /// An invalid WAL tail is cut off before new writes are appended.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs, or the snapshot is corrupt.
    pub fn open<V>(&self) -> crate::Result<PersistenceManager<AnyIndex<V>, V>>
    where
        V: Encode + Decode + Clone + Send + 'static,
    {
        log::debug!("Opening index with {self:?}");

        let index = self.build_index();
        let stats = load_from_snapshot_and_wal(&index, &self.snapshot_path, &self.wal_path)?;

        if stats.torn_tail {
            log::warn!("WAL ended in a torn or corrupt record, which was ignored");
            wal::cut_tail(&self.wal_path, stats.wal_valid_len)?;
        }

        log::info!(
            "Recovered {} items ({} from snapshot, {} WAL records replayed)",
            index.len(),
            stats.snapshot_items,
            stats.replayed_records,
        );

        self.open_persistence(index)
    }
}

fn create_parent_folder(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(folder) if !folder.as_os_str().is_empty() => std::fs::create_dir_all(folder),
        _ => Ok(()),
    }
}
