// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Write-ahead logging and snapshots

mod recovery;
pub mod snapshot;
pub mod wal;

pub use recovery::{import_all, load_from_snapshot_and_wal, RecoveryStats};

use crate::{coding::Encode, AbstractIndex, OrderedIndex};
use std::{
    marker::PhantomData,
    path::Path,
    sync::{Mutex, MutexGuard},
};
use wal::{WalRecord, Writer};

/// Makes writes to an index durable
///
/// Every write is applied to the index, then appended to the write-ahead log.
/// Writes, snapshots and WAL truncation are serialized by one lock, which is
/// independent of the index's own locking.
///
/// Reads go to the index directly, so a read may observe a write whose log
/// append has not finished yet.
///
/// If an append fails, the write stays applied in memory and the error is returned.
pub struct PersistenceManager<I, V> {
    index: I,
    wal: Mutex<Writer>,
    phantom: PhantomData<fn() -> V>,
}

impl<I, V> PersistenceManager<I, V> {
    /// Wraps an index, appending to the WAL at `wal_path` (which is created if needed).
    ///
    /// The index is used as is, see [`load_from_snapshot_and_wal`] to recover it first.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn new<P: AsRef<Path>>(index: I, wal_path: P) -> crate::Result<Self> {
        Self::open(index, wal_path, false)
    }

    /// Like [`PersistenceManager::new`], optionally syncing every append to disk.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn open<P: AsRef<Path>>(index: I, wal_path: P, fsync_wal: bool) -> crate::Result<Self> {
        let wal_path = wal_path.as_ref();

        log::debug!(
            "Opening WAL at {} (fsync={fsync_wal})",
            wal_path.display()
        );

        Ok(Self {
            index,
            wal: Mutex::new(Writer::open(wal_path, fsync_wal)?),
            phantom: PhantomData,
        })
    }

    /// Returns the wrapped index.
    ///
    /// Writing to it directly bypasses the WAL.
    #[must_use]
    pub fn index(&self) -> &I {
        &self.index
    }

    /// Returns the wrapped index, closing the WAL.
    #[must_use]
    pub fn into_inner(self) -> I {
        self.index
    }

    /// Returns the path of the WAL.
    #[must_use]
    pub fn wal_path(&self) -> std::path::PathBuf {
        self.lock_wal().path().into()
    }

    fn lock_wal(&self) -> MutexGuard<'_, Writer> {
        self.wal.lock().expect("lock is poisoned")
    }
}

impl<I: AbstractIndex<V>, V: Encode + Clone> PersistenceManager<I, V> {
    /// Inserts a key-value pair and logs it.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs; the item is inserted regardless.
    pub fn insert(&self, key: i64, value: V) -> crate::Result<()> {
        let mut wal = self.lock_wal();

        self.index.insert(key, value.clone());
        wal.append(&WalRecord::Insert { key, value })
    }

    /// Deletes a key and logs it, returning the removed value.
    ///
    /// Deleting a missing key is logged as well.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs; the item is deleted regardless.
    pub fn delete(&self, key: i64) -> crate::Result<Option<V>> {
        let mut wal = self.lock_wal();

        let value = self.index.delete(key);
        wal.append(&WalRecord::<V>::Delete { key })?;

        Ok(value)
    }

    /// Retrieves the value of a key.
    #[must_use]
    pub fn get(&self, key: i64) -> Option<V> {
        self.index.get(key)
    }

    /// Empties the WAL.
    ///
    /// Only safe to use right after a snapshot, see [`PersistenceManager::checkpoint`].
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn truncate_wal(&self) -> crate::Result<()> {
        self.lock_wal().truncate()
    }
}

impl<I: OrderedIndex<V>, V: Encode + Clone> PersistenceManager<I, V> {
    /// Writes all items into a snapshot file.
    ///
    /// The file is replaced atomically.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let _wal = self.lock_wal();
        snapshot::write(path, &self.index.scan())
    }

    /// Writes a snapshot, then empties the WAL, without letting any write in between.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    /// If the snapshot fails, the WAL is not touched.
    pub fn checkpoint<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let mut wal = self.lock_wal();

        snapshot::write(path, &self.index.scan())?;
        wal.truncate()?;

        log::info!("Checkpointed {} items", self.index.len());

        Ok(())
    }
}
