// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::{snapshot, wal};
use crate::{coding::Decode, AbstractIndex};
use std::path::Path;

/// Outcome of a recovery
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct RecoveryStats {
    /// Number of items loaded from the snapshot
    pub snapshot_items: usize,

    /// Number of WAL records replayed on top of the snapshot
    pub replayed_records: usize,

    /// Whether the WAL ended in an invalid record, which was ignored
    pub torn_tail: bool,

    /// Length of the WAL up to the end of the last valid record
    pub wal_valid_len: u64,
}

/// Inserts all items into an index, returning how many were inserted.
pub fn import_all<I, V, It>(index: &I, items: It) -> usize
where
    I: AbstractIndex<V>,
    It: IntoIterator<Item = (i64, V)>,
{
    let mut count = 0;

    for (key, value) in items {
        index.insert(key, value);
        count += 1;
    }

    count
}

/// Rebuilds an index from a snapshot and the write-ahead log.
///
/// The index should be empty. Missing files are skipped: the snapshot is loaded first
/// (if it exists), then all WAL records are replayed in order.
///
/// Replay stops at the first record that cannot be decoded, which is expected
/// after a crash in the middle of an append. Everything before it is kept, and
/// [`RecoveryStats::wal_valid_len`] tells where the invalid tail starts. The WAL
/// file itself is not modified.
///
/// # Errors
///
/// Will return `Err` if an IO error occurs (including one while reading the WAL),
/// or the snapshot is corrupt.
pub fn load_from_snapshot_and_wal<I, V, P, Q>(
    index: &I,
    snapshot_path: P,
    wal_path: Q,
) -> crate::Result<RecoveryStats>
where
    I: AbstractIndex<V>,
    V: Decode,
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let snapshot_path = snapshot_path.as_ref();
    let wal_path = wal_path.as_ref();

    let mut stats = RecoveryStats::default();

    if snapshot_path.try_exists()? {
        log::debug!("Loading snapshot from {}", snapshot_path.display());

        let items = snapshot::read::<V, _>(snapshot_path)?;
        stats.snapshot_items = import_all(index, items);
    } else {
        log::trace!("No snapshot at {}", snapshot_path.display());
    }

    if wal_path.try_exists()? {
        log::debug!("Replaying WAL from {}", wal_path.display());

        let mut reader = wal::Reader::<V>::open(wal_path)?;

        for record in reader.by_ref() {
            record?.apply(index);
            stats.replayed_records += 1;
        }

        stats.torn_tail = reader.is_torn();
        stats.wal_valid_len = reader.valid_len();
    } else {
        log::trace!("No WAL at {}", wal_path.display());
    }

    Ok(stats)
}
