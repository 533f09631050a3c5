// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Write-ahead log

use crate::{
    checksum::{ChecksummedReader, ChecksummedWriter},
    coding::{read_framed, write_framed, Decode, DecodeError, Encode, EncodeError},
    file::open_append,
    AbstractIndex,
};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::{
    fs::{File, OpenOptions},
    io::{BufRead, BufReader, Read, Write},
    marker::PhantomData,
    path::{Path, PathBuf},
};

/// Kind of a logged write
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OpType {
    /// Insert or overwrite
    Insert,

    /// Delete
    Delete,
}

impl From<OpType> for u8 {
    fn from(value: OpType) -> Self {
        match value {
            OpType::Insert => 1,
            OpType::Delete => 2,
        }
    }
}

impl TryFrom<u8> for OpType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Insert),
            2 => Ok(Self::Delete),
            _ => Err(()),
        }
    }
}

/// A single logged write
///
/// ```text
/// [op; 1 byte] [key; 8 bytes] ([value length; 4 bytes] [value], if insert) [checksum; 16 bytes]
/// ```
///
/// The checksum covers all preceding bytes of the record, so a torn append is detected.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WalRecord<V> {
    /// Insert or overwrite
    Insert {
        /// Key
        key: i64,

        /// Value
        value: V,
    },

    /// Delete
    Delete {
        /// Key
        key: i64,
    },
}

impl<V> WalRecord<V> {
    /// Returns the key the record refers to.
    #[must_use]
    pub fn key(&self) -> i64 {
        match self {
            Self::Insert { key, .. } | Self::Delete { key } => *key,
        }
    }

    /// Returns the kind of the record.
    #[must_use]
    pub fn op_type(&self) -> OpType {
        match self {
            Self::Insert { .. } => OpType::Insert,
            Self::Delete { .. } => OpType::Delete,
        }
    }

    /// Replays the record against an index.
    pub fn apply<I: AbstractIndex<V>>(self, index: &I) {
        match self {
            Self::Insert { key, value } => index.insert(key, value),
            Self::Delete { key } => {
                index.delete(key);
            }
        }
    }
}

impl<V: Encode> Encode for WalRecord<V> {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        let mut writer = ChecksummedWriter::new(writer);

        writer.write_u8(self.op_type().into())?;
        writer.write_i64::<BigEndian>(self.key())?;

        if let Self::Insert { value, .. } = self {
            write_framed(&mut writer, value)?;
        }

        let checksum = writer.checksum();
        writer
            .inner_mut()
            .write_u128::<BigEndian>(checksum.into_u128())?;

        Ok(())
    }
}

impl<V: Decode> Decode for WalRecord<V> {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let mut reader = ChecksummedReader::new(reader);

        let tag = reader.read_u8()?;
        let op_type = OpType::try_from(tag).map_err(|()| DecodeError::InvalidTag(("OpType", tag)))?;

        let key = reader.read_i64::<BigEndian>()?;

        let record = match op_type {
            OpType::Insert => Self::Insert {
                key,
                value: read_framed(&mut reader)?,
            },
            OpType::Delete => Self::Delete { key },
        };

        let checksum = reader.checksum();
        let expected = reader.inner_mut().read_u128::<BigEndian>()?;

        if checksum.into_u128() != expected {
            log::trace!(
                "WAL record checksum mismatch: got {checksum}, expected {expected:032x}"
            );
            return Err(DecodeError::InvalidTrailer);
        }

        Ok(record)
    }
}

/// Appends records to the write-ahead log
pub struct Writer {
    path: PathBuf,
    file: File,
    fsync: bool,
}

impl Writer {
    /// Opens the log for appending, creating it if needed.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn open<P: AsRef<Path>>(path: P, fsync: bool) -> std::io::Result<Self> {
        let path = path.as_ref();

        Ok(Self {
            path: path.into(),
            file: open_append(path)?,
            fsync,
        })
    }

    /// Returns the path of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a record.
    ///
    /// The record is written with a single `write_all` call, then flushed (and synced, if configured).
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn append<V: Encode>(&mut self, record: &WalRecord<V>) -> crate::Result<()> {
        let bytes = {
            let mut v = vec![];
            record.encode_into(&mut v)?;
            v
        };

        self.file.write_all(&bytes)?;
        self.file.flush()?;

        if self.fsync {
            self.file.sync_data()?;
        }

        Ok(())
    }

    /// Empties the log, and reopens it for appending.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn truncate(&mut self) -> crate::Result<()> {
        self.file.flush()?;

        {
            let file = OpenOptions::new()
                .write(true)
                .truncate(true)
                .open(&self.path)?;
            file.sync_all()?;
        }

        self.file = open_append(&self.path)?;

        log::debug!("Truncated WAL at {}", self.path.display());

        Ok(())
    }
}

/// Cuts the log back to `valid_len` bytes, dropping an invalid tail.
///
/// New records must not be appended behind a torn record, or they would be
/// unreachable for the next replay.
///
/// # Errors
///
/// Will return `Err` if an IO error occurs.
pub fn cut_tail<P: AsRef<Path>>(path: P, valid_len: u64) -> std::io::Result<()> {
    let path = path.as_ref();

    let file = OpenOptions::new().write(true).open(path)?;
    file.set_len(valid_len)?;
    file.sync_all()?;

    log::info!("Cut invalid WAL tail at {}, {valid_len} bytes remain", path.display());

    Ok(())
}

/// Reads records from the write-ahead log, in file order
///
/// Iteration ends at the end of the file, or at the first record that cannot be
/// decoded (a torn write, a checksum mismatch or an unknown op), see [`Reader::is_torn`].
///
/// Other IO errors are yielded as `Err`, after which iteration ends.
pub struct Reader<V> {
    inner: BufReader<File>,
    record_count: usize,
    valid_len: u64,
    torn: bool,
    done: bool,
    phantom: PhantomData<V>,
}

impl<V: Decode> Reader<V> {
    /// Opens the log for reading.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn open<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        Ok(Self {
            inner: BufReader::new(File::open(path)?),
            record_count: 0,
            valid_len: 0,
            torn: false,
            done: false,
            phantom: PhantomData,
        })
    }

    /// Returns `true` if reading stopped at an invalid record instead of the end of the file.
    #[must_use]
    pub fn is_torn(&self) -> bool {
        self.torn
    }

    /// Returns the number of bytes taken up by the valid records read so far.
    #[must_use]
    pub fn valid_len(&self) -> u64 {
        self.valid_len
    }

    fn stop_at(&mut self, error: &dyn std::fmt::Display) {
        log::warn!(
            "Stopping WAL replay after {} records, trailing record is invalid: {error}",
            self.record_count,
        );
        self.torn = true;
        self.done = true;
    }
}

impl<V: Decode> Iterator for Reader<V> {
    type Item = crate::Result<WalRecord<V>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.inner.fill_buf() {
            Ok([]) => {
                self.done = true;
                return None;
            }
            Ok(_) => {}
            Err(e) => {
                self.done = true;
                return Some(Err(e.into()));
            }
        }

        let mut reader = (&mut self.inner).take(u64::MAX);

        match WalRecord::decode_from(&mut reader) {
            Ok(record) => {
                self.valid_len += u64::MAX - reader.limit();
                self.record_count += 1;
                Some(Ok(record))
            }
            Err(DecodeError::Io(e)) if e.kind() != std::io::ErrorKind::UnexpectedEof => {
                self.done = true;
                Some(Err(DecodeError::Io(e).into()))
            }
            Err(e) => {
                self.stop_at(&e);
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn wal_record_layout() {
        let record = WalRecord::Insert {
            key: 7,
            value: 5_u64,
        };
        let bytes = record.encode_into_vec();

        // op + key + value length + value + checksum
        assert_eq!(1 + 8 + 4 + 8 + 16, bytes.len());
        assert_eq!(Some(&1), bytes.first());

        let record = WalRecord::<u64>::Delete { key: -1 };
        let bytes = record.encode_into_vec();
        assert_eq!(1 + 8 + 16, bytes.len());
        assert_eq!(Some(&2), bytes.first());
    }

    #[test]
    fn wal_record_decode() {
        let record = WalRecord::Insert {
            key: -42,
            value: String::from("hello"),
        };
        let bytes = record.encode_into_vec();

        let decoded = WalRecord::<String>::decode_from(&mut bytes.as_slice()).unwrap();
        assert_eq!(record, decoded);
    }

    #[test]
    fn wal_record_checksum_mismatch() {
        let mut bytes = WalRecord::Insert {
            key: 1,
            value: 100_u64,
        }
        .encode_into_vec();

        // Flip a bit inside the value
        if let Some(byte) = bytes.get_mut(14) {
            *byte ^= 1;
        }

        let result = WalRecord::<u64>::decode_from(&mut bytes.as_slice());
        assert!(matches!(result, Err(DecodeError::InvalidTrailer)));
    }

    #[test]
    fn wal_record_unknown_op() {
        let mut bytes = WalRecord::<u64>::Delete { key: 1 }.encode_into_vec();
        if let Some(byte) = bytes.first_mut() {
            *byte = 9;
        }

        let result = WalRecord::<u64>::decode_from(&mut bytes.as_slice());
        assert!(matches!(
            result,
            Err(DecodeError::InvalidTag(("OpType", 9)))
        ));
    }

    #[test]
    fn wal_write_read_truncate() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(crate::file::WAL_FILE);

        let mut writer = Writer::open(&path, true)?;
        writer.append(&WalRecord::Insert { key: 1, value: 10_u64 })?;
        writer.append(&WalRecord::Insert { key: 2, value: 20_u64 })?;
        writer.append(&WalRecord::<u64>::Delete { key: 1 })?;

        let mut reader = Reader::<u64>::open(&path)?;
        let records = reader.by_ref().collect::<crate::Result<Vec<_>>>()?;
        assert_eq!(
            vec![
                WalRecord::Insert { key: 1, value: 10 },
                WalRecord::Insert { key: 2, value: 20 },
                WalRecord::Delete { key: 1 },
            ],
            records
        );
        assert!(!reader.is_torn());
        assert_eq!(std::fs::metadata(&path)?.len(), reader.valid_len());

        writer.truncate()?;
        assert_eq!(0, std::fs::metadata(&path)?.len());

        writer.append(&WalRecord::<u64>::Delete { key: 5 })?;
        let records = Reader::<u64>::open(&path)?.collect::<crate::Result<Vec<_>>>()?;
        assert_eq!(vec![WalRecord::Delete { key: 5 }], records);

        Ok(())
    }

    #[test]
    fn wal_torn_tail() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(crate::file::WAL_FILE);

        let mut writer = Writer::open(&path, false)?;
        for key in 0..10 {
            writer.append(&WalRecord::Insert { key, value: key })?;
        }

        // Cut the last record in half
        let len = std::fs::metadata(&path)?.len();
        OpenOptions::new().write(true).open(&path)?.set_len(len - 10)?;

        let mut reader = Reader::<i64>::open(&path)?;
        let records = reader.by_ref().collect::<crate::Result<Vec<_>>>()?;

        assert_eq!(9, records.len());
        assert!(reader.is_torn());

        // Every insert of an i64 takes 37 bytes
        assert_eq!(9 * 37, reader.valid_len());

        Ok(())
    }

    #[test]
    fn wal_cut_tail_then_append() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(crate::file::WAL_FILE);

        let mut writer = Writer::open(&path, false)?;
        for key in 0..5 {
            writer.append(&WalRecord::Insert { key, value: key })?;
        }
        drop(writer);

        let len = std::fs::metadata(&path)?.len();
        OpenOptions::new().write(true).open(&path)?.set_len(len - 3)?;

        let mut reader = Reader::<i64>::open(&path)?;
        assert_eq!(4, reader.by_ref().count());
        assert!(reader.is_torn());

        cut_tail(&path, reader.valid_len())?;
        assert_eq!(4 * 37, std::fs::metadata(&path)?.len());

        let mut writer = Writer::open(&path, false)?;
        writer.append(&WalRecord::Insert { key: 100, value: 1_i64 })?;

        let mut reader = Reader::<i64>::open(&path)?;
        let records = reader.by_ref().collect::<crate::Result<Vec<_>>>()?;
        assert!(!reader.is_torn());
        assert_eq!(5, records.len());
        assert_eq!(Some(&WalRecord::Insert { key: 100, value: 1 }), records.last());

        Ok(())
    }

    #[test]
    fn wal_reader_surfaces_io_errors() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;

        // Reading a directory fails with an error other than a short read
        let Ok(mut reader) = Reader::<i64>::open(dir.path()) else {
            return Ok(());
        };

        assert!(matches!(reader.next(), Some(Err(crate::Error::Io(_)))));
        assert!(reader.next().is_none());
        assert!(!reader.is_torn());

        Ok(())
    }
}
