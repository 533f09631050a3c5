// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Snapshot file
//!
//! ```text
//! [magic; "RBS" + version 1]
//! [item count; 8 bytes]
//! [key; 8 bytes] [value length; 4 bytes] [value]   (item count times)
//! [checksum; 16 bytes]
//! ```
//!
//! The checksum covers everything between the magic and the checksum.

use crate::{
    checksum::ChecksummedWriter,
    coding::{read_framed, write_framed, Decode, DecodeError, Encode},
    file::rewrite_atomic,
    Checksum,
};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::path::Path;

/// File magic, including the format version
pub const MAGIC_BYTES: [u8; 4] = [b'R', b'B', b'S', 1];

/// Smallest possible encoded item (key and value length)
const MIN_ITEM_SIZE: usize = 8 + 4;

/// Serializes all items into one snapshot blob.
///
/// # Errors
///
/// Will return `Err` if an IO error occurs, or the data is invalid.
pub fn encode<V: Encode>(items: &[(i64, V)]) -> crate::Result<Vec<u8>> {
    let mut writer = ChecksummedWriter::new(MAGIC_BYTES.to_vec());

    writer.write_u64::<BigEndian>(items.len() as u64)?;

    for (key, value) in items {
        writer.write_i64::<BigEndian>(*key)?;
        write_framed(&mut writer, value)?;
    }

    let checksum = writer.checksum();

    let mut bytes = writer.into_inner();
    bytes.write_u128::<BigEndian>(checksum.into_u128())?;

    Ok(bytes)
}

/// Deserializes a snapshot blob.
///
/// # Errors
///
/// Will return `Err` if an IO error occurs, or the data is invalid.
pub fn decode<V: Decode>(bytes: &[u8]) -> crate::Result<Vec<(i64, V)>> {
    let Some((magic, rest)) = bytes.split_first_chunk::<4>() else {
        return Err(DecodeError::InvalidHeader("Snapshot").into());
    };

    let [m0, m1, m2, version] = *magic;
    if [m0, m1, m2] != *b"RBS" {
        return Err(DecodeError::InvalidHeader("Snapshot").into());
    }
    if Some(&version) != MAGIC_BYTES.last() {
        return Err(DecodeError::InvalidVersion.into());
    }

    let Some((body, trailer)) = rest.split_last_chunk::<16>() else {
        return Err(DecodeError::InvalidHeader("Snapshot").into());
    };

    let expected = Checksum::from_raw(u128::from_be_bytes(*trailer));
    Checksum::of(body).check(expected)?;

    Ok(decode_items(body)?)
}

fn decode_items<V: Decode>(mut reader: &[u8]) -> Result<Vec<(i64, V)>, DecodeError> {
    let count = reader.read_u64::<BigEndian>()?;

    // NOTE: The count is checksummed, but only allocate what the body can possibly hold
    #[allow(clippy::cast_possible_truncation)]
    let capacity = (count as usize).min(reader.len() / MIN_ITEM_SIZE);
    let mut items = Vec::with_capacity(capacity);

    for _ in 0..count {
        let key = reader.read_i64::<BigEndian>()?;
        let value = read_framed(&mut reader)?;
        items.push((key, value));
    }

    if !reader.is_empty() {
        return Err(DecodeError::InvalidTrailer);
    }

    Ok(items)
}

/// Atomically writes a snapshot file.
///
/// # Errors
///
/// Will return `Err` if an IO error occurs, or the data is invalid.
pub fn write<V: Encode, P: AsRef<Path>>(path: P, items: &[(i64, V)]) -> crate::Result<()> {
    let path = path.as_ref();
    let bytes = encode(items)?;

    rewrite_atomic(path, &bytes)?;

    log::debug!(
        "Wrote snapshot with {} items ({} bytes) to {}",
        items.len(),
        bytes.len(),
        path.display(),
    );

    Ok(())
}

/// Reads a snapshot file.
///
/// # Errors
///
/// Will return `Err` if an IO error occurs, or the data is invalid.
pub fn read<V: Decode, P: AsRef<Path>>(path: P) -> crate::Result<Vec<(i64, V)>> {
    let bytes = std::fs::read(path)?;
    decode(&bytes)
}
