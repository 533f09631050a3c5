// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Error during serialization
#[derive(Debug)]
pub enum EncodeError {
    /// I/O error
    Io(std::io::Error),

    /// Encoded value does not fit into a 32-bit length prefix
    ValueTooLarge(usize),
}

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "EncodeError(Io: {e})"),
            Self::ValueTooLarge(len) => write!(f, "EncodeError(ValueTooLarge: {len} bytes)"),
        }
    }
}

impl From<std::io::Error> for EncodeError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::ValueTooLarge(_) => None,
        }
    }
}

/// Error during deserialization
#[derive(Debug)]
pub enum DecodeError {
    /// I/O error
    Io(std::io::Error),

    /// Unsupported/outdated disk version
    InvalidVersion,

    /// Invalid enum tag
    InvalidTag((&'static str, u8)),

    /// Record trailer (checksum) does not match its contents
    InvalidTrailer,

    /// Invalid file header
    InvalidHeader(&'static str),

    /// UTF-8 error
    Utf8(std::str::Utf8Error),
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "DecodeError({})",
            match self {
                Self::Io(e) => e.to_string(),
                e => format!("{e:?}"),
            }
        )
    }
}

impl From<std::str::Utf8Error> for DecodeError {
    fn from(value: std::str::Utf8Error) -> Self {
        Self::Utf8(value)
    }
}

impl From<std::io::Error> for DecodeError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Utf8(e) => Some(e),
            _ => None,
        }
    }
}

/// Trait to serialize stuff
pub trait Encode {
    /// Serializes into writer.
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError>;

    /// Serializes into vector.
    #[allow(unused)]
    fn encode_into_vec(&self) -> Vec<u8> {
        let mut v = vec![];
        self.encode_into(&mut v).expect("cannot fail");
        v
    }
}

/// Trait to deserialize stuff
pub trait Decode {
    /// Deserializes from reader.
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError>
    where
        Self: Sized;
}

impl Encode for i64 {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        writer.write_i64::<BigEndian>(*self)?;
        Ok(())
    }
}

impl Decode for i64 {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        Ok(reader.read_i64::<BigEndian>()?)
    }
}

impl Encode for u64 {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        writer.write_u64::<BigEndian>(*self)?;
        Ok(())
    }
}

impl Decode for u64 {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        Ok(reader.read_u64::<BigEndian>()?)
    }
}

impl Encode for [u8] {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        let len = u32::try_from(self.len()).map_err(|_| EncodeError::ValueTooLarge(self.len()))?;
        writer.write_u32::<BigEndian>(len)?;
        writer.write_all(self)?;
        Ok(())
    }
}

impl Encode for Vec<u8> {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        self.as_slice().encode_into(writer)
    }
}

impl Decode for Vec<u8> {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let len = reader.read_u32::<BigEndian>()?;
        read_bytes(reader, len)
    }
}

impl Encode for String {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        self.as_bytes().encode_into(writer)
    }
}

impl Decode for String {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let bytes = Vec::<u8>::decode_from(reader)?;
        String::from_utf8(bytes).map_err(|e| DecodeError::Utf8(e.utf8_error()))
    }
}

/// Reads exactly `len` bytes.
///
/// The buffer grows with the data actually read, so a corrupt length
/// cannot trigger a huge upfront allocation.
fn read_bytes<R: Read>(reader: &mut R, len: u32) -> Result<Vec<u8>, DecodeError> {
    let mut bytes = vec![];
    reader.take(u64::from(len)).read_to_end(&mut bytes)?;

    if bytes.len() != len as usize {
        return Err(DecodeError::Io(std::io::ErrorKind::UnexpectedEof.into()));
    }

    Ok(bytes)
}

/// Writes `value` framed by a 32-bit length prefix.
pub(crate) fn write_framed<W: Write, V: Encode + ?Sized>(
    writer: &mut W,
    value: &V,
) -> Result<(), EncodeError> {
    let mut bytes = vec![];
    value.encode_into(&mut bytes)?;

    let len = u32::try_from(bytes.len()).map_err(|_| EncodeError::ValueTooLarge(bytes.len()))?;
    writer.write_u32::<BigEndian>(len)?;
    writer.write_all(&bytes)?;

    Ok(())
}

/// Reads a value written by [`write_framed`].
///
/// The value must consume its frame exactly, otherwise the frame is considered corrupt.
pub(crate) fn read_framed<R: Read, V: Decode>(reader: &mut R) -> Result<V, DecodeError> {
    let len = reader.read_u32::<BigEndian>()?;
    let bytes = read_bytes(reader, len)?;

    let mut slice = bytes.as_slice();
    let value = V::decode_from(&mut slice)?;

    if !slice.is_empty() {
        return Err(DecodeError::InvalidHeader("ValueFrame"));
    }

    Ok(value)
}
