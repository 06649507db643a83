//! Byte ranges.
//!
//! A [`ByteRange`] addresses part of a stored value relative to its start or its end.
//! Stores serve byte ranges through `get_partial_values_key` on
//! [`ReadableStorageTraits`](crate::storage::ReadableStorageTraits), so a sharded array can read
//! a shard index or a single subchunk without fetching the whole shard.

use std::{fmt, ops::Range};

use thiserror::Error;

/// A byte offset.
pub type ByteOffset = u64;

/// A byte length.
pub type ByteLength = u64;

/// A byte range.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ByteRange {
    /// A byte range from the start.
    ///
    /// If the byte length is [`None`], reads to the end of the value.
    FromStart(ByteOffset, Option<ByteLength>),
    /// A byte range from the end.
    ///
    /// If the byte length is [`None`], reads to the start of the value.
    FromEnd(ByteOffset, Option<ByteLength>),
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FromStart(offset, None) => write!(f, "{offset}.."),
            Self::FromStart(offset, Some(length)) => {
                write!(f, "{offset}..{}", offset.saturating_add(*length))
            }
            Self::FromEnd(offset, None) => write!(f, "..-{offset}"),
            Self::FromEnd(offset, Some(length)) => {
                write!(f, "-{}..-{offset}", offset.saturating_add(*length))
            }
        }
    }
}

impl ByteRange {
    /// Return the start of the byte range within a value of `size` bytes.
    #[must_use]
    pub fn start(&self, size: u64) -> u64 {
        match self {
            Self::FromStart(offset, _) => *offset,
            Self::FromEnd(offset, length) => length.map_or(0, |length| {
                size.saturating_sub(offset.saturating_add(length))
            }),
        }
    }

    /// Return the exclusive end of the byte range within a value of `size` bytes.
    #[must_use]
    pub fn end(&self, size: u64) -> u64 {
        match self {
            Self::FromStart(offset, length) => {
                length.map_or(size, |length| offset.saturating_add(length))
            }
            Self::FromEnd(offset, _) => size.saturating_sub(*offset),
        }
    }

    /// Return the length of the byte range within a value of `size` bytes.
    #[must_use]
    pub fn length(&self, size: u64) -> u64 {
        match self {
            Self::FromStart(offset, None) | Self::FromEnd(offset, None) => {
                size.saturating_sub(*offset)
            }
            Self::FromStart(_, Some(length)) | Self::FromEnd(_, Some(length)) => *length,
        }
    }

    /// Convert the byte range to a [`Range<u64>`] within a value of `size` bytes.
    #[must_use]
    pub fn to_range(&self, size: u64) -> Range<u64> {
        self.start(size)..self.end(size)
    }

    /// Returns true if the byte range lies within a value of `size` bytes.
    #[must_use]
    pub fn is_within(&self, size: u64) -> bool {
        let (Self::FromStart(offset, length) | Self::FromEnd(offset, length)) = self;
        offset
            .checked_add(length.unwrap_or(0))
            .is_some_and(|end| end <= size)
    }
}

/// A byte range reaching beyond the end of a value.
#[derive(Copy, Clone, Debug, Error)]
#[error("invalid byte range {0} for bytes of length {1}")]
pub struct InvalidByteRangeError(ByteRange, u64);

impl InvalidByteRangeError {
    /// Create a new [`InvalidByteRangeError`].
    #[must_use]
    pub fn new(byte_range: ByteRange, bytes_len: u64) -> Self {
        Self(byte_range, bytes_len)
    }
}

/// Return the bytes of `byte_range` within `bytes`.
///
/// # Errors
/// Returns [`InvalidByteRangeError`] if any bytes are requested beyond the end of `bytes`.
pub fn extract_byte_range<'a>(
    bytes: &'a [u8],
    byte_range: &ByteRange,
) -> Result<&'a [u8], InvalidByteRangeError> {
    let size = bytes.len() as u64;
    if byte_range.is_within(size) {
        // within `bytes`, so both ends fit in a usize
        #[allow(clippy::cast_possible_truncation)]
        let range = byte_range.start(size) as usize..byte_range.end(size) as usize;
        Ok(&bytes[range])
    } else {
        Err(InvalidByteRangeError(*byte_range, size))
    }
}

/// Extract `byte_ranges` from `bytes`.
///
/// # Errors
/// Returns [`InvalidByteRangeError`] if any bytes are requested beyond the end of `bytes`.
pub fn extract_byte_ranges(
    bytes: &[u8],
    byte_ranges: &[ByteRange],
) -> Result<Vec<Vec<u8>>, InvalidByteRangeError> {
    byte_ranges
        .iter()
        .map(|byte_range| extract_byte_range(bytes, byte_range).map(<[u8]>::to_vec))
        .collect()
}
