//! The stages of writing an array subset to a chunk.
//!
//! A subset write is split into one update per intersecting chunk.
//! Each update runs through the following stages:
//!  1. [`CheckFullOverlap`](ChunkUpdateStage::CheckFullOverlap): [`ChunkUpdate::for_chunk_subset`] decides whether the overlap covers the entire chunk.
//!  2. [`DirectEncode`](ChunkUpdateStage::DirectEncode): a [`ChunkUpdate::Direct`] update encodes the overlap bytes as the chunk and writes them without locking.
//!  3. [`ReadExisting`](ChunkUpdateStage::ReadExisting): a [`ChunkUpdate::ReadModifyWrite`] update locks the chunk key and retrieves the chunk (or the fill value if it does not exist).
//!  4. [`Merge`](ChunkUpdateStage::Merge): [`merge_chunk_subset`] overwrites the overlap region of the retrieved chunk.
//!  5. [`Encode`](ChunkUpdateStage::Encode) and [`Write`](ChunkUpdateStage::Write): the merged chunk is encoded and stored, then the chunk key is unlocked.

use derive_more::Display;

use crate::array_subset::{ArraySubset, ArraySubsetBytesError};

/// A stage of a chunk update.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display)]
pub enum ChunkUpdateStage {
    /// Check if the update covers the entire chunk.
    #[display("check full overlap")]
    CheckFullOverlap,
    /// Encode the update bytes as the entire chunk.
    #[display("direct encode")]
    DirectEncode,
    /// Retrieve the existing chunk under a lock.
    #[display("read existing")]
    ReadExisting,
    /// Merge the update bytes into the existing chunk.
    #[display("merge")]
    Merge,
    /// Encode the merged chunk.
    #[display("encode")]
    Encode,
    /// Write the encoded chunk.
    #[display("write")]
    Write,
}

/// The kind of update applied to a chunk.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChunkUpdate {
    /// The update covers the entire chunk, which is encoded and written directly.
    Direct,
    /// The update covers part of the chunk, which is read, merged, then written under a lock.
    ReadModifyWrite,
}

impl ChunkUpdate {
    /// Return the kind of update for writing `chunk_subset` (relative to the chunk origin) of a chunk with `chunk_shape`.
    #[must_use]
    pub fn for_chunk_subset(chunk_subset: &ArraySubset, chunk_shape: &[u64]) -> Self {
        let full = chunk_subset.start().iter().all(|&start| start == 0)
            && chunk_subset.shape() == chunk_shape;
        if full {
            Self::Direct
        } else {
            Self::ReadModifyWrite
        }
    }

    /// The stages run by this kind of update, in order.
    #[must_use]
    pub fn stages(&self) -> &'static [ChunkUpdateStage] {
        use ChunkUpdateStage as S;
        match self {
            Self::Direct => &[S::CheckFullOverlap, S::DirectEncode, S::Write],
            Self::ReadModifyWrite => &[
                S::CheckFullOverlap,
                S::ReadExisting,
                S::Merge,
                S::Encode,
                S::Write,
            ],
        }
    }
}

/// Overwrite the `chunk_subset` region of `chunk_bytes` with `chunk_subset_bytes`.
///
/// Elements of the chunk outside of `chunk_subset` are untouched.
///
/// # Errors
/// Returns [`ArraySubsetBytesError`] if `chunk_subset` is not within `chunk_shape`, or a byte length does not match its shape and `element_size`.
pub fn merge_chunk_subset(
    chunk_bytes: &mut [u8],
    chunk_shape: &[u64],
    chunk_subset: &ArraySubset,
    chunk_subset_bytes: &[u8],
    element_size: usize,
) -> Result<(), ArraySubsetBytesError> {
    chunk_subset.store_bytes(chunk_subset_bytes, chunk_bytes, chunk_shape, element_size)
}
