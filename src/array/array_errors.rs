use derive_more::Display;
use thiserror::Error;

use crate::{
    array_subset::{ArraySubset, IncompatibleDimensionalityError},
    metadata::UnsupportedAdditionalFieldError,
    node::NodePathError,
    plugin::PluginCreateError,
    storage::StorageError,
};

use super::{
    chunk_grid::InvalidChunkGridIndicesError,
    codec::CodecError,
    data_type::{
        IncompatibleFillValueError, IncompatibleFillValueMetadataError, UnsupportedDataTypeError,
    },
    ArrayIndices, ArrayShape,
};

/// The category of an [`ArrayError`] or [`ArrayCreateError`].
///
/// Every error maps to exactly one kind, which is a uniform status for callers that do not need the full error.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display)]
pub enum ErrorKind {
    /// The array metadata does not exist.
    #[display("not found")]
    NotFound,
    /// An array subset or chunk subset is outside the bounds of the array or chunk.
    #[display("out of bounds")]
    OutOfBounds,
    /// Chunk grid indices are outside of the chunk grid.
    #[display("out of range")]
    OutOfRange,
    /// The size of a buffer, the element size, or a dimensionality does not match what is expected.
    #[display("shape mismatch")]
    ShapeMismatch,
    /// The array metadata could not be parsed or is inconsistent.
    #[display("metadata corrupt")]
    MetadataCorrupt,
    /// A stored chunk could not be decoded.
    #[display("corrupt chunk")]
    CorruptChunk,
    /// A write to the store failed.
    #[display("write error")]
    WriteError,
    /// An output buffer is smaller than the chunk.
    #[display("buffer too small")]
    BufferTooSmall,
    /// Any other storage failure.
    #[display("storage error")]
    Storage,
    /// A chunk could not be encoded.
    #[display("codec error")]
    Codec,
}

/// A failure to open or create an array.
#[derive(Debug, Error)]
pub enum ArrayCreateError {
    /// The path is not a valid node path.
    #[error(transparent)]
    NodePathError(#[from] NodePathError),
    /// No `zarr.json` exists at the path.
    #[error("no array metadata at the path")]
    MissingMetadata,
    /// The store failed while reading the metadata.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// The metadata document is not valid array metadata JSON.
    #[error(transparent)]
    MetadataDeserializationError(#[from] serde_json::Error),
    /// The metadata has an extra field that must be understood.
    #[error(transparent)]
    UnsupportedAdditionalFieldError(#[from] UnsupportedAdditionalFieldError),
    /// The data type is unknown.
    #[error(transparent)]
    DataTypeCreateError(UnsupportedDataTypeError),
    /// The fill value metadata does not suit the data type.
    #[error(transparent)]
    InvalidFillValueMetadata(#[from] IncompatibleFillValueMetadataError),
    /// The fill value does not suit the data type.
    #[error(transparent)]
    InvalidFillValue(#[from] IncompatibleFillValueError),
    /// A codec is unknown or misconfigured.
    #[error(transparent)]
    CodecsCreateError(PluginCreateError),
    /// The chunk grid is unknown or misconfigured.
    #[error(transparent)]
    ChunkGridCreateError(PluginCreateError),
    /// The chunk key encoding is unknown or misconfigured.
    #[error(transparent)]
    ChunkKeyEncodingCreateError(PluginCreateError),
    /// The shape is empty.
    #[error("array shape has no dimensions")]
    ZeroDimensionality,
    /// The chunk grid and the shape have different dimensionality.
    #[error("{0}-dimensional chunk grid for a {1}-dimensional array")]
    InvalidChunkGridDimensionality(usize, usize),
    /// A chunk is too large to hold in memory.
    #[error("chunk shape {_0:?} with {_1} byte elements exceeds the addressable size")]
    ChunkSizeOverflow(ArrayShape, usize),
    /// The codecs cannot encode chunks of the array, for example a subchunk shape that does not divide the chunk shape.
    #[error("the codecs cannot encode chunks of the array: {_0}")]
    InvalidCodecs(CodecError),
}

impl ArrayCreateError {
    /// The [`ErrorKind`] of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingMetadata => ErrorKind::NotFound,
            Self::StorageError(_) => ErrorKind::Storage,
            Self::NodePathError(_)
            | Self::MetadataDeserializationError(_)
            | Self::UnsupportedAdditionalFieldError(_)
            | Self::DataTypeCreateError(_)
            | Self::InvalidFillValueMetadata(_)
            | Self::InvalidFillValue(_)
            | Self::CodecsCreateError(_)
            | Self::ChunkGridCreateError(_)
            | Self::ChunkKeyEncodingCreateError(_)
            | Self::ZeroDimensionality
            | Self::InvalidChunkGridDimensionality(_, _)
            | Self::ChunkSizeOverflow(_, _)
            | Self::InvalidCodecs(_) => ErrorKind::MetadataCorrupt,
        }
    }
}

/// A failure of an operation on an open array.
///
/// Operations that touch several chunks stop at the first error. Chunks already written stay written.
#[derive(Debug, Error)]
pub enum ArrayError {
    /// The store failed while reading.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// The store failed while writing or erasing.
    #[error("store write failed: {0}")]
    StoreWriteError(#[source] StorageError),
    /// Encoding a chunk failed.
    #[error(transparent)]
    CodecError(#[from] CodecError),
    /// A stored chunk did not decode.
    #[error("stored chunk {0:?} does not decode: {1}")]
    CorruptChunk(ArrayIndices, #[source] CodecError),
    /// The chunk indices lie outside the chunk grid.
    #[error(transparent)]
    InvalidChunkGridIndicesError(#[from] InvalidChunkGridIndicesError),
    /// The indices or subset have the wrong number of dimensions.
    #[error(transparent)]
    IncompatibleDimensionalityError(#[from] IncompatibleDimensionalityError),
    /// The subset reaches outside the array.
    #[error("subset {_0} exceeds array shape {_1:?}")]
    InvalidArraySubset(ArraySubset, ArrayShape),
    /// The subset reaches outside the chunk.
    #[error("subset {_0} exceeds chunk {_1:?} of shape {_2:?}")]
    InvalidChunkSubset(ArraySubset, ArrayIndices, ArrayShape),
    /// The input buffer has the wrong length.
    #[error("input of {_0} bytes, expected {_1}")]
    InvalidBytesInputSize(usize, u64),
    /// The element type has a different size from the data type.
    #[error("element size {_0} does not match data type size {_1}")]
    IncompatibleElementSize(usize, usize),
    /// The output buffer is shorter than the data.
    #[error("output buffer of {_0} bytes, {_1} required")]
    BufferTooSmall(usize, u64),
    /// The size in bytes of the subset exceeds [`u64::MAX`].
    #[error("subset {_0} is too large to address")]
    SubsetSizeOverflow(ArraySubset),
}

impl ArrayError {
    /// The [`ErrorKind`] of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::StorageError(_) => ErrorKind::Storage,
            Self::StoreWriteError(_) => ErrorKind::WriteError,
            Self::CodecError(_) => ErrorKind::Codec,
            Self::CorruptChunk(_, _) => ErrorKind::CorruptChunk,
            Self::InvalidChunkGridIndicesError(_) => ErrorKind::OutOfRange,
            Self::InvalidArraySubset(_, _) | Self::InvalidChunkSubset(_, _, _) => {
                ErrorKind::OutOfBounds
            }
            Self::IncompatibleDimensionalityError(_)
            | Self::InvalidBytesInputSize(_, _)
            | Self::IncompatibleElementSize(_, _) => ErrorKind::ShapeMismatch,
            Self::BufferTooSmall(_, _) | Self::SubsetSizeOverflow(_) => ErrorKind::BufferTooSmall,
        }
    }
}
