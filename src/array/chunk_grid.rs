//! Partitioning of an array shape into chunks.
//!
//! [`ChunkGridTraits`] maps between array indices, chunk grid indices and chunk subsets.
//! Implementations register a [`ChunkGridPlugin`] so they can be named in array metadata.
//! The only built-in grid is [`RegularChunkGrid`], which a plain chunk shape converts into:
//! ```
//! # use chunkarray::array::ChunkGrid;
//! let chunk_grid: ChunkGrid = vec![64, 64].try_into()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod regular;

pub use regular::{RegularChunkGrid, RegularChunkGridConfiguration};

use derive_more::Deref;
use thiserror::Error;

use crate::{
    array_subset::{
        ArraySubset, IncompatibleArraySubsetAndShapeError, IncompatibleDimensionalityError,
        IndicesIterator,
    },
    metadata::Metadata,
    plugin::{try_create_from_registry, Plugin, PluginCreateError},
};

use super::{chunk_shape::NonZeroError, ravel_indices, ArrayIndices, ArrayShape, ChunkShape};

/// A type-erased chunk grid.
#[derive(Debug, Clone, Deref)]
pub struct ChunkGrid(Box<dyn ChunkGridTraits>);

/// The registration record of a chunk grid, keyed by its metadata name.
pub type ChunkGridPlugin = Plugin<ChunkGrid>;
inventory::collect!(ChunkGridPlugin);

impl ChunkGrid {
    /// Create a chunk grid.
    pub fn new<T: ChunkGridTraits + 'static>(chunk_grid: T) -> Self {
        Self(Box::new(chunk_grid))
    }

    /// Instantiate the registered chunk grid named in `metadata`.
    ///
    /// # Errors
    /// Returns [`PluginCreateError`] if no chunk grid is registered under the name or its configuration is rejected.
    pub fn from_metadata(metadata: &Metadata) -> Result<Self, PluginCreateError> {
        try_create_from_registry(metadata, "chunk grid")
    }
}

impl From<ChunkShape> for ChunkGrid {
    fn from(regular_chunk_shape: ChunkShape) -> Self {
        Self::new(RegularChunkGrid::new(regular_chunk_shape))
    }
}

impl TryFrom<ArrayShape> for ChunkGrid {
    type Error = NonZeroError;

    /// Fails if any extent is zero.
    fn try_from(regular_chunk_shape: ArrayShape) -> Result<Self, Self::Error> {
        Ok(ChunkShape::try_from(regular_chunk_shape)?.into())
    }
}

/// The overlap of an array subset with a single chunk.
///
/// Produced by [`ChunkGridTraits::chunk_local_overlap`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkOverlap {
    chunk_indices: ArrayIndices,
    array_subset: ArraySubset,
    chunk_subset: ArraySubset,
    subset_subset: ArraySubset,
    buffer_offset: u64,
}

impl ChunkOverlap {
    /// The chunk grid indices of the chunk.
    #[must_use]
    pub fn chunk_indices(&self) -> &[u64] {
        &self.chunk_indices
    }

    /// The overlap in array coordinates.
    #[must_use]
    pub fn array_subset(&self) -> &ArraySubset {
        &self.array_subset
    }

    /// The overlap relative to the chunk origin.
    #[must_use]
    pub fn chunk_subset(&self) -> &ArraySubset {
        &self.chunk_subset
    }

    /// The overlap relative to the start of the array subset.
    #[must_use]
    pub fn subset_subset(&self) -> &ArraySubset {
        &self.subset_subset
    }

    /// The row-major element offset of the start of the overlap within the array subset.
    #[must_use]
    pub fn buffer_offset(&self) -> u64 {
        self.buffer_offset
    }

    /// Returns true if the overlap contains no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.array_subset.is_empty()
    }
}

/// Geometry of a chunk grid.
///
/// Implementors provide the `*_unchecked` methods, which may assume their arguments have the dimensionality of the grid.
/// The provided methods validate their arguments first.
pub trait ChunkGridTraits: dyn_clone::DynClone + core::fmt::Debug + Send + Sync {
    /// The `chunk_grid` entry of the array metadata.
    fn create_metadata(&self) -> Metadata;

    /// The dimensionality of the grid.
    fn dimensionality(&self) -> usize;

    /// The grid shape (i.e. number of chunks) given `array_shape`.
    #[doc(hidden)]
    fn grid_shape_unchecked(&self, array_shape: &[u64]) -> ArrayShape;

    /// The shape of the chunk at `chunk_indices`.
    #[doc(hidden)]
    fn chunk_shape_unchecked(&self, chunk_indices: &[u64]) -> ChunkShape;

    /// The origin of the chunk at `chunk_indices`.
    #[doc(hidden)]
    fn chunk_origin_unchecked(&self, chunk_indices: &[u64]) -> ArrayIndices;

    /// The indices of the chunk which has the element at `array_indices`.
    #[doc(hidden)]
    fn chunk_indices_unchecked(&self, array_indices: &[u64]) -> ArrayIndices;

    /// The indices within its chunk of the element at `array_indices`.
    #[doc(hidden)]
    fn chunk_element_indices_unchecked(&self, array_indices: &[u64]) -> ArrayIndices;

    /// The number of chunks along each dimension of an array of `array_shape`.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the length of `array_shape` does not match the dimensionality of the chunk grid.
    fn grid_shape(
        &self,
        array_shape: &[u64],
    ) -> Result<ArrayShape, IncompatibleDimensionalityError> {
        if array_shape.len() == self.dimensionality() {
            Ok(self.grid_shape_unchecked(array_shape))
        } else {
            Err(IncompatibleDimensionalityError::new(
                array_shape.len(),
                self.dimensionality(),
            ))
        }
    }

    /// The shape of the chunk at `chunk_indices`.
    ///
    /// # Errors
    /// Returns [`InvalidChunkGridIndicesError`] if `chunk_indices` are not [valid](ChunkGridTraits::validate_chunk_indices).
    fn chunk_shape(
        &self,
        chunk_indices: &[u64],
        array_shape: &[u64],
    ) -> Result<ChunkShape, InvalidChunkGridIndicesError> {
        self.validate_chunk_indices(chunk_indices, array_shape)?;
        Ok(self.chunk_shape_unchecked(chunk_indices))
    }

    /// The origin of the chunk at `chunk_indices`.
    ///
    /// # Errors
    /// Returns [`InvalidChunkGridIndicesError`] if `chunk_indices` are not [valid](ChunkGridTraits::validate_chunk_indices).
    fn chunk_origin(
        &self,
        chunk_indices: &[u64],
        array_shape: &[u64],
    ) -> Result<ArrayIndices, InvalidChunkGridIndicesError> {
        self.validate_chunk_indices(chunk_indices, array_shape)?;
        Ok(self.chunk_origin_unchecked(chunk_indices))
    }

    /// The indices of the chunk which has the element at `array_indices`.
    ///
    /// # Errors
    /// Returns [`InvalidArrayIndicesError`] if `array_indices` are not within `array_shape`.
    fn chunk_indices(
        &self,
        array_indices: &[u64],
        array_shape: &[u64],
    ) -> Result<ArrayIndices, InvalidArrayIndicesError> {
        self.validate_array_indices(array_indices, array_shape)?;
        Ok(self.chunk_indices_unchecked(array_indices))
    }

    /// The indices within its chunk of the element at `array_indices`.
    ///
    /// # Errors
    /// Returns [`InvalidArrayIndicesError`] if `array_indices` are not within `array_shape`.
    fn chunk_element_indices(
        &self,
        array_indices: &[u64],
        array_shape: &[u64],
    ) -> Result<ArrayIndices, InvalidArrayIndicesError> {
        self.validate_array_indices(array_indices, array_shape)?;
        Ok(self.chunk_element_indices_unchecked(array_indices))
    }

    /// Check that `array_indices` and `array_shape` match the grid dimensionality and the indices are within the array shape.
    ///
    /// # Errors
    /// Returns [`InvalidArrayIndicesError`] if the array indices are invalid.
    fn validate_array_indices(
        &self,
        array_indices: &[u64],
        array_shape: &[u64],
    ) -> Result<(), InvalidArrayIndicesError> {
        if array_indices.len() == self.dimensionality()
            && array_shape.len() == self.dimensionality()
            && std::iter::zip(array_indices, array_shape).all(|(index, shape)| index < shape)
        {
            Ok(())
        } else {
            Err(InvalidArrayIndicesError(
                array_indices.to_vec(),
                array_shape.to_vec(),
            ))
        }
    }

    /// Check that `chunk_indices` and `array_shape` match the grid dimensionality and the chunk indices are within the grid shape.
    ///
    /// # Errors
    /// Returns [`InvalidChunkGridIndicesError`] if the chunk indices are invalid.
    fn validate_chunk_indices(
        &self,
        chunk_indices: &[u64],
        array_shape: &[u64],
    ) -> Result<(), InvalidChunkGridIndicesError> {
        let valid = chunk_indices.len() == self.dimensionality()
            && self.grid_shape(array_shape).is_ok_and(|grid_shape| {
                std::iter::zip(chunk_indices, grid_shape).all(|(index, shape)| *index < shape)
            });
        if valid {
            Ok(())
        } else {
            Err(InvalidChunkGridIndicesError(
                chunk_indices.to_vec(),
                array_shape.to_vec(),
            ))
        }
    }

    /// Return the [`ArraySubset`] of the chunk at `chunk_indices`.
    ///
    /// The subset is the full chunk, so it may extend beyond `array_shape` for a chunk on the array boundary.
    ///
    /// # Errors
    /// Returns [`InvalidChunkGridIndicesError`] if `chunk_indices` are not [valid](ChunkGridTraits::validate_chunk_indices).
    fn subset(
        &self,
        chunk_indices: &[u64],
        array_shape: &[u64],
    ) -> Result<ArraySubset, InvalidChunkGridIndicesError> {
        self.validate_chunk_indices(chunk_indices, array_shape)?;
        Ok(self.subset_unchecked(chunk_indices))
    }

    /// Return the [`ArraySubset`] of the chunk at `chunk_indices`.
    #[doc(hidden)]
    fn subset_unchecked(&self, chunk_indices: &[u64]) -> ArraySubset {
        let chunk_origin = self.chunk_origin_unchecked(chunk_indices);
        let chunk_shape = self.chunk_shape_unchecked(chunk_indices).to_array_shape();
        ArraySubset::new_with_start_shape(chunk_origin, chunk_shape)
            .unwrap_or_else(|_| ArraySubset::new_empty(chunk_indices.len()))
    }

    /// Return the indices of the chunks intersecting `array_subset`, lazily and in row-major order.
    ///
    /// An empty array subset intersects no chunks.
    ///
    /// # Errors
    /// Returns [`IncompatibleArraySubsetAndShapeError`] if `array_subset` is not within the bounds of `array_shape` or dimensionalities do not match.
    fn chunks_intersecting(
        &self,
        array_subset: &ArraySubset,
        array_shape: &[u64],
    ) -> Result<IndicesIterator, IncompatibleArraySubsetAndShapeError> {
        if array_shape.len() != self.dimensionality() || !array_subset.inbounds(array_shape) {
            return Err(IncompatibleArraySubsetAndShapeError::new(
                array_subset.clone(),
                array_shape.to_vec(),
            ));
        }
        let chunks = match array_subset.end_inc() {
            Some(end_inc) => {
                let first = self.chunk_indices_unchecked(array_subset.start());
                let last = self.chunk_indices_unchecked(&end_inc);
                ArraySubset::new_with_start_end_inc(first, &last)
                    .unwrap_or_else(|_| ArraySubset::new_empty(self.dimensionality()))
            }
            None => ArraySubset::new_empty(self.dimensionality()),
        };
        Ok(chunks.iter_indices())
    }

    /// Return the overlap of `array_subset` with the chunk at `chunk_indices`.
    ///
    /// The overlap is expressed in array coordinates, relative to the chunk origin and relative to the array subset start.
    /// The overlap is empty if the chunk does not intersect the array subset.
    ///
    /// # Errors
    /// Returns [`ChunkOverlapError`] if `chunk_indices` are invalid or `array_subset` has an incompatible dimensionality.
    fn chunk_local_overlap(
        &self,
        array_subset: &ArraySubset,
        chunk_indices: &[u64],
        array_shape: &[u64],
    ) -> Result<ChunkOverlap, ChunkOverlapError> {
        let chunk_subset = self.subset(chunk_indices, array_shape)?;
        let overlap = array_subset.overlap(&chunk_subset)?;
        let overlap_in_chunk = overlap.relative_to(chunk_subset.start())?;
        let overlap_in_subset = overlap.relative_to(array_subset.start())?;
        let buffer_offset = if overlap.is_empty() {
            0
        } else {
            ravel_indices(overlap_in_subset.start(), array_subset.shape())
        };
        Ok(ChunkOverlap {
            chunk_indices: chunk_indices.to_vec(),
            array_subset: overlap,
            chunk_subset: overlap_in_chunk,
            subset_subset: overlap_in_subset,
            buffer_offset,
        })
    }
}

dyn_clone::clone_trait_object!(ChunkGridTraits);

/// Array indices outside the array, or of the wrong dimensionality.
#[derive(Debug, Error)]
#[error("indices {0:?} are outside array shape {1:?}")]
pub struct InvalidArrayIndicesError(ArrayIndices, ArrayShape);

/// Chunk grid indices outside the grid, or of the wrong dimensionality.
#[derive(Debug, Error)]
#[error("chunk {0:?} is outside the chunk grid of array shape {1:?}")]
pub struct InvalidChunkGridIndicesError(ArrayIndices, ArrayShape);

impl InvalidChunkGridIndicesError {
    /// Create a new invalid chunk grid indices error.
    #[must_use]
    pub fn new(chunk_indices: ArrayIndices, array_shape: ArrayShape) -> Self {
        Self(chunk_indices, array_shape)
    }
}

/// A failure to intersect a subset with a chunk.
#[derive(Debug, Error)]
pub enum ChunkOverlapError {
    /// Invalid chunk grid indices.
    #[error(transparent)]
    InvalidChunkGridIndices(#[from] InvalidChunkGridIndicesError),
    /// An incompatible dimensionality.
    #[error(transparent)]
    IncompatibleDimensionality(#[from] IncompatibleDimensionalityError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_grid_from_metadata() {
        let metadata = serde_json::from_str::<Metadata>(
            r#"{"name": "regular", "configuration": {"chunk_shape": [1, 256, 256]}}"#,
        )
        .unwrap();
        let chunk_grid = ChunkGrid::from_metadata(&metadata).unwrap();
        assert_eq!(chunk_grid.dimensionality(), 3);
        assert_eq!(chunk_grid.create_metadata(), metadata);
    }

    #[test]
    fn chunk_grid_configuration_invalid() {
        let metadata = serde_json::from_str::<Metadata>(
            r#"{"name":"regular","configuration":{"chunk_shape":[5,0]}}"#,
        )
        .unwrap();
        assert!(ChunkGrid::from_metadata(&metadata).is_err());
        let metadata = serde_json::from_str::<Metadata>(
            r#"{"name":"rectangular","configuration":{"chunk_shape":[[5,5],10]}}"#,
        )
        .unwrap();
        assert_eq!(
            ChunkGrid::from_metadata(&metadata).unwrap_err().to_string(),
            "chunk grid rectangular is not supported"
        );
    }

    #[test]
    fn chunk_grid_chunks_intersecting() {
        let chunk_grid = ChunkGrid::try_from(vec![2, 2]).unwrap();
        let array_shape = [4, 5];

        let subset = ArraySubset::new_with_ranges(&[1..3, 1..3]);
        let chunks: Vec<_> = chunk_grid
            .chunks_intersecting(&subset, &array_shape)
            .unwrap()
            .collect();
        assert_eq!(chunks, vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]]);

        let subset = ArraySubset::new_with_ranges(&[2..4, 4..5]);
        let chunks: Vec<_> = chunk_grid
            .chunks_intersecting(&subset, &array_shape)
            .unwrap()
            .collect();
        assert_eq!(chunks, vec![vec![1, 2]]);

        let subset = ArraySubset::new_with_ranges(&[1..3, 2..2]);
        assert_eq!(
            chunk_grid
                .chunks_intersecting(&subset, &array_shape)
                .unwrap()
                .count(),
            0
        );

        let subset = ArraySubset::new_with_ranges(&[3..5, 0..1]);
        assert!(chunk_grid.chunks_intersecting(&subset, &array_shape).is_err());
        let subset = ArraySubset::new_with_ranges(&[0..1]);
        assert!(chunk_grid.chunks_intersecting(&subset, &array_shape).is_err());
    }

    #[test]
    fn chunk_grid_chunk_local_overlap() {
        let chunk_grid = ChunkGrid::try_from(vec![2, 2]).unwrap();
        let array_shape = [4, 4];
        let subset = ArraySubset::new_with_ranges(&[1..3, 1..4]);

        let overlap = chunk_grid
            .chunk_local_overlap(&subset, &[0, 0], &array_shape)
            .unwrap();
        assert_eq!(overlap.chunk_indices(), &[0, 0]);
        assert_eq!(overlap.array_subset(), &ArraySubset::new_with_ranges(&[1..2, 1..2]));
        assert_eq!(overlap.chunk_subset(), &ArraySubset::new_with_ranges(&[1..2, 1..2]));
        assert_eq!(overlap.subset_subset(), &ArraySubset::new_with_ranges(&[0..1, 0..1]));
        assert_eq!(overlap.buffer_offset(), 0);

        let overlap = chunk_grid
            .chunk_local_overlap(&subset, &[1, 1], &array_shape)
            .unwrap();
        assert_eq!(overlap.array_subset(), &ArraySubset::new_with_ranges(&[2..3, 2..4]));
        assert_eq!(overlap.chunk_subset(), &ArraySubset::new_with_ranges(&[0..1, 0..2]));
        assert_eq!(overlap.subset_subset(), &ArraySubset::new_with_ranges(&[1..2, 1..3]));
        assert_eq!(overlap.buffer_offset(), 4);

        let subset = ArraySubset::new_with_ranges(&[0..1, 0..1]);
        let overlap = chunk_grid
            .chunk_local_overlap(&subset, &[1, 1], &array_shape)
            .unwrap();
        assert!(overlap.is_empty());

        assert!(chunk_grid
            .chunk_local_overlap(&subset, &[2, 0], &array_shape)
            .is_err());
    }
}
