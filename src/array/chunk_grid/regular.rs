//! The `regular` chunk grid.
//!
//! Every chunk has the same shape.
//! Chunks on the upper boundary of an array may extend beyond the array shape.

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::{
    array::{chunk_grid::ChunkGridPlugin, ArrayIndices, ArrayShape, ChunkShape},
    metadata::Metadata,
    plugin::{plugin_configuration, PluginCreateError},
};

use super::{ChunkGrid, ChunkGridTraits};

/// The name of the chunk grid in array metadata.
pub const IDENTIFIER: &str = "regular";

inventory::submit! {
    ChunkGridPlugin::new(IDENTIFIER, create_chunk_grid_regular)
}

fn create_chunk_grid_regular(metadata: &Metadata) -> Result<ChunkGrid, PluginCreateError> {
    let RegularChunkGridConfiguration { chunk_shape } =
        plugin_configuration(IDENTIFIER, "chunk grid", metadata)?;
    Ok(chunk_shape.into())
}

/// The `configuration` object of a `regular` chunk grid.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Display)]
#[serde(deny_unknown_fields)]
#[display("{}", serde_json::to_string(self).unwrap_or_default())]
pub struct RegularChunkGridConfiguration {
    /// The shape shared by all chunks.
    pub chunk_shape: ChunkShape,
}

/// A chunk grid of equally shaped chunks anchored at the array origin.
#[derive(Debug, Clone)]
pub struct RegularChunkGrid {
    chunk_shape: ChunkShape,
}

impl RegularChunkGrid {
    /// Partition arrays into chunks of `chunk_shape`.
    #[must_use]
    pub fn new(chunk_shape: ChunkShape) -> Self {
        Self { chunk_shape }
    }

    /// The shape shared by all chunks.
    #[must_use]
    pub fn chunk_shape(&self) -> &ChunkShape {
        &self.chunk_shape
    }

    /// Apply `op` to each value of `indices` and the chunk extent of its dimension.
    fn per_dimension(&self, indices: &[u64], op: impl Fn(u64, u64) -> u64) -> ArrayIndices {
        debug_assert_eq!(self.dimensionality(), indices.len());
        std::iter::zip(indices, self.chunk_shape.iter())
            .map(|(&index, extent)| op(index, extent.get()))
            .collect()
    }
}

impl ChunkGridTraits for RegularChunkGrid {
    fn create_metadata(&self) -> Metadata {
        Metadata::new_with_serializable_configuration(
            IDENTIFIER,
            &RegularChunkGridConfiguration {
                chunk_shape: self.chunk_shape.clone(),
            },
        )
        .unwrap_or_else(|_| Metadata::new(IDENTIFIER))
    }

    fn dimensionality(&self) -> usize {
        self.chunk_shape.len()
    }

    fn grid_shape_unchecked(&self, array_shape: &[u64]) -> ArrayShape {
        self.per_dimension(array_shape, u64::div_ceil)
    }

    fn chunk_shape_unchecked(&self, _chunk_indices: &[u64]) -> ChunkShape {
        self.chunk_shape.clone()
    }

    fn chunk_origin_unchecked(&self, chunk_indices: &[u64]) -> ArrayIndices {
        self.per_dimension(chunk_indices, |index, extent| index * extent)
    }

    fn chunk_indices_unchecked(&self, array_indices: &[u64]) -> ArrayIndices {
        self.per_dimension(array_indices, |index, extent| index / extent)
    }

    fn chunk_element_indices_unchecked(&self, array_indices: &[u64]) -> ArrayIndices {
        self.per_dimension(array_indices, |index, extent| index % extent)
    }
}
