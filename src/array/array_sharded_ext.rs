use super::{
    chunk_grid::ChunkGridTraits,
    codec::{array_to_bytes::sharding::IDENTIFIER, CodecChain, ShardingCodec},
    Array, ArrayShape, ChunkGrid, ChunkShape,
};

/// An [`Array`] extension trait to simplify working with arrays using the `sharding_indexed` codec.
pub trait ArrayShardedExt {
    /// Returns true if the array to bytes codec of the array is `sharding_indexed`.
    fn is_sharded(&self) -> bool;

    /// Return the subchunk shape.
    ///
    /// Returns [`None`] for an unsharded array.
    fn subchunk_shape(&self) -> Option<ChunkShape>;

    /// Retrieve the subchunk grid.
    ///
    /// Returns the normal chunk grid for an unsharded array.
    fn subchunk_grid(&self) -> ChunkGrid;

    /// Return the shape of the subchunk grid (i.e., the number of subchunks).
    ///
    /// Returns the normal chunk grid shape for an unsharded array.
    fn subchunk_grid_shape(&self) -> ArrayShape;
}

impl<TStorage: ?Sized> ArrayShardedExt for Array<TStorage> {
    fn is_sharded(&self) -> bool {
        self.codecs()
            .array_to_bytes_codec()
            .and_then(|codec| codec.create_metadata())
            .is_some_and(|metadata| metadata.name() == IDENTIFIER)
    }

    fn subchunk_shape(&self) -> Option<ChunkShape> {
        sharding_codec(self.codecs()).map(|codec| codec.subchunk_shape().clone())
    }

    fn subchunk_grid(&self) -> ChunkGrid {
        self.subchunk_shape()
            .map_or_else(|| self.chunk_grid().clone(), ChunkGrid::from)
    }

    fn subchunk_grid_shape(&self) -> ArrayShape {
        // the subchunk shape is checked against the chunk shape when the array is created
        self.subchunk_grid().grid_shape_unchecked(self.shape())
    }
}

/// The `sharding_indexed` codec of `codecs`, if it has one.
pub(crate) fn sharding_codec(codecs: &CodecChain) -> Option<ShardingCodec> {
    let metadata = codecs.array_to_bytes_codec()?.create_metadata()?;
    if metadata.name() != IDENTIFIER {
        return None;
    }
    ShardingCodec::new_with_configuration(&metadata.to_configuration().ok()?).ok()
}
