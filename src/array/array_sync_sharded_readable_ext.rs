use std::{collections::HashMap, sync::Arc};

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use rayon_iter_concurrent_limit::iter_concurrent_limit;

use crate::{
    array_subset::ArraySubset,
    byte_range::InvalidByteRangeError,
    config::global_config,
    storage::ReadableStorageTraits,
};

use super::{
    addressable,
    array_sharded_ext::sharding_codec,
    chunk_grid::{ChunkGridTraits, ChunkOverlapError},
    codec::{CodecError, ShardingCodec},
    ravel_indices, transmute_from_bytes_vec, validate_element_size, Array, ArrayError,
    ArrayIndices, ArrayShardedExt, ChunkGrid,
};

/// The decoded index of a stored shard.
#[derive(Debug)]
struct ShardIndex {
    /// The size in bytes of the encoded shard.
    shard_size: u64,
    /// The `(offset, nbytes)` pair of each subchunk.
    entries: Vec<u64>,
}

/// A cache used for methods in the [`ArrayShardedReadableExt`] trait.
///
/// It holds the index of each shard read through it, so a shard index is read from the store once.
/// A shard that did not exist is cached as missing.
/// [`clear`](ArrayShardedReadableExtCache::clear) the cache after shards of the array are written.
#[derive(Debug)]
pub struct ArrayShardedReadableExtCache {
    sharding_codec: Option<ShardingCodec>,
    subchunk_grid: ChunkGrid,
    partial_reads: bool,
    cache: parking_lot::Mutex<HashMap<ArrayIndices, Option<Arc<ShardIndex>>>>,
}

impl ArrayShardedReadableExtCache {
    /// Create a new cache for an array.
    #[must_use]
    pub fn new<TStorage: ?Sized>(array: &Array<TStorage>) -> Self {
        Self {
            sharding_codec: sharding_codec(array.codecs()),
            subchunk_grid: array.subchunk_grid(),
            // bytes->bytes codecs after sharding must see the whole shard
            partial_reads: array.codecs().bytes_to_bytes_codecs().is_empty(),
            cache: parking_lot::Mutex::new(HashMap::default()),
        }
    }

    /// Returns true if the array is sharded.
    ///
    /// This is cheaper than calling [`ArrayShardedExt::is_sharded`] repeatedly.
    #[must_use]
    pub fn array_is_sharded(&self) -> bool {
        self.sharding_codec.is_some()
    }

    /// Return the number of shard indexes cached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Returns true if the cache contains no cached shard indexes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }

    /// Clear the cache.
    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    /// The index of the shard at `shard_indices`, or [`None`] if the shard does not exist.
    ///
    /// The lock is not held while reading from the store,
    /// so two threads missing the same shard may both read its index.
    fn shard_index<TStorage: ?Sized + ReadableStorageTraits>(
        &self,
        array: &Array<TStorage>,
        sharding_codec: &ShardingCodec,
        shard_indices: &[u64],
    ) -> Result<Option<Arc<ShardIndex>>, ArrayError> {
        if let Some(shard_index) = self.cache.lock().get(shard_indices) {
            return Ok(shard_index.clone());
        }
        let shard_index = retrieve_shard_index(array, sharding_codec, shard_indices)?.map(Arc::new);
        self.cache
            .lock()
            .insert(shard_indices.to_vec(), shard_index.clone());
        Ok(shard_index)
    }
}

/// Read and decode the index of the shard at `shard_indices` with partial reads.
fn retrieve_shard_index<TStorage: ?Sized + ReadableStorageTraits>(
    array: &Array<TStorage>,
    sharding_codec: &ShardingCodec,
    shard_indices: &[u64],
) -> Result<Option<ShardIndex>, ArrayError> {
    let corrupt = |err: CodecError| ArrayError::CorruptChunk(shard_indices.to_vec(), err);
    let key = array.chunk_key(shard_indices);
    let Some(shard_size) = array.storage.size_key(&key)? else {
        return Ok(None);
    };
    let shard_shape = array.chunk_shape(shard_indices)?;
    let index_byte_range = sharding_codec
        .index_byte_range(&shard_shape)
        .map_err(corrupt)?;
    if !index_byte_range.is_within(shard_size) {
        return Err(corrupt(
            InvalidByteRangeError::new(index_byte_range, shard_size).into(),
        ));
    }
    let Some(encoded_index) = array
        .storage
        .get_partial_values_key(&key, &[index_byte_range])?
        .and_then(|mut encoded| encoded.pop())
    else {
        return Ok(None);
    };
    let num_subchunks = sharding_codec
        .subchunks_per_shard(&shard_shape)
        .map_err(corrupt)?
        .num_elements_u64();
    let entries = sharding_codec
        .decode_index(encoded_index.to_vec(), num_subchunks)
        .map_err(corrupt)?;
    log::trace!(
        "array {}: read the index of shard {shard_indices:?}",
        array.path()
    );
    Ok(Some(ShardIndex {
        shard_size,
        entries,
    }))
}

/// An [`Array`] extension trait to efficiently read data (e.g. subchunks) from arrays using the `sharding_indexed` codec.
///
/// Shard indexes are cached in an [`ArrayShardedReadableExtCache`], and a subchunk is read from the store
/// with a partial read of its bytes when no `bytes->bytes` codecs follow the `sharding_indexed` codec.
/// Unsharded arrays are read with the methods of [`Array`], treating each chunk as a subchunk.
pub trait ArrayShardedReadableExt {
    /// Read and decode the subchunk at `subchunk_indices` of the [subchunk grid](ArrayShardedExt::subchunk_grid) into its bytes.
    ///
    /// Subchunks that are not stored take the fill value.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - `subchunk_indices` are invalid,
    ///  - the shard index or subchunk cannot be decoded ([`ArrayError::CorruptChunk`]), or
    ///  - an underlying store error.
    fn retrieve_subchunk(
        &self,
        cache: &ArrayShardedReadableExtCache,
        subchunk_indices: &[u64],
    ) -> Result<Vec<u8>, ArrayError>;

    /// Read and decode the subchunk at `subchunk_indices` into a vector of its elements.
    ///
    /// # Errors
    /// Returns [`ArrayError::IncompatibleElementSize`] if the size of `T` does not match the data type size, or any error of [`retrieve_subchunk`](ArrayShardedReadableExt::retrieve_subchunk).
    fn retrieve_subchunk_elements<T: bytemuck::Pod>(
        &self,
        cache: &ArrayShardedReadableExtCache,
        subchunk_indices: &[u64],
    ) -> Result<Vec<T>, ArrayError>;

    /// Read and decode the `array_subset` of the array into its bytes, reading only the subchunks it intersects.
    ///
    /// # Errors
    /// See [`Array::retrieve_array_subset`].
    fn retrieve_array_subset_sharded(
        &self,
        cache: &ArrayShardedReadableExtCache,
        array_subset: &ArraySubset,
    ) -> Result<Vec<u8>, ArrayError>;

    /// Read and decode the `array_subset` of the array into a vector of its elements.
    ///
    /// # Errors
    /// Returns [`ArrayError::IncompatibleElementSize`] if the size of `T` does not match the data type size, or any error of [`retrieve_array_subset_sharded`](ArrayShardedReadableExt::retrieve_array_subset_sharded).
    fn retrieve_array_subset_elements_sharded<T: bytemuck::Pod>(
        &self,
        cache: &ArrayShardedReadableExtCache,
        array_subset: &ArraySubset,
    ) -> Result<Vec<T>, ArrayError>;
}

impl<TStorage: ?Sized + ReadableStorageTraits + 'static> ArrayShardedReadableExt
    for Array<TStorage>
{
    fn retrieve_subchunk(
        &self,
        cache: &ArrayShardedReadableExtCache,
        subchunk_indices: &[u64],
    ) -> Result<Vec<u8>, ArrayError> {
        let Some(sharding_codec) = &cache.sharding_codec else {
            return self.retrieve_chunk(subchunk_indices);
        };
        let subchunk_subset = cache.subchunk_grid.subset(subchunk_indices, self.shape())?;
        let shard_indices = self
            .chunk_grid()
            .chunk_indices_unchecked(subchunk_subset.start());
        let shard_subset = self.chunk_subset(&shard_indices)?;
        let subchunk_in_shard = subchunk_subset.relative_to(shard_subset.start())?;
        if !cache.partial_reads {
            return self.retrieve_chunk_subset(&shard_indices, &subchunk_in_shard);
        }

        let subchunk_representation =
            self.chunk_representation(sharding_codec.subchunk_shape().clone());
        let fill_value = || -> Result<Vec<u8>, ArrayError> {
            let num_elements = addressable(subchunk_representation.num_elements())?;
            Ok(self.fill_value().repeat(num_elements))
        };
        let Some(shard_index) = cache.shard_index(self, sharding_codec, &shard_indices)? else {
            return fill_value();
        };

        let corrupt = |err: CodecError| ArrayError::CorruptChunk(shard_indices.clone(), err);
        let subchunk_shape = sharding_codec.subchunk_shape().to_array_shape();
        let subchunks_per_shard = sharding_codec
            .subchunks_per_shard(self.chunk_shape(&shard_indices)?.as_slice())
            .map_err(corrupt)?
            .to_array_shape();
        let subchunk_index_in_shard: Vec<u64> =
            std::iter::zip(subchunk_in_shard.start(), &subchunk_shape)
                .map(|(start, size)| start / size)
                .collect();
        let subchunk_index = usize::try_from(ravel_indices(
            &subchunk_index_in_shard,
            &subchunks_per_shard,
        ))
        .map_err(|_| corrupt(CodecError::Other("subchunk index overflow".to_string())))?;

        let Some(byte_range) = ShardingCodec::subchunk_byte_range(
            &shard_index.entries,
            subchunk_index,
            shard_index.shard_size,
        )
        .map_err(corrupt)?
        else {
            return fill_value();
        };
        let encoded_subchunk = self
            .storage
            .get_partial_values_key(&self.chunk_key(&shard_indices), &[byte_range])?
            .and_then(|mut encoded| encoded.pop());
        match encoded_subchunk {
            Some(encoded_subchunk) => sharding_codec
                .decode_subchunk(encoded_subchunk.to_vec(), &subchunk_representation)
                .map_err(corrupt),
            // erased after its index was cached
            None => fill_value(),
        }
    }

    fn retrieve_subchunk_elements<T: bytemuck::Pod>(
        &self,
        cache: &ArrayShardedReadableExtCache,
        subchunk_indices: &[u64],
    ) -> Result<Vec<T>, ArrayError> {
        validate_element_size::<T>(self.data_type())?;
        let bytes = self.retrieve_subchunk(cache, subchunk_indices)?;
        Ok(transmute_from_bytes_vec::<T>(bytes))
    }

    fn retrieve_array_subset_sharded(
        &self,
        cache: &ArrayShardedReadableExtCache,
        array_subset: &ArraySubset,
    ) -> Result<Vec<u8>, ArrayError> {
        if !cache.array_is_sharded() || !cache.partial_reads {
            return self.retrieve_array_subset(array_subset);
        }
        let invalid_subset =
            || ArrayError::InvalidArraySubset(array_subset.clone(), self.shape().to_vec());
        let subchunks: Vec<ArrayIndices> = cache
            .subchunk_grid
            .chunks_intersecting(array_subset, self.shape())
            .map_err(|_| invalid_subset())?
            .collect();
        let size = addressable(self.array_subset_size_bytes(array_subset)?)?;

        let chunk_concurrent_limit = global_config().chunk_concurrent_limit().max(1);
        let overlaps = iter_concurrent_limit!(
            chunk_concurrent_limit,
            subchunks,
            map,
            |subchunk_indices: ArrayIndices| -> Result<(ArraySubset, Vec<u8>), ArrayError> {
                let overlap = cache
                    .subchunk_grid
                    .chunk_local_overlap(array_subset, &subchunk_indices, self.shape())
                    .map_err(|err| -> ArrayError { match err {
                        ChunkOverlapError::InvalidChunkGridIndices(err) => err.into(),
                        ChunkOverlapError::IncompatibleDimensionality(err) => err.into(),
                    }})?;
                let subchunk = self.retrieve_subchunk(cache, &subchunk_indices)?;
                let subchunk_shape = cache
                    .subchunk_grid
                    .chunk_shape_unchecked(&subchunk_indices)
                    .to_array_shape();
                let bytes = overlap
                    .chunk_subset()
                    .extract_bytes(&subchunk, &subchunk_shape, self.element_size())
                    .map_err(|_| invalid_subset())?;
                Ok((overlap.subset_subset().clone(), bytes))
            }
        )
        .collect::<Result<Vec<_>, ArrayError>>()?;

        let mut output = vec![0; size];
        for (subset_subset, bytes) in overlaps {
            subset_subset
                .store_bytes(
                    &bytes,
                    &mut output,
                    array_subset.shape(),
                    self.element_size(),
                )
                .map_err(|_| invalid_subset())?;
        }
        Ok(output)
    }

    fn retrieve_array_subset_elements_sharded<T: bytemuck::Pod>(
        &self,
        cache: &ArrayShardedReadableExtCache,
        array_subset: &ArraySubset,
    ) -> Result<Vec<T>, ArrayError> {
        validate_element_size::<T>(self.data_type())?;
        let bytes = self.retrieve_array_subset_sharded(cache, array_subset)?;
        Ok(transmute_from_bytes_vec::<T>(bytes))
    }
}
