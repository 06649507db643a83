use itertools::Itertools;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use rayon_iter_concurrent_limit::iter_concurrent_limit;

use crate::{
    array_subset::ArraySubset,
    config::global_config,
    storage::ReadableWritableStorageTraits,
};

use super::{
    chunk_update::{merge_chunk_subset, ChunkUpdate},
    Array, ArrayError, ArrayIndices,
};

impl<TStorage: ?Sized + ReadableWritableStorageTraits + 'static> Array<TStorage> {
    /// Write `chunk_subset_bytes` into the region `chunk_subset` of the chunk at `chunk_indices`, keeping the rest of the chunk.
    ///
    /// A region covering the whole chunk replaces it outright.
    /// A smaller region is merged into the stored chunk (or the fill value) under the chunk's store lock; see [`chunk_update`](super::chunk_update).
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidChunkSubset`] if the region is outside the chunk and [`ArrayError::InvalidBytesInputSize`] if the buffer does not match it.
    /// Invalid chunk indices, a stored chunk that does not decode, encoding failures and store failures are also reported.
    pub fn store_chunk_subset(
        &self,
        chunk_indices: &[u64],
        chunk_subset: &ArraySubset,
        chunk_subset_bytes: Vec<u8>,
    ) -> Result<(), ArrayError> {
        let chunk_shape = self.chunk_shape(chunk_indices)?.to_array_shape();
        let invalid_chunk_subset = || {
            ArrayError::InvalidChunkSubset(
                chunk_subset.clone(),
                chunk_indices.to_vec(),
                chunk_shape.clone(),
            )
        };
        if chunk_subset.dimensionality() != chunk_shape.len()
            || !chunk_subset.inbounds(&chunk_shape)
        {
            return Err(invalid_chunk_subset());
        }
        let expected_size = chunk_subset
            .size_bytes(self.element_size())
            .unwrap_or(u64::MAX);
        if chunk_subset_bytes.len() as u64 != expected_size {
            return Err(ArrayError::InvalidBytesInputSize(
                chunk_subset_bytes.len(),
                expected_size,
            ));
        }
        if chunk_subset.is_empty() {
            return Ok(());
        }

        let update = ChunkUpdate::for_chunk_subset(chunk_subset, &chunk_shape);
        log::trace!(
            "array {}: updating chunk {chunk_indices:?} ({})",
            self.path(),
            update.stages().iter().join(" -> ")
        );
        match update {
            ChunkUpdate::Direct => self.store_chunk(chunk_indices, chunk_subset_bytes),
            ChunkUpdate::ReadModifyWrite => {
                let mutex = self.storage.mutex(&self.chunk_key(chunk_indices))?;
                let _lock = mutex.lock();

                let mut chunk_bytes = self.retrieve_chunk(chunk_indices)?;
                merge_chunk_subset(
                    &mut chunk_bytes,
                    &chunk_shape,
                    chunk_subset,
                    &chunk_subset_bytes,
                    self.element_size(),
                )
                .map_err(|_| invalid_chunk_subset())?;
                self.store_chunk(chunk_indices, chunk_bytes)
            }
        }
    }

    /// Typed form of [`store_chunk_subset`](Array::store_chunk_subset).
    ///
    /// # Errors
    /// Returns [`ArrayError::IncompatibleElementSize`] if `T` does not match the data type, otherwise as [`store_chunk_subset`](Array::store_chunk_subset).
    pub fn store_chunk_subset_elements<T: bytemuck::Pod>(
        &self,
        chunk_indices: &[u64],
        chunk_subset: &ArraySubset,
        chunk_subset_elements: Vec<T>,
    ) -> Result<(), ArrayError> {
        array_store_elements!(
            self,
            chunk_subset_elements,
            store_chunk_subset(chunk_indices, chunk_subset, chunk_subset_elements)
        )
    }

    /// Write `subset_bytes`, laid out in C order over `array_subset`, into the array.
    ///
    /// Chunks are updated one after another in row-major chunk order with [`store_chunk_subset`](Array::store_chunk_subset).
    /// The first failure stops the write and chunks updated before it keep their new contents.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidArraySubset`] if the subset is outside the array and [`ArrayError::InvalidBytesInputSize`] if the buffer does not match it.
    /// Otherwise returns the first error of a chunk update.
    pub fn store_array_subset(
        &self,
        array_subset: &ArraySubset,
        subset_bytes: Vec<u8>,
    ) -> Result<(), ArrayError> {
        self.validate_array_subset(array_subset)?;
        self.validate_subset_buffer(array_subset, subset_bytes.len())?;
        for chunk_indices in self.chunks_intersecting(array_subset)? {
            self.store_chunk_overlap(array_subset, &subset_bytes, &chunk_indices)?;
        }
        Ok(())
    }

    /// Parallel [`store_array_subset`](Array::store_array_subset), with at most [`chunk_concurrent_limit`](crate::config::Config::chunk_concurrent_limit) chunks in flight.
    ///
    /// Which chunks were updated when an error is returned is unspecified.
    ///
    /// # Errors
    /// See [`store_array_subset`](Array::store_array_subset).
    pub fn par_store_array_subset(
        &self,
        array_subset: &ArraySubset,
        subset_bytes: Vec<u8>,
    ) -> Result<(), ArrayError> {
        self.validate_array_subset(array_subset)?;
        self.validate_subset_buffer(array_subset, subset_bytes.len())?;
        let chunks: Vec<ArrayIndices> = self.chunks_intersecting(array_subset)?.collect();
        let chunk_concurrent_limit = global_config().chunk_concurrent_limit().max(1);
        iter_concurrent_limit!(
            chunk_concurrent_limit,
            chunks,
            try_for_each,
            |chunk_indices: ArrayIndices| {
                self.store_chunk_overlap(array_subset, &subset_bytes, &chunk_indices)
            }
        )
    }

    /// Typed form of [`store_array_subset`](Array::store_array_subset).
    ///
    /// # Errors
    /// Returns [`ArrayError::IncompatibleElementSize`] if `T` does not match the data type, otherwise as [`store_array_subset`](Array::store_array_subset).
    pub fn store_array_subset_elements<T: bytemuck::Pod>(
        &self,
        array_subset: &ArraySubset,
        subset_elements: Vec<T>,
    ) -> Result<(), ArrayError> {
        array_store_elements!(
            self,
            subset_elements,
            store_array_subset(array_subset, subset_elements)
        )
    }

    /// Typed form of [`par_store_array_subset`](Array::par_store_array_subset).
    ///
    /// # Errors
    /// See [`store_array_subset_elements`](Array::store_array_subset_elements).
    pub fn par_store_array_subset_elements<T: bytemuck::Pod>(
        &self,
        array_subset: &ArraySubset,
        subset_elements: Vec<T>,
    ) -> Result<(), ArrayError> {
        array_store_elements!(
            self,
            subset_elements,
            par_store_array_subset(array_subset, subset_elements)
        )
    }

    #[cfg(feature = "ndarray")]
    /// Write `subset_array` into the region of its shape that starts at `subset_start`.
    ///
    /// # Errors
    /// As [`store_array_subset_elements`](Array::store_array_subset_elements).
    pub fn store_array_subset_ndarray<T: bytemuck::Pod>(
        &self,
        subset_start: &[u64],
        subset_array: &ndarray::ArrayViewD<T>,
    ) -> Result<(), ArrayError> {
        let subset_shape: Vec<u64> = subset_array
            .shape()
            .iter()
            .map(|&dim| dim as u64)
            .collect();
        let array_subset =
            ArraySubset::new_with_start_shape(subset_start.to_vec(), subset_shape.clone())?;
        array_store_ndarray!(
            self,
            subset_array,
            &subset_shape,
            store_array_subset_elements(&array_subset, subset_array)
        )
    }

    /// Store the part of `subset_bytes` overlapping the chunk at `chunk_indices`.
    fn store_chunk_overlap(
        &self,
        array_subset: &ArraySubset,
        subset_bytes: &[u8],
        chunk_indices: &[u64],
    ) -> Result<(), ArrayError> {
        let overlap = self.chunk_overlap(array_subset, chunk_indices)?;
        let overlap_bytes = overlap
            .subset_subset()
            .extract_bytes(subset_bytes, array_subset.shape(), self.element_size())
            .map_err(|_| {
                ArrayError::InvalidArraySubset(
                    overlap.subset_subset().clone(),
                    array_subset.shape().to_vec(),
                )
            })?;
        self.store_chunk_subset(chunk_indices, overlap.chunk_subset(), overlap_bytes)
    }
}
