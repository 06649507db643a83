use std::sync::Arc;

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use rayon_iter_concurrent_limit::iter_concurrent_limit;

use crate::{
    array_subset::ArraySubset,
    config::global_config,
    node::NodePath,
    storage::{meta_key, ReadableStorageTraits},
};

use super::{
    addressable, transmute_from_bytes_vec, validate_element_size, Array, ArrayCreateError,
    ArrayError, ArrayIndices, ArrayMetadata,
};

#[cfg(feature = "ndarray")]
use super::elements_to_ndarray;

impl<TStorage: ?Sized + ReadableStorageTraits + 'static> Array<TStorage> {
    /// Open an existing array in `storage` at `path`. The metadata is read from the store.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError::MissingMetadata`] if the array metadata does not exist, or another [`ArrayCreateError`] if there is a storage error or any metadata is invalid.
    pub fn open(storage: Arc<TStorage>, path: &str) -> Result<Self, ArrayCreateError> {
        let node_path = NodePath::new(path)?;
        let metadata = storage
            .get(&meta_key(&node_path))?
            .ok_or(ArrayCreateError::MissingMetadata)?;
        let metadata: ArrayMetadata = serde_json::from_slice(&metadata)?;
        log::debug!("array {node_path}: opened with shape {:?}", metadata.shape);
        Self::new_with_metadata(storage, path, metadata)
    }

    /// Read and decode the chunk at `chunk_indices` into its bytes if it exists.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - `chunk_indices` are invalid,
    ///  - the stored chunk cannot be decoded ([`ArrayError::CorruptChunk`]), or
    ///  - an underlying store error.
    pub fn retrieve_chunk_if_exists(
        &self,
        chunk_indices: &[u64],
    ) -> Result<Option<Vec<u8>>, ArrayError> {
        let chunk_shape = self.chunk_shape(chunk_indices)?;
        self.storage
            .get(&self.chunk_key(chunk_indices))?
            .map(|chunk_encoded| {
                self.codecs()
                    .decode(
                        chunk_encoded.to_vec(),
                        &self.chunk_representation(chunk_shape),
                    )
                    .map_err(|err| ArrayError::CorruptChunk(chunk_indices.to_vec(), err))
            })
            .transpose()
    }

    /// Read and decode the chunk at `chunk_indices` into its bytes or the fill value if it does not exist.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - `chunk_indices` are invalid,
    ///  - the stored chunk cannot be decoded ([`ArrayError::CorruptChunk`]), or
    ///  - an underlying store error.
    pub fn retrieve_chunk(&self, chunk_indices: &[u64]) -> Result<Vec<u8>, ArrayError> {
        match self.retrieve_chunk_if_exists(chunk_indices)? {
            Some(chunk) => Ok(chunk),
            None => {
                let chunk_shape = self.chunk_shape(chunk_indices)?;
                let num_elements = addressable(chunk_shape.num_elements_u64())?;
                Ok(self.fill_value().repeat(num_elements))
            }
        }
    }

    /// Read and decode the chunk at `chunk_indices` into the start of `buffer`.
    ///
    /// Returns the number of bytes written, which is the [chunk size](Array::chunk_size_bytes).
    /// Bytes in `buffer` beyond the chunk size are untouched.
    ///
    /// # Errors
    /// Returns [`ArrayError::BufferTooSmall`] if `buffer` is smaller than the chunk, or any error of [`retrieve_chunk`](Array::retrieve_chunk).
    pub fn retrieve_chunk_into(
        &self,
        chunk_indices: &[u64],
        buffer: &mut [u8],
    ) -> Result<usize, ArrayError> {
        let chunk_size = self.chunk_size_bytes(chunk_indices)?;
        if (buffer.len() as u64) < chunk_size {
            return Err(ArrayError::BufferTooSmall(buffer.len(), chunk_size));
        }
        let chunk = self.retrieve_chunk(chunk_indices)?;
        buffer[..chunk.len()].copy_from_slice(&chunk);
        Ok(chunk.len())
    }

    /// Read and decode the chunk at `chunk_indices` into a vector of its elements if it exists.
    ///
    /// # Errors
    /// Returns [`ArrayError::IncompatibleElementSize`] if the size of `T` does not match the data type size, or any error of [`retrieve_chunk_if_exists`](Array::retrieve_chunk_if_exists).
    pub fn retrieve_chunk_elements_if_exists<T: bytemuck::Pod>(
        &self,
        chunk_indices: &[u64],
    ) -> Result<Option<Vec<T>>, ArrayError> {
        validate_element_size::<T>(self.data_type())?;
        Ok(self
            .retrieve_chunk_if_exists(chunk_indices)?
            .map(transmute_from_bytes_vec::<T>))
    }

    /// Read and decode the chunk at `chunk_indices` into a vector of its elements or the fill value if it does not exist.
    ///
    /// # Errors
    /// Returns [`ArrayError::IncompatibleElementSize`] if the size of `T` does not match the data type size, or any error of [`retrieve_chunk`](Array::retrieve_chunk).
    pub fn retrieve_chunk_elements<T: bytemuck::Pod>(
        &self,
        chunk_indices: &[u64],
    ) -> Result<Vec<T>, ArrayError> {
        validate_element_size::<T>(self.data_type())?;
        let bytes = self.retrieve_chunk(chunk_indices)?;
        Ok(transmute_from_bytes_vec::<T>(bytes))
    }

    #[cfg(feature = "ndarray")]
    /// Read and decode the chunk at `chunk_indices` into an [`ndarray::ArrayD`]. It is filled with the fill value if it does not exist.
    ///
    /// # Errors
    /// See [`retrieve_chunk_elements`](Array::retrieve_chunk_elements).
    pub fn retrieve_chunk_ndarray<T: bytemuck::Pod>(
        &self,
        chunk_indices: &[u64],
    ) -> Result<ndarray::ArrayD<T>, ArrayError> {
        let chunk_shape = self.chunk_shape(chunk_indices)?.to_array_shape();
        elements_to_ndarray(
            &chunk_shape,
            self.retrieve_chunk_elements::<T>(chunk_indices)?,
        )
    }

    /// Read and decode the `chunk_subset` of the chunk at `chunk_indices` into its bytes.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - `chunk_indices` are invalid,
    ///  - `chunk_subset` is not within the chunk ([`ArrayError::InvalidChunkSubset`]), or
    ///  - any error of [`retrieve_chunk`](Array::retrieve_chunk).
    pub fn retrieve_chunk_subset(
        &self,
        chunk_indices: &[u64],
        chunk_subset: &ArraySubset,
    ) -> Result<Vec<u8>, ArrayError> {
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
        let chunk = self.retrieve_chunk(chunk_indices)?;
        if chunk_subset.shape() == chunk_shape.as_slice() {
            Ok(chunk)
        } else {
            chunk_subset
                .extract_bytes(&chunk, &chunk_shape, self.element_size())
                .map_err(|_| invalid_chunk_subset())
        }
    }

    /// Read and decode the `chunk_subset` of the chunk at `chunk_indices` into a vector of its elements.
    ///
    /// # Errors
    /// Returns [`ArrayError::IncompatibleElementSize`] if the size of `T` does not match the data type size, or any error of [`retrieve_chunk_subset`](Array::retrieve_chunk_subset).
    pub fn retrieve_chunk_subset_elements<T: bytemuck::Pod>(
        &self,
        chunk_indices: &[u64],
        chunk_subset: &ArraySubset,
    ) -> Result<Vec<T>, ArrayError> {
        validate_element_size::<T>(self.data_type())?;
        let bytes = self.retrieve_chunk_subset(chunk_indices, chunk_subset)?;
        Ok(transmute_from_bytes_vec::<T>(bytes))
    }

    #[cfg(feature = "ndarray")]
    /// Read and decode the `chunk_subset` of the chunk at `chunk_indices` into an [`ndarray::ArrayD`].
    ///
    /// # Errors
    /// See [`retrieve_chunk_subset_elements`](Array::retrieve_chunk_subset_elements).
    pub fn retrieve_chunk_subset_ndarray<T: bytemuck::Pod>(
        &self,
        chunk_indices: &[u64],
        chunk_subset: &ArraySubset,
    ) -> Result<ndarray::ArrayD<T>, ArrayError> {
        let elements = self.retrieve_chunk_subset_elements::<T>(chunk_indices, chunk_subset)?;
        elements_to_ndarray(chunk_subset.shape(), elements)
    }

    /// Read and decode the `array_subset` of the array into its bytes.
    ///
    /// Out-of-bounds elements of chunks on the array boundary are never returned.
    /// Elements in chunks that do not exist take the fill value.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - `array_subset` is not within the bounds of the array ([`ArrayError::InvalidArraySubset`]),
    ///  - a stored chunk cannot be decoded ([`ArrayError::CorruptChunk`]), or
    ///  - an underlying store error.
    pub fn retrieve_array_subset(&self, array_subset: &ArraySubset) -> Result<Vec<u8>, ArrayError> {
        self.validate_array_subset(array_subset)?;
        let size = addressable(self.array_subset_size_bytes(array_subset)?)?;
        let mut bytes = vec![0; size];
        self.retrieve_array_subset_into(array_subset, &mut bytes)?;
        Ok(bytes)
    }

    /// Read and decode the `array_subset` of the array into `buffer`.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidBytesInputSize`] if the length of `buffer` does not match the size of `array_subset`, or any error of [`retrieve_array_subset`](Array::retrieve_array_subset).
    pub fn retrieve_array_subset_into(
        &self,
        array_subset: &ArraySubset,
        buffer: &mut [u8],
    ) -> Result<(), ArrayError> {
        self.validate_array_subset(array_subset)?;
        self.validate_subset_buffer(array_subset, buffer.len())?;
        for chunk_indices in self.chunks_intersecting(array_subset)? {
            let (subset_subset, bytes) =
                self.retrieve_chunk_overlap(array_subset, &chunk_indices)?;
            self.store_subset_subset(array_subset, &subset_subset, &bytes, buffer)?;
        }
        Ok(())
    }

    /// Read and decode the `array_subset` of the array into its bytes, retrieving chunks in parallel.
    ///
    /// The number of chunks retrieved concurrently is limited by [`chunk_concurrent_limit`](crate::config::Config::chunk_concurrent_limit).
    ///
    /// # Errors
    /// See [`retrieve_array_subset`](Array::retrieve_array_subset).
    pub fn par_retrieve_array_subset(
        &self,
        array_subset: &ArraySubset,
    ) -> Result<Vec<u8>, ArrayError> {
        self.validate_array_subset(array_subset)?;
        let size = addressable(self.array_subset_size_bytes(array_subset)?)?;
        let chunks: Vec<ArrayIndices> = self.chunks_intersecting(array_subset)?.collect();
        let chunk_concurrent_limit = global_config().chunk_concurrent_limit().max(1);
        let overlaps = iter_concurrent_limit!(chunk_concurrent_limit, chunks, map, |chunk_indices| {
            self.retrieve_chunk_overlap(array_subset, &chunk_indices)
        })
        .collect::<Result<Vec<_>, ArrayError>>()?;

        let mut bytes = vec![0; size];
        for (subset_subset, overlap_bytes) in overlaps {
            self.store_subset_subset(array_subset, &subset_subset, &overlap_bytes, &mut bytes)?;
        }
        Ok(bytes)
    }

    /// Read and decode the `array_subset` of the array into a vector of its elements.
    ///
    /// # Errors
    /// Returns [`ArrayError::IncompatibleElementSize`] if the size of `T` does not match the data type size, or any error of [`retrieve_array_subset`](Array::retrieve_array_subset).
    pub fn retrieve_array_subset_elements<T: bytemuck::Pod>(
        &self,
        array_subset: &ArraySubset,
    ) -> Result<Vec<T>, ArrayError> {
        validate_element_size::<T>(self.data_type())?;
        let bytes = self.retrieve_array_subset(array_subset)?;
        Ok(transmute_from_bytes_vec::<T>(bytes))
    }

    #[cfg(feature = "ndarray")]
    /// Read and decode the `array_subset` of the array into an [`ndarray::ArrayD`].
    ///
    /// # Errors
    /// See [`retrieve_array_subset_elements`](Array::retrieve_array_subset_elements).
    pub fn retrieve_array_subset_ndarray<T: bytemuck::Pod>(
        &self,
        array_subset: &ArraySubset,
    ) -> Result<ndarray::ArrayD<T>, ArrayError> {
        let elements = self.retrieve_array_subset_elements::<T>(array_subset)?;
        elements_to_ndarray(array_subset.shape(), elements)
    }

    /// Retrieve the part of the chunk at `chunk_indices` overlapping `array_subset`.
    ///
    /// Returns the overlap relative to the start of `array_subset` and its bytes.
    fn retrieve_chunk_overlap(
        &self,
        array_subset: &ArraySubset,
        chunk_indices: &[u64],
    ) -> Result<(ArraySubset, Vec<u8>), ArrayError> {
        let overlap = self.chunk_overlap(array_subset, chunk_indices)?;
        let bytes = self.retrieve_chunk_subset(chunk_indices, overlap.chunk_subset())?;
        Ok((overlap.subset_subset().clone(), bytes))
    }

    /// Copy `bytes` of `subset_subset` into `buffer` holding the bytes of `array_subset`.
    fn store_subset_subset(
        &self,
        array_subset: &ArraySubset,
        subset_subset: &ArraySubset,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), ArrayError> {
        subset_subset
            .store_bytes(bytes, buffer, array_subset.shape(), self.element_size())
            .map_err(|_| {
                ArrayError::InvalidArraySubset(subset_subset.clone(), array_subset.shape().to_vec())
            })
    }
}
