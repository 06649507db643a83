use crate::{
    array_subset::ArraySubset,
    storage::{meta_key, StorageError, StoreKey, WritableStorageTraits},
};

use super::{Array, ArrayError};

impl<TStorage: ?Sized + WritableStorageTraits + 'static> Array<TStorage> {
    /// Store metadata.
    ///
    /// # Errors
    /// Returns [`ArrayError::StoreWriteError`] if the metadata could not be written to the store.
    pub fn store_metadata(&self) -> Result<(), ArrayError> {
        let key = meta_key(self.path());
        let json = serde_json::to_vec_pretty(self.metadata())
            .map_err(|err| StorageError::InvalidMetadata(key.clone(), err.to_string()))
            .map_err(ArrayError::StoreWriteError)?;
        self.storage
            .set(&key, json.into())
            .map_err(ArrayError::StoreWriteError)?;
        log::debug!("array {}: stored metadata", self.path());
        Ok(())
    }

    /// Encode `chunk_bytes` and store at `chunk_indices`.
    ///
    /// A chunk composed entirely of the fill value will not be written to the store, and an existing chunk is erased.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - `chunk_indices` are invalid,
    ///  - the length of `chunk_bytes` is not equal to the expected length (the product of the number of elements in the chunk and the data type size in bytes),
    ///  - there is a codec encoding error, or
    ///  - the chunk could not be written to the store ([`ArrayError::StoreWriteError`]).
    pub fn store_chunk(
        &self,
        chunk_indices: &[u64],
        chunk_bytes: Vec<u8>,
    ) -> Result<(), ArrayError> {
        // Validation
        let chunk_shape = self.chunk_shape(chunk_indices)?;
        let chunk_representation = self.chunk_representation(chunk_shape);
        let chunk_size = chunk_representation.size();
        if chunk_bytes.len() as u64 != chunk_size {
            return Err(ArrayError::InvalidBytesInputSize(
                chunk_bytes.len(),
                chunk_size,
            ));
        }

        if self.fill_value().equals_all(&chunk_bytes) {
            self.erase_chunk(chunk_indices)?;
            Ok(())
        } else {
            let chunk_encoded = self
                .codecs()
                .encode(chunk_bytes, &chunk_representation)?;
            log::trace!(
                "array {}: storing chunk {chunk_indices:?} ({} bytes encoded)",
                self.path(),
                chunk_encoded.len()
            );
            self.storage
                .set(&self.chunk_key(chunk_indices), chunk_encoded.into())
                .map_err(ArrayError::StoreWriteError)
        }
    }

    /// Encode `chunk_elements` and store at `chunk_indices`.
    ///
    /// A chunk composed entirely of the fill value will not be written to the store.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - the size of  `T` does not match the data type size, or
    ///  - a [`store_chunk`](Array::store_chunk) error condition is met.
    pub fn store_chunk_elements<T: bytemuck::Pod>(
        &self,
        chunk_indices: &[u64],
        chunk_elements: Vec<T>,
    ) -> Result<(), ArrayError> {
        array_store_elements!(
            self,
            chunk_elements,
            store_chunk(chunk_indices, chunk_elements)
        )
    }

    #[cfg(feature = "ndarray")]
    /// Encode `chunk_array` and store at `chunk_indices`.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - the shape of `chunk_array` does not match the chunk shape,
    ///  - a [`store_chunk_elements`](Array::store_chunk_elements) error condition is met.
    pub fn store_chunk_ndarray<T: bytemuck::Pod>(
        &self,
        chunk_indices: &[u64],
        chunk_array: &ndarray::ArrayViewD<T>,
    ) -> Result<(), ArrayError> {
        let chunk_shape = self.chunk_shape(chunk_indices)?.to_array_shape();
        array_store_ndarray!(
            self,
            chunk_array,
            &chunk_shape,
            store_chunk_elements(chunk_indices, chunk_array)
        )
    }

    /// Erase the chunk at `chunk_indices`.
    ///
    /// Succeeds if the chunk does not exist, returning false.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if `chunk_indices` are invalid or the chunk could not be erased from the store.
    pub fn erase_chunk(&self, chunk_indices: &[u64]) -> Result<bool, ArrayError> {
        self.chunk_shape(chunk_indices)?;
        log::trace!("array {}: erasing chunk {chunk_indices:?}", self.path());
        self.storage
            .erase(&self.chunk_key(chunk_indices))
            .map_err(ArrayError::StoreWriteError)
    }

    /// Erase the chunks in `chunks`, an array subset of the chunk grid.
    ///
    /// Returns true if every chunk existed.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if `chunks` is not within the chunk grid or the chunks could not be erased from the store.
    pub fn erase_chunks(&self, chunks: &ArraySubset) -> Result<bool, ArrayError> {
        let chunk_grid_shape = self.chunk_grid_shape();
        if chunks.dimensionality() != chunk_grid_shape.len() || !chunks.inbounds(&chunk_grid_shape)
        {
            return Err(ArrayError::InvalidArraySubset(
                chunks.clone(),
                chunk_grid_shape,
            ));
        }
        let keys: Vec<StoreKey> = chunks
            .iter_indices()
            .map(|chunk_indices| self.chunk_key(&chunk_indices))
            .collect();
        log::trace!("array {}: erasing {} chunks", self.path(), keys.len());
        self.storage
            .erase_values(&keys)
            .map_err(ArrayError::StoreWriteError)
    }

    /// Erase the array metadata.
    ///
    /// Chunks are untouched, use [`erase_node`](crate::storage::erase_node) to erase the entire array.
    ///
    /// # Errors
    /// Returns [`ArrayError::StoreWriteError`] if the metadata could not be erased from the store.
    pub fn erase_metadata(&self) -> Result<bool, ArrayError> {
        self.storage
            .erase(&meta_key(self.path()))
            .map_err(ArrayError::StoreWriteError)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        array::{ArrayBuilder, DataType, ErrorKind, FillValue},
        storage::{store::MemoryStore, ReadableStorageTraits, StoreKey},
    };

    use super::*;

    fn test_array(store: Arc<MemoryStore>) -> Array<MemoryStore> {
        ArrayBuilder::new(
            vec![4, 4],
            DataType::Int16,
            vec![2, 2].try_into().unwrap(),
            FillValue::from(0i16),
        )
        .build(store, "/array")
        .unwrap()
    }

    #[test]
    fn array_store_metadata() {
        let store = Arc::new(MemoryStore::new());
        let array = test_array(store.clone());
        let key = StoreKey::new("array/zarr.json").unwrap();
        assert!(!store.exists(&key).unwrap());
        array.store_metadata().unwrap();
        assert!(store.exists(&key).unwrap());
        assert!(array.erase_metadata().unwrap());
        assert!(!array.erase_metadata().unwrap());
    }

    #[test]
    fn array_store_chunk() {
        let store = Arc::new(MemoryStore::new());
        let array = test_array(store.clone());
        let key = StoreKey::new("array/c/1/0").unwrap();

        array
            .store_chunk_elements::<i16>(&[1, 0], vec![1, 2, 3, 4])
            .unwrap();
        assert_eq!(store.size_key(&key).unwrap(), Some(8));
        assert_eq!(
            array.retrieve_chunk_elements::<i16>(&[1, 0]).unwrap(),
            vec![1, 2, 3, 4]
        );

        // A chunk of the fill value erases the stored chunk
        array.store_chunk_elements::<i16>(&[1, 0], vec![0; 4]).unwrap();
        assert!(!store.exists(&key).unwrap());
    }

    #[test]
    fn array_store_chunk_invalid() {
        let store = Arc::new(MemoryStore::new());
        let array = test_array(store);
        assert_eq!(
            array.store_chunk(&[2, 0], vec![0; 8]).unwrap_err().kind(),
            ErrorKind::OutOfRange
        );
        assert_eq!(
            array.store_chunk(&[0, 0], vec![0; 7]).unwrap_err().kind(),
            ErrorKind::ShapeMismatch
        );
        assert_eq!(
            array
                .store_chunk_elements::<i32>(&[0, 0], vec![0; 2])
                .unwrap_err()
                .kind(),
            ErrorKind::ShapeMismatch
        );
    }

    #[test]
    fn array_erase_chunks() {
        let store = Arc::new(MemoryStore::new());
        let array = test_array(store);
        array.store_chunk_elements::<i16>(&[0, 0], vec![1; 4]).unwrap();
        array.store_chunk_elements::<i16>(&[0, 1], vec![2; 4]).unwrap();
        assert!(array.erase_chunk(&[0, 0]).unwrap());
        assert!(!array.erase_chunk(&[0, 0]).unwrap());
        assert!(array
            .erase_chunks(&ArraySubset::new_with_ranges(&[0..1, 1..2]))
            .unwrap());
        assert!(array.retrieve_chunk_if_exists(&[0, 1]).unwrap().is_none());
        assert_eq!(
            array
                .erase_chunks(&ArraySubset::new_with_ranges(&[0..3, 0..1]))
                .unwrap_err()
                .kind(),
            ErrorKind::OutOfBounds
        );
    }

    #[cfg(feature = "ndarray")]
    #[test]
    fn array_store_chunk_ndarray() {
        let store = Arc::new(MemoryStore::new());
        let array = test_array(store);
        let chunk = ndarray::ArrayD::<i16>::from_shape_vec(vec![2, 2], vec![1, 2, 3, 4]).unwrap();
        array.store_chunk_ndarray(&[1, 1], &chunk.view()).unwrap();
        assert_eq!(array.retrieve_chunk_ndarray::<i16>(&[1, 1]).unwrap(), chunk);

        let chunk = ndarray::ArrayD::<i16>::zeros(vec![4, 1]);
        assert_eq!(
            array
                .store_chunk_ndarray(&[1, 1], &chunk.view())
                .unwrap_err()
                .kind(),
            ErrorKind::ShapeMismatch
        );
    }
}
