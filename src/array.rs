//! Chunked N-dimensional arrays.
//!
//! An array holds multidimensional data split into chunks of a [chunk grid](chunk_grid), each stored under its own key.
//! Its [`ArrayMetadata`] is stored as a JSON document (`zarr.json`) at the array path.
//!
//! Use [`ArrayBuilder`] to setup a new array, or use [`Array::open`] for an existing array.
//! The documentation for [`Array`] details how to interact with arrays.

/// Validate the element size of `T`, convert `$elements` to bytes, then call `$func`.
macro_rules! array_store_elements {
    ( $self:expr, $elements:ident, $func:ident($($arg:tt)*) ) => {{
        $crate::array::validate_element_size::<T>($self.data_type())?;
        let $elements = $crate::array::transmute_to_bytes_vec($elements);
        $self.$func($($arg)*)
    }};
}

#[cfg(feature = "ndarray")]
/// Check `$array` has `$shape`, collect it into elements in logical order, then call `$func`.
macro_rules! array_store_ndarray {
    ( $self:expr, $array:ident, $shape:expr, $func:ident($($arg:tt)*) ) => {{
        let shape: &[u64] = $shape;
        if !std::iter::zip($array.shape(), shape).all(|(&a, &b)| a as u64 == b)
            || $array.ndim() != shape.len()
        {
            return Err($crate::array::ArrayError::InvalidBytesInputSize(
                $array.len(),
                shape.iter().product(),
            ));
        }
        let $array: Vec<T> = $array.iter().copied().collect();
        $self.$func($($arg)*)
    }};
}

mod array_builder;
mod array_errors;
mod array_metadata;
#[cfg(feature = "sharding")]
mod array_sharded_ext;
mod array_sync_readable;
mod array_sync_readable_writable;
#[cfg(feature = "sharding")]
mod array_sync_sharded_readable_ext;
mod array_sync_writable;
mod bytes_representation;
pub mod chunk_grid;
pub mod chunk_key_encoding;
mod chunk_representation;
mod chunk_shape;
pub mod chunk_update;
pub mod codec;
pub mod data_type;
mod fill_value;
mod fill_value_metadata;

use std::sync::Arc;

pub use self::{
    array_builder::ArrayBuilder,
    array_errors::{ArrayCreateError, ArrayError, ErrorKind},
    array_metadata::ArrayMetadata,
    bytes_representation::BytesRepresentation,
    chunk_grid::{ChunkGrid, ChunkOverlap},
    chunk_key_encoding::{ChunkKeyEncoding, ChunkKeySeparator},
    chunk_representation::ChunkRepresentation,
    chunk_shape::{chunk_shape_to_array_shape, ChunkShape, NonZeroError},
    codec::CodecChain,
    data_type::DataType,
    fill_value::FillValue,
    fill_value_metadata::{
        FillValueFloat, FillValueFloatType, FillValueMetadata, FillValueNonFinite, HexString,
        HexStringError,
    },
};

#[cfg(feature = "sharding")]
pub use self::{
    array_sharded_ext::ArrayShardedExt,
    array_sync_sharded_readable_ext::{ArrayShardedReadableExt, ArrayShardedReadableExtCache},
};

use crate::{
    array_subset::{ArraySubset, IndicesIterator},
    node::NodePath,
    storage::{data_key, StoreKey},
};

use self::chunk_grid::{ChunkGridTraits, ChunkOverlapError};

/// An ND index to an element in an array.
pub type ArrayIndices = Vec<u64>;

/// The shape of an array.
pub type ArrayShape = Vec<u64>;

/// A chunked N-dimensional array.
///
/// ### Metadata
///
/// The `zarr.json` document of an array records its
///  - **shape**, the extent of each dimension,
///  - **data type** of its elements,
///  - **chunk grid**, which partitions the shape into chunks,
///  - **chunk key encoding**, which names the store key of each chunk,
///  - **fill value** returned for elements that were never written,
///  - **codecs** applied to chunk bytes,
///
/// plus free-form **attributes**.
///
/// ### Creating and opening
///
/// [`ArrayBuilder`] and [`Array::new_with_metadata`] create an array in memory only.
/// Nothing reaches the store until [`store_metadata`](Array::store_metadata) is called.
/// [`Array::open`] reads the metadata of an array that already exists.
///
/// ### Access modes
///
/// The methods available depend on what the storage type `TStorage` can do.
/// Opening an array over a [`ReadableStorageTraits`](crate::storage::ReadableStorageTraits) store gives a read-only array.
///  - readable storage:
///    [`open`](Array::open),
///    [`retrieve_chunk`](Array::retrieve_chunk), [`retrieve_chunk_into`](Array::retrieve_chunk_into),
///    [`retrieve_chunk_subset`](Array::retrieve_chunk_subset),
///    [`retrieve_array_subset`](Array::retrieve_array_subset), [`retrieve_array_subset_into`](Array::retrieve_array_subset_into), [`par_retrieve_array_subset`](Array::par_retrieve_array_subset)
///  - writable storage:
///    [`store_metadata`](Array::store_metadata), [`store_chunk`](Array::store_chunk), [`erase_chunk`](Array::erase_chunk)
///  - readable and writable storage ([`ReadableWritableStorageTraits`](crate::storage::ReadableWritableStorageTraits)):
///    [`store_chunk_subset`](Array::store_chunk_subset),
///    [`store_array_subset`](Array::store_array_subset), [`par_store_array_subset`](Array::par_store_array_subset)
///
/// Plain methods move raw bytes in native byte order.
/// The `_elements` variants take or return typed elements, and with the `ndarray` feature the `_ndarray` variants use [`ndarray::ArrayD`].
///
/// ### Sharding
///
/// With the `sharding_indexed` codec ([`ShardingCodec`](codec::ShardingCodec)) each chunk is a shard of smaller subchunks.
/// [`ArrayShardedExt`] exposes the subchunk grid, and [`ArrayShardedReadableExt`] reads subchunks
/// through a cache of shard indexes without retrieving whole shards.
///
/// ### Concurrent writes
///
/// A partial chunk write reads the chunk, merges the new elements, and writes it back (see [`chunk_update`]).
/// That sequence holds the chunk's [`StoreKeyMutex`](crate::storage::store_lock::StoreKeyMutex) so that concurrent merges into one chunk are not lost.
/// Writes covering a whole chunk skip the read and the lock.
///
/// Overlapping writes are not ordered against each other.
/// Each chunk ends up holding whichever merge finished last, so the overlap of two subsets can mix values from both.
/// For a `1x6` array with `1x3` chunks and fill value 9:
/// ```text
///   write 0 to [1, 4)     [ A B C | D E F ]
///   write 1 to [2, 5)       9 0 0   0 1 9
///   write 2 to [2, 3)           1   1
///                               2
/// ```
///
/// Any number of [`Array`] handles may share one array as long as they share the store, since the locks live in the store.
/// A store built with [`DisabledStoreLocks`](crate::storage::store_lock::DisabledStoreLocks) skips locking, and is only safe when no chunk is partially written by two threads at once.
/// Nothing is synchronised between processes.
#[derive(Debug)]
pub struct Array<TStorage: ?Sized> {
    /// The storage.
    storage: Arc<TStorage>,
    /// The path of the array in a store.
    path: NodePath,
    /// The data type of the array.
    data_type: DataType,
    /// The chunk grid of the array.
    chunk_grid: ChunkGrid,
    /// The mapping from chunk grid cell coordinates to keys in the underlying store.
    chunk_key_encoding: ChunkKeyEncoding,
    /// The fill value, encoded with the data type.
    fill_value: FillValue,
    /// The codecs used to encode and decode chunks.
    codecs: CodecChain,
    /// The array metadata.
    metadata: ArrayMetadata,
}

impl<TStorage: ?Sized> Array<TStorage> {
    /// Create an array in `storage` at `path` with `metadata`.
    /// This does **not** write to the store, use [`store_metadata`](Array::store_metadata) to write `metadata` to `storage`.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if:
    ///  - the path is invalid,
    ///  - any metadata is invalid or inconsistent, or
    ///  - a plugin (data type/chunk grid/chunk key encoding/codec) is unsupported or misconfigured.
    pub fn new_with_metadata(
        storage: Arc<TStorage>,
        path: &str,
        metadata: ArrayMetadata,
    ) -> Result<Self, ArrayCreateError> {
        let path = NodePath::new(path)?;
        metadata.additional_fields.validate()?;
        if metadata.shape.is_empty() {
            return Err(ArrayCreateError::ZeroDimensionality);
        }
        let data_type = DataType::from_metadata(&metadata.data_type)
            .map_err(ArrayCreateError::DataTypeCreateError)?;
        let chunk_grid = ChunkGrid::from_metadata(&metadata.chunk_grid)
            .map_err(ArrayCreateError::ChunkGridCreateError)?;
        if chunk_grid.dimensionality() != metadata.shape.len() {
            return Err(ArrayCreateError::InvalidChunkGridDimensionality(
                chunk_grid.dimensionality(),
                metadata.shape.len(),
            ));
        }
        let fill_value = data_type.fill_value_from_metadata(&metadata.fill_value)?;
        let chunk_shape = chunk_grid.chunk_shape_unchecked(&vec![0; metadata.shape.len()]);
        let chunk_size = chunk_shape
            .num_elements_checked()
            .and_then(|num_elements| num_elements.checked_mul(data_type.size() as u64));
        if chunk_size.map_or(true, |chunk_size| addressable(chunk_size).is_err()) {
            return Err(ArrayCreateError::ChunkSizeOverflow(
                chunk_shape.to_array_shape(),
                data_type.size(),
            ));
        }
        let codecs = CodecChain::from_metadata(&metadata.codecs)
            .map_err(ArrayCreateError::CodecsCreateError)?;
        codecs
            .compute_encoded_size(&ChunkRepresentation::new_unchecked(
                chunk_shape,
                data_type.clone(),
                fill_value.clone(),
            ))
            .map_err(ArrayCreateError::InvalidCodecs)?;
        let chunk_key_encoding = ChunkKeyEncoding::from_metadata(&metadata.chunk_key_encoding)
            .map_err(ArrayCreateError::ChunkKeyEncodingCreateError)?;

        log::debug!(
            "array {path}: shape {:?}, data type {data_type}, {} codecs",
            metadata.shape,
            codecs.len()
        );

        Ok(Self {
            storage,
            path,
            data_type,
            chunk_grid,
            chunk_key_encoding,
            fill_value,
            codecs,
            metadata,
        })
    }

    /// Get the node path.
    #[must_use]
    pub const fn path(&self) -> &NodePath {
        &self.path
    }

    /// Get the array shape.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.metadata.shape
    }

    /// Get the array dimensionality.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.metadata.shape.len()
    }

    /// Get the data type.
    #[must_use]
    pub const fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Get the size in bytes of an element of the array.
    #[must_use]
    pub const fn element_size(&self) -> usize {
        self.data_type.size()
    }

    /// Get the fill value.
    #[must_use]
    pub const fn fill_value(&self) -> &FillValue {
        &self.fill_value
    }

    /// Get the codecs.
    #[must_use]
    pub const fn codecs(&self) -> &CodecChain {
        &self.codecs
    }

    /// Get the chunk grid.
    #[must_use]
    pub const fn chunk_grid(&self) -> &ChunkGrid {
        &self.chunk_grid
    }

    /// Get the chunk key encoding.
    #[must_use]
    pub const fn chunk_key_encoding(&self) -> &ChunkKeyEncoding {
        &self.chunk_key_encoding
    }

    /// Returns the store key of the chunk at `chunk_indices`.
    #[must_use]
    pub fn chunk_key(&self, chunk_indices: &[u64]) -> StoreKey {
        data_key(self.path(), chunk_indices, &self.chunk_key_encoding)
    }

    /// Get the attributes.
    #[must_use]
    pub const fn attributes(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.metadata.attributes
    }

    /// Mutably borrow the array attributes.
    ///
    /// Changes are persisted by the next call to [`store_metadata`](Array::store_metadata).
    #[must_use]
    pub fn attributes_mut(&mut self) -> &mut serde_json::Map<String, serde_json::Value> {
        &mut self.metadata.attributes
    }

    /// Get the array metadata.
    #[must_use]
    pub const fn metadata(&self) -> &ArrayMetadata {
        &self.metadata
    }

    /// Create an array builder matching the parameters of this array.
    #[must_use]
    pub fn builder(&self) -> ArrayBuilder {
        ArrayBuilder::from_array(self)
    }

    /// Return the shape of the chunk grid (i.e., the number of chunks in each dimension).
    #[must_use]
    pub fn chunk_grid_shape(&self) -> ArrayShape {
        self.chunk_grid.grid_shape_unchecked(self.shape())
    }

    /// Return the shape of the chunk at `chunk_indices`.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidChunkGridIndicesError`] if the `chunk_indices` are incompatible with the chunk grid.
    pub fn chunk_shape(&self, chunk_indices: &[u64]) -> Result<ChunkShape, ArrayError> {
        Ok(self.chunk_grid.chunk_shape(chunk_indices, self.shape())?)
    }

    /// Return the origin (the array indices of the first element) of the chunk at `chunk_indices`.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidChunkGridIndicesError`] if the `chunk_indices` are incompatible with the chunk grid.
    pub fn chunk_origin(&self, chunk_indices: &[u64]) -> Result<ArrayIndices, ArrayError> {
        Ok(self.chunk_grid.chunk_origin(chunk_indices, self.shape())?)
    }

    /// Return the array subset of the chunk at `chunk_indices`.
    ///
    /// A chunk on the array boundary may extend beyond the array shape.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidChunkGridIndicesError`] if the `chunk_indices` are incompatible with the chunk grid.
    pub fn chunk_subset(&self, chunk_indices: &[u64]) -> Result<ArraySubset, ArrayError> {
        Ok(self.chunk_grid.subset(chunk_indices, self.shape())?)
    }

    /// Return the array subset of the chunk at `chunk_indices` bounded by the array shape.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidChunkGridIndicesError`] if the `chunk_indices` are incompatible with the chunk grid.
    pub fn chunk_subset_bounded(&self, chunk_indices: &[u64]) -> Result<ArraySubset, ArrayError> {
        Ok(self.chunk_subset(chunk_indices)?.bound(self.shape())?)
    }

    /// Return the size in bytes of the decoded chunk at `chunk_indices`.
    ///
    /// This is independent of whether the chunk exists in the store.
    /// Chunks on the array boundary have the same size as other chunks.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidChunkGridIndicesError`] if the `chunk_indices` are incompatible with the chunk grid.
    pub fn chunk_size_bytes(&self, chunk_indices: &[u64]) -> Result<u64, ArrayError> {
        let chunk_shape = self.chunk_shape(chunk_indices)?;
        Ok(self.chunk_representation(chunk_shape).size())
    }

    /// Return the size in bytes of `array_subset`.
    ///
    /// # Errors
    /// Returns [`ArrayError::IncompatibleDimensionalityError`] if the dimensionality of `array_subset` does not match the array,
    /// or [`ArrayError::SubsetSizeOverflow`] if the size exceeds [`u64::MAX`].
    pub fn array_subset_size_bytes(&self, array_subset: &ArraySubset) -> Result<u64, ArrayError> {
        self.validate_dimensionality(array_subset.dimensionality())?;
        array_subset
            .size_bytes(self.element_size())
            .ok_or_else(|| ArrayError::SubsetSizeOverflow(array_subset.clone()))
    }

    /// Return an array subset of the chunk grid indicating the chunks intersecting `array_subset`.
    ///
    /// The result is empty if `array_subset` is empty.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidArraySubset`] if `array_subset` is not within the bounds of the array.
    pub fn chunks_in_array_subset(
        &self,
        array_subset: &ArraySubset,
    ) -> Result<ArraySubset, ArrayError> {
        let invalid =
            || ArrayError::InvalidArraySubset(array_subset.clone(), self.shape().to_vec());
        if array_subset.dimensionality() != self.dimensionality()
            || !array_subset.inbounds(self.shape())
        {
            return Err(invalid());
        }
        match array_subset.end_inc() {
            Some(end_inc) => {
                let chunks_start = self.chunk_grid.chunk_indices_unchecked(array_subset.start());
                let chunks_end = self.chunk_grid.chunk_indices_unchecked(&end_inc);
                Ok(ArraySubset::new_with_start_end_inc(
                    chunks_start,
                    &chunks_end,
                )?)
            }
            None => Ok(ArraySubset::new_empty(self.dimensionality())),
        }
    }

    /// Release the array handle.
    ///
    /// Only in-memory resources are released, the store is not modified.
    pub fn destroy(self) {
        log::trace!("array {}: released", self.path);
    }

    /// The representation of a decoded chunk with `chunk_shape`.
    ///
    /// Chunk sizes are checked to be addressable when the array is created.
    pub(crate) fn chunk_representation(&self, chunk_shape: ChunkShape) -> ChunkRepresentation {
        ChunkRepresentation::new_unchecked(
            chunk_shape,
            self.data_type.clone(),
            self.fill_value.clone(),
        )
    }

    fn validate_dimensionality(&self, dimensionality: usize) -> Result<(), ArrayError> {
        if dimensionality == self.dimensionality() {
            Ok(())
        } else {
            Err(crate::array_subset::IncompatibleDimensionalityError::new(
                dimensionality,
                self.dimensionality(),
            )
            .into())
        }
    }

    /// Check that a buffer of `length` bytes holds exactly the elements of `array_subset`.
    fn validate_subset_buffer(
        &self,
        array_subset: &ArraySubset,
        length: usize,
    ) -> Result<(), ArrayError> {
        let expected = self.array_subset_size_bytes(array_subset)?;
        if length as u64 == expected {
            Ok(())
        } else {
            Err(ArrayError::InvalidBytesInputSize(length, expected))
        }
    }

    /// The indices of the chunks intersecting `array_subset` in row-major order.
    fn chunks_intersecting(
        &self,
        array_subset: &ArraySubset,
    ) -> Result<IndicesIterator, ArrayError> {
        self.chunk_grid
            .chunks_intersecting(array_subset, self.shape())
            .map_err(|_| {
                ArrayError::InvalidArraySubset(array_subset.clone(), self.shape().to_vec())
            })
    }

    /// The overlap of `array_subset` with the chunk at `chunk_indices`.
    fn chunk_overlap(
        &self,
        array_subset: &ArraySubset,
        chunk_indices: &[u64],
    ) -> Result<ChunkOverlap, ArrayError> {
        self.chunk_grid
            .chunk_local_overlap(array_subset, chunk_indices, self.shape())
            .map_err(|err| match err {
                ChunkOverlapError::InvalidChunkGridIndices(err) => err.into(),
                ChunkOverlapError::IncompatibleDimensionality(err) => err.into(),
            })
    }

    /// Check that `array_subset` is within the bounds of the array.
    fn validate_array_subset(&self, array_subset: &ArraySubset) -> Result<(), ArrayError> {
        if array_subset.dimensionality() == self.dimensionality()
            && array_subset.inbounds(self.shape())
        {
            Ok(())
        } else {
            Err(ArrayError::InvalidArraySubset(
                array_subset.clone(),
                self.shape().to_vec(),
            ))
        }
    }
}

fn validate_element_size<T>(data_type: &DataType) -> Result<(), ArrayError> {
    if data_type.size() == std::mem::size_of::<T>() {
        Ok(())
    } else {
        Err(ArrayError::IncompatibleElementSize(
            data_type.size(),
            std::mem::size_of::<T>(),
        ))
    }
}

/// `size` as a `usize`, or [`ArrayError::BufferTooSmall`] if it exceeds the address space.
/// Convert a size in bytes to a `usize` no larger than the maximum allocation size.
fn addressable(size: u64) -> Result<usize, ArrayError> {
    usize::try_from(size)
        .ok()
        .filter(|&size| isize::try_from(size).is_ok())
        .ok_or(ArrayError::BufferTooSmall(isize::MAX as usize, size))
}

/// Transmute from `Vec<u8>` to `Vec<T>`, avoiding a copy if the allocation is suitably aligned.
#[must_use]
pub fn transmute_from_bytes_vec<T: bytemuck::Pod>(from: Vec<u8>) -> Vec<T> {
    bytemuck::allocation::try_cast_vec(from)
        .unwrap_or_else(|(_err, from)| bytemuck::allocation::pod_collect_to_vec(&from))
}

/// Transmute from `Vec<T>` to `Vec<u8>`, avoiding a copy where possible.
#[must_use]
pub fn transmute_to_bytes_vec<T: bytemuck::NoUninit>(from: Vec<T>) -> Vec<u8> {
    bytemuck::allocation::try_cast_vec(from)
        .unwrap_or_else(|(_err, from)| bytemuck::allocation::pod_collect_to_vec(&from))
}

/// Unravel a linearised index to ND indices.
///
/// Dimensions of length zero produce an index of zero.
#[must_use]
pub fn unravel_index(mut index: u64, shape: &[u64]) -> ArrayIndices {
    let mut indices = vec![0; shape.len()];
    for (indices_i, &dim) in std::iter::zip(indices.iter_mut().rev(), shape.iter().rev()) {
        *indices_i = index.checked_rem(dim).unwrap_or_default();
        index = index.checked_div(dim).unwrap_or_default();
    }
    indices
}

/// Ravel ND indices to a linearised index.
#[must_use]
pub fn ravel_indices(indices: &[u64], shape: &[u64]) -> u64 {
    let mut index: u64 = 0;
    let mut count = 1;
    for (i, s) in std::iter::zip(indices, shape).rev() {
        index += i * count;
        count *= s;
    }
    index
}

#[cfg(feature = "ndarray")]
/// Convert a vector of elements to an [`ndarray::ArrayD`].
///
/// # Errors
/// Returns [`ArrayError::InvalidBytesInputSize`] if the length of `elements` is not equal to the product of the components in `shape`.
pub fn elements_to_ndarray<T>(
    shape: &[u64],
    elements: Vec<T>,
) -> Result<ndarray::ArrayD<T>, ArrayError> {
    let length = elements.len();
    let shape_usize = shape
        .iter()
        .map(|&dim| addressable(dim))
        .collect::<Result<Vec<_>, _>>()?;
    ndarray::ArrayD::<T>::from_shape_vec(shape_usize, elements)
        .map_err(|_| ArrayError::InvalidBytesInputSize(length, shape.iter().product()))
}

#[cfg(test)]
mod tests {
    use crate::{metadata::Metadata, storage::store::MemoryStore};

    use super::*;

    #[test]
    fn array_metadata_write_read() {
        let store = Arc::new(MemoryStore::new());

        let array_path = "/array";
        let array = ArrayBuilder::new(
            vec![8, 8],
            DataType::UInt8,
            vec![4, 4].try_into().unwrap(),
            FillValue::from(0u8),
        )
        .build(store.clone(), array_path)
        .unwrap();
        array.store_metadata().unwrap();

        let array_open = Array::open(store, array_path).unwrap();
        assert_eq!(array_open.metadata(), array.metadata());
        assert_eq!(array_open.chunk_grid_shape(), vec![2, 2]);
    }

    #[test]
    fn array_attributes() {
        let store = Arc::new(MemoryStore::new());
        let mut array = ArrayBuilder::new(
            vec![8, 8],
            DataType::Float32,
            vec![4, 4].try_into().unwrap(),
            FillValue::from(f32::NAN),
        )
        .build(store, "/group/array")
        .unwrap();

        array
            .attributes_mut()
            .insert("test".to_string(), "apple".into());
        assert_eq!(
            array.attributes().get_key_value("test"),
            Some((
                &"test".to_string(),
                &serde_json::Value::String("apple".to_string())
            ))
        );
        assert_eq!(array.metadata().attributes, *array.attributes());
    }

    #[test]
    fn array_introspection() {
        let store = Arc::new(MemoryStore::new());
        let array = ArrayBuilder::new(
            vec![5, 7],
            DataType::Int16,
            vec![2, 3].try_into().unwrap(),
            FillValue::from(-1i16),
        )
        .build(store, "/array")
        .unwrap();
        assert_eq!(array.dimensionality(), 2);
        assert_eq!(array.element_size(), 2);
        assert_eq!(array.chunk_grid_shape(), vec![3, 3]);
        assert_eq!(array.chunk_origin(&[2, 1]).unwrap(), vec![4, 3]);
        assert_eq!(array.chunk_shape(&[2, 2]).unwrap().to_array_shape(), vec![2, 3]);
        assert_eq!(array.chunk_size_bytes(&[2, 2]).unwrap(), 12);
        assert_eq!(
            array.chunk_subset(&[2, 2]).unwrap(),
            ArraySubset::new_with_ranges(&[4..6, 6..9])
        );
        assert_eq!(
            array.chunk_subset_bounded(&[2, 2]).unwrap(),
            ArraySubset::new_with_ranges(&[4..5, 6..7])
        );
        assert_eq!(
            array.chunk_size_bytes(&[3, 0]).unwrap_err().kind(),
            ErrorKind::OutOfRange
        );
        assert_eq!(
            array.chunk_size_bytes(&[0]).unwrap_err().kind(),
            ErrorKind::OutOfRange
        );
        assert_eq!(
            array
                .array_subset_size_bytes(&ArraySubset::new_with_ranges(&[1..3, 0..5]))
                .unwrap(),
            20
        );
        assert_eq!(
            array
                .chunks_in_array_subset(&ArraySubset::new_with_ranges(&[1..4, 2..7]))
                .unwrap(),
            ArraySubset::new_with_ranges(&[0..2, 0..3])
        );
        assert!(array
            .chunks_in_array_subset(&ArraySubset::new_with_ranges(&[1..1, 2..7]))
            .unwrap()
            .is_empty());
        assert_eq!(
            array
                .chunks_in_array_subset(&ArraySubset::new_with_ranges(&[1..6, 2..7]))
                .unwrap_err()
                .kind(),
            ErrorKind::OutOfBounds
        );
        array.destroy();
    }

    #[test]
    fn array_new_with_metadata_invalid() {
        let store = Arc::new(MemoryStore::new());
        let array = ArrayBuilder::new(
            vec![4, 4],
            DataType::Float32,
            vec![2, 2].try_into().unwrap(),
            FillValue::from(0.0f32),
        )
        .build(store.clone(), "/array")
        .unwrap();

        let mut metadata = array.metadata().clone();
        metadata.shape = vec![4];
        assert!(matches!(
            Array::new_with_metadata(store.clone(), "/array", metadata),
            Err(ArrayCreateError::InvalidChunkGridDimensionality(2, 1))
        ));

        let mut metadata = array.metadata().clone();
        metadata.shape = vec![];
        assert!(matches!(
            Array::new_with_metadata(store.clone(), "/array", metadata),
            Err(ArrayCreateError::ZeroDimensionality)
        ));

        let mut metadata = array.metadata().clone();
        metadata.data_type = Metadata::new("complex64");
        assert!(matches!(
            Array::new_with_metadata(store.clone(), "/array", metadata),
            Err(ArrayCreateError::DataTypeCreateError(_))
        ));

        let mut metadata = array.metadata().clone();
        metadata.codecs = vec![Metadata::new("unknown")];
        let err = Array::new_with_metadata(store.clone(), "/array", metadata).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MetadataCorrupt);

        let mut metadata = array.metadata().clone();
        metadata.fill_value = FillValueMetadata::Bool(true);
        let err = Array::new_with_metadata(store.clone(), "/array", metadata).unwrap_err();
        assert!(matches!(err, ArrayCreateError::InvalidFillValueMetadata(_)));

        let metadata = array.metadata().clone();
        assert!(matches!(
            Array::new_with_metadata(store, "array", metadata),
            Err(ArrayCreateError::NodePathError(_))
        ));
    }

    #[test]
    fn array_chunk_size_overflow() {
        let store = Arc::new(MemoryStore::new());
        let err = ArrayBuilder::new(
            vec![u64::MAX],
            DataType::Float64,
            vec![1u64 << 62].try_into().unwrap(),
            FillValue::from(0.0f64),
        )
        .build(store.clone(), "/array")
        .unwrap_err();
        assert!(matches!(err, ArrayCreateError::ChunkSizeOverflow(_, 8)));
        assert_eq!(err.kind(), ErrorKind::MetadataCorrupt);

        let err = ArrayBuilder::new(
            vec![u64::MAX, u64::MAX],
            DataType::UInt8,
            vec![1u64 << 32, 1u64 << 32].try_into().unwrap(),
            FillValue::from(0u8),
        )
        .build(store.clone(), "/array")
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MetadataCorrupt);

        // a huge array with small chunks is fine, but not every subset of it is addressable
        let array = ArrayBuilder::new(
            vec![u64::MAX, u64::MAX],
            DataType::UInt8,
            vec![4, 4].try_into().unwrap(),
            FillValue::from(0u8),
        )
        .build(store, "/array")
        .unwrap();
        let subset = ArraySubset::new_with_shape(vec![u64::MAX, u64::MAX]);
        let err = array.array_subset_size_bytes(&subset).unwrap_err();
        assert!(matches!(err, ArrayError::SubsetSizeOverflow(_)));
        assert_eq!(
            array.retrieve_array_subset(&subset).unwrap_err().kind(),
            ErrorKind::BufferTooSmall
        );
        let subset = ArraySubset::new_with_shape(vec![u64::MAX, 1]);
        assert_eq!(
            array.retrieve_array_subset(&subset).unwrap_err().kind(),
            ErrorKind::BufferTooSmall
        );
    }

    #[test]
    fn array_subset_end_overflow() {
        let store = Arc::new(MemoryStore::new());
        let array = ArrayBuilder::new(
            vec![4],
            DataType::UInt8,
            vec![2].try_into().unwrap(),
            FillValue::from(0u8),
        )
        .build(store, "/array")
        .unwrap();
        let subset = ArraySubset::new_with_start_shape(vec![u64::MAX], vec![2]).unwrap();
        assert_eq!(
            array.retrieve_array_subset(&subset).unwrap_err().kind(),
            ErrorKind::OutOfBounds
        );
        assert_eq!(
            array.par_retrieve_array_subset(&subset).unwrap_err().kind(),
            ErrorKind::OutOfBounds
        );
        assert_eq!(
            array
                .store_array_subset(&subset, vec![1, 2])
                .unwrap_err()
                .kind(),
            ErrorKind::OutOfBounds
        );
        assert_eq!(
            array.chunks_in_array_subset(&subset).unwrap_err().kind(),
            ErrorKind::OutOfBounds
        );
    }

    #[test]
    fn array_ravel_unravel() {
        assert_eq!(ravel_indices(&[1, 2], &[3, 4]), 6);
        assert_eq!(unravel_index(6, &[3, 4]), vec![1, 2]);
        assert_eq!(unravel_index(0, &[0, 4]), vec![0, 0]);
        let shape = [2, 3, 4];
        for index in 0..24 {
            assert_eq!(ravel_indices(&unravel_index(index, &shape), &shape), index);
        }
    }

    #[test]
    fn array_transmute() {
        let elements = vec![1.0f32, -2.0, 3.5];
        let bytes = transmute_to_bytes_vec(elements.clone());
        assert_eq!(bytes.len(), 12);
        assert_eq!(transmute_from_bytes_vec::<f32>(bytes), elements);
    }
}
