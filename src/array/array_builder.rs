use std::sync::Arc;

use crate::metadata::AdditionalFields;

use super::{
    chunk_key_encoding::{ChunkKeyEncoding, DefaultChunkKeyEncoding},
    codec::{ArrayToBytesCodecTraits, BytesToBytesCodecTraits},
    Array, ArrayCreateError, ArrayMetadata, ArrayShape, ChunkGrid, ChunkKeySeparator, CodecChain,
    DataType, FillValue,
};

/// Configures a new [`Array`].
///
/// A builder starts from the four properties every array needs: shape, data type, chunk grid and fill value.
/// It has no codecs, so chunks are stored as raw native endian bytes, and it uses the `default` chunk key encoding with `/` separators.
/// An `array->bytes` codec such as [`ShardingCodec`](crate::array::codec::ShardingCodec) can be set with [`ArrayBuilder::array_to_bytes_codec`].
///
/// [`ArrayBuilder::build`] only creates the array handle.
/// Nothing is written until [`Array::store_metadata`] or a chunk write.
///
/// ```rust
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// # use std::sync::Arc;
/// use chunkarray::array::{ArrayBuilder, DataType, FillValue};
/// # let store = Arc::new(chunkarray::storage::store::MemoryStore::new());
/// let array = ArrayBuilder::new(
///     vec![8, 8],
///     DataType::Float32,
///     vec![4, 4].try_into()?, // every chunk extent must be non-zero
///     FillValue::from(f32::NAN),
/// )
/// .bytes_to_bytes_codecs(vec![
///     #[cfg(feature = "gzip")]
///     Box::new(chunkarray::array::codec::GzipCodec::new(5)?),
/// ])
/// .build(store.clone(), "/group/array")?;
/// array.store_metadata()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ArrayBuilder {
    shape: ArrayShape,
    data_type: DataType,
    chunk_grid: ChunkGrid,
    chunk_key_encoding: ChunkKeyEncoding,
    fill_value: FillValue,
    array_to_bytes_codec: Option<Box<dyn ArrayToBytesCodecTraits>>,
    bytes_to_bytes_codecs: Vec<Box<dyn BytesToBytesCodecTraits>>,
    attributes: serde_json::Map<String, serde_json::Value>,
    additional_fields: AdditionalFields,
}

macro_rules! builder_setters {
    ($($(#[$doc:meta])* $field:ident: $ty:ty,)*) => {
        $(
            $(#[$doc])*
            pub fn $field(&mut self, $field: $ty) -> &mut Self {
                self.$field = $field;
                self
            }
        )*
    };
}

impl ArrayBuilder {
    /// Create a builder for an array of `shape` and `data_type`, split by `chunk_grid`, where unwritten elements read as `fill_value`.
    #[must_use]
    pub fn new(
        shape: ArrayShape,
        data_type: DataType,
        chunk_grid: ChunkGrid,
        fill_value: FillValue,
    ) -> Self {
        Self {
            shape,
            data_type,
            chunk_grid,
            chunk_key_encoding: DefaultChunkKeyEncoding::default().into(),
            fill_value,
            array_to_bytes_codec: None,
            bytes_to_bytes_codecs: vec![],
            attributes: serde_json::Map::new(),
            additional_fields: AdditionalFields::default(),
        }
    }

    /// Create a builder with the configuration of `array`.
    #[must_use]
    pub fn from_array<T: ?Sized>(array: &Array<T>) -> Self {
        let metadata = array.metadata();
        Self {
            shape: metadata.shape.clone(),
            data_type: array.data_type().clone(),
            chunk_grid: array.chunk_grid().clone(),
            chunk_key_encoding: array.chunk_key_encoding().clone(),
            fill_value: array.fill_value().clone(),
            array_to_bytes_codec: array
                .codecs()
                .array_to_bytes_codec()
                .map(dyn_clone::clone_box),
            bytes_to_bytes_codecs: array.codecs().bytes_to_bytes_codecs().to_vec(),
            attributes: metadata.attributes.clone(),
            additional_fields: metadata.additional_fields.clone(),
        }
    }

    builder_setters! {
        /// Set the shape.
        shape: ArrayShape,
        /// Set the data type.
        data_type: DataType,
        /// Set the chunk grid.
        chunk_grid: ChunkGrid,
        /// Set the fill value.
        fill_value: FillValue,
        /// Set the chunk key encoding.
        chunk_key_encoding: ChunkKeyEncoding,
        /// Set the `bytes->bytes` codecs, in the order they are applied on encode.
        bytes_to_bytes_codecs: Vec<Box<dyn BytesToBytesCodecTraits>>,
        /// Set the user attributes.
        attributes: serde_json::Map<String, serde_json::Value>,
        /// Set extra top level metadata fields.
        ///
        /// Each must be an object with `"must_understand": false`, or the metadata will not open.
        /// User data belongs in [`ArrayBuilder::attributes`].
        additional_fields: AdditionalFields,
    }

    /// Set the `array->bytes` codec, applied to chunk elements before the `bytes->bytes` codecs.
    pub fn array_to_bytes_codec(
        &mut self,
        array_to_bytes_codec: Box<dyn ArrayToBytesCodecTraits>,
    ) -> &mut Self {
        self.array_to_bytes_codec = Some(array_to_bytes_codec);
        self
    }

    /// Use the `default` chunk key encoding with `separator`.
    pub fn chunk_key_encoding_default_separator(
        &mut self,
        separator: ChunkKeySeparator,
    ) -> &mut Self {
        self.chunk_key_encoding = DefaultChunkKeyEncoding::new(separator).into();
        self
    }

    /// Returns the metadata document the array would store.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if the array has no dimensions, the chunk grid dimensionality differs from the shape, or the fill value does not suit the data type.
    pub fn build_metadata(&self) -> Result<ArrayMetadata, ArrayCreateError> {
        if self.shape.is_empty() {
            return Err(ArrayCreateError::ZeroDimensionality);
        }
        if self.chunk_grid.dimensionality() != self.shape.len() {
            return Err(ArrayCreateError::InvalidChunkGridDimensionality(
                self.chunk_grid.dimensionality(),
                self.shape.len(),
            ));
        }
        let codec_chain = CodecChain::new(
            self.array_to_bytes_codec.clone(),
            self.bytes_to_bytes_codecs.clone(),
        );
        Ok(ArrayMetadata::new(
            self.shape.clone(),
            self.data_type.metadata(),
            self.chunk_grid.create_metadata(),
            self.chunk_key_encoding.create_metadata(),
            self.data_type.metadata_fill_value(&self.fill_value)?,
            codec_chain.create_metadatas(),
            self.attributes.clone(),
        )
        .with_additional_fields(self.additional_fields.clone()))
    }

    /// Create the [`Array`] at `path` of `storage`.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if `path` is not a valid node path or the configuration is invalid.
    pub fn build<TStorage: ?Sized>(
        &self,
        storage: Arc<TStorage>,
        path: &str,
    ) -> Result<Array<TStorage>, ArrayCreateError> {
        Array::new_with_metadata(storage, path, self.build_metadata()?)
    }
}
