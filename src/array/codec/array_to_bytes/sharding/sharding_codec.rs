use std::num::NonZeroU64;

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use rayon_iter_concurrent_limit::iter_concurrent_limit;

use crate::{
    array::{
        codec::{
            ArrayToBytesCodecTraits, BytesToBytesCodecTraits, CodecChain, CodecError, CodecTraits,
        },
        unravel_index, ArrayShape, BytesRepresentation, ChunkRepresentation, ChunkShape, DataType,
        FillValue,
    },
    array_subset::ArraySubset,
    byte_range::{extract_byte_range, ByteRange, InvalidByteRangeError},
    config::global_config,
    metadata::Metadata,
    plugin::PluginCreateError,
};

use super::{
    ShardingCodecConfiguration, ShardingCodecConfigurationV1, ShardingIndexLocation, IDENTIFIER,
    MISSING_SUBCHUNK,
};

/// A `sharding_indexed` codec implementation.
#[derive(Clone, Debug)]
pub struct ShardingCodec {
    /// The shape of the subchunks in a shard.
    subchunk_shape: ChunkShape,
    /// The codecs encoding each subchunk.
    inner_codecs: CodecChain,
    /// The `bytes->bytes` codecs encoding the shard index.
    index_codecs: CodecChain,
    /// Where the shard index is stored.
    index_location: ShardingIndexLocation,
}

impl ShardingCodec {
    /// Create a new `sharding_indexed` codec.
    #[must_use]
    pub fn new(
        subchunk_shape: ChunkShape,
        inner_codecs: CodecChain,
        index_codecs: Vec<Box<dyn BytesToBytesCodecTraits>>,
        index_location: ShardingIndexLocation,
    ) -> Self {
        Self {
            subchunk_shape,
            inner_codecs,
            index_codecs: CodecChain::new(None, index_codecs),
            index_location,
        }
    }

    /// Create a new `sharding_indexed` codec from configuration.
    ///
    /// # Errors
    /// Returns [`PluginCreateError`] if a nested codec cannot be created
    /// or if the index codecs include an `array->bytes` codec.
    pub fn new_with_configuration(
        configuration: &ShardingCodecConfiguration,
    ) -> Result<Self, PluginCreateError> {
        let ShardingCodecConfiguration::V1(configuration) = configuration;
        let inner_codecs = CodecChain::from_metadata(&configuration.codecs)?;
        let index_codecs = CodecChain::from_metadata(&configuration.index_codecs)?;
        if index_codecs.array_to_bytes_codec().is_some() {
            return Err(PluginCreateError::Other(
                "the shard index codecs must be bytes->bytes codecs".to_string(),
            ));
        }
        Ok(Self::new(
            configuration.chunk_shape.clone(),
            inner_codecs,
            index_codecs.bytes_to_bytes_codecs().to_vec(),
            configuration.index_location,
        ))
    }

    /// The shape of the subchunks in a shard.
    #[must_use]
    pub const fn subchunk_shape(&self) -> &ChunkShape {
        &self.subchunk_shape
    }

    /// The codecs encoding each subchunk.
    #[must_use]
    pub const fn inner_codecs(&self) -> &CodecChain {
        &self.inner_codecs
    }

    /// The codecs encoding the shard index.
    #[must_use]
    pub const fn index_codecs(&self) -> &CodecChain {
        &self.index_codecs
    }

    /// Where the shard index is stored.
    #[must_use]
    pub const fn index_location(&self) -> ShardingIndexLocation {
        self.index_location
    }

    /// The number of subchunks along each dimension of a shard of `shard_shape`.
    ///
    /// # Errors
    /// Returns [`CodecError`] if the subchunk shape does not have the dimensionality of
    /// `shard_shape` or does not evenly divide it.
    pub fn subchunks_per_shard(
        &self,
        shard_shape: &[NonZeroU64],
    ) -> Result<ChunkShape, CodecError> {
        if shard_shape.len() != self.subchunk_shape.len() {
            return Err(CodecError::Other(format!(
                "subchunk shape {:?} does not match the dimensionality of shard shape {:?}",
                self.subchunk_shape.to_array_shape(),
                shard_shape
            )));
        }
        std::iter::zip(shard_shape, self.subchunk_shape.iter())
            .map(|(shard, subchunk)| {
                if shard.get() % subchunk.get() == 0 {
                    NonZeroU64::new(shard.get() / subchunk.get())
                } else {
                    None
                }
            })
            .collect::<Option<Vec<_>>>()
            .map(ChunkShape::from)
            .ok_or_else(|| {
                CodecError::Other(format!(
                    "subchunk shape {:?} does not evenly divide shard shape {:?}",
                    self.subchunk_shape.to_array_shape(),
                    shard_shape
                ))
            })
    }

    /// The decoded representation of the index of a shard with `num_subchunks` subchunks.
    fn index_representation(num_subchunks: u64) -> Result<ChunkRepresentation, CodecError> {
        let index_shape = num_subchunks
            .checked_mul(2)
            .and_then(NonZeroU64::new)
            .ok_or_else(|| CodecError::Other("a shard must have at least one subchunk".into()))?;
        Ok(ChunkRepresentation::new_unchecked(
            vec![index_shape].into(),
            DataType::UInt64,
            FillValue::from(MISSING_SUBCHUNK),
        ))
    }

    /// The size in bytes of the encoded index of a shard with `num_subchunks` subchunks.
    ///
    /// # Errors
    /// Returns [`CodecError`] if the index codecs do not produce a fixed size output.
    pub fn index_encoded_size(&self, num_subchunks: u64) -> Result<u64, CodecError> {
        match self
            .index_codecs
            .compute_encoded_size(&Self::index_representation(num_subchunks)?)?
        {
            BytesRepresentation::FixedSize(size) => Ok(size),
            bytes_representation => Err(CodecError::Other(format!(
                "the shard index codecs must have a fixed size output, not {bytes_representation}"
            ))),
        }
    }

    /// The byte range of the encoded index within a shard of `shard_shape`.
    ///
    /// # Errors
    /// Returns [`CodecError`] if `shard_shape` is incompatible with the subchunk shape
    /// or the index does not have a fixed encoded size.
    pub fn index_byte_range(&self, shard_shape: &[NonZeroU64]) -> Result<ByteRange, CodecError> {
        let num_subchunks = self
            .subchunks_per_shard(shard_shape)?
            .num_elements_checked()
            .ok_or_else(|| CodecError::Other("too many subchunks in a shard".to_string()))?;
        let index_size = self.index_encoded_size(num_subchunks)?;
        Ok(match self.index_location {
            ShardingIndexLocation::Start => ByteRange::FromStart(0, Some(index_size)),
            ShardingIndexLocation::End => ByteRange::FromEnd(0, Some(index_size)),
        })
    }

    /// Decode a shard index of `num_subchunks` subchunks into its `(offset, nbytes)` pairs.
    ///
    /// # Errors
    /// Returns [`CodecError`] if an index codec fails.
    pub fn decode_index(
        &self,
        encoded_index: Vec<u8>,
        num_subchunks: u64,
    ) -> Result<Vec<u64>, CodecError> {
        let index_representation = Self::index_representation(num_subchunks)?;
        let decoded_index = self
            .index_codecs
            .decode(encoded_index, &index_representation)?;
        Ok(decoded_index
            .chunks_exact(std::mem::size_of::<u64>())
            .map(|entry| u64::from_le(bytemuck::pod_read_unaligned(entry)))
            .collect())
    }

    fn encode_index(&self, shard_index: &[u64]) -> Result<Vec<u8>, CodecError> {
        let index_representation = Self::index_representation(shard_index.len() as u64 / 2)?;
        let decoded_index = shard_index
            .iter()
            .flat_map(|entry| entry.to_le_bytes())
            .collect();
        self.index_codecs.encode(decoded_index, &index_representation)
    }

    /// The byte range of subchunk `subchunk_index` within a shard of `shard_size` bytes,
    /// or [`None`] if the subchunk is not stored.
    ///
    /// # Errors
    /// Returns [`CodecError`] if `subchunk_index` is not in `shard_index`
    /// or the entry refers to bytes beyond the end of the shard.
    pub fn subchunk_byte_range(
        shard_index: &[u64],
        subchunk_index: usize,
        shard_size: u64,
    ) -> Result<Option<ByteRange>, CodecError> {
        let entry = shard_index
            .chunks_exact(2)
            .nth(subchunk_index)
            .ok_or_else(|| {
                CodecError::Other(format!("subchunk {subchunk_index} is not in the shard index"))
            })?;
        let (offset, nbytes) = (entry[0], entry[1]);
        if offset == MISSING_SUBCHUNK && nbytes == MISSING_SUBCHUNK {
            return Ok(None);
        }
        let byte_range = ByteRange::FromStart(offset, Some(nbytes));
        if byte_range.is_within(shard_size) {
            Ok(Some(byte_range))
        } else {
            Err(InvalidByteRangeError::new(byte_range, shard_size).into())
        }
    }

    /// The decoded representation of each subchunk of a shard of `shard_representation`.
    #[must_use]
    pub fn subchunk_representation(
        &self,
        shard_representation: &ChunkRepresentation,
    ) -> ChunkRepresentation {
        shard_representation.with_shape(self.subchunk_shape.clone())
    }

    /// Decode an encoded subchunk with the inner codecs.
    ///
    /// # Errors
    /// Returns [`CodecError`] if an inner codec fails.
    pub fn decode_subchunk(
        &self,
        encoded_subchunk: Vec<u8>,
        subchunk_representation: &ChunkRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        self.inner_codecs
            .decode(encoded_subchunk, subchunk_representation)
    }

    /// The subset of the shard covered by subchunk `subchunk_index`.
    fn subchunk_subset(
        &self,
        subchunk_index: u64,
        subchunks_per_shard: &[u64],
    ) -> Result<ArraySubset, CodecError> {
        let subchunk_shape = self.subchunk_shape.to_array_shape();
        let start = std::iter::zip(
            unravel_index(subchunk_index, subchunks_per_shard),
            &subchunk_shape,
        )
        .map(|(index, size)| index * size)
        .collect();
        ArraySubset::new_with_start_shape(start, subchunk_shape)
            .map_err(|err| CodecError::Other(err.to_string()))
    }

    fn num_subchunks_usize(subchunks_per_shard: &ArrayShape) -> Result<usize, CodecError> {
        usize::try_from(subchunks_per_shard.iter().product::<u64>())
            .map_err(|_| CodecError::Other("too many subchunks in a shard".to_string()))
    }
}

impl CodecTraits for ShardingCodec {
    fn create_metadata(&self) -> Option<Metadata> {
        let configuration = ShardingCodecConfigurationV1 {
            chunk_shape: self.subchunk_shape.clone(),
            codecs: self.inner_codecs.create_metadatas(),
            index_codecs: self.index_codecs.create_metadatas(),
            index_location: self.index_location,
        };
        Metadata::new_with_serializable_configuration(IDENTIFIER, &configuration).ok()
    }
}

impl ArrayToBytesCodecTraits for ShardingCodec {
    fn encode(
        &self,
        decoded_value: Vec<u8>,
        shard_representation: &ChunkRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        if decoded_value.len() as u64 != shard_representation.size() {
            return Err(CodecError::UnexpectedChunkDecodedSize(
                decoded_value.len(),
                shard_representation.size(),
            ));
        }
        let shard_shape = shard_representation.shape_u64();
        let subchunks_per_shard = self
            .subchunks_per_shard(shard_representation.shape())?
            .to_array_shape();
        let num_subchunks = Self::num_subchunks_usize(&subchunks_per_shard)?;
        let index_size = usize::try_from(self.index_encoded_size(num_subchunks as u64)?)
            .map_err(|_| CodecError::Other("the shard index is too large".to_string()))?;
        let subchunk_representation = self.subchunk_representation(shard_representation);
        let element_size = shard_representation.element_size();

        // Encode the subchunks, skipping those holding only the fill value
        let concurrent_limit = global_config().chunk_concurrent_limit().max(1);
        let encoded_subchunks = iter_concurrent_limit!(
            concurrent_limit,
            (0..num_subchunks),
            map,
            |subchunk_index: usize| -> Result<Option<Vec<u8>>, CodecError> {
                let subchunk_bytes = self
                    .subchunk_subset(subchunk_index as u64, &subchunks_per_shard)?
                    .extract_bytes(&decoded_value, &shard_shape, element_size)
                    .map_err(|err| CodecError::Other(err.to_string()))?;
                if shard_representation
                    .fill_value()
                    .equals_all(&subchunk_bytes)
                {
                    Ok(None)
                } else {
                    self.inner_codecs
                        .encode(subchunk_bytes, &subchunk_representation)
                        .map(Some)
                }
            }
        )
        .collect::<Result<Vec<_>, CodecError>>()?;

        // Concatenate the subchunks and record their location in the index
        let encoded_subchunks_size: usize = encoded_subchunks.iter().flatten().map(Vec::len).sum();
        let mut shard = Vec::with_capacity(encoded_subchunks_size + index_size);
        if self.index_location == ShardingIndexLocation::Start {
            shard.resize(index_size, 0);
        }
        let mut shard_index = vec![MISSING_SUBCHUNK; num_subchunks * 2];
        for (subchunk_index, encoded_subchunk) in encoded_subchunks.into_iter().enumerate() {
            if let Some(encoded_subchunk) = encoded_subchunk {
                shard_index[subchunk_index * 2] = shard.len() as u64;
                shard_index[subchunk_index * 2 + 1] = encoded_subchunk.len() as u64;
                shard.extend_from_slice(&encoded_subchunk);
            }
        }

        let encoded_index = self.encode_index(&shard_index)?;
        if encoded_index.len() != index_size {
            return Err(CodecError::Other(format!(
                "the shard index encoded to {} bytes, expected {index_size}",
                encoded_index.len()
            )));
        }
        match self.index_location {
            ShardingIndexLocation::Start => shard[..index_size].copy_from_slice(&encoded_index),
            ShardingIndexLocation::End => shard.extend_from_slice(&encoded_index),
        }
        Ok(shard)
    }

    fn decode(
        &self,
        encoded_shard: Vec<u8>,
        shard_representation: &ChunkRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        let shard_shape = shard_representation.shape_u64();
        let subchunks_per_shard = self
            .subchunks_per_shard(shard_representation.shape())?
            .to_array_shape();
        let num_subchunks = Self::num_subchunks_usize(&subchunks_per_shard)?;
        let shard_size = encoded_shard.len() as u64;
        let index_byte_range = self.index_byte_range(shard_representation.shape())?;
        let encoded_index = extract_byte_range(&encoded_shard, &index_byte_range)?.to_vec();
        let shard_index = self.decode_index(encoded_index, num_subchunks as u64)?;
        let subchunk_representation = self.subchunk_representation(shard_representation);

        let concurrent_limit = global_config().chunk_concurrent_limit().max(1);
        let decoded_subchunks = iter_concurrent_limit!(
            concurrent_limit,
            (0..num_subchunks),
            map,
            |subchunk_index: usize| -> Result<Option<Vec<u8>>, CodecError> {
                match Self::subchunk_byte_range(&shard_index, subchunk_index, shard_size)? {
                    Some(byte_range) => {
                        let encoded_subchunk =
                            extract_byte_range(&encoded_shard, &byte_range)?.to_vec();
                        self.decode_subchunk(encoded_subchunk, &subchunk_representation)
                            .map(Some)
                    }
                    None => Ok(None),
                }
            }
        )
        .collect::<Result<Vec<_>, CodecError>>()?;

        let num_elements = usize::try_from(shard_representation.num_elements())
            .map_err(|_| CodecError::Other("the shard is too large".to_string()))?;
        let mut decoded_shard = shard_representation.fill_value().repeat(num_elements);
        for (subchunk_index, decoded_subchunk) in decoded_subchunks.into_iter().enumerate() {
            if let Some(decoded_subchunk) = decoded_subchunk {
                self.subchunk_subset(subchunk_index as u64, &subchunks_per_shard)?
                    .store_bytes(
                        &decoded_subchunk,
                        &mut decoded_shard,
                        &shard_shape,
                        shard_representation.element_size(),
                    )
                    .map_err(|err| CodecError::Other(err.to_string()))?;
            }
        }
        Ok(decoded_shard)
    }

    fn compute_encoded_size(
        &self,
        shard_representation: &ChunkRepresentation,
    ) -> Result<BytesRepresentation, CodecError> {
        let num_subchunks = self
            .subchunks_per_shard(shard_representation.shape())?
            .num_elements_checked()
            .ok_or_else(|| CodecError::Other("too many subchunks in a shard".to_string()))?;
        let index_size = self.index_encoded_size(num_subchunks)?;
        let subchunk_size = self
            .inner_codecs
            .compute_encoded_size(&self.subchunk_representation(shard_representation))?;
        Ok(subchunk_size.size().map_or(
            BytesRepresentation::UnboundedSize,
            |subchunk_size| {
                BytesRepresentation::BoundedSize(
                    subchunk_size
                        .saturating_mul(num_subchunks)
                        .saturating_add(index_size),
                )
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::array::codec::{try_create_codec, Codec};

    use super::*;

    fn shard_representation() -> ChunkRepresentation {
        ChunkRepresentation::new(
            vec![4, 4].try_into().unwrap(),
            DataType::UInt16,
            FillValue::from(0u16),
        )
        .unwrap()
    }

    // The top left subchunk holds only the fill value
    fn shard_elements() -> Vec<u8> {
        let elements: Vec<u16> = (0..16u16)
            .map(|i| if i / 4 < 2 && i % 4 < 2 { 0 } else { i })
            .collect();
        crate::array::transmute_to_bytes_vec(elements)
    }

    fn sharding_codec(index_location: ShardingIndexLocation) -> ShardingCodec {
        ShardingCodec::new(
            vec![2, 2].try_into().unwrap(),
            CodecChain::default(),
            vec![],
            index_location,
        )
    }

    #[test]
    fn codec_sharding_round_trip() {
        for index_location in [ShardingIndexLocation::Start, ShardingIndexLocation::End] {
            let codec = sharding_codec(index_location);
            let representation = shard_representation();
            let encoded = codec.encode(shard_elements(), &representation).unwrap();
            // 3 stored subchunks of 8 bytes plus 4 index entries of 16 bytes
            assert_eq!(encoded.len(), 3 * 8 + 4 * 16);

            let index_byte_range = codec.index_byte_range(representation.shape()).unwrap();
            let encoded_index = extract_byte_range(&encoded, &index_byte_range).unwrap();
            let shard_index = codec.decode_index(encoded_index.to_vec(), 4).unwrap();
            assert_eq!(&shard_index[..2], &[MISSING_SUBCHUNK, MISSING_SUBCHUNK]);
            let offset = match index_location {
                ShardingIndexLocation::Start => 64,
                ShardingIndexLocation::End => 0,
            };
            assert_eq!(&shard_index[2..4], &[offset, 8]);

            let decoded = codec.decode(encoded, &representation).unwrap();
            assert_eq!(decoded, shard_elements());
        }
    }

    #[test]
    fn codec_sharding_fill_value_shard() {
        let codec = sharding_codec(ShardingIndexLocation::End);
        let representation = shard_representation();
        let encoded = codec.encode(vec![0; 32], &representation).unwrap();
        assert_eq!(encoded.len(), 4 * 16);
        assert_eq!(codec.decode(encoded, &representation).unwrap(), vec![0; 32]);
    }

    #[test]
    fn codec_sharding_subchunk_shape_must_divide_shard() {
        let codec = ShardingCodec::new(
            vec![3, 2].try_into().unwrap(),
            CodecChain::default(),
            vec![],
            ShardingIndexLocation::End,
        );
        let representation = shard_representation();
        assert!(codec.compute_encoded_size(&representation).is_err());
        assert!(codec.encode(shard_elements(), &representation).is_err());

        let codec = ShardingCodec::new(
            vec![2].try_into().unwrap(),
            CodecChain::default(),
            vec![],
            ShardingIndexLocation::End,
        );
        assert!(codec.compute_encoded_size(&representation).is_err());
    }

    #[test]
    fn codec_sharding_corrupt_index() {
        let codec = sharding_codec(ShardingIndexLocation::End);
        let representation = shard_representation();
        let mut encoded = codec.encode(shard_elements(), &representation).unwrap();
        // point the second subchunk beyond the end of the shard
        let entry = encoded.len() - 4 * 16 + 16;
        encoded[entry..entry + 8].copy_from_slice(&1000u64.to_le_bytes());
        assert!(matches!(
            codec.decode(encoded.clone(), &representation),
            Err(CodecError::InvalidByteRangeError(_))
        ));

        encoded.truncate(10);
        assert!(codec.decode(encoded, &representation).is_err());
    }

    #[cfg(feature = "crc32c")]
    #[test]
    fn codec_sharding_index_checksum() {
        let codec = ShardingCodec::new(
            vec![2, 2].try_into().unwrap(),
            CodecChain::default(),
            vec![Box::new(crate::array::codec::Crc32cCodec::new())],
            ShardingIndexLocation::Start,
        );
        let representation = shard_representation();
        assert_eq!(codec.index_encoded_size(4).unwrap(), 4 * 16 + 4);
        let mut encoded = codec.encode(shard_elements(), &representation).unwrap();
        assert_eq!(
            codec.decode(encoded.clone(), &representation).unwrap(),
            shard_elements()
        );
        encoded[0] ^= 1;
        assert!(codec.decode(encoded, &representation).is_err());
    }

    #[cfg(feature = "gzip")]
    #[test]
    fn codec_sharding_compressed_subchunks() {
        const JSON: &str = r#"{
            "name": "sharding_indexed",
            "configuration": {
                "chunk_shape": [2, 2],
                "codecs": [{ "name": "gzip", "configuration": { "level": 5 } }],
                "index_codecs": []
            }
        }"#;
        let metadata: Metadata = serde_json::from_str(JSON).unwrap();
        let Codec::ArrayToBytes(codec) = try_create_codec(&metadata).unwrap() else {
            panic!("sharding_indexed is an array->bytes codec")
        };
        let representation = shard_representation();
        assert!(matches!(
            codec.compute_encoded_size(&representation).unwrap(),
            BytesRepresentation::BoundedSize(_)
        ));
        let encoded = codec.encode(shard_elements(), &representation).unwrap();
        assert_eq!(codec.decode(encoded, &representation).unwrap(), shard_elements());
    }

    #[cfg(feature = "gzip")]
    #[test]
    fn codec_sharding_index_must_have_fixed_size() {
        const JSON: &str = r#"{
            "name": "sharding_indexed",
            "configuration": {
                "chunk_shape": [2, 2],
                "codecs": [],
                "index_codecs": [{ "name": "gzip", "configuration": { "level": 1 } }]
            }
        }"#;
        let metadata: Metadata = serde_json::from_str(JSON).unwrap();
        let Codec::ArrayToBytes(codec) = try_create_codec(&metadata).unwrap() else {
            panic!("sharding_indexed is an array->bytes codec")
        };
        assert!(codec.compute_encoded_size(&shard_representation()).is_err());
    }

    #[test]
    fn codec_sharding_nested_array_to_bytes_must_be_first() {
        const JSON: &str = r#"{
            "name": "sharding_indexed",
            "configuration": {
                "chunk_shape": [2, 2],
                "codecs": [],
                "index_codecs": [{
                    "name": "sharding_indexed",
                    "configuration": { "chunk_shape": [1], "codecs": [], "index_codecs": [] }
                }]
            }
        }"#;
        let metadata: Metadata = serde_json::from_str(JSON).unwrap();
        assert!(try_create_codec(&metadata).is_err());
    }

    #[test]
    fn codec_sharding_metadata() {
        let codec = ShardingCodec::new(
            vec![2, 2].try_into().unwrap(),
            CodecChain::default(),
            vec![],
            ShardingIndexLocation::Start,
        );
        let metadata = codec.create_metadata().unwrap();
        assert_eq!(metadata.name(), IDENTIFIER);
        let Codec::ArrayToBytes(recreated) = try_create_codec(&metadata).unwrap() else {
            panic!("sharding_indexed is an array->bytes codec")
        };
        assert_eq!(recreated.create_metadata().unwrap(), metadata);
    }
}
