//! A sequence of codecs applied to each chunk.

use crate::{
    array::{
        codec::{
            try_create_codec, ArrayToBytesCodecTraits, BytesToBytesCodecTraits, Codec, CodecError,
            CodecTraits,
        },
        BytesRepresentation, ChunkRepresentation,
    },
    metadata::Metadata,
    plugin::PluginCreateError,
};

/// A codec chain is an optional `array->bytes` codec followed by a sequence of `bytes->bytes` codecs.
///
/// Chunks are encoded by each codec in order and decoded by each codec in reverse order.
/// Without an `array->bytes` codec the elements of a chunk enter the chain as their native endian bytes,
/// so an empty codec chain stores chunks as their raw bytes.
#[derive(Debug, Clone, Default)]
pub struct CodecChain {
    array_to_bytes: Option<Box<dyn ArrayToBytesCodecTraits>>,
    bytes_to_bytes: Vec<Box<dyn BytesToBytesCodecTraits>>,
}

impl CodecChain {
    /// Create a new codec chain.
    #[must_use]
    pub fn new(
        array_to_bytes: Option<Box<dyn ArrayToBytesCodecTraits>>,
        bytes_to_bytes: Vec<Box<dyn BytesToBytesCodecTraits>>,
    ) -> Self {
        Self {
            array_to_bytes,
            bytes_to_bytes,
        }
    }

    /// Create a new codec chain from a list of metadata.
    ///
    /// # Errors
    /// Returns a [`PluginCreateError`] if a codec could not be created,
    /// or if an `array->bytes` codec is not the first codec.
    pub fn from_metadata(metadatas: &[Metadata]) -> Result<Self, PluginCreateError> {
        let mut array_to_bytes = None;
        let mut bytes_to_bytes = Vec::with_capacity(metadatas.len());
        for (index, metadata) in metadatas.iter().enumerate() {
            match try_create_codec(metadata)? {
                Codec::ArrayToBytes(codec) if index == 0 => array_to_bytes = Some(codec),
                Codec::ArrayToBytes(_) => {
                    return Err(PluginCreateError::Other(format!(
                        "array->bytes codec {} must be the first codec",
                        metadata.name()
                    )));
                }
                Codec::BytesToBytes(codec) => bytes_to_bytes.push(codec),
            }
        }
        Ok(Self::new(array_to_bytes, bytes_to_bytes))
    }

    /// Create codec chain metadata.
    #[must_use]
    pub fn create_metadatas(&self) -> Vec<Metadata> {
        self.array_to_bytes
            .iter()
            .filter_map(|codec| codec.create_metadata())
            .chain(
                self.bytes_to_bytes
                    .iter()
                    .filter_map(|codec| codec.create_metadata()),
            )
            .collect()
    }

    /// Returns the `array->bytes` codec, if any.
    #[must_use]
    pub fn array_to_bytes_codec(&self) -> Option<&(dyn ArrayToBytesCodecTraits + 'static)> {
        self.array_to_bytes.as_deref()
    }

    /// Returns the `bytes->bytes` codecs in encoding order.
    #[must_use]
    pub fn bytes_to_bytes_codecs(&self) -> &[Box<dyn BytesToBytesCodecTraits>] {
        &self.bytes_to_bytes
    }

    /// Returns the number of codecs in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        usize::from(self.array_to_bytes.is_some()) + self.bytes_to_bytes.len()
    }

    /// Returns true if the chain has no codecs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The representation of the bytes leaving the `array->bytes` stage.
    fn array_to_bytes_representation(
        &self,
        decoded_representation: &ChunkRepresentation,
    ) -> Result<BytesRepresentation, CodecError> {
        match &self.array_to_bytes {
            Some(codec) => codec.compute_encoded_size(decoded_representation),
            None => Ok(BytesRepresentation::FixedSize(decoded_representation.size())),
        }
    }

    /// The decoded representation at the input of each `bytes->bytes` codec, followed by the final encoded representation.
    fn get_bytes_representations(
        &self,
        decoded_representation: BytesRepresentation,
    ) -> Vec<BytesRepresentation> {
        let mut bytes_representations = Vec::with_capacity(self.bytes_to_bytes.len() + 1);
        let mut bytes_representation = decoded_representation;
        bytes_representations.push(bytes_representation);
        for codec in &self.bytes_to_bytes {
            bytes_representation = codec.compute_encoded_size(&bytes_representation);
            bytes_representations.push(bytes_representation);
        }
        bytes_representations
    }

    /// Encode a chunk with each codec in order.
    ///
    /// # Errors
    /// Returns [`CodecError::UnexpectedChunkDecodedSize`] if `decoded_value` is not the size of `decoded_representation`,
    /// or an error if a codec fails.
    pub fn encode(
        &self,
        decoded_value: Vec<u8>,
        decoded_representation: &ChunkRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        let decoded_size = BytesRepresentation::FixedSize(decoded_representation.size());
        validate_size(&decoded_value, &decoded_size)?;
        let mut value = match &self.array_to_bytes {
            Some(codec) => codec.encode(decoded_value, decoded_representation)?,
            None => decoded_value,
        };
        for codec in &self.bytes_to_bytes {
            value = codec.encode(value)?;
        }
        Ok(value)
    }

    /// Decode a chunk with each codec in reverse order.
    ///
    /// # Errors
    /// Returns [`CodecError::UnexpectedChunkDecodedSize`] if the decoded bytes are not the size of `decoded_representation`,
    /// or an error if a codec fails.
    pub fn decode(
        &self,
        encoded_value: Vec<u8>,
        decoded_representation: &ChunkRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        let value = self.decode_bytes_to_bytes(encoded_value, decoded_representation)?;
        let value = match &self.array_to_bytes {
            Some(codec) => codec.decode(value, decoded_representation)?,
            None => value,
        };
        validate_size(
            &value,
            &BytesRepresentation::FixedSize(decoded_representation.size()),
        )?;
        Ok(value)
    }

    /// Decode a chunk with the `bytes->bytes` codecs only, in reverse order.
    ///
    /// The result is the input of the `array->bytes` decoder.
    ///
    /// # Errors
    /// Returns an error if a codec fails.
    pub fn decode_bytes_to_bytes(
        &self,
        encoded_value: Vec<u8>,
        decoded_representation: &ChunkRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        let bytes_representations = self.get_bytes_representations(
            self.array_to_bytes_representation(decoded_representation)?,
        );
        let mut value = encoded_value;
        for (codec, bytes_representation) in std::iter::zip(
            self.bytes_to_bytes.iter().rev(),
            bytes_representations.iter().rev().skip(1),
        ) {
            value = codec.decode(value, bytes_representation)?;
        }
        Ok(value)
    }

    /// Returns the size of the encoded representation of a chunk of `decoded_representation`.
    ///
    /// # Errors
    /// Returns [`CodecError`] if the `array->bytes` codec cannot encode a chunk of `decoded_representation`.
    pub fn compute_encoded_size(
        &self,
        decoded_representation: &ChunkRepresentation,
    ) -> Result<BytesRepresentation, CodecError> {
        let bytes_representation = self.array_to_bytes_representation(decoded_representation)?;
        Ok(self
            .bytes_to_bytes
            .iter()
            .fold(bytes_representation, |bytes_representation, codec| {
                codec.compute_encoded_size(&bytes_representation)
            }))
    }
}

fn validate_size(
    value: &[u8],
    decoded_representation: &BytesRepresentation,
) -> Result<(), CodecError> {
    match decoded_representation {
        BytesRepresentation::FixedSize(size) if value.len() as u64 != *size => Err(
            CodecError::UnexpectedChunkDecodedSize(value.len(), *size),
        ),
        _ => Ok(()),
    }
}
