use std::io::{Read, Write};

use flate2::{read::GzDecoder, write::GzEncoder, Compression};

use crate::{
    array::{
        codec::{BytesToBytesCodecTraits, CodecError, CodecTraits},
        BytesRepresentation,
    },
    metadata::Metadata,
};

use super::{
    GzipCodecConfiguration, GzipCodecConfigurationV1, GzipCompressionLevel,
    GzipCompressionLevelError, IDENTIFIER,
};

/// A `gzip` codec implementation.
#[derive(Clone, Debug)]
pub struct GzipCodec {
    compression_level: GzipCompressionLevel,
}

impl GzipCodec {
    /// Create a new `gzip` codec.
    ///
    /// # Errors
    /// Returns [`GzipCompressionLevelError`] if `compression_level` is not valid.
    pub fn new(compression_level: u32) -> Result<Self, GzipCompressionLevelError> {
        Ok(Self {
            compression_level: compression_level.try_into()?,
        })
    }

    /// Create a new `gzip` codec from configuration.
    #[must_use]
    pub const fn new_with_configuration(configuration: &GzipCodecConfiguration) -> Self {
        let GzipCodecConfiguration::V1(GzipCodecConfigurationV1 { level }) = configuration;
        Self {
            compression_level: *level,
        }
    }
}

impl CodecTraits for GzipCodec {
    fn create_metadata(&self) -> Option<Metadata> {
        let configuration = GzipCodecConfigurationV1 {
            level: self.compression_level,
        };
        Metadata::new_with_serializable_configuration(IDENTIFIER, &configuration).ok()
    }
}

impl BytesToBytesCodecTraits for GzipCodec {
    fn encode(&self, decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let capacity = self
            .compute_encoded_size(&BytesRepresentation::FixedSize(decoded_value.len() as u64))
            .capacity();
        let mut encoder = GzEncoder::new(
            Vec::with_capacity(capacity),
            Compression::new(self.compression_level.as_u32()),
        );
        encoder.write_all(&decoded_value)?;
        Ok(encoder.finish()?)
    }

    fn decode(
        &self,
        encoded_value: Vec<u8>,
        decoded_representation: &BytesRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        let mut decoded = Vec::with_capacity(decoded_representation.capacity());
        GzDecoder::new(encoded_value.as_slice()).read_to_end(&mut decoded)?;
        Ok(decoded)
    }

    fn compute_encoded_size(
        &self,
        decoded_representation: &BytesRepresentation,
    ) -> BytesRepresentation {
        // 18 bytes of header and trailer, plus 5 bytes per 32 KiB stored block
        decoded_representation.compressed(|size| 18 + 5 * size.div_ceil(32_768))
    }
}
