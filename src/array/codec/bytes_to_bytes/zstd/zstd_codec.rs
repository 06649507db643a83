use zstd::zstd_safe;

use crate::{
    array::{
        codec::{BytesToBytesCodecTraits, CodecError, CodecTraits},
        BytesRepresentation,
    },
    metadata::Metadata,
};

use super::{ZstdCodecConfiguration, ZstdCodecConfigurationV1, IDENTIFIER};

/// A `zstd` codec implementation.
#[derive(Clone, Debug)]
pub struct ZstdCodec {
    level: zstd_safe::CompressionLevel,
    checksum: bool,
}

impl ZstdCodec {
    /// Create a new `zstd` codec.
    ///
    /// If `checksum` is true, a content checksum is written with each frame and verified on decode.
    #[must_use]
    pub const fn new(level: zstd_safe::CompressionLevel, checksum: bool) -> Self {
        Self { level, checksum }
    }

    /// Create a new `zstd` codec from configuration.
    #[must_use]
    pub fn new_with_configuration(configuration: &ZstdCodecConfiguration) -> Self {
        let ZstdCodecConfiguration::V1(configuration) = configuration;
        Self::new(configuration.level.into(), configuration.checksum)
    }
}

impl CodecTraits for ZstdCodec {
    fn create_metadata(&self) -> Option<Metadata> {
        let configuration = ZstdCodecConfigurationV1 {
            level: self.level.into(),
            checksum: self.checksum,
        };
        Metadata::new_with_serializable_configuration(IDENTIFIER, &configuration).ok()
    }
}

impl BytesToBytesCodecTraits for ZstdCodec {
    fn encode(&self, decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let mut compressor = zstd::bulk::Compressor::new(self.level)?;
        compressor.include_checksum(self.checksum)?;
        Ok(compressor.compress(&decoded_value)?)
    }

    fn decode(
        &self,
        encoded_value: Vec<u8>,
        decoded_representation: &BytesRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        match decoded_representation.size() {
            // The frame may not record its content size, so the bound comes from the caller
            Some(_) => Ok(zstd::bulk::decompress(
                &encoded_value,
                decoded_representation.capacity(),
            )?),
            None => Ok(zstd::decode_all(encoded_value.as_slice())?),
        }
    }

    fn compute_encoded_size(
        &self,
        decoded_representation: &BytesRepresentation,
    ) -> BytesRepresentation {
        // 22 bytes of frame header and checksum, plus 3 bytes per block of at least 1 KB
        decoded_representation.compressed(|size| 22 + 3 * size.div_ceil(1000))
    }
}
