use crate::{
    array::{
        codec::{BytesToBytesCodecTraits, CodecError, CodecTraits},
        BytesRepresentation,
    },
    config::global_config,
    metadata::Metadata,
};

use super::{Crc32cCodecConfiguration, CHECKSUM_SIZE, IDENTIFIER};

/// A `CRC32C checksum` codec implementation.
#[derive(Clone, Debug, Default)]
pub struct Crc32cCodec;

impl Crc32cCodec {
    /// Create a new `CRC32C checksum` codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Create a new `CRC32C checksum` codec from configuration.
    #[must_use]
    pub const fn new_with_configuration(_configuration: &Crc32cCodecConfiguration) -> Self {
        Self
    }
}

impl CodecTraits for Crc32cCodec {
    fn create_metadata(&self) -> Option<Metadata> {
        Some(Metadata::new(IDENTIFIER))
    }
}

impl BytesToBytesCodecTraits for Crc32cCodec {
    fn encode(&self, mut decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let checksum = crc32c::crc32c(&decoded_value);
        decoded_value.extend_from_slice(&checksum.to_le_bytes());
        Ok(decoded_value)
    }

    fn decode(
        &self,
        mut encoded_value: Vec<u8>,
        _decoded_representation: &BytesRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        let Some(decoded_len) = encoded_value.len().checked_sub(CHECKSUM_SIZE) else {
            return Err(CodecError::TruncatedInput(
                IDENTIFIER,
                encoded_value.len(),
            ));
        };
        let (data, suffix) = encoded_value.split_at(decoded_len);
        if global_config().validate_checksums() && crc32c::crc32c(data).to_le_bytes() != suffix {
            return Err(CodecError::InvalidChecksum);
        }
        encoded_value.truncate(decoded_len);
        Ok(encoded_value)
    }

    fn compute_encoded_size(
        &self,
        decoded_representation: &BytesRepresentation,
    ) -> BytesRepresentation {
        decoded_representation.with_overhead(CHECKSUM_SIZE as u64)
    }
}
