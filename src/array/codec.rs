//! Chunk codecs.
//!
//! A chunk is encoded by a sequence of codecs before it is stored, each of which specifies a bidirectional transform (an encode transform and a decode transform).
//! There are two kinds of codec:
//!  - `array->bytes`: maps the elements of a chunk to bytes, for example [`sharding_indexed`](array_to_bytes::sharding).
//!    A chain has at most one, and it comes first. Without one, chunk elements are stored as their native endian bytes.
//!  - `bytes->bytes`: maps bytes to bytes, for example a compressor or a checksum.
//!
//! A [`CodecChain`] represents an ordered sequence of codecs.
//! It encodes with each codec in order, and decodes with each codec in reverse order.
//!
//! Codecs are created from [`Metadata`] through registered [`CodecPlugin`]s.

pub mod array_to_bytes;
pub mod bytes_to_bytes;
mod codec_chain;

pub use codec_chain::CodecChain;

#[cfg(feature = "sharding")]
pub use array_to_bytes::sharding::{
    ShardingCodec, ShardingCodecBuilder, ShardingCodecConfiguration,
    ShardingCodecConfigurationV1, ShardingIndexLocation,
};

#[cfg(feature = "crc32c")]
pub use bytes_to_bytes::crc32c::{
    Crc32cCodec, Crc32cCodecConfiguration, Crc32cCodecConfigurationV1,
};
#[cfg(feature = "gzip")]
pub use bytes_to_bytes::gzip::{
    GzipCodec, GzipCodecConfiguration, GzipCodecConfigurationV1, GzipCompressionLevel,
    GzipCompressionLevelError,
};
#[cfg(feature = "zstd")]
pub use bytes_to_bytes::zstd::{
    ZstdCodec, ZstdCodecConfiguration, ZstdCodecConfigurationV1, ZstdCompressionLevel,
    ZstdCompressionLevelError,
};

use thiserror::Error;

use crate::{
    byte_range::InvalidByteRangeError,
    metadata::Metadata,
    plugin::{try_create_from_registry, Plugin, PluginCreateError},
};

use super::{BytesRepresentation, ChunkRepresentation};

/// A codec of either kind.
#[derive(Debug, Clone)]
pub enum Codec {
    /// An `array->bytes` codec.
    ArrayToBytes(Box<dyn ArrayToBytesCodecTraits>),
    /// A `bytes->bytes` codec.
    BytesToBytes(Box<dyn BytesToBytesCodecTraits>),
}

impl Codec {
    /// The metadata entry of the codec, see [`CodecTraits::create_metadata`].
    #[must_use]
    pub fn create_metadata(&self) -> Option<Metadata> {
        match self {
            Self::ArrayToBytes(codec) => codec.create_metadata(),
            Self::BytesToBytes(codec) => codec.create_metadata(),
        }
    }
}

/// The registration record of a codec, keyed by its metadata name.
pub type CodecPlugin = Plugin<Codec>;
inventory::collect!(CodecPlugin);

/// Instantiate the registered codec named in `metadata`.
///
/// # Errors
/// Returns [`PluginCreateError`] if no codec is registered under the name or its configuration is rejected.
pub fn try_create_codec(metadata: &Metadata) -> Result<Codec, PluginCreateError> {
    try_create_from_registry(metadata, "codec")
}

/// Behaviour shared by every codec.
pub trait CodecTraits: Send + Sync {
    /// The metadata entry written to the `codecs` list of the array, or [`None`] to leave the codec out.
    fn create_metadata(&self) -> Option<Metadata>;
}

/// A reversible transform from the elements of a chunk to bytes.
pub trait ArrayToBytesCodecTraits: CodecTraits + dyn_clone::DynClone + core::fmt::Debug {
    /// Encode the native endian elements in `decoded_value`, which has the shape of `decoded_representation`.
    ///
    /// # Errors
    /// Returns [`CodecError::UnexpectedChunkDecodedSize`] if `decoded_value` is not the size of `decoded_representation`,
    /// or another [`CodecError`] if the transform fails.
    fn encode(
        &self,
        decoded_value: Vec<u8>,
        decoded_representation: &ChunkRepresentation,
    ) -> Result<Vec<u8>, CodecError>;

    /// Invert [`encode`](ArrayToBytesCodecTraits::encode).
    ///
    /// # Errors
    /// Returns [`CodecError`] if `encoded_value` is malformed or fails verification.
    fn decode(
        &self,
        encoded_value: Vec<u8>,
        decoded_representation: &ChunkRepresentation,
    ) -> Result<Vec<u8>, CodecError>;

    /// The size of the output of [`encode`](ArrayToBytesCodecTraits::encode) for a chunk of `decoded_representation`.
    ///
    /// # Errors
    /// Returns [`CodecError`] if the codec cannot encode a chunk of `decoded_representation`.
    fn compute_encoded_size(
        &self,
        decoded_representation: &ChunkRepresentation,
    ) -> Result<BytesRepresentation, CodecError>;
}

dyn_clone::clone_trait_object!(ArrayToBytesCodecTraits);

/// A reversible transform from bytes to bytes.
pub trait BytesToBytesCodecTraits: CodecTraits + dyn_clone::DynClone + core::fmt::Debug {
    /// Transform `decoded_value` into its stored form.
    ///
    /// # Errors
    /// Returns [`CodecError`] if the transform fails.
    fn encode(&self, decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError>;

    /// Invert [`encode`](BytesToBytesCodecTraits::encode).
    ///
    /// `decoded_representation` describes the expected output.
    ///
    /// # Errors
    /// Returns [`CodecError`] if `encoded_value` is malformed or fails verification.
    fn decode(
        &self,
        encoded_value: Vec<u8>,
        decoded_representation: &BytesRepresentation,
    ) -> Result<Vec<u8>, CodecError>;

    /// The size of the output of [`encode`](BytesToBytesCodecTraits::encode) for an input of `decoded_representation`.
    fn compute_encoded_size(
        &self,
        decoded_representation: &BytesRepresentation,
    ) -> BytesRepresentation;
}

dyn_clone::clone_trait_object!(BytesToBytesCodecTraits);

/// A failure to encode or decode a chunk.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Compression or decompression failed, including on malformed input.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// The decoded chunk has the wrong number of bytes.
    #[error("decoded chunk has {_0} bytes, expected {_1}")]
    UnexpectedChunkDecodedSize(usize, u64),
    /// The stored checksum disagrees with the data.
    #[error("the checksum is invalid")]
    InvalidChecksum,
    /// The input of a codec is too short to contain its framing.
    #[error("{_0} input of {_1} bytes is truncated")]
    TruncatedInput(&'static str, usize),
    /// An encoded value refers to bytes it does not contain.
    #[error(transparent)]
    InvalidByteRangeError(#[from] InvalidByteRangeError),
    /// Any other codec failure.
    #[error("{_0}")]
    Other(String),
}

impl From<&str> for CodecError {
    fn from(error: &str) -> Self {
        Self::Other(error.to_string())
    }
}

impl From<String> for CodecError {
    fn from(error: String) -> Self {
        Self::Other(error)
    }
}
