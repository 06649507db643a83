use crate::array::{
    codec::{ArrayToBytesCodecTraits, BytesToBytesCodecTraits, CodecChain},
    ChunkShape,
};

use super::{ShardingCodec, ShardingIndexLocation};

/// A [`ShardingCodec`] builder.
///
/// By default, subchunks are stored as their raw bytes and the index is encoded with the `crc32c` codec (if supported).
///
/// Use the methods in the builder to change the configuration away from these defaults, and then build the codec with [`build`](ShardingCodecBuilder::build).
#[derive(Debug)]
pub struct ShardingCodecBuilder {
    subchunk_shape: ChunkShape,
    index_bytes_to_bytes_codecs: Vec<Box<dyn BytesToBytesCodecTraits>>,
    array_to_bytes_codec: Option<Box<dyn ArrayToBytesCodecTraits>>,
    bytes_to_bytes_codecs: Vec<Box<dyn BytesToBytesCodecTraits>>,
    index_location: ShardingIndexLocation,
}

impl ShardingCodecBuilder {
    /// Create a new `sharding_indexed` codec builder.
    #[must_use]
    pub fn new(subchunk_shape: ChunkShape) -> Self {
        Self {
            subchunk_shape,
            index_bytes_to_bytes_codecs: vec![
                #[cfg(feature = "crc32c")]
                Box::new(crate::array::codec::Crc32cCodec::new()),
            ],
            array_to_bytes_codec: None,
            bytes_to_bytes_codecs: Vec::default(),
            index_location: ShardingIndexLocation::default(),
        }
    }

    /// Set the index bytes to bytes codecs.
    ///
    /// If left unmodified, the index will be encoded with the `crc32c` codec (if supported).
    pub fn index_bytes_to_bytes_codecs(
        &mut self,
        index_bytes_to_bytes_codecs: Vec<Box<dyn BytesToBytesCodecTraits>>,
    ) -> &mut Self {
        self.index_bytes_to_bytes_codecs = index_bytes_to_bytes_codecs;
        self
    }

    /// Set the subchunk array to bytes codec, such as a nested [`ShardingCodec`].
    pub fn array_to_bytes_codec(
        &mut self,
        array_to_bytes_codec: Box<dyn ArrayToBytesCodecTraits>,
    ) -> &mut Self {
        self.array_to_bytes_codec = Some(array_to_bytes_codec);
        self
    }

    /// Set the subchunk bytes to bytes codecs.
    ///
    /// If left unmodified, no bytes to bytes codecs will be applied to the subchunks.
    pub fn bytes_to_bytes_codecs(
        &mut self,
        bytes_to_bytes_codecs: Vec<Box<dyn BytesToBytesCodecTraits>>,
    ) -> &mut Self {
        self.bytes_to_bytes_codecs = bytes_to_bytes_codecs;
        self
    }

    /// Set the index location.
    ///
    /// If left unmodified, defaults to the end of the shard.
    pub fn index_location(&mut self, index_location: ShardingIndexLocation) -> &mut Self {
        self.index_location = index_location;
        self
    }

    /// Build into a [`ShardingCodec`].
    #[must_use]
    pub fn build(&self) -> ShardingCodec {
        let inner_codecs = CodecChain::new(
            self.array_to_bytes_codec.clone(),
            self.bytes_to_bytes_codecs.clone(),
        );
        ShardingCodec::new(
            self.subchunk_shape.clone(),
            inner_codecs,
            self.index_bytes_to_bytes_codecs.clone(),
            self.index_location,
        )
    }
}
