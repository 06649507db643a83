//! The `sharding_indexed` array to bytes codec.
//!
//! Sharding splits each chunk (a shard) into subchunks that are encoded individually and stored together under the key of the shard.
//! Many small subchunks can then be read independently without one store value per subchunk.
//!
//! ### Shard layout
//!
//! An encoded shard is the concatenation of its encoded subchunks plus an index, at the start or end of the shard ([`ShardingIndexLocation`]).
//! The index holds an `(offset, nbytes)` pair of little endian `u64`s per subchunk, in row-major subchunk order,
//! then is encoded by the `bytes->bytes` index codecs, whose output must have a fixed size.
//! A subchunk holding only the fill value is not stored and has the pair `(u64::MAX, u64::MAX)`.
//!
//! The subchunk shape must evenly divide the shard shape.
//!
//! This codec requires the `sharding` feature, which is enabled by default.
//! See [`ShardingCodecConfigurationV1`] for example JSON metadata.
//! The [`ShardingCodecBuilder`] can help with creating a [`ShardingCodec`].

mod sharding_codec;
mod sharding_codec_builder;
mod sharding_configuration;

pub use sharding_codec::ShardingCodec;
pub use sharding_codec_builder::ShardingCodecBuilder;
pub use sharding_configuration::{
    ShardingCodecConfiguration, ShardingCodecConfigurationV1, ShardingIndexLocation,
};

use crate::{
    array::codec::{Codec, CodecPlugin},
    metadata::Metadata,
    plugin::{plugin_configuration, PluginCreateError},
};

/// The identifier for the `sharding_indexed` codec.
pub const IDENTIFIER: &str = "sharding_indexed";

/// The value of both fields of the index entry of a subchunk that is not stored.
pub const MISSING_SUBCHUNK: u64 = u64::MAX;

// Register the codec.
inventory::submit! {
    CodecPlugin::new(IDENTIFIER, create_codec_sharding)
}

fn create_codec_sharding(metadata: &Metadata) -> Result<Codec, PluginCreateError> {
    let configuration: ShardingCodecConfiguration =
        plugin_configuration(IDENTIFIER, "codec", metadata)?;
    let codec = ShardingCodec::new_with_configuration(&configuration)?;
    Ok(Codec::ArrayToBytes(Box::new(codec)))
}
