//! The `gzip` bytes to bytes codec.
//!
//! Applies gzip compression.

mod gzip_codec;
mod gzip_configuration;

pub use gzip_codec::GzipCodec;
pub use gzip_configuration::{
    GzipCodecConfiguration, GzipCodecConfigurationV1, GzipCompressionLevel,
    GzipCompressionLevelError,
};

use crate::{
    array::codec::{Codec, CodecPlugin},
    metadata::Metadata,
    plugin::{plugin_configuration, PluginCreateError},
};

/// The identifier for the `gzip` codec.
pub const IDENTIFIER: &str = "gzip";

// Register the codec.
inventory::submit! {
    CodecPlugin::new(IDENTIFIER, create_codec_gzip)
}

fn create_codec_gzip(metadata: &Metadata) -> Result<Codec, PluginCreateError> {
    let configuration: GzipCodecConfiguration =
        plugin_configuration(IDENTIFIER, "codec", metadata)?;
    Ok(Codec::BytesToBytes(Box::new(GzipCodec::new_with_configuration(
        &configuration,
    ))))
}
