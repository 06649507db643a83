//! The `crc32c` (CRC32C checksum) bytes to bytes codec.
//!
//! Appends a little endian CRC32C checksum of the input bytestream.
//! On decode, the checksum is verified (see [`Config::validate_checksums`](crate::config::Config::validate_checksums)) and stripped.

mod crc32c_codec;
mod crc32c_configuration;

pub use crc32c_codec::Crc32cCodec;
pub use crc32c_configuration::{Crc32cCodecConfiguration, Crc32cCodecConfigurationV1};

use crate::{
    array::codec::{Codec, CodecPlugin},
    metadata::Metadata,
    plugin::{plugin_configuration, PluginCreateError},
};

/// The identifier for the `crc32c` codec.
pub const IDENTIFIER: &str = "crc32c";

// Register the codec.
inventory::submit! {
    CodecPlugin::new(IDENTIFIER, create_codec_crc32c)
}

fn create_codec_crc32c(metadata: &Metadata) -> Result<Codec, PluginCreateError> {
    let configuration: Crc32cCodecConfiguration =
        plugin_configuration(IDENTIFIER, "codec", metadata)?;
    Ok(Codec::BytesToBytes(Box::new(Crc32cCodec::new_with_configuration(
        &configuration,
    ))))
}

const CHECKSUM_SIZE: usize = core::mem::size_of::<u32>();
