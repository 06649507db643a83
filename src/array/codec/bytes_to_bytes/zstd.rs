//! The `zstd` bytes to bytes codec.
//!
//! Applies [Zstandard](https://tools.ietf.org/html/rfc8878) compression.

mod zstd_codec;
mod zstd_configuration;

pub use zstd_codec::ZstdCodec;
pub use zstd_configuration::{
    ZstdCodecConfiguration, ZstdCodecConfigurationV1, ZstdCompressionLevel,
    ZstdCompressionLevelError,
};

use crate::{
    array::codec::{Codec, CodecPlugin},
    metadata::Metadata,
    plugin::{plugin_configuration, PluginCreateError},
};

/// The identifier for the `zstd` codec.
pub const IDENTIFIER: &str = "zstd";

// Register the codec.
inventory::submit! {
    CodecPlugin::new(IDENTIFIER, create_codec_zstd)
}

fn create_codec_zstd(metadata: &Metadata) -> Result<Codec, PluginCreateError> {
    let configuration: ZstdCodecConfiguration =
        plugin_configuration(IDENTIFIER, "codec", metadata)?;
    Ok(Codec::BytesToBytes(Box::new(ZstdCodec::new_with_configuration(
        &configuration,
    ))))
}

#[cfg(test)]
mod tests {
    use crate::array::{
        codec::{BytesToBytesCodecTraits, CodecTraits},
        BytesRepresentation,
    };

    use super::*;

    const JSON_VALID: &str = r#"{
    "level": 22,
    "checksum": false
}"#;

    const JSON_CHECKSUM: &str = r#"{
    "level": 3,
    "checksum": true
}"#;

    #[test]
    fn codec_zstd_round_trip() {
        let elements: Vec<u16> = (0..32).collect();
        let bytes = bytemuck::cast_slice::<u16, u8>(&elements).to_vec();
        let bytes_representation = BytesRepresentation::FixedSize(bytes.len() as u64);

        let configuration: ZstdCodecConfiguration = serde_json::from_str(JSON_VALID).unwrap();
        let codec = ZstdCodec::new_with_configuration(&configuration);

        let encoded = codec.encode(bytes.clone()).unwrap();
        let decoded = codec.decode(encoded, &bytes_representation).unwrap();
        assert_eq!(bytes, decoded);
    }

    #[test]
    fn codec_zstd_round_trip_checksum() {
        let bytes: Vec<u8> = (0..255).collect();
        let bytes_representation = BytesRepresentation::FixedSize(bytes.len() as u64);

        let configuration: ZstdCodecConfiguration = serde_json::from_str(JSON_CHECKSUM).unwrap();
        let codec = ZstdCodec::new_with_configuration(&configuration);

        let mut encoded = codec.encode(bytes.clone()).unwrap();
        let decoded = codec.decode(encoded.clone(), &bytes_representation).unwrap();
        assert_eq!(bytes, decoded);

        // corrupt the content checksum at the end of the frame
        let last = encoded.len() - 1;
        encoded[last] ^= 0xff;
        assert!(codec.decode(encoded, &bytes_representation).is_err());
    }

    #[test]
    fn codec_zstd_metadata() {
        let codec = ZstdCodec::new(5, true);
        assert_eq!(
            serde_json::to_string(&codec.create_metadata().unwrap()).unwrap(),
            r#"{"name":"zstd","configuration":{"level":5,"checksum":true}}"#
        );
    }
}
