use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

use crate::{array::ChunkShape, metadata::Metadata};

/// Versioned configuration of the `sharding_indexed` codec.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Display, From)]
#[serde(untagged)]
pub enum ShardingCodecConfiguration {
    /// Version 1.0.
    V1(ShardingCodecConfigurationV1),
}

/// `sharding_indexed` codec configuration, version 1.0.
///
/// ```json
/// {
///     "chunk_shape": [32, 32],
///     "codecs": [{ "name": "gzip", "configuration": { "level": 1 } }],
///     "index_codecs": [{ "name": "crc32c" }],
///     "index_location": "end"
/// }
/// ```
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Display)]
#[serde(deny_unknown_fields)]
#[display("{}", serde_json::to_string(self).unwrap_or_default())]
pub struct ShardingCodecConfigurationV1 {
    /// The shape of the subchunks in a shard. It must evenly divide the shard (chunk) shape.
    pub chunk_shape: ChunkShape,
    /// The codecs encoding each subchunk.
    pub codecs: Vec<Metadata>,
    /// The `bytes->bytes` codecs encoding the shard index. Their output must have a fixed size.
    pub index_codecs: Vec<Metadata>,
    /// Where the shard index is stored.
    #[serde(default)]
    pub index_location: ShardingIndexLocation,
}

/// The location of the index within a shard.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug, Default, Display)]
#[serde(rename_all = "lowercase")]
pub enum ShardingIndexLocation {
    /// Before the subchunks.
    #[display("start")]
    Start,
    /// After the subchunks.
    #[default]
    #[display("end")]
    End,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_sharding_configuration() {
        const JSON: &str = r#"{
            "chunk_shape": [2, 2],
            "codecs": [],
            "index_codecs": [{ "name": "crc32c" }],
            "index_location": "start"
        }"#;
        let ShardingCodecConfiguration::V1(configuration) =
            serde_json::from_str::<ShardingCodecConfiguration>(JSON).unwrap();
        assert_eq!(configuration.index_location, ShardingIndexLocation::Start);
        assert_eq!(configuration.chunk_shape.to_array_shape(), vec![2, 2]);
    }

    #[test]
    fn codec_sharding_configuration_defaults_and_rejects() {
        let configuration: ShardingCodecConfigurationV1 =
            serde_json::from_str(r#"{"chunk_shape":[4],"codecs":[],"index_codecs":[]}"#).unwrap();
        assert_eq!(configuration.index_location, ShardingIndexLocation::End);
        assert!(serde_json::from_str::<ShardingCodecConfiguration>(
            r#"{"chunk_shape":[0],"codecs":[],"index_codecs":[]}"#
        )
        .is_err());
        assert!(serde_json::from_str::<ShardingCodecConfiguration>(
            r#"{"chunk_shape":[2],"codecs":[],"index_codecs":[],"index_location":"middle"}"#
        )
        .is_err());
        assert!(serde_json::from_str::<ShardingCodecConfiguration>(
            r#"{"chunk_shape":[2],"codecs":[],"index_codecs":[],"extra":1}"#
        )
        .is_err());
    }
}
