use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zstd::zstd_safe;

/// Versioned configuration of the `zstd` codec.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Display, From)]
#[serde(untagged)]
pub enum ZstdCodecConfiguration {
    /// Version 1.0.
    V1(ZstdCodecConfigurationV1),
}

/// `zstd` codec configuration, version 1.0.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Display)]
#[serde(deny_unknown_fields)]
#[display("level {level}, checksum {checksum}")]
pub struct ZstdCodecConfigurationV1 {
    /// The compression level.
    pub level: ZstdCompressionLevel,
    /// Write a content checksum with each frame and verify it on decode.
    pub checksum: bool,
}

/// A `zstd` compression level from -131072 to 22.
///
/// Zero selects the library default. Higher levels trade speed for ratio, and the level has no effect on decoding.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug, Display)]
#[serde(try_from = "i64", into = "i32")]
pub struct ZstdCompressionLevel(zstd_safe::CompressionLevel);

/// A `zstd` compression level outside of -131072 to 22.
#[derive(Copy, Clone, Debug, Error)]
#[error("zstd compression level {0} is not in -131072 to 22")]
pub struct ZstdCompressionLevelError(i64);

impl TryFrom<i64> for ZstdCompressionLevel {
    type Error = ZstdCompressionLevelError;

    fn try_from(level: i64) -> Result<Self, Self::Error> {
        match zstd_safe::CompressionLevel::try_from(level) {
            Ok(level) if (-131_072..=22).contains(&level) => Ok(Self(level)),
            _ => Err(ZstdCompressionLevelError(level)),
        }
    }
}

impl From<zstd_safe::CompressionLevel> for ZstdCompressionLevel {
    fn from(level: zstd_safe::CompressionLevel) -> Self {
        Self(level)
    }
}

impl From<ZstdCompressionLevel> for zstd_safe::CompressionLevel {
    fn from(level: ZstdCompressionLevel) -> Self {
        level.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<ZstdCodecConfiguration, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn codec_zstd_configuration() {
        let ZstdCodecConfiguration::V1(configuration) =
            parse(r#"{"level": -5, "checksum": true}"#).unwrap();
        assert_eq!(zstd_safe::CompressionLevel::from(configuration.level), -5);
        assert!(configuration.checksum);
        assert_eq!(configuration.to_string(), "level -5, checksum true");
    }

    #[test]
    fn codec_zstd_configuration_invalid() {
        assert!(parse(r#"{"level": 5}"#).is_err());
        assert!(parse(r#"{"level": 23, "checksum": true}"#).is_err());
        assert!(parse(r#"{"level": -131073, "checksum": true}"#).is_err());
        assert!(parse(r#"{"level": 5000000000, "checksum": true}"#).is_err());
    }
}
