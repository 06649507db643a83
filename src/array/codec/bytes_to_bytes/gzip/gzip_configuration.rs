use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Versioned configuration of the `gzip` codec.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Display, From)]
#[serde(untagged)]
pub enum GzipCodecConfiguration {
    /// Version 1.0.
    V1(GzipCodecConfigurationV1),
}

/// `gzip` codec configuration, version 1.0.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Display)]
#[serde(deny_unknown_fields)]
#[display("level {level}")]
pub struct GzipCodecConfigurationV1 {
    /// The compression level.
    pub level: GzipCompressionLevel,
}

/// A `gzip` compression level from 0 (stored, no compression) to 9 (smallest output).
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug, Display)]
#[serde(try_from = "u32", into = "u32")]
pub struct GzipCompressionLevel(u32);

/// A `gzip` compression level outside of 0-9.
#[derive(Copy, Clone, Debug, Error)]
#[error("gzip compression level {0} is not in 0-9")]
pub struct GzipCompressionLevelError(u32);

impl GzipCompressionLevel {
    /// The highest compression level.
    pub const MAX: u32 = 9;

    /// Returns the level as a [`u32`].
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for GzipCompressionLevel {
    type Error = GzipCompressionLevelError;

    fn try_from(level: u32) -> Result<Self, Self::Error> {
        if level <= Self::MAX {
            Ok(Self(level))
        } else {
            Err(GzipCompressionLevelError(level))
        }
    }
}

impl From<GzipCompressionLevel> for u32 {
    fn from(level: GzipCompressionLevel) -> Self {
        level.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<GzipCodecConfiguration, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn codec_gzip_configuration() {
        let GzipCodecConfiguration::V1(configuration) = parse(r#"{"level": 9}"#).unwrap();
        assert_eq!(configuration.level.as_u32(), 9);
        assert_eq!(configuration.to_string(), "level 9");
        assert_eq!(
            serde_json::to_string(&configuration).unwrap(),
            r#"{"level":9}"#
        );
    }

    #[test]
    fn codec_gzip_configuration_invalid() {
        assert!(parse(r#"{"level": -1}"#).is_err());
        assert!(parse(r#"{"level": 10}"#).is_err());
        assert!(parse(r#"{"level": 1.5}"#).is_err());
        assert!(parse(r#"{"level": 1, "window": 15}"#).is_err());
        assert!(parse("{}").is_err());
    }
}
