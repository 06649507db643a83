use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

/// Versioned configuration of the `crc32c` codec.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Display, From)]
#[serde(untagged)]
pub enum Crc32cCodecConfiguration {
    /// Version 1.0.
    V1(Crc32cCodecConfigurationV1),
}

/// `crc32c` codec configuration, version 1.0. It has no parameters.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Display, Default)]
#[serde(deny_unknown_fields)]
#[display("no parameters")]
pub struct Crc32cCodecConfigurationV1 {}
