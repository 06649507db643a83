//! The `v2` chunk key encoding.

use serde::{Deserialize, Serialize};

use crate::{
    array::chunk_key_encoding::ChunkKeyEncodingPlugin,
    metadata::Metadata,
    plugin::{plugin_configuration, PluginCreateError},
    storage::StoreKey,
};

use super::{chunk_key, ChunkKeyEncoding, ChunkKeyEncodingTraits, ChunkKeySeparator};

/// The identifier for the `v2` chunk key encoding.
pub const IDENTIFIER: &str = "v2";

inventory::submit! {
    ChunkKeyEncodingPlugin::new(IDENTIFIER, create_chunk_key_encoding_v2)
}

fn create_chunk_key_encoding_v2(
    metadata: &Metadata,
) -> Result<ChunkKeyEncoding, PluginCreateError> {
    let configuration: V2ChunkKeyEncodingConfiguration =
        plugin_configuration(IDENTIFIER, "chunk key encoding", metadata)?;
    Ok(V2ChunkKeyEncoding::from(configuration).into())
}

/// Configuration of the `v2` chunk key encoding.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct V2ChunkKeyEncodingConfiguration {
    /// The chunk key separator, `.` if omitted.
    #[serde(default = "V2ChunkKeyEncoding::default_separator")]
    pub separator: ChunkKeySeparator,
}

/// The `v2` chunk key encoding.
///
/// Chunk `[1, 23, 45]` has key `1.23.45` with the `.` separator.
/// There is no prefix, so the single chunk of a zero dimensional array has key `0`.
#[derive(Debug, Clone, Copy)]
pub struct V2ChunkKeyEncoding {
    separator: ChunkKeySeparator,
}

impl V2ChunkKeyEncoding {
    const fn default_separator() -> ChunkKeySeparator {
        ChunkKeySeparator::Dot
    }

    /// Create a `v2` chunk key encoding with `separator`.
    #[must_use]
    pub const fn new(separator: ChunkKeySeparator) -> Self {
        Self { separator }
    }

    /// Create a `v2` chunk key encoding with the `.` separator.
    #[must_use]
    pub const fn new_dot() -> Self {
        Self::new(ChunkKeySeparator::Dot)
    }

    /// Create a `v2` chunk key encoding with the `/` separator.
    #[must_use]
    pub const fn new_slash() -> Self {
        Self::new(ChunkKeySeparator::Slash)
    }
}

impl Default for V2ChunkKeyEncoding {
    fn default() -> Self {
        Self::new(Self::default_separator())
    }
}

impl From<V2ChunkKeyEncodingConfiguration> for V2ChunkKeyEncoding {
    fn from(configuration: V2ChunkKeyEncodingConfiguration) -> Self {
        Self::new(configuration.separator)
    }
}

impl ChunkKeyEncodingTraits for V2ChunkKeyEncoding {
    fn create_metadata(&self) -> Metadata {
        let configuration = V2ChunkKeyEncodingConfiguration {
            separator: self.separator,
        };
        Metadata::new_with_serializable_configuration(IDENTIFIER, &configuration)
            .unwrap_or_else(|_| Metadata::new(IDENTIFIER))
    }

    fn encode(&self, chunk_grid_indices: &[u64]) -> StoreKey {
        if chunk_grid_indices.is_empty() {
            StoreKey::new_unchecked("0".to_string())
        } else {
            chunk_key("", chunk_grid_indices, self.separator)
        }
    }
}
