//! The `default` chunk key encoding.

use serde::{Deserialize, Serialize};

use crate::{
    array::chunk_key_encoding::ChunkKeyEncodingPlugin,
    metadata::Metadata,
    plugin::{plugin_configuration, PluginCreateError},
    storage::StoreKey,
};

use super::{chunk_key, ChunkKeyEncoding, ChunkKeyEncodingTraits, ChunkKeySeparator};

/// The identifier for the `default` chunk key encoding.
pub const IDENTIFIER: &str = "default";

inventory::submit! {
    ChunkKeyEncodingPlugin::new(IDENTIFIER, create_chunk_key_encoding_default)
}

fn create_chunk_key_encoding_default(
    metadata: &Metadata,
) -> Result<ChunkKeyEncoding, PluginCreateError> {
    let configuration: DefaultChunkKeyEncodingConfiguration =
        plugin_configuration(IDENTIFIER, "chunk key encoding", metadata)?;
    Ok(DefaultChunkKeyEncoding::from(configuration).into())
}

/// Configuration of the `default` chunk key encoding.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct DefaultChunkKeyEncodingConfiguration {
    /// The chunk key separator, `/` if omitted.
    #[serde(default = "DefaultChunkKeyEncoding::default_separator")]
    pub separator: ChunkKeySeparator,
}

/// The `default` chunk key encoding.
///
/// Chunk `[1, 23, 45]` has key `c/1/23/45` with the `/` separator, and the single chunk of a zero dimensional array has key `c`.
#[derive(Debug, Clone, Copy)]
pub struct DefaultChunkKeyEncoding {
    separator: ChunkKeySeparator,
}

impl DefaultChunkKeyEncoding {
    const fn default_separator() -> ChunkKeySeparator {
        ChunkKeySeparator::Slash
    }

    /// Create a `default` chunk key encoding with `separator`.
    #[must_use]
    pub const fn new(separator: ChunkKeySeparator) -> Self {
        Self { separator }
    }

    /// Create a `default` chunk key encoding with the `.` separator.
    #[must_use]
    pub const fn new_dot() -> Self {
        Self::new(ChunkKeySeparator::Dot)
    }

    /// Create a `default` chunk key encoding with the `/` separator.
    #[must_use]
    pub const fn new_slash() -> Self {
        Self::new(ChunkKeySeparator::Slash)
    }
}

impl Default for DefaultChunkKeyEncoding {
    fn default() -> Self {
        Self::new(Self::default_separator())
    }
}

impl From<DefaultChunkKeyEncodingConfiguration> for DefaultChunkKeyEncoding {
    fn from(configuration: DefaultChunkKeyEncodingConfiguration) -> Self {
        Self::new(configuration.separator)
    }
}

impl ChunkKeyEncodingTraits for DefaultChunkKeyEncoding {
    fn create_metadata(&self) -> Metadata {
        let configuration = DefaultChunkKeyEncodingConfiguration {
            separator: self.separator,
        };
        Metadata::new_with_serializable_configuration(IDENTIFIER, &configuration)
            .unwrap_or_else(|_| Metadata::new(IDENTIFIER))
    }

    fn encode(&self, chunk_grid_indices: &[u64]) -> StoreKey {
        chunk_key("c", chunk_grid_indices, self.separator)
    }
}

#[cfg(test)]
mod tests {
    use crate::{node::NodePath, storage::data_key};

    use super::*;

    fn key(encoding: DefaultChunkKeyEncoding, chunk_grid_indices: &[u64]) -> String {
        data_key(&NodePath::root(), chunk_grid_indices, &encoding.into())
            .as_str()
            .to_string()
    }

    #[test]
    fn default_chunk_keys() {
        assert_eq!(key(DefaultChunkKeyEncoding::new_slash(), &[1, 23, 45]), "c/1/23/45");
        assert_eq!(key(DefaultChunkKeyEncoding::new_dot(), &[1, 23, 45]), "c.1.23.45");
        assert_eq!(key(DefaultChunkKeyEncoding::new_dot(), &[0]), "c.0");
        assert_eq!(key(DefaultChunkKeyEncoding::default(), &[]), "c");
    }

    #[test]
    fn default_metadata() {
        assert_eq!(
            serde_json::to_string(&DefaultChunkKeyEncoding::default().create_metadata()).unwrap(),
            r#"{"name":"default","configuration":{"separator":"/"}}"#
        );
        let configuration: DefaultChunkKeyEncodingConfiguration =
            serde_json::from_str("{}").unwrap();
        assert_eq!(configuration.separator, ChunkKeySeparator::Slash);
    }
}
