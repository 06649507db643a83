//! Chunk key encodings: [`DefaultChunkKeyEncoding`] and [`V2ChunkKeyEncoding`].
//!
//! A chunk key encoding maps chunk grid indices to a store key relative to the array path.
//! The mapping is a bijection over valid chunk grid indices.

mod default;
mod v2;

pub use default::{DefaultChunkKeyEncoding, DefaultChunkKeyEncodingConfiguration};
pub use v2::{V2ChunkKeyEncoding, V2ChunkKeyEncodingConfiguration};

use crate::{
    metadata::Metadata,
    plugin::{try_create_from_registry, Plugin, PluginCreateError},
    storage::StoreKey,
};

use derive_more::{Deref, Display};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A chunk key encoding.
#[derive(Debug, Clone, Deref)]
pub struct ChunkKeyEncoding(Box<dyn ChunkKeyEncodingTraits>);

/// A chunk key encoding plugin.
pub type ChunkKeyEncodingPlugin = Plugin<ChunkKeyEncoding>;
inventory::collect!(ChunkKeyEncodingPlugin);

impl ChunkKeyEncoding {
    /// Create a chunk key encoding.
    pub fn new<T: ChunkKeyEncodingTraits + 'static>(chunk_key_encoding: T) -> Self {
        Self(Box::new(chunk_key_encoding))
    }

    /// Create a chunk key encoding from metadata.
    ///
    /// # Errors
    /// Returns [`PluginCreateError`] if the metadata is invalid or not associated with a registered chunk key encoding plugin.
    pub fn from_metadata(metadata: &Metadata) -> Result<Self, PluginCreateError> {
        try_create_from_registry(metadata, "chunk key encoding")
    }
}

impl<T: ChunkKeyEncodingTraits + 'static> From<T> for ChunkKeyEncoding {
    fn from(chunk_key_encoding: T) -> Self {
        Self::new(chunk_key_encoding)
    }
}

/// Chunk key encoding traits.
pub trait ChunkKeyEncodingTraits: dyn_clone::DynClone + core::fmt::Debug + Send + Sync {
    /// Create the metadata of this chunk key encoding.
    fn create_metadata(&self) -> Metadata;

    /// Encode chunk grid indices (grid cell coordinates) into a store key.
    fn encode(&self, chunk_grid_indices: &[u64]) -> StoreKey;
}

dyn_clone::clone_trait_object!(ChunkKeyEncodingTraits);

/// The character placed between chunk grid indices in a chunk key.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Display, Serialize, Deserialize)]
#[serde(try_from = "char", into = "char")]
pub enum ChunkKeySeparator {
    /// `/`, which nests chunks in directories of a filesystem store.
    #[display("/")]
    Slash,
    /// `.`, which keeps all chunks of an array side by side.
    #[display(".")]
    Dot,
}

/// A character that is not a chunk key separator.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Error)]
#[error("chunk key separator must be `/` or `.`, not `{0}`")]
pub struct ChunkKeySeparatorError(char);

impl TryFrom<char> for ChunkKeySeparator {
    type Error = ChunkKeySeparatorError;

    fn try_from(separator: char) -> Result<Self, Self::Error> {
        match separator {
            '/' => Ok(Self::Slash),
            '.' => Ok(Self::Dot),
            other => Err(ChunkKeySeparatorError(other)),
        }
    }
}

impl From<ChunkKeySeparator> for char {
    fn from(separator: ChunkKeySeparator) -> Self {
        match separator {
            ChunkKeySeparator::Slash => '/',
            ChunkKeySeparator::Dot => '.',
        }
    }
}

/// Join a (possibly empty) `prefix` and the chunk grid indices with `separator`.
fn chunk_key(prefix: &str, chunk_grid_indices: &[u64], separator: ChunkKeySeparator) -> StoreKey {
    let separator = char::from(separator);
    let mut key = prefix.to_string();
    for index in chunk_grid_indices {
        if !key.is_empty() {
            key.push(separator);
        }
        key.push_str(&index.to_string());
    }
    StoreKey::new_unchecked(key)
}
