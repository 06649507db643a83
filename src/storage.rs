//! Array storage ([stores](store) and the storage interfaces they implement).
//!
//! A [store] is a key-value system that holds the metadata document and the encoded chunks of an array.
//! For example: a directory on a filesystem or a map in memory.
//!
//! Keys are `/` separated strings ([`StoreKey`]) and values are byte strings ([`Bytes`]).
//! An absent key is a normal state, not an error: retrieving it returns [`None`].
//!
//! This module defines the abstract store interfaces, the stores shipped with the crate, and the keys under which [`Array`](crate::array::Array) stores its metadata and chunks.

mod storage_sync;
pub mod store;
mod store_key;
pub mod store_lock;
mod store_prefix;

use std::sync::Arc;

use thiserror::Error;

use crate::{
    array::ChunkKeyEncoding,
    byte_range::InvalidByteRangeError,
    node::{NodePath, NodePathError},
};

pub use store_key::{StoreKey, StoreKeyError, StoreKeys};
pub use store_prefix::{StorePrefix, StorePrefixError, StorePrefixes};

pub use self::storage_sync::{
    erase_node, ListableStorageTraits, ReadableListableStorageTraits, ReadableStorageTraits,
    ReadableWritableListableStorageTraits, ReadableWritableStorageTraits, WritableStorageTraits,
};

/// The value stored under a key.
pub type Bytes = bytes::Bytes;

/// The value under a key, [`None`] when the key is absent.
pub type MaybeBytes = Option<Bytes>;

/// A shared, type-erased readable store.
pub type ReadableStorage = Arc<dyn ReadableStorageTraits>;
/// A shared, type-erased writable store.
pub type WritableStorage = Arc<dyn WritableStorageTraits>;
/// A shared, type-erased listable store.
pub type ListableStorage = Arc<dyn ListableStorageTraits>;
/// A shared, type-erased store that can be read and written.
pub type ReadableWritableStorage = Arc<dyn ReadableWritableStorageTraits>;
/// A shared, type-erased store that can be read and listed.
pub type ReadableListableStorage = Arc<dyn ReadableListableStorageTraits>;
/// A shared, type-erased store with every capability.
pub type ReadableWritableListableStorage = Arc<dyn ReadableWritableListableStorageTraits>;

/// The result of listing one level of a store: keys directly under a prefix and the child prefixes.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct StoreKeysPrefixes {
    keys: StoreKeys,
    prefixes: StorePrefixes,
}

impl StoreKeysPrefixes {
    /// Pair up `keys` and child `prefixes`.
    #[must_use]
    pub fn new(keys: StoreKeys, prefixes: StorePrefixes) -> Self {
        Self { keys, prefixes }
    }

    /// The keys at this level.
    #[must_use]
    pub const fn keys(&self) -> &StoreKeys {
        &self.keys
    }

    /// The child prefixes at this level.
    #[must_use]
    pub const fn prefixes(&self) -> &StorePrefixes {
        &self.prefixes
    }
}

/// An error raised by a store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A write was attempted on a read-only store.
    #[error("the store is read only")]
    ReadOnly,
    /// The backing medium failed.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// A metadata document could not be encoded for writing under the key.
    #[error("invalid metadata for {0}: {1}")]
    InvalidMetadata(StoreKey, String),
    /// A listed name is not a valid prefix.
    #[error(transparent)]
    StorePrefixError(#[from] StorePrefixError),
    /// A listed name is not a valid key.
    #[error(transparent)]
    InvalidStoreKey(#[from] StoreKeyError),
    /// A path is not a valid node path.
    #[error(transparent)]
    NodePathError(#[from] NodePathError),
    /// A byte range reaches beyond the end of a value.
    #[error(transparent)]
    InvalidByteRangeError(#[from] InvalidByteRangeError),
}

const METADATA_FILE_NAME: &str = "zarr.json";

/// `key` relative to the node at `path`.
fn node_key(path: &NodePath, key: &str) -> StoreKey {
    match path.as_str().trim_start_matches('/') {
        "" => StoreKey::new_unchecked(key.to_string()),
        node => StoreKey::new_unchecked(format!("{node}/{key}")),
    }
}

/// Returns the key of the metadata document of the node at `path`.
#[must_use]
pub fn meta_key(path: &NodePath) -> StoreKey {
    node_key(path, METADATA_FILE_NAME)
}

/// Returns the key of the chunk at `chunk_grid_indices` of the array at `path`.
#[must_use]
pub fn data_key(
    path: &NodePath,
    chunk_grid_indices: &[u64],
    chunk_key_encoding: &ChunkKeyEncoding,
) -> StoreKey {
    node_key(path, chunk_key_encoding.encode(chunk_grid_indices).as_str())
}

#[cfg(test)]
mod tests {
    use crate::array::chunk_key_encoding::{DefaultChunkKeyEncoding, V2ChunkKeyEncoding};

    use super::*;

    #[test]
    fn storage_meta_key() {
        assert_eq!(meta_key(&NodePath::root()).as_str(), "zarr.json");
        assert_eq!(
            meta_key(&NodePath::new("/group/array").unwrap()).as_str(),
            "group/array/zarr.json"
        );
    }

    #[test]
    fn storage_data_key() {
        let path = NodePath::new("/array").unwrap();
        let encoding: ChunkKeyEncoding = DefaultChunkKeyEncoding::default().into();
        assert_eq!(data_key(&path, &[1, 23, 45], &encoding).as_str(), "array/c/1/23/45");
        let encoding: ChunkKeyEncoding = V2ChunkKeyEncoding::default().into();
        assert_eq!(data_key(&path, &[1, 23, 45], &encoding).as_str(), "array/1.23.45");
        assert_eq!(
            data_key(&NodePath::root(), &[1, 23, 45], &encoding).as_str(),
            "1.23.45"
        );
    }
}
