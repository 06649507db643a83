//! Groups.
//!
//! A group is a node of a hierarchy that holds other nodes (groups or [arrays](crate::array)) below its path.
//! It has no data, only attributes recorded in a `zarr.json` document at its path. For example:
//! ```json
//! {
//!     "zarr_format": 3,
//!     "node_type": "group",
//!     "attributes": {
//!         "spam": "ham",
//!         "eggs": 42
//!     }
//! }
//! ```
//!
//! Use [`GroupBuilder`] to setup a new group, or use [`Group::open`] for an existing group.

mod group_builder;
mod group_metadata;

use std::sync::Arc;

use thiserror::Error;

use crate::{
    array::ErrorKind,
    metadata::{AdditionalFields, UnsupportedAdditionalFieldError},
    node::{NodePath, NodePathError},
    storage::{meta_key, ReadableStorageTraits, StorageError, WritableStorageTraits},
};

pub use self::{group_builder::GroupBuilder, group_metadata::GroupMetadata};

/// A group.
#[derive(Debug)]
pub struct Group<TStorage: ?Sized> {
    /// The storage.
    storage: Arc<TStorage>,
    /// The path of the group in the store.
    path: NodePath,
    /// The metadata.
    metadata: GroupMetadata,
}

impl<TStorage: ?Sized> Group<TStorage> {
    /// Create a group in `storage` at `path` with `metadata`.
    /// This does **not** write to the store, use [`store_metadata`](Group::store_metadata) to write `metadata` to `storage`.
    ///
    /// # Errors
    /// Returns [`GroupCreateError`] if the path is invalid or the metadata has an additional field that must be understood.
    pub fn new_with_metadata(
        storage: Arc<TStorage>,
        path: &str,
        metadata: GroupMetadata,
    ) -> Result<Self, GroupCreateError> {
        let path = NodePath::new(path)?;
        metadata.additional_fields.validate()?;
        Ok(Self {
            storage,
            path,
            metadata,
        })
    }

    /// Get the path.
    #[must_use]
    pub const fn path(&self) -> &NodePath {
        &self.path
    }

    /// Get the attributes.
    #[must_use]
    pub const fn attributes(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.metadata.attributes
    }

    /// Mutably borrow the group attributes.
    ///
    /// Changes are persisted by the next call to [`store_metadata`](Group::store_metadata).
    #[must_use]
    pub fn attributes_mut(&mut self) -> &mut serde_json::Map<String, serde_json::Value> {
        &mut self.metadata.attributes
    }

    /// Get the additional fields.
    #[must_use]
    pub const fn additional_fields(&self) -> &AdditionalFields {
        &self.metadata.additional_fields
    }

    /// Get the group metadata.
    #[must_use]
    pub const fn metadata(&self) -> &GroupMetadata {
        &self.metadata
    }
}

impl<TStorage: ?Sized + ReadableStorageTraits> Group<TStorage> {
    /// Open an existing group in `storage` at `path`. The metadata is read from the store.
    ///
    /// # Errors
    /// Returns [`GroupCreateError::MissingMetadata`] if the group metadata does not exist,
    /// or another [`GroupCreateError`] if there is a storage error or the metadata is not group metadata.
    pub fn open(storage: Arc<TStorage>, path: &str) -> Result<Self, GroupCreateError> {
        let node_path = NodePath::new(path)?;
        let metadata = storage
            .get(&meta_key(&node_path))?
            .ok_or(GroupCreateError::MissingMetadata)?;
        let metadata: GroupMetadata = serde_json::from_slice(&metadata)?;
        log::debug!("group {node_path}: opened");
        Self::new_with_metadata(storage, path, metadata)
    }
}

impl<TStorage: ?Sized + WritableStorageTraits> Group<TStorage> {
    /// Store metadata.
    ///
    /// # Errors
    /// Returns [`StorageError`] if the metadata could not be written to the store.
    pub fn store_metadata(&self) -> Result<(), StorageError> {
        let key = meta_key(self.path());
        let json = serde_json::to_vec_pretty(self.metadata())
            .map_err(|err| StorageError::InvalidMetadata(key.clone(), err.to_string()))?;
        self.storage.set(&key, json.into())?;
        log::debug!("group {}: stored metadata", self.path());
        Ok(())
    }
}

/// A failure to open or create a group.
#[derive(Debug, Error)]
pub enum GroupCreateError {
    /// The path is not a valid node path.
    #[error(transparent)]
    NodePathError(#[from] NodePathError),
    /// No `zarr.json` exists at the path.
    #[error("no group metadata at the path")]
    MissingMetadata,
    /// The store failed while reading the metadata.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// The metadata document is not valid group metadata JSON, for example the metadata of an array.
    #[error(transparent)]
    MetadataDeserializationError(#[from] serde_json::Error),
    /// The metadata has an extra field that must be understood.
    #[error(transparent)]
    UnsupportedAdditionalFieldError(#[from] UnsupportedAdditionalFieldError),
}

impl GroupCreateError {
    /// The [`ErrorKind`] of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingMetadata => ErrorKind::NotFound,
            Self::StorageError(_) => ErrorKind::Storage,
            Self::NodePathError(_)
            | Self::MetadataDeserializationError(_)
            | Self::UnsupportedAdditionalFieldError(_) => ErrorKind::MetadataCorrupt,
        }
    }
}
