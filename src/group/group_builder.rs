use std::sync::Arc;

use crate::metadata::AdditionalFields;

use super::{Group, GroupCreateError, GroupMetadata};

/// A [`Group`] builder.
#[derive(Debug, Default)]
pub struct GroupBuilder {
    metadata: GroupMetadata,
}

impl GroupBuilder {
    /// Create a new group builder with no attributes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the attributes.
    pub fn attributes(
        &mut self,
        attributes: serde_json::Map<String, serde_json::Value>,
    ) -> &mut Self {
        self.metadata.attributes = attributes;
        self
    }

    /// Set the additional fields.
    ///
    /// Fields that must be understood are rejected by [`build`](GroupBuilder::build).
    pub fn additional_fields(&mut self, additional_fields: AdditionalFields) -> &mut Self {
        self.metadata.additional_fields = additional_fields;
        self
    }

    /// Build into a [`Group`].
    ///
    /// # Errors
    /// Returns [`GroupCreateError`] if the path or the additional fields are invalid.
    pub fn build<TStorage: ?Sized>(
        &self,
        storage: Arc<TStorage>,
        path: &str,
    ) -> Result<Group<TStorage>, GroupCreateError> {
        Group::new_with_metadata(storage, path, self.metadata.clone())
    }
}
