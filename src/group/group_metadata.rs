use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::metadata::AdditionalFields;

/// The `zarr.json` document of a group.
///
/// ```json
/// {
///   "zarr_format": 3,
///   "node_type": "group",
///   "attributes": {"spam": "ham", "eggs": 42}
/// }
/// ```
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Display)]
#[display("{}", serde_json::to_string(self).unwrap_or_default())]
pub struct GroupMetadata {
    /// Always `3`.
    pub zarr_format: monostate::MustBe!(3u64),
    /// Always `"group"`.
    pub node_type: monostate::MustBe!("group"),
    /// Free-form user attributes. Omitted from the document when empty.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, serde_json::Value>,
    /// Any other top level fields.
    #[serde(flatten)]
    pub additional_fields: AdditionalFields,
}

impl Default for GroupMetadata {
    fn default() -> Self {
        Self::new(serde_json::Map::default())
    }
}

impl GroupMetadata {
    /// Group metadata with `attributes` and no additional fields.
    #[must_use]
    pub fn new(attributes: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            zarr_format: monostate::MustBe!(3u64),
            node_type: monostate::MustBe!("group"),
            attributes,
            additional_fields: AdditionalFields::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_metadata_json() {
        let metadata: GroupMetadata = serde_json::from_str(
            r#"{"zarr_format":3,"node_type":"group","attributes":{"spam":"ham"}}"#,
        )
        .unwrap();
        assert_eq!(metadata.attributes["spam"], "ham");
        assert_eq!(
            GroupMetadata::default().to_string(),
            r#"{"zarr_format":3,"node_type":"group"}"#
        );
        assert!(serde_json::from_str::<GroupMetadata>(r#"{"zarr_format":2,"node_type":"group"}"#)
            .is_err());
        assert!(serde_json::from_str::<GroupMetadata>(r#"{"zarr_format":3,"node_type":"array"}"#)
            .is_err());
    }
}
