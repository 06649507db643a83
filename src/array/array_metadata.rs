use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::metadata::{AdditionalFields, Metadata};

use super::{ArrayShape, FillValueMetadata};

/// The `zarr.json` document of an array.
///
/// A 3D `uint16` array of 512 cubed elements in 64 cubed chunks, compressed with zstd and checksummed:
/// ```json
/// {
///   "zarr_format": 3,
///   "node_type": "array",
///   "shape": [512, 512, 512],
///   "data_type": "uint16",
///   "chunk_grid": {"name": "regular", "configuration": {"chunk_shape": [64, 64, 64]}},
///   "chunk_key_encoding": {"name": "default", "configuration": {"separator": "/"}},
///   "fill_value": 0,
///   "codecs": [
///     {"name": "zstd", "configuration": {"level": 3, "checksum": false}},
///     {"name": "crc32c"}
///   ],
///   "attributes": {"voxel_size_nm": [4, 4, 40]}
/// }
/// ```
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Display)]
#[display("{}", serde_json::to_string(self).unwrap_or_default())]
pub struct ArrayMetadata {
    /// Always `3`.
    pub zarr_format: monostate::MustBe!(3u64),
    /// Always `"array"`.
    pub node_type: monostate::MustBe!("array"),
    /// Extent of each dimension.
    pub shape: ArrayShape,
    /// Element type name, e.g. `"float32"` or `"r16"`.
    pub data_type: Metadata,
    /// Partition of the shape into chunks.
    pub chunk_grid: Metadata,
    /// How chunk grid indices become store keys.
    pub chunk_key_encoding: Metadata,
    /// Value of elements that were never written, in the JSON form of the data type.
    ///
    /// Booleans and integers are JSON literals.
    /// Floats are numbers, `"NaN"`, `"Infinity"`, `"-Infinity"` or a big endian hex string such as `"0x7fc00000"`.
    /// Raw bits are an array of bytes.
    pub fill_value: FillValueMetadata,
    /// Codecs in the order they are applied on encode.
    pub codecs: Vec<Metadata>,
    /// Free-form user attributes. Omitted from the document when empty.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, serde_json::Value>,
    /// Any other top level fields.
    #[serde(flatten)]
    pub additional_fields: AdditionalFields,
}

impl ArrayMetadata {
    /// Assemble array metadata with no additional fields.
    #[must_use]
    pub fn new(
        shape: ArrayShape,
        data_type: Metadata,
        chunk_grid: Metadata,
        chunk_key_encoding: Metadata,
        fill_value: FillValueMetadata,
        codecs: Vec<Metadata>,
        attributes: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            zarr_format: monostate::MustBe!(3u64),
            node_type: monostate::MustBe!("array"),
            shape,
            data_type,
            chunk_grid,
            chunk_key_encoding,
            fill_value,
            codecs,
            attributes,
            additional_fields: AdditionalFields::default(),
        }
    }

    /// Replace the additional fields.
    #[must_use]
    pub fn with_additional_fields(mut self, additional_fields: AdditionalFields) -> Self {
        self.additional_fields = additional_fields;
        self
    }
}
