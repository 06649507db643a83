use derive_more::Display;

use super::{data_type::IncompatibleFillValueError, ArrayShape, ChunkShape, DataType, FillValue};

/// The shape, data type and fill value of a decoded chunk.
///
/// Codecs that interpret chunk bytes as elements, such as `sharding_indexed`, are given this instead of a byte count.
#[derive(Clone, Debug, Display)]
#[display("{shape:?} {data_type} {fill_value}")]
pub struct ChunkRepresentation {
    shape: ChunkShape,
    data_type: DataType,
    fill_value: FillValue,
}

impl ChunkRepresentation {
    /// Create a new [`ChunkRepresentation`].
    ///
    /// # Errors
    /// Returns [`IncompatibleFillValueError`] if `fill_value` does not have the size of `data_type`.
    pub fn new(
        shape: ChunkShape,
        data_type: DataType,
        fill_value: FillValue,
    ) -> Result<Self, IncompatibleFillValueError> {
        if data_type.size() == fill_value.size() {
            Ok(Self {
                shape,
                data_type,
                fill_value,
            })
        } else {
            Err(IncompatibleFillValueError::new(
                data_type.name(),
                fill_value,
            ))
        }
    }

    /// Create a new [`ChunkRepresentation`] whose fill value is known to match the data type.
    pub(crate) fn new_unchecked(
        shape: ChunkShape,
        data_type: DataType,
        fill_value: FillValue,
    ) -> Self {
        debug_assert_eq!(data_type.size(), fill_value.size());
        Self {
            shape,
            data_type,
            fill_value,
        }
    }

    /// The chunk shape.
    #[must_use]
    pub const fn shape(&self) -> &ChunkShape {
        &self.shape
    }

    /// The chunk shape as an [`ArrayShape`].
    #[must_use]
    pub fn shape_u64(&self) -> ArrayShape {
        self.shape.to_array_shape()
    }

    /// The dimensionality of the chunk.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.shape.len()
    }

    /// The data type of the elements.
    #[must_use]
    pub const fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// The fill value.
    #[must_use]
    pub const fn fill_value(&self) -> &FillValue {
        &self.fill_value
    }

    /// The size in bytes of an element.
    #[must_use]
    pub const fn element_size(&self) -> usize {
        self.data_type.size()
    }

    /// The number of elements, saturating at [`u64::MAX`].
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.num_elements_checked().unwrap_or(u64::MAX)
    }

    /// The decoded size in bytes, saturating at [`u64::MAX`].
    #[must_use]
    pub fn size(&self) -> u64 {
        self.num_elements()
            .saturating_mul(self.element_size() as u64)
    }

    /// Same representation with a different `shape`.
    #[must_use]
    pub fn with_shape(&self, shape: ChunkShape) -> Self {
        Self {
            shape,
            data_type: self.data_type.clone(),
            fill_value: self.fill_value.clone(),
        }
    }
}
