use std::num::NonZeroU64;

use derive_more::Deref;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ArrayShape;

/// The shape of a chunk. All dimensions must be non-zero.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Deref)]
pub struct ChunkShape(Vec<NonZeroU64>);

/// A zero chunk dimension error.
#[derive(Copy, Clone, Debug, Error)]
#[error("chunk shape dimensions must be non-zero")]
pub struct NonZeroError;

impl ChunkShape {
    /// Return the number of elements as a u64.
    ///
    /// Equal to the product of the components of its shape.
    #[must_use]
    pub fn num_elements_u64(&self) -> u64 {
        self.0.iter().copied().map(NonZeroU64::get).product::<u64>()
    }

    /// Return the number of elements, or [`None`] if it exceeds [`u64::MAX`].
    #[must_use]
    pub fn num_elements_checked(&self) -> Option<u64> {
        self.0
            .iter()
            .try_fold(1u64, |count, size| count.checked_mul(size.get()))
    }

    /// Convert to an [`ArrayShape`].
    #[must_use]
    pub fn to_array_shape(&self) -> ArrayShape {
        chunk_shape_to_array_shape(&self.0)
    }
}

impl From<ChunkShape> for Vec<NonZeroU64> {
    fn from(val: ChunkShape) -> Self {
        val.0
    }
}

impl From<Vec<NonZeroU64>> for ChunkShape {
    fn from(value: Vec<NonZeroU64>) -> Self {
        ChunkShape(value)
    }
}

impl From<&[NonZeroU64]> for ChunkShape {
    fn from(value: &[NonZeroU64]) -> Self {
        ChunkShape(value.to_vec())
    }
}

impl TryFrom<&[u64]> for ChunkShape {
    type Error = NonZeroError;

    fn try_from(value: &[u64]) -> Result<Self, Self::Error> {
        Ok(ChunkShape(
            value
                .iter()
                .map(|&i| NonZeroU64::new(i).ok_or(NonZeroError))
                .collect::<Result<_, _>>()?,
        ))
    }
}

impl TryFrom<Vec<u64>> for ChunkShape {
    type Error = NonZeroError;

    fn try_from(value: Vec<u64>) -> Result<Self, Self::Error> {
        Self::try_from(value.as_slice())
    }
}

impl<const N: usize> TryFrom<[u64; N]> for ChunkShape {
    type Error = NonZeroError;

    fn try_from(value: [u64; N]) -> Result<Self, Self::Error> {
        Self::try_from(value.as_slice())
    }
}

/// Convert a [`ChunkShape`] to an [`ArrayShape`].
#[must_use]
pub fn chunk_shape_to_array_shape(chunk_shape: &[NonZeroU64]) -> ArrayShape {
    chunk_shape.iter().map(|i| i.get()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_shape() {
        let chunk_shape: ChunkShape = vec![2, 3, 4].try_into().unwrap();
        assert_eq!(chunk_shape.len(), 3);
        assert_eq!(chunk_shape.num_elements_u64(), 24);
        assert_eq!(chunk_shape.to_array_shape(), vec![2, 3, 4]);
        assert!(ChunkShape::try_from([2, 0]).is_err());
    }

    #[test]
    fn chunk_shape_deserialize_zero() {
        assert!(serde_json::from_str::<ChunkShape>("[1,2]").is_ok());
        assert!(serde_json::from_str::<ChunkShape>("[1,0]").is_err());
    }
}
