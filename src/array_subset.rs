//! Array subsets.
//!
//! An [`ArraySubset`] is a hyperrectangle of element indices, given by a start and a shape per dimension.
//! Reads and writes of an array region, and the parts of that region falling in each chunk, are all array subsets.
//!
//! [`ArraySubset::extract_bytes`] and [`ArraySubset::store_bytes`] copy the bytes of a subset out of and into the C order bytes of an enclosing array.

mod iterators;

use std::ops::Range;

use derive_more::Display;
use itertools::izip;
use thiserror::Error;

pub use iterators::{
    ContiguousIndicesIterator, ContiguousLinearisedIndicesIterator, IndicesIterator,
};

use crate::array::{ArrayIndices, ArrayShape};

/// An array subset.
///
/// The subset is empty if any component of its shape is zero.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Default)]
#[display("start {start:?} shape {shape:?}")]
pub struct ArraySubset {
    start: ArrayIndices,
    shape: ArrayShape,
}

impl<const N: usize> From<[Range<u64>; N]> for ArraySubset {
    fn from(ranges: [Range<u64>; N]) -> Self {
        Self::new_with_ranges(&ranges)
    }
}

impl From<Vec<Range<u64>>> for ArraySubset {
    fn from(ranges: Vec<Range<u64>>) -> Self {
        Self::new_with_ranges(&ranges)
    }
}

fn check_dimensionality(
    got: usize,
    expected: usize,
) -> Result<(), IncompatibleDimensionalityError> {
    if got == expected {
        Ok(())
    } else {
        Err(IncompatibleDimensionalityError::new(got, expected))
    }
}

impl ArraySubset {
    /// Collect `(start, size)` pairs, one per dimension.
    fn from_pairs(pairs: impl Iterator<Item = (u64, u64)>) -> Self {
        let (start, shape) = pairs.unzip();
        Self { start, shape }
    }

    /// Create an empty array subset with `dimensionality` dimensions.
    #[must_use]
    pub fn new_empty(dimensionality: usize) -> Self {
        Self {
            start: vec![0; dimensionality],
            shape: vec![0; dimensionality],
        }
    }

    /// Create an array subset with `shape` at the origin.
    #[must_use]
    pub fn new_with_shape(shape: ArrayShape) -> Self {
        Self {
            start: vec![0; shape.len()],
            shape,
        }
    }

    /// Create an array subset covering `ranges`.
    ///
    /// A range ending before its start is empty.
    #[must_use]
    pub fn new_with_ranges(ranges: &[Range<u64>]) -> Self {
        Self::from_pairs(
            ranges
                .iter()
                .map(|range| (range.start, range.end.saturating_sub(range.start))),
        )
    }

    /// Create an array subset from `start` and `shape`.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if `start` and `shape` have different lengths.
    pub fn new_with_start_shape(
        start: ArrayIndices,
        shape: ArrayShape,
    ) -> Result<Self, IncompatibleDimensionalityError> {
        check_dimensionality(shape.len(), start.len())?;
        Ok(Self { start, shape })
    }

    /// Create an array subset from `start` to an inclusive `end`.
    ///
    /// An `end` of [`u64::MAX`] is clipped to [`u64::MAX`] exclusive.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if `start` and `end` have different lengths.
    pub fn new_with_start_end_inc(
        start: ArrayIndices,
        end: &[u64],
    ) -> Result<Self, IncompatibleDimensionalityError> {
        check_dimensionality(end.len(), start.len())?;
        let shape = std::iter::zip(&start, end)
            .map(|(&start, &end)| end.saturating_add(1).saturating_sub(start))
            .collect();
        Ok(Self { start, shape })
    }

    /// Create an array subset from `start` to an exclusive `end`.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if `start` and `end` have different lengths.
    pub fn new_with_start_end_exc(
        start: ArrayIndices,
        end: &[u64],
    ) -> Result<Self, IncompatibleDimensionalityError> {
        check_dimensionality(end.len(), start.len())?;
        let shape = std::iter::zip(&start, end)
            .map(|(&start, &end)| end.saturating_sub(start))
            .collect();
        Ok(Self { start, shape })
    }

    /// Return the start.
    #[must_use]
    pub fn start(&self) -> &[u64] {
        &self.start
    }

    /// Return the shape.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Return the number of dimensions.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.start.len()
    }

    /// Returns true if the array subset has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shape.contains(&0)
    }

    /// Return the inclusive end.
    ///
    /// Returns [`None`] if the array subset is empty or its end is beyond [`u64::MAX`].
    #[must_use]
    pub fn end_inc(&self) -> Option<ArrayIndices> {
        if self.is_empty() {
            return None;
        }
        std::iter::zip(&self.start, &self.shape)
            .map(|(start, size)| start.checked_add(size - 1))
            .collect()
    }

    /// The exclusive end of each dimension, [`None`] where it is beyond [`u64::MAX`].
    fn end_exc(&self) -> impl Iterator<Item = Option<u64>> + '_ {
        std::iter::zip(&self.start, &self.shape).map(|(start, size)| start.checked_add(*size))
    }

    /// Return the number of elements, the product of the shape.
    ///
    /// Saturates at [`u64::MAX`], see [`num_elements_checked`](Self::num_elements_checked).
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape
            .iter()
            .fold(1u64, |count, &size| count.saturating_mul(size))
    }

    /// Return the number of elements, or [`None`] if it exceeds [`u64::MAX`].
    #[must_use]
    pub fn num_elements_checked(&self) -> Option<u64> {
        self.shape
            .iter()
            .try_fold(1u64, |count, &size| count.checked_mul(size))
    }

    /// Return the size in bytes of the array subset with `element_size` byte elements.
    ///
    /// Returns [`None`] if the size exceeds [`u64::MAX`].
    #[must_use]
    pub fn size_bytes(&self, element_size: usize) -> Option<u64> {
        self.num_elements_checked()?.checked_mul(element_size as u64)
    }

    /// Return the number of elements as a `usize`.
    ///
    /// # Panics
    /// Panics if [`num_elements()`](Self::num_elements()) exceeds [`usize::MAX`].
    #[must_use]
    pub fn num_elements_usize(&self) -> usize {
        usize::try_from(self.num_elements()).unwrap()
    }

    /// Returns true if the array subset lies within an array of `array_shape`.
    ///
    /// A subset whose end is beyond [`u64::MAX`] is never in bounds.
    #[must_use]
    pub fn inbounds(&self, array_shape: &[u64]) -> bool {
        self.dimensionality() == array_shape.len()
            && self
                .end_exc()
                .zip(array_shape)
                .all(|(end, shape)| end.is_some_and(|end| end <= *shape))
    }

    /// Clip the array subset to the region below the exclusive `end`.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if `end` has a different dimensionality.
    pub fn bound(&self, end: &[u64]) -> Result<Self, IncompatibleDimensionalityError> {
        check_dimensionality(end.len(), self.dimensionality())?;
        Ok(Self::from_pairs(
            izip!(&self.start, self.end_exc(), end).map(|(&start, subset_end, &end)| {
                let start = start.min(end);
                let subset_end = subset_end.unwrap_or(u64::MAX);
                (start, subset_end.min(end).saturating_sub(start))
            }),
        ))
    }

    /// Return the intersection with `other`, which is empty if they do not overlap.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if `other` has a different dimensionality.
    pub fn overlap(&self, other: &Self) -> Result<Self, IncompatibleDimensionalityError> {
        check_dimensionality(other.dimensionality(), self.dimensionality())?;
        Ok(Self::from_pairs(
            izip!(&self.start, self.end_exc(), &other.start, other.end_exc()).map(
                |(&start_a, end_a, &start_b, end_b)| {
                    let start = start_a.max(start_b);
                    let end = end_a.unwrap_or(u64::MAX).min(end_b.unwrap_or(u64::MAX));
                    (start, end.saturating_sub(start))
                },
            ),
        ))
    }

    /// Return the array subset with its start measured from `origin`.
    ///
    /// `origin` must not exceed the start in any dimension.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if `origin` has a different dimensionality.
    pub fn relative_to(&self, origin: &[u64]) -> Result<Self, IncompatibleDimensionalityError> {
        check_dimensionality(origin.len(), self.dimensionality())?;
        debug_assert!(std::iter::zip(&self.start, origin).all(|(start, origin)| start >= origin));
        Ok(Self {
            start: std::iter::zip(&self.start, origin)
                .map(|(start, origin)| start.saturating_sub(*origin))
                .collect(),
            shape: self.shape.clone(),
        })
    }

    /// Byte ranges of the runs of this subset within the bytes of an array of `array_shape`, in C order.
    ///
    /// `array_bytes` is the length of those bytes, which must match `array_shape` and `element_size`.
    /// Every run then lies within `array_bytes`, so offsets fit in a `usize`.
    #[allow(clippy::cast_possible_truncation)]
    fn byte_runs<'a>(
        &self,
        array_bytes: usize,
        array_shape: &'a [u64],
        element_size: usize,
    ) -> Result<impl Iterator<Item = Range<usize>> + 'a, ArraySubsetBytesError> {
        let expected = array_shape
            .iter()
            .try_fold(element_size as u64, |size, &dim| size.checked_mul(dim));
        if expected != Some(array_bytes as u64) {
            return Err(ArraySubsetBytesError::ArrayBytesLength(
                array_bytes,
                expected.unwrap_or(u64::MAX),
            ));
        }
        Ok(self
            .iter_contiguous_linearised_indices(array_shape)?
            .map(move |(index, length)| {
                let start = index as usize * element_size;
                start..start + length as usize * element_size
            }))
    }

    /// Return the bytes of this subset within `bytes`, the C order bytes of an array of `array_shape` with `element_size` byte elements.
    ///
    /// # Errors
    /// Returns [`ArraySubsetBytesError`] if the array subset is not within `array_shape`, or `bytes` does not match `array_shape` and `element_size`.
    pub fn extract_bytes(
        &self,
        bytes: &[u8],
        array_shape: &[u64],
        element_size: usize,
    ) -> Result<Vec<u8>, ArraySubsetBytesError> {
        let runs = self.byte_runs(bytes.len(), array_shape, element_size)?;
        let mut subset_bytes = Vec::with_capacity(self.num_elements_usize() * element_size);
        for run in runs {
            subset_bytes.extend_from_slice(&bytes[run]);
        }
        Ok(subset_bytes)
    }

    /// Overwrite the bytes of this subset within `array_bytes` with `subset_bytes`.
    ///
    /// `array_bytes` are the C order bytes of an array of `array_shape` with `element_size` byte elements.
    ///
    /// # Errors
    /// Returns [`ArraySubsetBytesError`] if the array subset is not within `array_shape`, or a byte length does not match its shape and `element_size`.
    pub fn store_bytes(
        &self,
        subset_bytes: &[u8],
        array_bytes: &mut [u8],
        array_shape: &[u64],
        element_size: usize,
    ) -> Result<(), ArraySubsetBytesError> {
        let expected = self.size_bytes(element_size);
        if expected != Some(subset_bytes.len() as u64) {
            return Err(ArraySubsetBytesError::SubsetBytesLength(
                subset_bytes.len(),
                expected.unwrap_or(u64::MAX),
            ));
        }
        let mut remaining = subset_bytes;
        for run in self.byte_runs(array_bytes.len(), array_shape, element_size)? {
            let (head, tail) = remaining.split_at(run.len());
            array_bytes[run].copy_from_slice(head);
            remaining = tail;
        }
        Ok(())
    }

    /// Returns an iterator over the indices of every element.
    #[must_use]
    pub fn iter_indices(&self) -> IndicesIterator {
        IndicesIterator::new(self.clone())
    }

    /// Returns an iterator over the starting indices and lengths of runs of elements that are contiguous within an array of `array_shape`.
    ///
    /// # Errors
    /// Returns [`IncompatibleArraySubsetAndShapeError`] if the array subset is not within `array_shape`.
    pub fn iter_contiguous_indices(
        &self,
        array_shape: &[u64],
    ) -> Result<ContiguousIndicesIterator, IncompatibleArraySubsetAndShapeError> {
        ContiguousIndicesIterator::new(self, array_shape)
    }

    /// As [`ArraySubset::iter_contiguous_indices`], with each run start linearised in `array_shape`.
    ///
    /// # Errors
    /// Returns [`IncompatibleArraySubsetAndShapeError`] if the array subset is not within `array_shape`.
    pub fn iter_contiguous_linearised_indices<'a>(
        &self,
        array_shape: &'a [u64],
    ) -> Result<ContiguousLinearisedIndicesIterator<'a>, IncompatibleArraySubsetAndShapeError>
    {
        ContiguousLinearisedIndicesIterator::new(self, array_shape)
    }
}

/// An incompatible dimensionality error.
#[derive(Copy, Clone, Debug, Error)]
#[error("incompatible dimensionality {0}, expected {1}")]
pub struct IncompatibleDimensionalityError(usize, usize);

impl IncompatibleDimensionalityError {
    /// Create a new incompatible dimensionality error.
    #[must_use]
    pub const fn new(got: usize, expected: usize) -> Self {
        Self(got, expected)
    }
}

/// An incompatible array subset and array shape error.
#[derive(Clone, Debug, Error)]
#[error("incompatible array subset {0} with array shape {1:?}")]
pub struct IncompatibleArraySubsetAndShapeError(ArraySubset, ArrayShape);

impl IncompatibleArraySubsetAndShapeError {
    /// Create a new incompatible array subset and shape error.
    #[must_use]
    pub fn new(subset: ArraySubset, array_shape: ArrayShape) -> Self {
        Self(subset, array_shape)
    }
}

/// An error copying the bytes of an array subset.
#[derive(Debug, Error)]
pub enum ArraySubsetBytesError {
    /// The array subset is not within the array.
    #[error(transparent)]
    IncompatibleShape(#[from] IncompatibleArraySubsetAndShapeError),
    /// The array bytes have the wrong length.
    #[error("array bytes have length {0}, expected {1}")]
    ArrayBytesLength(usize, u64),
    /// The subset bytes have the wrong length.
    #[error("subset bytes have length {0}, expected {1}")]
    SubsetBytesLength(usize, u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_subset_constructors() {
        assert!(ArraySubset::new_with_start_shape(vec![0, 0], vec![10]).is_err());
        assert!(ArraySubset::new_with_start_end_inc(vec![0, 0], &[10]).is_err());
        assert_eq!(
            ArraySubset::new_with_start_end_exc(vec![1, 4], &[4, 2]).unwrap(),
            ArraySubset::new_with_ranges(&[1..4, 4..2])
        );
        assert_eq!(
            ArraySubset::new_with_start_end_inc(vec![1, 2], &[3, 2]).unwrap(),
            ArraySubset::new_with_ranges(&[1..4, 2..3])
        );
        assert_eq!(
            ArraySubset::new_with_start_shape(vec![1, 5], vec![2, 0]).unwrap(),
            [1..3, 5..2].into()
        );
        assert_eq!(ArraySubset::from(vec![0..1]).shape(), &[1]);
        assert_eq!(
            ArraySubset::new_with_shape(vec![5, 5]).to_string(),
            "start [0, 0] shape [5, 5]"
        );
        assert!(ArraySubset::new_empty(2).is_empty());
    }

    #[test]
    fn array_subset_extent() {
        let subset = ArraySubset::new_with_ranges(&[1..3, 4..7]);
        assert_eq!(subset.end_inc(), Some(vec![2, 6]));
        assert_eq!(subset.num_elements(), 6);
        assert!(subset.inbounds(&[3, 7]));
        assert!(!subset.inbounds(&[2, 7]));
        assert!(!subset.inbounds(&[3, 7, 1]));
        let empty = ArraySubset::new_with_ranges(&[1..3, 4..4]);
        assert!(empty.is_empty());
        assert_eq!(empty.end_inc(), None);
        assert_eq!(empty.num_elements(), 0);
    }

    #[test]
    fn array_subset_extent_overflow() {
        let subset = ArraySubset::new_with_start_shape(vec![u64::MAX], vec![2]).unwrap();
        assert!(!subset.inbounds(&[4]));
        assert!(!subset.inbounds(&[u64::MAX]));
        assert_eq!(subset.end_inc(), None);
        assert_eq!(
            subset.bound(&[4]).unwrap(),
            ArraySubset::new_with_start_shape(vec![4], vec![0]).unwrap()
        );
        assert!(subset
            .overlap(&ArraySubset::new_with_ranges(&[0..4]))
            .unwrap()
            .is_empty());

        let last = ArraySubset::new_with_start_end_inc(vec![u64::MAX - 1], &[u64::MAX]).unwrap();
        assert_eq!(last.shape(), &[1]);
        assert!(last.inbounds(&[u64::MAX]));

        let huge = ArraySubset::new_with_shape(vec![u64::MAX, 2]);
        assert_eq!(huge.num_elements(), u64::MAX);
        assert_eq!(huge.num_elements_checked(), None);
        assert_eq!(huge.size_bytes(1), None);
        assert_eq!(
            ArraySubset::new_with_shape(vec![3, 2]).size_bytes(4),
            Some(24)
        );
    }

    #[test]
    fn array_subset_bound() {
        let subset = ArraySubset::new_with_ranges(&[2..10, 0..4]);
        assert_eq!(
            subset.bound(&[5, 8]).unwrap(),
            ArraySubset::new_with_ranges(&[2..5, 0..4])
        );
        assert!(subset.bound(&[1, 8]).unwrap().is_empty());
        assert!(subset.bound(&[5, 5, 5]).is_err());
    }

    #[test]
    fn array_subset_overlap() {
        let a = ArraySubset::new_with_ranges(&[1..5, 1..5]);
        let b = ArraySubset::new_with_ranges(&[3..6, 0..2]);
        let overlap = a.overlap(&b).unwrap();
        assert_eq!(overlap, ArraySubset::new_with_ranges(&[3..5, 1..2]));
        assert_eq!(
            overlap.relative_to(b.start()).unwrap(),
            ArraySubset::new_with_ranges(&[0..2, 1..2])
        );
        assert!(a
            .overlap(&ArraySubset::new_with_ranges(&[6..7, 0..2]))
            .unwrap()
            .is_empty());
        assert!(a.overlap(&ArraySubset::new_with_ranges(&[0..1])).is_err());
        assert!(a.relative_to(&[1]).is_err());
    }

    #[test]
    fn array_subset_bytes() {
        // 4x4 u16 array, element n has bytes [n, 0]
        let array: Vec<u8> = (0..16u8).flat_map(|n| [n, 0]).collect();
        let subset = ArraySubset::new_with_ranges(&[1..3, 1..3]);
        assert_eq!(
            subset.extract_bytes(&array, &[4, 4], 2).unwrap(),
            vec![5, 0, 6, 0, 9, 0, 10, 0]
        );
        assert!(matches!(
            subset.extract_bytes(&array, &[4, 4], 1),
            Err(ArraySubsetBytesError::ArrayBytesLength(32, 16))
        ));
        assert!(matches!(
            subset.extract_bytes(&array[..8], &[2, 2], 2),
            Err(ArraySubsetBytesError::IncompatibleShape(_))
        ));

        let mut array = vec![0u8; 16];
        subset.store_bytes(&[1, 2, 3, 4], &mut array, &[4, 4], 1).unwrap();
        assert_eq!(array, vec![0, 0, 0, 0, 0, 1, 2, 0, 0, 3, 4, 0, 0, 0, 0, 0]);
        assert!(matches!(
            subset.store_bytes(&[1, 2, 3], &mut array, &[4, 4], 1),
            Err(ArraySubsetBytesError::SubsetBytesLength(3, 4))
        ));
        assert!(subset
            .store_bytes(&[1, 2, 3, 4], &mut array[..12], &[2, 6], 1)
            .is_err());
    }
}
