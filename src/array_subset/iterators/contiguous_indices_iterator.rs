use std::iter::FusedIterator;

use itertools::izip;

use crate::{
    array::{ravel_indices, ArrayIndices},
    array_subset::{ArraySubset, IncompatibleArraySubsetAndShapeError},
};

use super::IndicesIterator;

/// Split `subset` of an array with `array_shape` into the subset of run starts and the run length.
///
/// A run always covers the innermost dimension of the subset.
/// It extends outward past every inner dimension that the subset spans entirely.
fn split_runs(subset: &ArraySubset, array_shape: &[u64]) -> (ArraySubset, u64) {
    if subset.is_empty() {
        return (subset.clone(), 0);
    }
    let spanned = izip!(subset.start(), subset.shape(), array_shape)
        .rev()
        .take_while(|&(start, size, array_size)| *start == 0 && size == array_size)
        .count();
    let run_dimensionality = (spanned + 1).min(subset.dimensionality());
    let outer_dimensionality = subset.dimensionality() - run_dimensionality;
    let run_length = subset.shape()[outer_dimensionality..].iter().product();

    let mut starts_shape = subset.shape().to_vec();
    starts_shape[outer_dimensionality..].fill(1);
    let starts = ArraySubset {
        start: subset.start().to_vec(),
        shape: starts_shape,
    };
    (starts, run_length)
}

/// Iterates over runs of contiguous elements of an array subset in C order.
///
/// Each item is the indices of the first element of a run and the run length.
/// Every run of a subset has the same length.
pub struct ContiguousIndicesIterator {
    starts: IndicesIterator,
    run_length: u64,
}

impl ContiguousIndicesIterator {
    /// Create a new contiguous indices iterator over `subset` of an array with `array_shape`.
    ///
    /// # Errors
    /// Returns [`IncompatibleArraySubsetAndShapeError`] if `subset` is not within `array_shape`.
    pub fn new(
        subset: &ArraySubset,
        array_shape: &[u64],
    ) -> Result<Self, IncompatibleArraySubsetAndShapeError> {
        if !subset.inbounds(array_shape) {
            return Err(IncompatibleArraySubsetAndShapeError::new(
                subset.clone(),
                array_shape.to_vec(),
            ));
        }
        let (starts, run_length) = split_runs(subset, array_shape);
        Ok(Self {
            starts: IndicesIterator::new(starts),
            run_length,
        })
    }

    /// Return the number of elements in each run.
    #[must_use]
    pub fn contiguous_elements(&self) -> u64 {
        self.run_length
    }
}

impl Iterator for ContiguousIndicesIterator {
    type Item = (ArrayIndices, u64);

    fn next(&mut self) -> Option<Self::Item> {
        let run_length = self.run_length;
        self.starts.next().map(|start| (start, run_length))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.starts.size_hint()
    }
}

impl ExactSizeIterator for ContiguousIndicesIterator {}

impl FusedIterator for ContiguousIndicesIterator {}

/// Iterates over runs of contiguous elements of an array subset in C order.
///
/// Each item is the linearised (C order) index in the array of the first element of a run and the run length.
pub struct ContiguousLinearisedIndicesIterator<'a> {
    runs: ContiguousIndicesIterator,
    array_shape: &'a [u64],
}

impl<'a> ContiguousLinearisedIndicesIterator<'a> {
    /// Create a new contiguous linearised indices iterator over `subset` of an array with `array_shape`.
    ///
    /// # Errors
    /// Returns [`IncompatibleArraySubsetAndShapeError`] if `subset` is not within `array_shape`.
    pub fn new(
        subset: &ArraySubset,
        array_shape: &'a [u64],
    ) -> Result<Self, IncompatibleArraySubsetAndShapeError> {
        Ok(Self {
            runs: ContiguousIndicesIterator::new(subset, array_shape)?,
            array_shape,
        })
    }

    /// Return the number of elements in each run.
    #[must_use]
    pub fn contiguous_elements(&self) -> u64 {
        self.runs.contiguous_elements()
    }
}

impl Iterator for ContiguousLinearisedIndicesIterator<'_> {
    type Item = (u64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        let (start, run_length) = self.runs.next()?;
        Some((ravel_indices(&start, self.array_shape), run_length))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.runs.size_hint()
    }
}

impl ExactSizeIterator for ContiguousLinearisedIndicesIterator<'_> {}

impl FusedIterator for ContiguousLinearisedIndicesIterator<'_> {}
