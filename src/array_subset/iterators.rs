//! Iterators over the elements of an [`ArraySubset`](super::ArraySubset).
//!
//! [`IndicesIterator`] yields the indices of every element.
//! [`ContiguousIndicesIterator`] and [`ContiguousLinearisedIndicesIterator`] yield runs of elements that are adjacent in the C order of the array, which is how bytes are copied between a chunk and a subset.

mod contiguous_indices_iterator;
mod indices_iterator;

pub use contiguous_indices_iterator::{
    ContiguousIndicesIterator, ContiguousLinearisedIndicesIterator,
};
pub use indices_iterator::IndicesIterator;

#[cfg(test)]
mod tests {
    use crate::array_subset::ArraySubset;

    #[test]
    fn indices_row_major() {
        let subset = ArraySubset::new_with_ranges(&[0..2, 3..6]);
        let indices = subset.iter_indices();
        assert_eq!(indices.len(), 6);
        assert_eq!(
            indices.collect::<Vec<_>>(),
            vec![
                vec![0, 3],
                vec![0, 4],
                vec![0, 5],
                vec![1, 3],
                vec![1, 4],
                vec![1, 5]
            ]
        );

        let mut fused = ArraySubset::new_with_ranges(&[7..8]).iter_indices();
        assert_eq!(fused.next(), Some(vec![7]));
        assert_eq!(fused.next(), None);
        assert_eq!(fused.next(), None);
    }

    #[test]
    fn indices_degenerate() {
        assert_eq!(
            ArraySubset::new_with_ranges(&[0..4, 2..2, 0..4])
                .iter_indices()
                .count(),
            0
        );
        // A zero-dimensional subset has exactly one element
        assert_eq!(
            ArraySubset::new_with_shape(vec![])
                .iter_indices()
                .collect::<Vec<_>>(),
            vec![Vec::<u64>::new()]
        );
    }

    #[test]
    fn contiguous_runs() {
        // (subset ranges, array shape, expected runs)
        let cases: [(&[std::ops::Range<u64>], &[u64], Vec<(Vec<u64>, u64)>); 4] = [
            // whole array is one run
            (&[0..3, 0..5], &[3, 5], vec![(vec![0, 0], 15)]),
            // full rows merge into one run
            (&[1..3, 0..5], &[3, 5], vec![(vec![1, 0], 10)]),
            // partial rows do not merge
            (&[0..3, 2..4], &[3, 5], vec![(vec![0, 2], 2), (vec![1, 2], 2), (vec![2, 2], 2)]),
            // trailing full dimensions merge up to the first partial one
            (&[0..2, 1..2, 0..4], &[2, 3, 4], vec![(vec![0, 1, 0], 4), (vec![1, 1, 0], 4)]),
        ];
        for (ranges, shape, expected) in cases {
            let subset = ArraySubset::new_with_ranges(ranges);
            let runs = subset.iter_contiguous_indices(shape).unwrap();
            assert_eq!(runs.len(), expected.len());
            assert_eq!(runs.contiguous_elements(), expected[0].1);
            assert_eq!(runs.collect::<Vec<_>>(), expected);
        }
    }

    #[test]
    fn contiguous_runs_empty_and_invalid() {
        let subset = ArraySubset::new_with_ranges(&[0..3, 1..1]);
        assert_eq!(subset.iter_contiguous_indices(&[3, 3]).unwrap().count(), 0);

        let subset = ArraySubset::new_with_ranges(&[0..3, 1..3]);
        assert!(subset.iter_contiguous_indices(&[3, 2]).is_err());
        assert!(subset.iter_contiguous_indices(&[3]).is_err());
        assert!(subset.iter_contiguous_linearised_indices(&[2, 3]).is_err());
    }

    #[test]
    fn contiguous_linearised_runs() {
        // 0  1  2  3  4
        // 5  6  7  8  9
        // 10 11 12 13 14
        let subset = ArraySubset::new_with_ranges(&[0..3, 2..4]);
        let runs = subset.iter_contiguous_linearised_indices(&[3, 5]).unwrap();
        assert_eq!(runs.collect::<Vec<_>>(), vec![(2, 2), (7, 2), (12, 2)]);

        let subset = ArraySubset::new_with_ranges(&[1..3, 0..5]);
        let runs = subset.iter_contiguous_linearised_indices(&[3, 5]).unwrap();
        assert_eq!(runs.collect::<Vec<_>>(), vec![(5, 10)]);
    }
}
