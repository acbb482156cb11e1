//! Seeded train/test partitioning of row indices.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum SplitError {
    #[error("Train fraction must be a finite value strictly between 0 and 1, got {0}.")]
    InvalidFraction(f64),
    #[error(
        "Splitting would leave an empty partition ({train} training rows, {test} test rows)."
    )]
    EmptyPartition { train: usize, test: usize },
}

/// A disjoint partition of `0..n` into training and test rows.
///
/// Both index vectors are sorted ascending, so subsets keep the file's row order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl TrainTestSplit {
    pub fn total(&self) -> usize {
        self.train.len() + self.test.len()
    }
}

/// Number of training rows for `n` total rows: `floor(fraction * n)`.
pub fn train_size(n: usize, fraction: f64) -> usize {
    (fraction * n as f64).floor() as usize
}

/// Draws one seeded permutation of `0..n`; the first `floor(fraction * n)` entries train.
pub fn split_rows(n: usize, fraction: f64, seed: u64) -> Result<TrainTestSplit, SplitError> {
    if !fraction.is_finite() || fraction <= 0.0 || fraction >= 1.0 {
        return Err(SplitError::InvalidFraction(fraction));
    }
    let n_train = train_size(n, fraction);
    if n_train == 0 || n_train == n {
        return Err(SplitError::EmptyPartition {
            train: n_train,
            test: n - n_train,
        });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut rng);

    let mut train = order[..n_train].to_vec();
    let mut test = order[n_train..].to_vec();
    train.sort_unstable();
    test.sort_unstable();

    log::info!(
        "Split {} rows into {} training and {} test rows (seed {}).",
        n,
        train.len(),
        test.len(),
        seed
    );
    Ok(TrainTestSplit { train, test })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_partition_is_disjoint_and_covering() {
        let n = 768;
        let split = split_rows(n, 0.6, 1234).unwrap();
        assert_eq!(split.train.len(), 460);
        assert_eq!(split.test.len(), 308);

        let train: HashSet<_> = split.train.iter().copied().collect();
        let test: HashSet<_> = split.test.iter().copied().collect();
        assert!(train.is_disjoint(&test));
        let union: HashSet<_> = train.union(&test).copied().collect();
        assert_eq!(union, (0..n).collect::<HashSet<_>>());
    }

    #[test]
    fn test_train_size_floors() {
        assert_eq!(train_size(10, 0.6), 6);
        assert_eq!(train_size(11, 0.6), 6);
        assert_eq!(train_size(9, 0.6), 5);
        for n in 2..60 {
            let split = split_rows(n, 0.6, 7).unwrap();
            assert_eq!(split.train.len(), (0.6 * n as f64).floor() as usize);
            assert_eq!(split.total(), n);
        }
    }

    #[test]
    fn test_same_seed_same_split() {
        let a = split_rows(200, 0.6, 99).unwrap();
        let b = split_rows(200, 0.6, 99).unwrap();
        assert_eq!(a, b);

        let c = split_rows(200, 0.6, 100).unwrap();
        assert_ne!(a.train, c.train);
    }

    #[test]
    fn test_indices_sorted() {
        let split = split_rows(50, 0.6, 3).unwrap();
        assert!(split.train.windows(2).all(|w| w[0] < w[1]));
        assert!(split.test.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_invalid_fraction_rejected() {
        for bad in [0.0, 1.0, -0.2, 1.5, f64::NAN] {
            assert!(matches!(
                split_rows(10, bad, 1),
                Err(SplitError::InvalidFraction(_))
            ));
        }
    }

    #[test]
    fn test_empty_partition_rejected() {
        assert_eq!(
            split_rows(1, 0.6, 1),
            Err(SplitError::EmptyPartition { train: 0, test: 1 })
        );
        assert_eq!(
            split_rows(3, 0.2, 1),
            Err(SplitError::EmptyPartition { train: 0, test: 3 })
        );
    }
}
