//! Column-wise rescaling of a predictor matrix to mean 0 and standard deviation 0.5.
//!
//! Each row set (train, test) is standardized with its own statistics; nothing fit on
//! one side of the split is ever applied to the other.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Standard deviation every standardized column ends up with.
pub const TARGET_STD_DEV: f64 = 0.5;

/// A standardized matrix together with the statistics it was derived from.
#[derive(Debug, Clone)]
pub struct Standardized {
    /// Shape matches the input: [n_rows, n_predictors].
    pub matrix: Array2<f64>,
    pub means: Array1<f64>,
    /// Sample standard deviations (n - 1 denominator) of the input columns.
    pub std_devs: Array1<f64>,
}

/// Sample mean and sample standard deviation of a column.
///
/// A single value has no spread; its standard deviation is reported as zero.
pub fn mean_and_std(column: ArrayView1<f64>) -> (f64, f64) {
    let n = column.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = column.sum() / n as f64;
    if n == 1 {
        return (mean, 0.0);
    }
    let ss: f64 = column.iter().map(|&v| (v - mean) * (v - mean)).sum();
    (mean, (ss / (n - 1) as f64).sqrt())
}

/// Rescales each column to `0.5 * (x - mean) / sd`.
///
/// Zero-variance columns become all zeros instead of NaN.
pub fn standardize(x: ArrayView2<f64>) -> Standardized {
    let ncols = x.ncols();
    let mut matrix = Array2::<f64>::zeros(x.raw_dim());
    let mut means = Array1::<f64>::zeros(ncols);
    let mut std_devs = Array1::<f64>::zeros(ncols);

    for (j, column) in x.columns().into_iter().enumerate() {
        let (mean, sd) = mean_and_std(column);
        means[j] = mean;
        std_devs[j] = sd;
        if sd > 0.0 {
            let scale = TARGET_STD_DEV / sd;
            matrix
                .column_mut(j)
                .zip_mut_with(&column, |out, &v| *out = (v - mean) * scale);
        } else {
            log::warn!("Predictor column {} has zero variance; standardized to 0.", j);
        }
    }

    Standardized {
        matrix,
        means,
        std_devs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_columns_have_mean_zero_and_half_unit_sd() {
        let x = array![
            [6.0, 148.0, 72.0],
            [1.0, 85.0, 66.0],
            [8.0, 183.0, 64.0],
            [1.0, 89.0, 66.0],
            [0.0, 137.0, 40.0],
            [5.0, 116.0, 74.0]
        ];
        let out = standardize(x.view());
        for column in out.matrix.columns() {
            let (mean, sd) = mean_and_std(column);
            assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(sd, 0.5, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(out.means[0], 3.5, epsilon = 1e-12);
    }

    #[test]
    fn test_train_and_test_standardized_independently() {
        let train = array![[1.0], [2.0], [3.0]];
        let test = array![[100.0], [300.0]];
        let train_out = standardize(train.view());
        let test_out = standardize(test.view());

        assert_abs_diff_eq!(train_out.means[0], 2.0);
        assert_abs_diff_eq!(test_out.means[0], 200.0);
        // Test rows are centered on their own mean, not on train's.
        assert_abs_diff_eq!(test_out.matrix[[0, 0]], -test_out.matrix[[1, 0]], epsilon = 1e-12);
        let (mean, sd) = mean_and_std(test_out.matrix.column(0));
        assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sd, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_constant_column_maps_to_zero() {
        let x = array![[4.0, 1.0], [4.0, 2.0], [4.0, 3.0]];
        let out = standardize(x.view());
        assert!(out.matrix.column(0).iter().all(|&v| v == 0.0));
        assert_abs_diff_eq!(out.std_devs[0], 0.0);
        assert!(out.matrix.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_single_row_is_finite() {
        let x = array![[1.0, 2.0, 3.0]];
        let out = standardize(x.view());
        assert!(out.matrix.iter().all(|&v| v == 0.0));
    }
}
