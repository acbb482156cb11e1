//! Median imputation of sentinel zeros.
//!
//! The source data records a missing measurement as `0` in every predictor except
//! `Pregnancies`, where zero is a genuine value. Each affected column has its sentinels
//! replaced by the column median. The median is taken over the whole column, sentinels
//! included, and computed once before any replacement happens.

use crate::data::{Dataset, PREDICTOR_COLUMNS};
use std::ops::Range;

/// The value used in the raw data to mark a missing measurement.
pub const SENTINEL: f64 = 0.0;

/// Predictor columns subject to imputation (everything after `Pregnancies`).
pub const IMPUTED_COLUMNS: Range<usize> = 1..PREDICTOR_COLUMNS.len();

/// What imputation did to a single column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnImputation {
    pub column: &'static str,
    pub median: f64,
    pub replaced: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImputationSummary {
    pub columns: Vec<ColumnImputation>,
}

impl ImputationSummary {
    pub fn total_replaced(&self) -> usize {
        self.columns.iter().map(|c| c.replaced).sum()
    }
}

/// Median of a slice; the mean of the two middle values for even lengths.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some(0.5 * (sorted[mid - 1] + sorted[mid]))
    } else {
        Some(sorted[mid])
    }
}

/// Replaces every sentinel zero in the imputed columns with that column's median.
pub fn impute_sentinels(data: &mut Dataset) -> ImputationSummary {
    let mut summary = ImputationSummary::default();
    for j in IMPUTED_COLUMNS {
        let mut column = data.predictors.column_mut(j);
        let values = column.to_vec();
        let Some(column_median) = median(&values) else {
            continue;
        };
        let mut replaced = 0;
        for value in column.iter_mut() {
            if *value == SENTINEL {
                *value = column_median;
                replaced += 1;
            }
        }
        log::debug!(
            "Imputed {} sentinel values in '{}' with median {:.4}",
            replaced,
            PREDICTOR_COLUMNS[j],
            column_median
        );
        summary.columns.push(ColumnImputation {
            column: PREDICTOR_COLUMNS[j],
            median: column_median,
            replaced,
        });
    }
    log::info!(
        "Median imputation replaced {} sentinel values across {} columns.",
        summary.total_replaced(),
        summary.columns.len()
    );
    summary
}
