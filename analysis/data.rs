//! # Data Loading and Validation Module
//!
//! This module is the exclusive entry point for user-provided data. It reads a
//! delimited tabular file, validates it against the fixed diabetes schema, and
//! materializes the clean `ndarray` structures consumed by the rest of the pipeline.
//!
//! - Strict Schema: Column names are not configurable. The eight predictors and the
//!   `Outcome` label must all be present; extra columns are ignored. Columns are
//!   located by name, but the loaded matrix always follows the canonical order.
//! - User-Centric Errors: Failures are assumed to be user-input errors. The
//!   `DataError` enum names the column and the 1-based data row at fault.

use ahash::AHashMap;
use ndarray::{Array1, Array2, Axis};
use std::fs::File;
use std::io;
use std::path::Path;
use thiserror::Error;

/// The predictor columns, in the canonical order used by every design matrix.
pub const PREDICTOR_COLUMNS: [&str; 8] = [
    "Pregnancies",
    "Glucose",
    "BloodPressure",
    "SkinThickness",
    "Insulin",
    "BMI",
    "DiabetesPedigreeFunction",
    "Age",
];

/// The binary label column.
pub const OUTCOME_COLUMN: &str = "Outcome";

/// Fewest rows that can still be split into a non-empty train and test set.
pub const MINIMUM_ROWS: usize = 2;

/// A validated dataset: one row per observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Predictor matrix. Shape: [n_rows, 8], columns in `PREDICTOR_COLUMNS` order.
    pub predictors: Array2<f64>,
    /// Outcome vector with values in {0, 1}.
    pub outcome: Array1<f64>,
}

/// A comprehensive error type for all data loading and validation failures.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Failed to parse delimited input: {0}")]
    CsvError(#[from] csv::Error),
    #[error(
        "The required column '{0}' was not found in the input file. Please check spelling and case."
    )]
    ColumnNotFound(String),
    #[error("Column '{column}' has a non-numeric value '{value}' at data row {row}.")]
    NonNumericValue {
        column: String,
        row: usize,
        value: String,
    },
    #[error("Column '{column}' has a missing value at data row {row}.")]
    MissingValue { column: String, row: usize },
    #[error("Column '{column}' has a non-finite value (NaN or Infinity) at data row {row}.")]
    NonFiniteValue { column: String, row: usize },
    #[error("Column '{column}' has a negative value {value} at data row {row}.")]
    NegativeValue {
        column: String,
        row: usize,
        value: f64,
    },
    #[error("Outcome must be 0 or 1, but data row {row} has {value}.")]
    InvalidOutcome { row: usize, value: f64 },
    #[error("The input file contains a header but no data rows.")]
    EmptyDataset,
    #[error("Input contains only {found} data rows, but at least {required} are required.")]
    InsufficientRows { found: usize, required: usize },
    #[error("Expected {expected} predictor columns, found {found}.")]
    WrongPredictorCount { found: usize, expected: usize },
    #[error("Predictor matrix has {predictors} rows but outcome has {outcome}.")]
    LengthMismatch { predictors: usize, outcome: usize },
}

impl Dataset {
    /// Builds a dataset from already-parsed arrays, checking shape and label values.
    pub fn new(predictors: Array2<f64>, outcome: Array1<f64>) -> Result<Self, DataError> {
        if predictors.nrows() != outcome.len() {
            return Err(DataError::LengthMismatch {
                predictors: predictors.nrows(),
                outcome: outcome.len(),
            });
        }
        if predictors.ncols() != PREDICTOR_COLUMNS.len() {
            return Err(DataError::WrongPredictorCount {
                found: predictors.ncols(),
                expected: PREDICTOR_COLUMNS.len(),
            });
        }
        for (i, &value) in outcome.iter().enumerate() {
            if value != 0.0 && value != 1.0 {
                return Err(DataError::InvalidOutcome { row: i + 1, value });
            }
        }
        Ok(Self {
            predictors,
            outcome,
        })
    }

    /// Reads and validates a dataset from any delimited source with a header row.
    pub fn from_reader<R: io::Read>(reader: R, delimiter: u8) -> Result<Self, DataError> {
        internal::read_dataset(reader, delimiter)
    }

    pub fn n_rows(&self) -> usize {
        self.outcome.len()
    }

    /// Predictor names in design-matrix order.
    pub fn predictor_names() -> Vec<String> {
        PREDICTOR_COLUMNS.iter().map(|s| s.to_string()).collect()
    }

    /// Materializes the rows at `indices`, in the order given.
    pub fn select_rows(&self, indices: &[usize]) -> Dataset {
        Dataset {
            predictors: self.predictors.select(Axis(0), indices),
            outcome: self.outcome.select(Axis(0), indices),
        }
    }
}

/// Loads and validates the dataset stored at `path`.
pub fn load_dataset(path: &Path, delimiter: u8) -> Result<Dataset, DataError> {
    log::info!("Loading data from '{}'", path.display());
    let file = File::open(path)?;
    let dataset = Dataset::from_reader(io::BufReader::new(file), delimiter)?;
    log::info!(
        "Data validation successful: {} rows, all required columns numeric.",
        dataset.n_rows()
    );
    Ok(dataset)
}

/// Picks the delimiter implied by a file extension: tab for `.tsv`/`.tab`, comma otherwise.
pub fn delimiter_for_path(path: &Path) -> u8 {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") || ext.eq_ignore_ascii_case("tab") => b'\t',
        _ => b',',
    }
}

/// Internal module for the row-by-row parsing logic.
mod internal {
    use super::*;

    fn parse_cell(raw: Option<&str>, column: &str, row: usize) -> Result<f64, DataError> {
        let text = match raw {
            Some(text) if !text.is_empty() => text,
            _ => {
                return Err(DataError::MissingValue {
                    column: column.to_string(),
                    row,
                });
            }
        };
        let value: f64 = text.parse().map_err(|_| DataError::NonNumericValue {
            column: column.to_string(),
            row,
            value: text.to_string(),
        })?;
        if !value.is_finite() {
            return Err(DataError::NonFiniteValue {
                column: column.to_string(),
                row,
            });
        }
        Ok(value)
    }

    pub(super) fn read_dataset<R: io::Read>(reader: R, delimiter: u8) -> Result<Dataset, DataError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let positions: AHashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name, i))
            .collect();

        let locate = |name: &str| -> Result<usize, DataError> {
            positions
                .get(name)
                .copied()
                .ok_or_else(|| DataError::ColumnNotFound(name.to_string()))
        };
        let mut predictor_positions = [0usize; PREDICTOR_COLUMNS.len()];
        for (slot, name) in predictor_positions.iter_mut().zip(PREDICTOR_COLUMNS) {
            *slot = locate(name)?;
        }
        let outcome_position = locate(OUTCOME_COLUMN)?;

        let mut rows: Vec<[f64; PREDICTOR_COLUMNS.len()]> = Vec::new();
        let mut outcome = Vec::new();
        for (i, record) in csv_reader.records().enumerate() {
            let record = record?;
            let row = i + 1;
            let mut values = [0.0; PREDICTOR_COLUMNS.len()];
            for (j, (&position, name)) in
                predictor_positions.iter().zip(PREDICTOR_COLUMNS).enumerate()
            {
                let value = parse_cell(record.get(position), name, row)?;
                if value < 0.0 {
                    return Err(DataError::NegativeValue {
                        column: name.to_string(),
                        row,
                        value,
                    });
                }
                values[j] = value;
            }
            let label = parse_cell(record.get(outcome_position), OUTCOME_COLUMN, row)?;
            if label != 0.0 && label != 1.0 {
                return Err(DataError::InvalidOutcome { row, value: label });
            }
            rows.push(values);
            outcome.push(label);
        }

        if rows.is_empty() {
            return Err(DataError::EmptyDataset);
        }
        if rows.len() < MINIMUM_ROWS {
            return Err(DataError::InsufficientRows {
                found: rows.len(),
                required: MINIMUM_ROWS,
            });
        }

        let predictors =
            Array2::from_shape_fn((rows.len(), PREDICTOR_COLUMNS.len()), |(i, j)| rows[i][j]);
        Ok(Dataset {
            predictors,
            outcome: Array1::from_vec(outcome),
        })
    }
}
