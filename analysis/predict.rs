//! Point prediction from posterior means and classification scoring.

use crate::sampler::PosteriorDraws;
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use std::fmt;
use thiserror::Error;

/// Probabilities strictly above this value are classified as 1.
pub const DECISION_THRESHOLD: f64 = 0.5;

#[derive(Error, Debug, PartialEq)]
pub enum PredictionError {
    #[error(
        "Coefficient vector has length {coefficients}, but the design matrix has {columns} columns plus an intercept."
    )]
    DimensionMismatch { coefficients: usize, columns: usize },
    #[error("Predicted labels ({predicted}) and actual labels ({actual}) differ in length.")]
    LengthMismatch { predicted: usize, actual: usize },
    #[error("No posterior draws are available to average.")]
    NoDraws,
}

/// Element-wise mean of every pooled draw.
pub fn posterior_mean(draws: &PosteriorDraws) -> Result<Array1<f64>, PredictionError> {
    draws
        .pooled()
        .mean_axis(Axis(0))
        .ok_or(PredictionError::NoDraws)
}

/// `b0 + X b[1..]`, checking that the coefficients match the design matrix.
pub fn linear_predictor(
    coefficients: ArrayView1<f64>,
    x: ArrayView2<f64>,
) -> Result<Array1<f64>, PredictionError> {
    if coefficients.len() != x.ncols() + 1 {
        return Err(PredictionError::DimensionMismatch {
            coefficients: coefficients.len(),
            columns: x.ncols(),
        });
    }
    Ok(crate::model::linear_predictor(x, coefficients))
}

/// The logistic function, evaluated without overflow on either tail.
#[inline]
pub fn logistic(eta: f64) -> f64 {
    if eta >= 0.0 {
        1.0 / (1.0 + (-eta).exp())
    } else {
        let e = eta.exp();
        e / (1.0 + e)
    }
}

pub fn predict_probabilities(
    coefficients: ArrayView1<f64>,
    x: ArrayView2<f64>,
) -> Result<Array1<f64>, PredictionError> {
    Ok(linear_predictor(coefficients, x)?.mapv(logistic))
}

/// 1 iff `probability > 0.5`; exactly 0.5 maps to 0.
#[inline]
pub fn classify(probability: f64) -> u8 {
    u8::from(probability > DECISION_THRESHOLD)
}

/// 2x2 counts indexed by (predicted, actual).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    counts: [[usize; 2]; 2],
}

impl ConfusionMatrix {
    pub fn tally(predicted: &[u8], actual: &[u8]) -> Result<Self, PredictionError> {
        if predicted.len() != actual.len() {
            return Err(PredictionError::LengthMismatch {
                predicted: predicted.len(),
                actual: actual.len(),
            });
        }
        let mut matrix = Self::default();
        for (&p, &a) in predicted.iter().zip(actual) {
            matrix.counts[usize::from(p != 0)][usize::from(a != 0)] += 1;
        }
        Ok(matrix)
    }

    pub fn get(&self, predicted: u8, actual: u8) -> usize {
        self.counts[usize::from(predicted != 0)][usize::from(actual != 0)]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn correct(&self) -> usize {
        self.counts[0][0] + self.counts[1][1]
    }

    /// Fraction of correct predictions; 0.0 for an empty matrix.
    pub fn accuracy(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.correct() as f64 / total as f64,
        }
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>14} {:>9} {:>9}", "", "actual 0", "actual 1")?;
        for predicted in 0..2u8 {
            writeln!(
                f,
                "{:>14} {:>9} {:>9}",
                format!("predicted {predicted}"),
                self.get(predicted, 0),
                self.get(predicted, 1)
            )?;
        }
        Ok(())
    }
}

/// Predictions and scores for one row set under one coefficient vector.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub probabilities: Array1<f64>,
    pub predicted: Vec<u8>,
    pub actual: Vec<u8>,
    pub confusion: ConfusionMatrix,
    pub accuracy: f64,
}

pub fn evaluate(
    coefficients: ArrayView1<f64>,
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
) -> Result<Evaluation, PredictionError> {
    let probabilities = predict_probabilities(coefficients, x)?;
    let predicted: Vec<u8> = probabilities.iter().map(|&p| classify(p)).collect();
    let actual: Vec<u8> = y.iter().map(|&v| u8::from(v != 0.0)).collect();
    let confusion = ConfusionMatrix::tally(&predicted, &actual)?;
    let accuracy = confusion.accuracy();
    Ok(Evaluation {
        probabilities,
        predicted,
        actual,
        confusion,
        accuracy,
    })
}
