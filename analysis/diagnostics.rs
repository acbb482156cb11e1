//! Convergence diagnostics for multi-chain MCMC output.
//!
//! Everything here is advisory: statistics are computed and reported, and callers may
//! log warnings, but nothing in this module fails or gates a run.

use crate::sampler::PosteriorDraws;
use ndarray::ArrayView1;
use rayon::prelude::*;
use std::fmt;

/// R-hat above this value is reported as a convergence warning.
pub const RHAT_WARNING_THRESHOLD: f64 = 1.1;

/// Autocorrelation lags reported by default.
pub const DEFAULT_LAGS: [usize; 6] = [0, 1, 2, 5, 10, 20];

/// Autocorrelations below this value end the ESS sum.
const ESS_CUTOFF: f64 = 0.05;

fn mean(values: ArrayView1<f64>) -> f64 {
    values.sum() / values.len() as f64
}

/// Gelman-Rubin potential scale reduction factor for one parameter.
///
/// `W` is the mean within-chain variance and `B/n` the variance of the chain means;
/// `R = sqrt(((n - 1)/n * W + B/n) / W)`.
///
/// Returns NaN for fewer than two chains or fewer than two draws, 1.0 when every chain
/// is the same constant, and +inf when chains are constant at different values.
/// Chains of unequal length are truncated to the shortest.
pub fn potential_scale_reduction(chains: &[ArrayView1<f64>]) -> f64 {
    let m = chains.len();
    let n = chains.iter().map(|c| c.len()).min().unwrap_or(0);
    if m < 2 || n < 2 {
        return f64::NAN;
    }

    let mut chain_means = Vec::with_capacity(m);
    let mut within = 0.0;
    for chain in chains {
        let chain = chain.slice(ndarray::s![..n]);
        let chain_mean = mean(chain);
        let ss: f64 = chain.iter().map(|&v| (v - chain_mean).powi(2)).sum();
        within += ss / (n - 1) as f64;
        chain_means.push(chain_mean);
    }
    within /= m as f64;

    let grand_mean = chain_means.iter().sum::<f64>() / m as f64;
    // B / n
    let between_over_n = chain_means
        .iter()
        .map(|&cm| (cm - grand_mean).powi(2))
        .sum::<f64>()
        / (m - 1) as f64;

    if within == 0.0 {
        return if between_over_n == 0.0 { 1.0 } else { f64::INFINITY };
    }
    let var_plus = (n - 1) as f64 / n as f64 * within + between_over_n;
    (var_plus / within).sqrt()
}

/// Sample autocorrelation at lags `0..=max_lag`, from the biased (1/n) autocovariance.
///
/// Lags at or beyond the chain length are reported as 0.
pub fn autocorrelation(chain: ArrayView1<f64>, max_lag: usize) -> Vec<f64> {
    let n = chain.len();
    let mut acf = vec![0.0; max_lag + 1];
    if n == 0 {
        return acf;
    }
    acf[0] = 1.0;
    let chain_mean = mean(chain);
    let centered: Vec<f64> = chain.iter().map(|&v| v - chain_mean).collect();
    let variance = centered.iter().map(|d| d * d).sum::<f64>() / n as f64;
    if variance == 0.0 {
        return acf;
    }
    for (lag, rho) in acf.iter_mut().enumerate().skip(1).take_while(|(lag, _)| *lag < n) {
        let covariance = centered[..n - lag]
            .iter()
            .zip(&centered[lag..])
            .map(|(a, b)| a * b)
            .sum::<f64>()
            / n as f64;
        *rho = covariance / variance;
    }
    acf
}

/// Effective sample size `n / (1 + 2 * sum rho_k)`, summing lags while `rho_k > 0.05`.
///
/// A constant chain is treated as independent.
pub fn effective_sample_size(chain: ArrayView1<f64>) -> f64 {
    let n = chain.len();
    if n < 2 {
        return n as f64;
    }
    let acf = autocorrelation(chain, n / 2);
    let sum_rho: f64 = acf
        .iter()
        .skip(1)
        .take_while(|&&rho| rho > ESS_CUTOFF)
        .sum();
    n as f64 / (1.0 + 2.0 * sum_rho)
}

/// Diagnostics for a single coefficient.
#[derive(Debug, Clone)]
pub struct ParameterDiagnostics {
    pub name: String,
    pub rhat: f64,
    /// Sum of the per-chain effective sample sizes
    pub ess: f64,
    /// One autocorrelation curve per chain, evaluated at the report's lags
    pub autocorrelations: Vec<Vec<f64>>,
}

impl ParameterDiagnostics {
    pub fn converged(&self) -> bool {
        self.rhat.is_finite() && self.rhat <= RHAT_WARNING_THRESHOLD
    }
}

#[derive(Debug, Clone)]
pub struct ConvergenceReport {
    pub lags: Vec<usize>,
    pub parameters: Vec<ParameterDiagnostics>,
}

impl ConvergenceReport {
    pub fn from_draws(draws: &PosteriorDraws, lags: &[usize]) -> Self {
        let max_lag = lags.iter().copied().max().unwrap_or(0);
        let parameters = draws
            .parameter_names
            .par_iter()
            .enumerate()
            .map(|(j, name)| {
                let traces = draws.parameter_traces(j);
                let autocorrelations = traces
                    .iter()
                    .map(|trace| {
                        let acf = autocorrelation(*trace, max_lag);
                        lags.iter().map(|&lag| acf[lag]).collect()
                    })
                    .collect();
                ParameterDiagnostics {
                    name: name.clone(),
                    rhat: potential_scale_reduction(&traces),
                    ess: traces.iter().map(|t| effective_sample_size(*t)).sum(),
                    autocorrelations,
                }
            })
            .collect();
        Self {
            lags: lags.to_vec(),
            parameters,
        }
    }

    /// Largest finite-or-infinite R-hat; NaN entries are skipped.
    pub fn max_rhat(&self) -> Option<f64> {
        self.parameters
            .iter()
            .map(|p| p.rhat)
            .filter(|r| !r.is_nan())
            .max_by(f64::total_cmp)
    }

    /// Parameters whose R-hat exceeds the warning threshold.
    pub fn unconverged(&self) -> impl Iterator<Item = &ParameterDiagnostics> {
        self.parameters
            .iter()
            .filter(|p| p.rhat > RHAT_WARNING_THRESHOLD)
    }
}

impl fmt::Display for ConvergenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<26} {:>8} {:>10}", "parameter", "R-hat", "ESS")?;
        for p in &self.parameters {
            writeln!(f, "{:<26} {:>8.4} {:>10.1}", p.name, p.rhat, p.ess)?;
        }
        if self.lags.is_empty() {
            return Ok(());
        }
        writeln!(f)?;
        write!(f, "{:<26} {:>5}", "autocorrelation", "chain")?;
        for lag in &self.lags {
            write!(f, " {:>7}", format!("lag {lag}"))?;
        }
        writeln!(f)?;
        for p in &self.parameters {
            for (chain, acf) in p.autocorrelations.iter().enumerate() {
                write!(f, "{:<26} {:>5}", p.name, chain + 1)?;
                for rho in acf {
                    write!(f, " {:>7.3}", rho)?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
