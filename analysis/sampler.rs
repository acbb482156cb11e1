//! MCMC sampling of logistic-regression posteriors using mini-mcmc.
//!
//! # Design
//!
//! The pipeline talks to the sampler only through [`SamplingEngine`]: a model
//! specification and named data go in, ordered per-chain draws come out. Warm-up
//! draws are never returned.
//!
//! [`NutsEngine`] hands the unnormalized log posterior (log likelihood plus log prior)
//! to mini-mcmc's No-U-Turn sampler, which runs the chains in parallel and tunes its
//! step size during warm-up:
//!
//! - Coefficients with a point-mass prior are dropped from the sampled dimension and
//!   re-inserted at their location in every draw.
//! - Gradients are computed analytically with ndarray, so burn's autodiff graph is
//!   never built.
//! - Chain starting points are drawn from a `StdRng` seeded with the run seed, and the
//!   sampler itself is seeded with the same value, so a seed fixes every draw.
//!
//! # Memory
//!
//! The design matrix and labels are wrapped in `Arc` so the clones mini-mcmc makes
//! for its chains share one copy.

use crate::model::{LogisticPosterior, ModelSpec};
use burn::backend::{Autodiff, NdArray};
use burn::prelude::*;
use burn::tensor::TensorData;
use mini_mcmc::distributions::GradientTarget;
use mini_mcmc::nuts::NUTS;
use ndarray::{Array1, Array2, ArrayView1, Axis, s};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Backend for NUTS; f64 keeps the Cauchy tails precise.
pub type NutsBackend = Autodiff<NdArray<f64>>;

/// Configuration for MCMC sampling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Number of independently initialized chains
    pub chains: usize,
    /// Warm-up iterations discarded at the start of every chain
    pub burn_in: usize,
    /// Iterations retained per chain after burn-in
    pub draws: usize,
    /// Target acceptance probability for step-size tuning (0.6-0.9 recommended)
    pub target_accept: f64,
    /// Half-width of the uniform jitter around the prior location used to start chains
    pub init_spread: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            chains: 3,
            burn_in: 1000,
            draws: 5000,
            target_accept: 0.8,
            init_spread: 1.0,
        }
    }
}

impl SamplerConfig {
    pub fn validate(&self) -> Result<(), SamplingError> {
        if self.chains == 0 || self.draws == 0 {
            return Err(SamplingError::ZeroDraws);
        }
        if !(self.target_accept > 0.0 && self.target_accept < 1.0) {
            return Err(SamplingError::InvalidConfig(format!(
                "sampler.target_accept must lie strictly between 0 and 1, got {}",
                self.target_accept
            )));
        }
        if !(self.init_spread.is_finite() && self.init_spread >= 0.0) {
            return Err(SamplingError::InvalidConfig(format!(
                "sampler.init_spread must be non-negative, got {}",
                self.init_spread
            )));
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum SamplingError {
    #[error("Malformed model specification: {0}")]
    MalformedModel(String),
    #[error("Invalid sampler configuration: {0}")]
    InvalidConfig(String),
    #[error("Sampling requires at least one chain and one retained draw per chain.")]
    ZeroDraws,
    #[error(
        "Numerical instability in chain {chain} at iteration {iteration} while updating '{parameter}': the log posterior is not finite."
    )]
    NumericalInstability {
        chain: usize,
        iteration: usize,
        parameter: String,
    },
    #[error("NUTS sampling failed: {0}")]
    Engine(String),
}

/// Named predictor arrays plus the label array handed to an engine.
#[derive(Clone, Debug)]
pub struct SamplingData {
    /// Predictor names, one per column of `x`
    pub names: Vec<String>,
    /// Design matrix without the intercept column [n_samples, n_predictors]
    pub x: Array2<f64>,
    /// Binary labels [n_samples]
    pub y: Array1<f64>,
}

impl SamplingData {
    pub fn new(names: Vec<String>, x: Array2<f64>, y: Array1<f64>) -> Self {
        Self { names, x, y }
    }

    /// Checks that the data and the model agree on shapes and that labels are binary.
    pub fn validate_against(&self, spec: &ModelSpec) -> Result<(), SamplingError> {
        if self.names.len() != self.x.ncols() {
            return Err(SamplingError::MalformedModel(format!(
                "{} predictor names for {} design columns",
                self.names.len(),
                self.x.ncols()
            )));
        }
        if self.x.nrows() != self.y.len() {
            return Err(SamplingError::MalformedModel(format!(
                "design matrix has {} rows but the label array has {}",
                self.x.nrows(),
                self.y.len()
            )));
        }
        if spec.num_coefficients() != self.x.ncols() + 1 {
            return Err(SamplingError::MalformedModel(format!(
                "'{}' declares {} coefficients but the data implies {} (intercept + {} predictors)",
                spec.label,
                spec.num_coefficients(),
                self.x.ncols() + 1,
                self.x.ncols()
            )));
        }
        if let Some(j) = spec.first_malformed_prior() {
            return Err(SamplingError::MalformedModel(format!(
                "prior on coefficient {} has invalid hyperparameters: {:?}",
                j, spec.priors[j]
            )));
        }
        if let Some(i) = self.y.iter().position(|&v| v != 0.0 && v != 1.0) {
            return Err(SamplingError::MalformedModel(format!(
                "label at row {} is {}, expected 0 or 1",
                i + 1,
                self.y[i]
            )));
        }
        if self.x.iter().any(|v| !v.is_finite()) {
            return Err(SamplingError::MalformedModel(
                "design matrix contains non-finite values".to_string(),
            ));
        }
        Ok(())
    }
}

/// An external MCMC capability: model + data in, per-chain draws out.
pub trait SamplingEngine {
    fn sample(&self, spec: &ModelSpec, data: &SamplingData)
    -> Result<PosteriorDraws, SamplingError>;
}

/// Retained posterior draws, kept per chain in iteration order.
#[derive(Clone, Debug)]
pub struct PosteriorDraws {
    /// Coefficient names: intercept first, then predictors
    pub parameter_names: Vec<String>,
    /// One [draws, n_parameters] matrix per chain
    pub chains: Vec<Array2<f64>>,
}

impl PosteriorDraws {
    pub fn num_chains(&self) -> usize {
        self.chains.len()
    }

    pub fn draws_per_chain(&self) -> usize {
        self.chains.first().map_or(0, |c| c.nrows())
    }

    pub fn num_parameters(&self) -> usize {
        self.parameter_names.len()
    }

    /// All chains stacked in chain order: [num_chains * draws, n_parameters].
    pub fn pooled(&self) -> Array2<f64> {
        let total: usize = self.chains.iter().map(|c| c.nrows()).sum();
        let mut pooled = Array2::<f64>::zeros((total, self.num_parameters()));
        let mut offset = 0;
        for chain in &self.chains {
            let rows = chain.nrows();
            pooled
                .slice_mut(s![offset..offset + rows, ..])
                .assign(chain);
            offset += rows;
        }
        pooled
    }

    /// The trace of one parameter in one chain.
    pub fn chain_parameter(&self, chain: usize, parameter: usize) -> ArrayView1<'_, f64> {
        self.chains[chain].column(parameter)
    }

    /// The traces of one parameter across every chain.
    pub fn parameter_traces(&self, parameter: usize) -> Vec<ArrayView1<'_, f64>> {
        self.chains.iter().map(|c| c.column(parameter)).collect()
    }

    pub fn summarize(&self) -> PosteriorSummary {
        PosteriorSummary::from_pooled(self.parameter_names.clone(), &self.pooled())
    }
}

/// Pooled point estimates and 95% central intervals for each coefficient.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PosteriorSummary {
    pub names: Vec<String>,
    pub mean: Array1<f64>,
    pub std_dev: Array1<f64>,
    /// 2.5th percentile
    pub lower: Array1<f64>,
    /// 97.5th percentile
    pub upper: Array1<f64>,
}

impl PosteriorSummary {
    pub fn from_pooled(names: Vec<String>, pooled: &Array2<f64>) -> Self {
        let p = pooled.ncols();
        let mean = pooled
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::from_elem(p, f64::NAN));
        let std_dev = if pooled.nrows() > 1 {
            pooled.std_axis(Axis(0), 1.0)
        } else {
            Array1::zeros(p)
        };
        let mut lower = Array1::from_elem(p, f64::NAN);
        let mut upper = Array1::from_elem(p, f64::NAN);
        for (j, column) in pooled.columns().into_iter().enumerate() {
            let mut sorted = column.to_vec();
            sorted.sort_by(f64::total_cmp);
            if let (Some(lo), Some(hi)) = (quantile(&sorted, 0.025), quantile(&sorted, 0.975)) {
                lower[j] = lo;
                upper[j] = hi;
            }
        }
        Self {
            names,
            mean,
            std_dev,
            lower,
            upper,
        }
    }
}

/// Linear-interpolated quantile of already sorted values.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let below = position.floor() as usize;
    let above = position.ceil() as usize;
    let weight = position - below as f64;
    Some(sorted[below] * (1.0 - weight) + sorted[above] * weight)
}

/// Log posterior over the free (non-pinned) coefficients.
///
/// Owns its data through `Arc` because mini-mcmc clones the target once per chain.
#[derive(Clone)]
pub struct FreeCoefficientPosterior {
    x: Arc<Array2<f64>>,
    y: Arc<Array1<f64>>,
    spec: Arc<ModelSpec>,
    /// Full coefficient vector holding the pinned values
    template: Arc<Array1<f64>>,
    /// Indices of the sampled coefficients
    free: Arc<Vec<usize>>,
}

impl FreeCoefficientPosterior {
    pub fn new(spec: &ModelSpec, data: &SamplingData) -> Self {
        let template = spec.priors.iter().map(|p| p.location()).collect();
        let free = (0..spec.num_coefficients())
            .filter(|&j| !spec.priors[j].is_point_mass())
            .collect();
        Self {
            x: Arc::new(data.x.clone()),
            y: Arc::new(data.y.clone()),
            spec: Arc::new(spec.clone()),
            template: Arc::new(template),
            free: Arc::new(free),
        }
    }

    pub fn dim(&self) -> usize {
        self.free.len()
    }

    pub fn free_indices(&self) -> &[usize] {
        &self.free
    }

    /// The full coefficient vector for a point in the free coordinates.
    pub fn expand(&self, z: &[f64]) -> Array1<f64> {
        let mut beta = self.template.as_ref().clone();
        for (&j, &value) in self.free.iter().zip(z.iter()) {
            beta[j] = value;
        }
        beta
    }

    /// Log posterior and its gradient restricted to the free coordinates.
    pub fn logp_and_grad(&self, z: &[f64]) -> (f64, Array1<f64>) {
        if z.len() != self.dim() {
            return (f64::NAN, Array1::from_elem(self.dim(), f64::NAN));
        }
        let beta = self.expand(z);
        let posterior = LogisticPosterior::new(self.x.view(), self.y.view(), &self.spec);
        let (logp, grad) = posterior.log_posterior_and_gradient(beta.view());
        (logp, self.free.iter().map(|&j| grad[j]).collect())
    }

    fn values_of(z: Tensor<NutsBackend, 1>) -> Vec<f64> {
        z.into_data().to_vec::<f64>().unwrap_or_default()
    }
}

impl GradientTarget<f64, NutsBackend> for FreeCoefficientPosterior {
    fn unnorm_logp(&self, z: Tensor<NutsBackend, 1>) -> Tensor<NutsBackend, 1> {
        let device = z.device();
        let (logp, _) = self.logp_and_grad(&Self::values_of(z));
        Tensor::<NutsBackend, 1>::from_data(TensorData::new(vec![logp], [1]), &device)
    }

    fn unnorm_logp_and_grad(
        &self,
        z: Tensor<NutsBackend, 1>,
    ) -> (Tensor<NutsBackend, 1>, Tensor<NutsBackend, 1>) {
        let device = z.device();
        let (logp, grad) = self.logp_and_grad(&Self::values_of(z));
        let logp_tensor =
            Tensor::<NutsBackend, 1>::from_data(TensorData::new(vec![logp], [1]), &device);
        let grad_tensor = Tensor::<NutsBackend, 1>::from_data(
            TensorData::new(grad.to_vec(), [self.dim()]),
            &device,
        );
        (logp_tensor, grad_tensor)
    }
}

/// No-U-Turn sampling through mini-mcmc.
#[derive(Clone, Debug)]
pub struct NutsEngine {
    config: SamplerConfig,
    seed: u64,
}

impl NutsEngine {
    pub fn new(config: SamplerConfig, seed: u64) -> Self {
        Self { config, seed }
    }

    /// Over-dispersed starting points: uniform jitter around each prior location.
    fn initial_positions(&self, target: &FreeCoefficientPosterior) -> Vec<Vec<f64>> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let spread = self.config.init_spread;
        (0..self.config.chains)
            .map(|_| {
                target
                    .free_indices()
                    .iter()
                    .map(|&j| {
                        let location = target.template[j];
                        if spread == 0.0 {
                            location
                        } else {
                            location + rng.gen_range(-spread..=spread)
                        }
                    })
                    .collect()
            })
            .collect()
    }

    /// Reshapes the [chains, draws, free] sample array into full per-chain matrices.
    fn expand_samples(
        &self,
        target: &FreeCoefficientPosterior,
        names: &[String],
        values: &[f64],
        shape: [usize; 3],
    ) -> Result<Vec<Array2<f64>>, SamplingError> {
        let [n_chains, n_draws, dim] = shape;
        if values.len() != n_chains * n_draws * dim || dim != target.dim() {
            return Err(SamplingError::Engine(format!(
                "expected {} values for shape {:?}, got {}",
                n_chains * n_draws * target.dim(),
                shape,
                values.len()
            )));
        }
        let mut chains = Vec::with_capacity(n_chains);
        for chain in 0..n_chains {
            let mut draws = Array2::<f64>::zeros((n_draws, target.template.len()));
            for draw in 0..n_draws {
                let offset = (chain * n_draws + draw) * dim;
                let beta = target.expand(&values[offset..offset + dim]);
                if let Some(j) = beta.iter().position(|v| !v.is_finite()) {
                    return Err(SamplingError::NumericalInstability {
                        chain,
                        iteration: self.config.burn_in + draw,
                        parameter: names.get(j).cloned().unwrap_or_else(|| j.to_string()),
                    });
                }
                draws.row_mut(draw).assign(&beta);
            }
            chains.push(draws);
        }
        Ok(chains)
    }
}

impl SamplingEngine for NutsEngine {
    fn sample(
        &self,
        spec: &ModelSpec,
        data: &SamplingData,
    ) -> Result<PosteriorDraws, SamplingError> {
        self.config.validate()?;
        data.validate_against(spec)?;

        let names = spec.parameter_names(&data.names);
        log::debug!("Model description:\n{}", spec.describe(&data.names));
        log::info!(
            "Sampling '{}': {} chains x ({} warm-up + {} retained) NUTS iterations over {} rows.",
            spec.label,
            self.config.chains,
            self.config.burn_in,
            self.config.draws,
            data.y.len()
        );

        let target = FreeCoefficientPosterior::new(spec, data);
        let initial_positions = self.initial_positions(&target);
        for (chain, start) in initial_positions.iter().enumerate() {
            let (logp, _) = target.logp_and_grad(start);
            if !logp.is_finite() {
                return Err(SamplingError::NumericalInstability {
                    chain,
                    iteration: 0,
                    parameter: "initial state".to_string(),
                });
            }
        }

        if target.dim() == 0 {
            log::info!("'{}': every coefficient is pinned; skipping NUTS.", spec.label);
            let fixed = target.expand(&[]);
            let chains = (0..self.config.chains)
                .map(|_| Array2::from_shape_fn((self.config.draws, fixed.len()), |(_, j)| fixed[j]))
                .collect();
            return Ok(PosteriorDraws {
                parameter_names: names,
                chains,
            });
        }

        let mut sampler = NUTS::<f64, NutsBackend, FreeCoefficientPosterior>::new(
            target.clone(),
            initial_positions,
            self.config.target_accept,
        )
        .set_seed(self.seed);

        let (samples_tensor, run_stats) = sampler
            .run_progress(self.config.draws, self.config.burn_in)
            .map_err(|e| SamplingError::Engine(e.to_string()))?;
        log::info!("'{}': NUTS sampling complete: {}", spec.label, run_stats);

        let shape = samples_tensor.dims();
        let values = samples_tensor
            .into_data()
            .to_vec::<f64>()
            .map_err(|e| SamplingError::Engine(format!("{e:?}")))?;
        let chains = self.expand_samples(&target, &names, &values, shape)?;

        Ok(PosteriorDraws {
            parameter_names: names,
            chains,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelVariant, Prior};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn small_config() -> SamplerConfig {
        SamplerConfig {
            chains: 3,
            burn_in: 200,
            draws: 400,
            ..SamplerConfig::default()
        }
    }

    fn toy_data() -> SamplingData {
        let x = array![
            [-0.8, 0.1],
            [-0.5, -0.3],
            [-0.2, 0.4],
            [0.0, -0.1],
            [0.2, 0.2],
            [0.4, -0.4],
            [0.6, 0.3],
            [0.9, 0.0]
        ];
        let y = array![0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 1.0];
        SamplingData::new(vec!["a".into(), "b".into()], x, y)
    }

    #[test]
    fn test_draw_counts_and_pooling() {
        let engine = NutsEngine::new(small_config(), 11);
        let spec = ModelVariant::VagueNormal.spec(2);
        let draws = engine.sample(&spec, &toy_data()).unwrap();

        assert_eq!(draws.num_chains(), 3);
        assert_eq!(draws.draws_per_chain(), 400);
        assert_eq!(draws.parameter_names, vec!["intercept", "a", "b"]);
        let pooled = draws.pooled();
        assert_eq!(pooled.shape(), &[1200, 3]);
        assert_eq!(pooled.row(400), draws.chains[1].row(0));
        assert_eq!(draws.chain_parameter(2, 1).len(), 400);
        assert_eq!(draws.chain_parameter(2, 1)[7], draws.chains[2][[7, 1]]);
        assert!(pooled.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_pooling_three_chains_of_five_thousand() {
        let chains: Vec<Array2<f64>> = (0..3)
            .map(|c| Array2::from_elem((5000, 9), c as f64))
            .collect();
        let draws = PosteriorDraws {
            parameter_names: (0..9).map(|j| format!("b{j}")).collect(),
            chains,
        };
        let pooled = draws.pooled();
        assert_eq!(pooled.nrows(), 15000);
        assert_eq!(pooled.column(4).len(), 15000);
        assert_abs_diff_eq!(pooled[[5000, 0]], 1.0);
        assert_abs_diff_eq!(pooled[[14999, 8]], 2.0);
        let summary = draws.summarize();
        assert_abs_diff_eq!(summary.mean[3], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_same_seed_reproduces_draws() {
        let spec = ModelVariant::WeaklyInformativeCauchy.spec(2);
        let a = NutsEngine::new(small_config(), 5)
            .sample(&spec, &toy_data())
            .unwrap();
        let b = NutsEngine::new(small_config(), 5)
            .sample(&spec, &toy_data())
            .unwrap();
        assert_eq!(a.chains, b.chains);

        let c = NutsEngine::new(small_config(), 6)
            .sample(&spec, &toy_data())
            .unwrap();
        assert_ne!(a.chains, c.chains);
    }

    #[test]
    fn test_chains_start_from_different_points() {
        let spec = ModelVariant::VagueNormal.spec(2);
        let draws = NutsEngine::new(small_config(), 8)
            .sample(&spec, &toy_data())
            .unwrap();
        assert_ne!(draws.chains[0].row(0), draws.chains[1].row(0));
    }

    #[test]
    fn test_point_mass_coefficients_stay_pinned() {
        let spec = ModelSpec::custom(
            "pinned slope",
            vec![
                Prior::Normal {
                    location: 0.0,
                    variance: 100.0,
                },
                Prior::Normal {
                    location: 1.5,
                    variance: 0.0,
                },
                Prior::Normal {
                    location: 0.0,
                    variance: 100.0,
                },
            ],
        );
        let draws = NutsEngine::new(small_config(), 3)
            .sample(&spec, &toy_data())
            .unwrap();
        for chain in &draws.chains {
            assert!(chain.column(1).iter().all(|&v| v == 1.5));
        }
        assert!(draws.chains[0].column(0).iter().any(|&v| v != draws.chains[0][[0, 0]]));
    }

    #[test]
    fn test_malformed_model_rejected() {
        let engine = NutsEngine::new(small_config(), 1);
        let spec = ModelVariant::VagueNormal.spec(8);
        match engine.sample(&spec, &toy_data()) {
            Err(SamplingError::MalformedModel(msg)) => assert!(msg.contains("9 coefficients")),
            other => panic!("Expected MalformedModel, got {:?}", other.map(|d| d.num_chains())),
        }

        let mut bad_labels = toy_data();
        bad_labels.y[2] = 0.5;
        let spec = ModelVariant::VagueNormal.spec(2);
        assert!(matches!(
            engine.sample(&spec, &bad_labels),
            Err(SamplingError::MalformedModel(_))
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let spec = ModelVariant::VagueNormal.spec(2);
        for config in [
            SamplerConfig {
                chains: 0,
                ..small_config()
            },
            SamplerConfig {
                draws: 0,
                ..small_config()
            },
        ] {
            assert!(matches!(
                NutsEngine::new(config, 1).sample(&spec, &toy_data()),
                Err(SamplingError::ZeroDraws)
            ));
        }
        for config in [
            SamplerConfig {
                target_accept: 1.0,
                ..small_config()
            },
            SamplerConfig {
                init_spread: -0.5,
                ..small_config()
            },
        ] {
            assert!(matches!(config.validate(), Err(SamplingError::InvalidConfig(_))));
            assert!(matches!(
                NutsEngine::new(config, 1).sample(&spec, &toy_data()),
                Err(SamplingError::InvalidConfig(_))
            ));
        }
        assert!(SamplerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_non_finite_initial_log_posterior_is_reported() {
        let spec = ModelSpec::custom(
            "flat intercept",
            vec![
                Prior::Normal {
                    location: 0.0,
                    variance: f64::INFINITY,
                },
                Prior::Normal {
                    location: 0.0,
                    variance: 100.0,
                },
                Prior::Normal {
                    location: 0.0,
                    variance: 100.0,
                },
            ],
        );
        match NutsEngine::new(small_config(), 4).sample(&spec, &toy_data()) {
            Err(SamplingError::NumericalInstability {
                chain,
                iteration,
                parameter,
            }) => {
                assert_eq!(chain, 0);
                assert_eq!(iteration, 0);
                assert_eq!(parameter, "initial state");
            }
            other => panic!(
                "Expected NumericalInstability, got {:?}",
                other.map(|d| d.num_chains())
            ),
        }
    }

    fn no_rows() -> SamplingData {
        SamplingData::new(
            vec!["a".into(), "b".into()],
            Array2::zeros((0, 2)),
            Array1::zeros(0),
        )
    }

    fn pooled_column(draws: &PosteriorDraws, j: usize) -> Vec<f64> {
        let mut column = draws.pooled().column(j).to_vec();
        column.sort_by(f64::total_cmp);
        column
    }

    #[test]
    fn test_without_data_normal_prior_is_reproduced() {
        let spec = ModelVariant::VagueNormal.spec(2);
        let draws = NutsEngine::new(SamplerConfig::default(), 17)
            .sample(&spec, &no_rows())
            .unwrap();
        assert_eq!(draws.pooled().nrows(), 15000);

        let summary = draws.summarize();
        for j in 0..3 {
            assert!(summary.mean[j].abs() < 1.0, "mean {}", summary.mean[j]);
            assert!(
                (summary.std_dev[j] - 10.0).abs() < 1.0,
                "coefficient {j}: sd {:.3}, expected 10",
                summary.std_dev[j]
            );
        }
    }

    #[test]
    fn test_without_data_cauchy_quartiles_match_scale() {
        let spec = ModelVariant::WeaklyInformativeCauchy.spec(2);
        let draws = NutsEngine::new(SamplerConfig::default(), 23)
            .sample(&spec, &no_rows())
            .unwrap();

        // Cauchy quartiles sit at location -/+ scale.
        for (j, scale) in [(0, 10.0), (1, 2.5), (2, 2.5)] {
            let sorted = pooled_column(&draws, j);
            let q1 = quantile(&sorted, 0.25).unwrap();
            let median = quantile(&sorted, 0.5).unwrap();
            let q3 = quantile(&sorted, 0.75).unwrap();
            assert!(
                (q1 + scale).abs() < 0.25 * scale && (q3 - scale).abs() < 0.25 * scale,
                "coefficient {j}: quartiles ({q1:.3}, {q3:.3}), expected -/+{scale}"
            );
            assert!(median.abs() < 0.25 * scale, "coefficient {j}: median {median:.3}");
        }
    }

    #[test]
    fn test_recovers_simulated_coefficients() {
        let truth: [f64; 3] = [-0.5, 1.0, -2.0];
        let n = 5000;
        let mut rng = StdRng::seed_from_u64(99);
        let x = Array2::from_shape_fn((n, 2), |_| rng.gen_range(-1.0..1.0));
        let y = Array1::from_shape_fn(n, |i| {
            let eta = truth[0] + truth[1] * x[[i, 0]] + truth[2] * x[[i, 1]];
            let p = 1.0 / (1.0 + (-eta).exp());
            if rng.gen_range(0.0..1.0) < p { 1.0 } else { 0.0 }
        });
        let data = SamplingData::new(vec!["a".into(), "b".into()], x, y);

        let config = SamplerConfig {
            chains: 3,
            burn_in: 500,
            draws: 1000,
            ..SamplerConfig::default()
        };
        let spec = ModelVariant::VagueNormal.spec(2);
        let summary = NutsEngine::new(config, 31)
            .sample(&spec, &data)
            .unwrap()
            .summarize();
        for j in 0..3 {
            let error = (summary.mean[j] - truth[j]).abs();
            assert!(
                error < 4.0 * summary.std_dev[j],
                "coefficient {j}: mean {:.4}, truth {}, sd {:.4}",
                summary.mean[j],
                truth[j],
                summary.std_dev[j]
            );
            assert!(summary.std_dev[j] < 0.2);
        }
    }

    #[test]
    fn test_quantile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile(&sorted, 0.0), Some(1.0));
        assert_eq!(quantile(&sorted, 0.5), Some(3.0));
        assert_eq!(quantile(&sorted, 0.875), Some(4.5));
        assert_eq!(quantile(&[], 0.5), None);
    }
}
