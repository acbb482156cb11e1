//! Bayesian logistic regression: priors, model variants and the log posterior.
//!
//! Every model shares the Bernoulli likelihood with a logit link,
//!
//! ```text
//! y_i ~ Bernoulli(p_i),   p_i = 1 / (1 + exp(-(b0 + sum_j bj * x_ij)))
//! ```
//!
//! and differs only in the independent prior placed on each coefficient. The
//! coefficient vector is always ordered intercept first, then one slope per predictor.

use ndarray::{Array1, ArrayView1, ArrayView2, s};
use serde::{Deserialize, Serialize};
use statrs::function::gamma::ln_gamma;
use std::f64::consts::PI;
use std::fmt::{self, Write as FmtWrite};

/// An independent prior on a single coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum Prior {
    /// Gaussian parameterized by variance. A variance of zero pins the coefficient.
    Normal { location: f64, variance: f64 },
    /// Location-scale Student-t; `df = 1` is the Cauchy distribution.
    StudentT { location: f64, scale: f64, df: f64 },
}

impl Prior {
    pub fn location(&self) -> f64 {
        match *self {
            Prior::Normal { location, .. } | Prior::StudentT { location, .. } => location,
        }
    }

    /// A zero-variance Normal: all mass sits on the location.
    pub fn is_point_mass(&self) -> bool {
        matches!(*self, Prior::Normal { variance, .. } if variance == 0.0)
    }

    /// Normalized log density at `beta`.
    pub fn log_density(&self, beta: f64) -> f64 {
        match *self {
            Prior::Normal { location, variance } => {
                if variance == 0.0 {
                    return if beta == location { 0.0 } else { f64::NEG_INFINITY };
                }
                let diff = beta - location;
                -0.5 * (2.0 * PI * variance).ln() - diff * diff / (2.0 * variance)
            }
            Prior::StudentT {
                location,
                scale,
                df,
            } => {
                let z = (beta - location) / scale;
                ln_gamma(0.5 * (df + 1.0))
                    - ln_gamma(0.5 * df)
                    - 0.5 * (df * PI).ln()
                    - scale.ln()
                    - 0.5 * (df + 1.0) * (z * z / df).ln_1p()
            }
        }
    }

    /// Derivative of [`Prior::log_density`] with respect to `beta`. Zero for a point mass.
    pub fn grad_log_density(&self, beta: f64) -> f64 {
        match *self {
            Prior::Normal { location, variance } => {
                if variance == 0.0 {
                    0.0
                } else {
                    -(beta - location) / variance
                }
            }
            Prior::StudentT {
                location,
                scale,
                df,
            } => {
                let diff = beta - location;
                -(df + 1.0) * diff / (df * scale * scale + diff * diff)
            }
        }
    }

    fn is_well_formed(&self) -> bool {
        match *self {
            Prior::Normal { location, variance } => location.is_finite() && variance >= 0.0,
            Prior::StudentT {
                location,
                scale,
                df,
            } => location.is_finite() && scale > 0.0 && df > 0.0,
        }
    }
}

/// BUGS notation, which parameterizes both families by precision.
impl fmt::Display for Prior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Prior::Normal { location, variance } => {
                write!(f, "dnorm({location}, {})", variance.recip())
            }
            Prior::StudentT {
                location,
                scale,
                df,
            } => write!(f, "dt({location}, {}, {df})", (scale * scale).recip()),
        }
    }
}

/// The two prior choices compared by the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelVariant {
    /// Model A: `Normal(0, variance 100)` on every coefficient.
    VagueNormal,
    /// Model B: Cauchy with scale 10 on the intercept and scale 2.5 on each slope.
    WeaklyInformativeCauchy,
}

impl ModelVariant {
    pub const ALL: [ModelVariant; 2] = [
        ModelVariant::VagueNormal,
        ModelVariant::WeaklyInformativeCauchy,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ModelVariant::VagueNormal => "Model A",
            ModelVariant::WeaklyInformativeCauchy => "Model B",
        }
    }

    /// Short identifier used in output file names.
    pub fn slug(self) -> &'static str {
        match self {
            ModelVariant::VagueNormal => "model_a",
            ModelVariant::WeaklyInformativeCauchy => "model_b",
        }
    }

    pub fn intercept_prior(self) -> Prior {
        match self {
            ModelVariant::VagueNormal => Prior::Normal {
                location: 0.0,
                variance: 100.0,
            },
            ModelVariant::WeaklyInformativeCauchy => Prior::StudentT {
                location: 0.0,
                scale: 10.0,
                df: 1.0,
            },
        }
    }

    pub fn slope_prior(self) -> Prior {
        match self {
            ModelVariant::VagueNormal => Prior::Normal {
                location: 0.0,
                variance: 100.0,
            },
            ModelVariant::WeaklyInformativeCauchy => Prior::StudentT {
                location: 0.0,
                scale: 2.5,
                df: 1.0,
            },
        }
    }

    pub fn spec(self, num_predictors: usize) -> ModelSpec {
        let mut priors = Vec::with_capacity(num_predictors + 1);
        priors.push(self.intercept_prior());
        priors.extend(std::iter::repeat(self.slope_prior()).take(num_predictors));
        ModelSpec {
            label: self.label().to_string(),
            slug: self.slug().to_string(),
            priors,
        }
    }
}

/// A declarative model: Bernoulli-logit likelihood plus one prior per coefficient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub label: String,
    pub slug: String,
    /// Intercept prior first, then one prior per predictor.
    pub priors: Vec<Prior>,
}

impl ModelSpec {
    /// A model with caller-chosen priors, e.g. point masses for recovery checks.
    pub fn custom(label: &str, priors: Vec<Prior>) -> Self {
        let slug = label
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect();
        Self {
            label: label.to_string(),
            slug,
            priors,
        }
    }

    pub fn num_coefficients(&self) -> usize {
        self.priors.len()
    }

    /// Coefficient names: `intercept` followed by the predictor names.
    pub fn parameter_names(&self, predictor_names: &[String]) -> Vec<String> {
        std::iter::once("intercept".to_string())
            .chain(predictor_names.iter().cloned())
            .collect()
    }

    /// Returns the index of the first prior with invalid hyperparameters.
    pub fn first_malformed_prior(&self) -> Option<usize> {
        self.priors.iter().position(|p| !p.is_well_formed())
    }

    /// Log prior density of a full coefficient vector.
    pub fn log_prior(&self, beta: ArrayView1<f64>) -> f64 {
        self.priors
            .iter()
            .zip(beta.iter())
            .map(|(prior, &b)| prior.log_density(b))
            .sum()
    }

    /// Textual model description in BUGS notation (priors printed by precision).
    pub fn describe(&self, predictor_names: &[String]) -> String {
        let mut text = String::new();
        let terms: Vec<String> = predictor_names
            .iter()
            .enumerate()
            .map(|(j, name)| format!("b[{}] * {}[i]", j + 1, name))
            .collect();
        let _ = writeln!(text, "model {{");
        let _ = writeln!(text, "  for (i in 1:N) {{");
        let _ = writeln!(text, "    Outcome[i] ~ dbern(p[i])");
        let _ = writeln!(
            text,
            "    logit(p[i]) <- b[0]{}{}",
            if terms.is_empty() { "" } else { " + " },
            terms.join(" + ")
        );
        let _ = writeln!(text, "  }}");
        for (j, prior) in self.priors.iter().enumerate() {
            let _ = writeln!(text, "  b[{j}] ~ {prior}");
        }
        text.push('}');
        text
    }
}

/// `ln(1 + exp(eta))` without overflow.
pub fn softplus(eta: f64) -> f64 {
    if eta > 0.0 {
        eta + (-eta).exp().ln_1p()
    } else {
        eta.exp().ln_1p()
    }
}

/// Bernoulli-logit log likelihood of labels `y` given linear predictors `eta`.
pub fn log_likelihood_from_eta(eta: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
    eta.iter()
        .zip(y.iter())
        .map(|(&e, &yi)| yi * e - softplus(e))
        .sum()
}

/// Linear predictor `b0 + X b[1..]` for a full coefficient vector.
pub fn linear_predictor(x: ArrayView2<f64>, beta: ArrayView1<f64>) -> Array1<f64> {
    let slopes = beta.slice(s![1..]);
    x.dot(&slopes) + beta[0]
}

/// Log posterior of a logistic regression over borrowed design data.
#[derive(Debug, Clone, Copy)]
pub struct LogisticPosterior<'a> {
    pub x: ArrayView2<'a, f64>,
    pub y: ArrayView1<'a, f64>,
    pub spec: &'a ModelSpec,
}

impl<'a> LogisticPosterior<'a> {
    pub fn new(x: ArrayView2<'a, f64>, y: ArrayView1<'a, f64>, spec: &'a ModelSpec) -> Self {
        Self { x, y, spec }
    }

    pub fn log_likelihood(&self, beta: ArrayView1<f64>) -> f64 {
        let eta = linear_predictor(self.x, beta);
        log_likelihood_from_eta(eta.view(), self.y)
    }

    /// Unnormalized log posterior: log likelihood plus log prior.
    pub fn log_posterior(&self, beta: ArrayView1<f64>) -> f64 {
        self.log_likelihood(beta) + self.spec.log_prior(beta)
    }

    /// Log posterior and its gradient with respect to every coefficient.
    ///
    /// The likelihood part of the gradient is `X~^T (y - p)` where `X~` is the design
    /// with a leading column of ones.
    pub fn log_posterior_and_gradient(&self, beta: ArrayView1<f64>) -> (f64, Array1<f64>) {
        let eta = linear_predictor(self.x, beta);
        let logp = log_likelihood_from_eta(eta.view(), self.y) + self.spec.log_prior(beta);

        let residual: Array1<f64> = eta
            .iter()
            .zip(self.y.iter())
            .map(|(&e, &yi)| yi - inverse_logit(e))
            .collect();
        let mut grad = Array1::<f64>::zeros(beta.len());
        grad[0] = residual.sum();
        grad.slice_mut(s![1..]).assign(&self.x.t().dot(&residual));
        for (j, prior) in self.spec.priors.iter().enumerate() {
            grad[j] += prior.grad_log_density(beta[j]);
        }
        (logp, grad)
    }
}

fn inverse_logit(eta: f64) -> f64 {
    if eta >= 0.0 {
        1.0 / (1.0 + (-eta).exp())
    } else {
        let e = eta.exp();
        e / (1.0 + e)
    }
}
