//! End-to-end orchestration: load, impute, split, standardize, sample, diagnose, score.
//!
//! Every model variant gets its own [`ModelRun`]; nothing computed for one variant is
//! reused or overwritten by the next.

use crate::config::{ConfigError, PipelineConfig};
use crate::data::{DataError, Dataset, load_dataset};
use crate::diagnostics::{ConvergenceReport, RHAT_WARNING_THRESHOLD};
use crate::impute::{ImputationSummary, impute_sentinels};
use crate::model::{ModelSpec, ModelVariant};
use crate::predict::{Evaluation, PredictionError, evaluate, posterior_mean};
use crate::sampler::{
    NutsEngine, PosteriorDraws, PosteriorSummary, SamplingData, SamplingEngine, SamplingError,
};
use crate::split::{SplitError, TrainTestSplit, split_rows};
use crate::standardize::{Standardized, standardize};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use ndarray::Array1;
use std::io::IsTerminal;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Data error: {0}")]
    Data(#[from] DataError),
    #[error("Split error: {0}")]
    Split(#[from] SplitError),
    #[error("Sampling error: {0}")]
    Sampling(#[from] SamplingError),
    #[error("Prediction error: {0}")]
    Prediction(#[from] PredictionError),
}

/// One side of the split, standardized on its own statistics.
#[derive(Debug, Clone)]
pub struct Partition {
    /// Row numbers (0-based) in the loaded file
    pub rows: Vec<usize>,
    pub x: Standardized,
    pub y: Array1<f64>,
}

impl Partition {
    fn from_rows(dataset: &Dataset, rows: &[usize]) -> Self {
        let subset = dataset.select_rows(rows);
        Self {
            rows: rows.to_vec(),
            x: standardize(subset.predictors.view()),
            y: subset.outcome,
        }
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }
}

/// The model-ready data shared by every variant.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub names: Vec<String>,
    pub imputation: ImputationSummary,
    pub split: TrainTestSplit,
    pub train: Partition,
    pub test: Partition,
}

impl PreparedData {
    /// Imputes sentinels, splits with `config.seed`, and standardizes each side separately.
    pub fn prepare(mut dataset: Dataset, config: &PipelineConfig) -> Result<Self, PipelineError> {
        let imputation = impute_sentinels(&mut dataset);
        let split = split_rows(dataset.n_rows(), config.train_fraction, config.seed)?;
        let train = Partition::from_rows(&dataset, &split.train);
        let test = Partition::from_rows(&dataset, &split.test);
        Ok(Self {
            names: Dataset::predictor_names(),
            imputation,
            split,
            train,
            test,
        })
    }

    pub fn training_data(&self) -> SamplingData {
        SamplingData::new(
            self.names.clone(),
            self.train.x.matrix.clone(),
            self.train.y.clone(),
        )
    }
}

/// Everything produced for a single model variant.
#[derive(Debug, Clone)]
pub struct ModelRun {
    pub spec: ModelSpec,
    pub draws: PosteriorDraws,
    pub convergence: ConvergenceReport,
    pub summary: PosteriorSummary,
    /// Posterior mean coefficient vector, intercept first
    pub coefficients: Array1<f64>,
    pub train: Evaluation,
    pub test: Evaluation,
}

#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub config: PipelineConfig,
    pub prepared: PreparedData,
    pub runs: Vec<ModelRun>,
}

/// Samples one model on the training partition and scores it on both partitions.
pub fn fit_model<E: SamplingEngine>(
    engine: &E,
    spec: ModelSpec,
    prepared: &PreparedData,
    lags: &[usize],
) -> Result<ModelRun, PipelineError> {
    let draws = engine.sample(&spec, &prepared.training_data())?;

    let convergence = ConvergenceReport::from_draws(&draws, lags);
    for p in convergence.unconverged() {
        log::warn!(
            "{}: R-hat for '{}' is {:.3} (above {}); chains may not have converged.",
            spec.label,
            p.name,
            p.rhat,
            RHAT_WARNING_THRESHOLD
        );
    }

    let summary = draws.summarize();
    let coefficients = posterior_mean(&draws)?;
    let train = evaluate(
        coefficients.view(),
        prepared.train.x.matrix.view(),
        prepared.train.y.view(),
    )?;
    let test = evaluate(
        coefficients.view(),
        prepared.test.x.matrix.view(),
        prepared.test.y.view(),
    )?;
    log::info!(
        "{}: training accuracy {:.4}, test accuracy {:.4}",
        spec.label,
        train.accuracy,
        test.accuracy
    );

    Ok(ModelRun {
        spec,
        draws,
        convergence,
        summary,
        coefficients,
        train,
        test,
    })
}

/// One tick per fitted model, drawn only when enabled and stderr is a terminal.
fn create_progress_bar(models: usize, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let draw_target = if std::io::stderr().is_terminal() {
        ProgressDrawTarget::stderr_with_hz(20)
    } else {
        ProgressDrawTarget::hidden()
    };
    let pb = ProgressBar::with_draw_target(Some(models as u64), draw_target);
    if let Ok(style) = ProgressStyle::with_template(
        "> [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} models {msg}",
    ) {
        pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
    }
    pb
}

/// Runs the given models, in order, on an already-loaded dataset.
pub fn run_models(
    dataset: Dataset,
    config: &PipelineConfig,
    specs: Vec<ModelSpec>,
) -> Result<PipelineReport, PipelineError> {
    config.validate()?;
    let prepared = PreparedData::prepare(dataset, config)?;
    let engine = NutsEngine::new(config.sampler.clone(), config.seed);

    let progress = create_progress_bar(specs.len(), config.progress);
    let runs = specs
        .into_iter()
        .map(|spec| {
            progress.set_message(format!("fitting {}", spec.label));
            let run = fit_model(&engine, spec, &prepared, &config.autocorrelation_lags);
            progress.inc(1);
            run
        })
        .collect::<Result<Vec<_>, _>>();
    progress.finish_and_clear();
    let runs = runs?;

    Ok(PipelineReport {
        config: config.clone(),
        prepared,
        runs,
    })
}

/// Runs Model A and Model B on an already-loaded dataset.
pub fn run_on_dataset(
    dataset: Dataset,
    config: &PipelineConfig,
) -> Result<PipelineReport, PipelineError> {
    let num_predictors = dataset.predictors.ncols();
    let specs = ModelVariant::ALL
        .iter()
        .map(|variant| variant.spec(num_predictors))
        .collect();
    run_models(dataset, config, specs)
}

/// Loads the file at `path` and runs the full two-model analysis.
pub fn run_pipeline(path: &Path, config: &PipelineConfig) -> Result<PipelineReport, PipelineError> {
    let dataset = load_dataset(path, config.delimiter_byte()?)?;
    run_on_dataset(dataset, config)
}
