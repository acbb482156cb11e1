//! Human-readable reporting and optional output files.
//!
//! Files written per model, under the chosen output directory:
//!
//! - `posterior_<model>.toml`: coefficient summaries, diagnostics, accuracies and the
//!   configuration that produced them.
//! - `predictions_<model>_<set>.tsv`: per-row probability, prediction, label and a
//!   jittered label for scatter plots.
//! - `draws_<model>.tsv`: every retained draw, tagged with chain and iteration.

use crate::config::PipelineConfig;
use crate::model::Prior;
use crate::pipeline::{ModelRun, Partition, PipelineReport};
use crate::predict::Evaluation;
use itertools::Itertools;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt::Write as FmtWrite;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    IoError(#[from] io::Error),
    #[error("Failed to serialize posterior summary to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
    #[error("Failed to parse posterior summary file: {0}")]
    TomlParseError(#[from] toml::de::Error),
}

/// One coefficient's entry in a posterior summary file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientRecord {
    pub name: String,
    pub mean: f64,
    pub std_dev: f64,
    pub lower_95: f64,
    pub upper_95: f64,
    pub rhat: f64,
    pub ess: f64,
    pub prior: Prior,
}

/// Contents of `posterior_<model>.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosteriorFile {
    pub model: String,
    pub num_chains: usize,
    pub draws_per_chain: usize,
    pub train_accuracy: f64,
    pub test_accuracy: f64,
    pub config: PipelineConfig,
    pub coefficients: Vec<CoefficientRecord>,
}

impl PosteriorFile {
    pub fn from_run(run: &ModelRun, config: &PipelineConfig) -> Self {
        let coefficients = run
            .summary
            .names
            .iter()
            .enumerate()
            .map(|(j, name)| CoefficientRecord {
                name: name.clone(),
                mean: run.summary.mean[j],
                std_dev: run.summary.std_dev[j],
                lower_95: run.summary.lower[j],
                upper_95: run.summary.upper[j],
                rhat: run.convergence.parameters[j].rhat,
                ess: run.convergence.parameters[j].ess,
                prior: run.spec.priors[j],
            })
            .collect();
        Self {
            model: run.spec.label.clone(),
            num_chains: run.draws.num_chains(),
            draws_per_chain: run.draws.draws_per_chain(),
            train_accuracy: run.train.accuracy,
            test_accuracy: run.test.accuracy,
            config: config.clone(),
            coefficients,
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ReportError> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut file = BufWriter::new(File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ReportError> {
        let toml_string = fs::read_to_string(path)?;
        Ok(toml::from_str(&toml_string)?)
    }
}

fn render_run(out: &mut String, run: &ModelRun, prepared_sizes: (usize, usize)) -> std::fmt::Result {
    writeln!(out, "==== {} ====", run.spec.label)?;
    writeln!(
        out,
        "{} chains x {} retained draws",
        run.draws.num_chains(),
        run.draws.draws_per_chain()
    )?;
    writeln!(out)?;
    writeln!(out, "Convergence diagnostics")?;
    write!(out, "{}", run.convergence)?;
    writeln!(out)?;
    writeln!(out, "Posterior summary")?;
    writeln!(
        out,
        "{:<26} {:>10} {:>10} {:>10} {:>10}",
        "parameter", "mean", "sd", "2.5%", "97.5%"
    )?;
    let s = &run.summary;
    for (j, name) in s.names.iter().enumerate() {
        writeln!(
            out,
            "{:<26} {:>10.4} {:>10.4} {:>10.4} {:>10.4}",
            name, s.mean[j], s.std_dev[j], s.lower[j], s.upper[j]
        )?;
    }
    for (set, evaluation, n) in [
        ("Training set", &run.train, prepared_sizes.0),
        ("Test set", &run.test, prepared_sizes.1),
    ] {
        writeln!(out)?;
        writeln!(out, "{set} ({n} rows)")?;
        write!(out, "{}", evaluation.confusion)?;
        writeln!(out, "accuracy: {:.4}", evaluation.accuracy)?;
    }
    writeln!(out)
}

/// Renders the full text report printed to stdout.
pub fn render_report(report: &PipelineReport) -> String {
    let mut out = String::new();
    let prepared = &report.prepared;
    let sizes = (prepared.train.len(), prepared.test.len());
    // Writing into a String cannot fail.
    let _ = writeln!(
        out,
        "Imputed {} sentinel values; {} training rows, {} test rows (seed {}).",
        prepared.imputation.total_replaced(),
        sizes.0,
        sizes.1,
        report.config.seed
    );
    let _ = writeln!(out);
    for run in &report.runs {
        let _ = render_run(&mut out, run, sizes);
    }
    let _ = writeln!(out, "==== Accuracy summary ====");
    for run in &report.runs {
        let _ = writeln!(
            out,
            "{} training accuracy: {:.4}",
            run.spec.label, run.train.accuracy
        );
        let _ = writeln!(out, "{} test accuracy: {:.4}", run.spec.label, run.test.accuracy);
    }
    out
}

fn write_predictions(
    path: &Path,
    partition: &Partition,
    evaluation: &Evaluation,
    jitter: f64,
    seed: u64,
) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut ryu_buffer = ryu::Buffer::new();
    let mut ryu_buffer_jitter = ryu::Buffer::new();

    writeln!(writer, "row\tprobability\tpredicted\tactual\tjittered_actual")?;
    for (i, &row) in partition.rows.iter().enumerate() {
        let actual = evaluation.actual[i];
        let jittered = f64::from(actual) + rng.gen_range(-jitter..=jitter);
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}",
            row + 1,
            ryu_buffer.format(evaluation.probabilities[i]),
            evaluation.predicted[i],
            actual,
            ryu_buffer_jitter.format(jittered)
        )?;
    }
    writer.flush()
}

fn write_draws(path: &Path, run: &ModelRun) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    let mut ryu_buffer = ryu::Buffer::new();
    let mut line = String::new();

    writeln!(
        writer,
        "chain\titeration\t{}",
        run.draws.parameter_names.iter().join("\t")
    )?;
    for (c, chain) in run.draws.chains.iter().enumerate() {
        for (t, row) in chain.rows().into_iter().enumerate() {
            line.clear();
            let _ = write!(line, "{}\t{}", c + 1, t + 1);
            for &value in row {
                line.push('\t');
                line.push_str(ryu_buffer.format(value));
            }
            writeln!(writer, "{line}")?;
        }
    }
    writer.flush()
}

/// Writes every per-model output file into `dir`, creating it if needed.
pub fn write_outputs(report: &PipelineReport, dir: &Path) -> Result<Vec<PathBuf>, ReportError> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    let prepared = &report.prepared;

    for (m, run) in report.runs.iter().enumerate() {
        let slug = &run.spec.slug;

        let posterior_path = dir.join(format!("posterior_{slug}.toml"));
        PosteriorFile::from_run(run, &report.config).save(&posterior_path)?;
        written.push(posterior_path);

        for (s, (set, partition, evaluation)) in [
            ("train", &prepared.train, &run.train),
            ("test", &prepared.test, &run.test),
        ]
        .into_iter()
        .enumerate()
        {
            let path = dir.join(format!("predictions_{slug}_{set}.tsv"));
            let jitter_seed = report.config.seed.wrapping_add((2 * m + s) as u64 + 1);
            write_predictions(&path, partition, evaluation, report.config.jitter, jitter_seed)?;
            written.push(path);
        }

        let draws_path = dir.join(format!("draws_{slug}.tsv"));
        write_draws(&draws_path, run)?;
        written.push(draws_path);
    }

    log::info!(
        "Wrote {} output files to '{}'",
        written.len(),
        dir.display()
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Dataset, PREDICTOR_COLUMNS};
    use crate::pipeline::run_on_dataset;
    use crate::sampler::SamplerConfig;
    use ndarray::{Array1, Array2};
    use tempfile::tempdir;

    fn small_report() -> PipelineReport {
        let n = 30;
        let predictors = Array2::from_shape_fn((n, PREDICTOR_COLUMNS.len()), |(i, j)| {
            2.0 + ((i * 5 + j * 11) % 13) as f64
        });
        let outcome = Array1::from_shape_fn(n, |i| (i % 2) as f64);
        let dataset = Dataset::new(predictors, outcome).unwrap();
        let config = PipelineConfig {
            progress: false,
            sampler: SamplerConfig {
                chains: 2,
                burn_in: 50,
                draws: 60,
                ..SamplerConfig::default()
            },
            ..PipelineConfig::default()
        };
        run_on_dataset(dataset, &config).unwrap()
    }

    #[test]
    fn test_render_report_mentions_every_section() {
        let report = small_report();
        let text = render_report(&report);
        assert!(text.contains("==== Model A ===="));
        assert!(text.contains("==== Model B ===="));
        assert!(text.contains("Posterior summary"));
        assert!(text.contains("R-hat"));
        assert!(text.contains("Model B test accuracy:"));
        assert!(text.contains("Test set (12 rows)"));
    }

    #[test]
    fn test_write_outputs() {
        let report = small_report();
        let dir = tempdir().unwrap();
        let written = write_outputs(&report, dir.path()).unwrap();
        assert_eq!(written.len(), 8);

        let posterior = PosteriorFile::load(&dir.path().join("posterior_model_a.toml")).unwrap();
        assert_eq!(posterior.model, "Model A");
        assert_eq!(posterior.coefficients.len(), 9);
        assert_eq!(posterior.coefficients[0].name, "intercept");
        assert_eq!(posterior.draws_per_chain, 60);
        assert_eq!(posterior.config, report.config);

        let predictions =
            fs::read_to_string(dir.path().join("predictions_model_b_test.tsv")).unwrap();
        let lines: Vec<&str> = predictions.lines().collect();
        assert_eq!(lines[0], "row\tprobability\tpredicted\tactual\tjittered_actual");
        assert_eq!(lines.len(), 1 + 12);
        for line in &lines[1..] {
            let fields: Vec<&str> = line.split('\t').collect();
            assert_eq!(fields.len(), 5);
            let actual: f64 = fields[3].parse().unwrap();
            let jittered: f64 = fields[4].parse().unwrap();
            assert!((jittered - actual).abs() <= report.config.jitter);
        }

        let draws = fs::read_to_string(dir.path().join("draws_model_a.tsv")).unwrap();
        let header = draws.lines().next().unwrap();
        assert!(header.starts_with("chain\titeration\tintercept\tPregnancies"));
        assert_eq!(draws.lines().count(), 1 + 2 * 60);
    }

    #[test]
    fn test_prediction_files_are_reproducible() {
        let report = small_report();
        let a = tempdir().unwrap();
        let b = tempdir().unwrap();
        write_outputs(&report, a.path()).unwrap();
        write_outputs(&report, b.path()).unwrap();
        let name = "predictions_model_a_train.tsv";
        assert_eq!(
            fs::read_to_string(a.path().join(name)).unwrap(),
            fs::read_to_string(b.path().join(name)).unwrap()
        );
    }
}
