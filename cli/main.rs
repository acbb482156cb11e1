#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]

use clap::Parser;
use std::path::PathBuf;
use std::process;

use diabayes::config::PipelineConfig;
use diabayes::data::delimiter_for_path;
use diabayes::pipeline::run_pipeline;
use diabayes::report::{render_report, write_outputs};

#[derive(Parser)]
#[command(
    name = "diabayes",
    about = "Bayesian logistic regression for diabetes outcome prediction",
    long_about = "Fits two Bayesian logistic regression models (vague Normal and weakly \
                 informative Cauchy priors) to the Pima diabetes data with MCMC, reports \
                 convergence diagnostics, and scores both models on a held-out test set."
)]
struct Cli {
    /// Path to the delimited data file with a header row
    data: PathBuf,

    /// TOML configuration file; command-line flags take precedence over it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Seed for the train/test split, the chains and the plot jitter
    #[arg(long)]
    seed: Option<u64>,

    /// Number of MCMC chains
    #[arg(long)]
    chains: Option<usize>,

    /// Burn-in iterations discarded per chain
    #[arg(long, value_name = "N")]
    burn_in: Option<usize>,

    /// Retained draws per chain
    #[arg(long, value_name = "N")]
    draws: Option<usize>,

    /// Fraction of rows used for training
    #[arg(long, value_name = "F")]
    train_fraction: Option<f64>,

    /// Directory for posterior summaries, predictions and raw draws
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Disable the per-model progress bar
    #[arg(long)]
    no_progress: bool,
}

impl Cli {
    /// Defaults, then the config file, then explicit flags.
    fn resolve_config(&self) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => {
                let mut config = PipelineConfig::default();
                if delimiter_for_path(&self.data) == b'\t' {
                    config.delimiter = "\t".to_string();
                }
                config
            }
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(chains) = self.chains {
            config.sampler.chains = chains;
        }
        if let Some(burn_in) = self.burn_in {
            config.sampler.burn_in = burn_in;
        }
        if let Some(draws) = self.draws {
            config.sampler.draws = draws;
        }
        if let Some(fraction) = self.train_fraction {
            config.train_fraction = fraction;
        }
        if self.no_progress {
            config.progress = false;
        }
        config.validate()?;
        Ok(config)
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = cli.resolve_config()?;
    let report = run_pipeline(&cli.data, &config)?;
    print!("{}", render_report(&report));
    if let Some(dir) = &cli.output_dir {
        let written = write_outputs(&report, dir)?;
        println!();
        println!("Wrote {} files to {}", written.len(), dir.display());
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
