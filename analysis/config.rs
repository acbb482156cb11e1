//! Run configuration, loaded from an optional TOML file.

use crate::diagnostics::DEFAULT_LAGS;
use crate::sampler::SamplerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read or write configuration file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML configuration: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to serialize configuration to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Everything a pipeline run depends on besides the data file itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Seed for the split, the per-chain samplers and the plot jitter
    pub seed: u64,
    /// Fraction of rows assigned to training
    pub train_fraction: f64,
    /// Field delimiter of the input file; a single ASCII character, or "\t"
    pub delimiter: String,
    pub autocorrelation_lags: Vec<usize>,
    /// Half-width of the uniform jitter added to 0/1 labels in prediction files
    pub jitter: f64,
    /// Draw a progress bar over the fitted models on a terminal
    pub progress: bool,
    pub sampler: SamplerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            train_fraction: 0.6,
            delimiter: ",".to_string(),
            autocorrelation_lags: DEFAULT_LAGS.to_vec(),
            jitter: 0.05,
            progress: true,
            sampler: SamplerConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let toml_string = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&toml_string)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        Ok(())
    }

    /// The delimiter as a byte; `"\t"` and `"tab"` both mean a tab.
    pub fn delimiter_byte(&self) -> Result<u8, ConfigError> {
        match self.delimiter.as_str() {
            "\t" | "\\t" | "tab" => Ok(b'\t'),
            s if s.len() == 1 && s.is_ascii() => Ok(s.as_bytes()[0]),
            other => Err(ConfigError::Invalid(format!(
                "delimiter must be a single ASCII character, got {other:?}"
            ))),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sampler
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "train_fraction must lie strictly between 0 and 1, got {}",
                self.train_fraction
            )));
        }
        if !(self.jitter.is_finite() && self.jitter >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "jitter must be non-negative, got {}",
                self.jitter
            )));
        }
        self.delimiter_byte()?;
        Ok(())
    }
}
