//! TOML run files.
//!
//! ```toml
//! [strategy]
//! name = "btc trend"
//! trading_pair = "BTC/USDT"
//! timeframe = "1h"
//! strategy_type = "ma_crossover"
//! stop_loss_pct = 2.0
//! take_profit_pct = 5.0
//!
//! [strategy.parameters]
//! fast_ma = 10
//! slow_ma = 30
//!
//! [run]
//! initial_capital = 10000.0
//! days = 30
//!
//! [data]
//! csv = "data/btc_1h.csv"
//! # or: synthetic = { bars = 2000, seed = 7, start_price = 100.0 }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tradelab_core::config::{ConfigError, RunParams, StrategyConfig, StrategyDefinition};

/// Unique identifier for a run configuration (content-addressable hash).
pub type RunId = String;

/// Errors from reading a run file.
#[derive(Debug, Error)]
pub enum RunnerConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Strategy(#[from] ConfigError),
    #[error("[data] must set exactly one of `csv` or `synthetic`")]
    AmbiguousData,
}

/// Parameters of a seeded synthetic random walk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyntheticSpec {
    #[serde(default = "default_synthetic_bars")]
    pub bars: usize,
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_start_price")]
    pub start_price: f64,
}

fn default_synthetic_bars() -> usize {
    1_000
}

fn default_start_price() -> f64 {
    100.0
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            bars: default_synthetic_bars(),
            seed: 0,
            start_price: default_start_price(),
        }
    }
}

/// Where bars come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataSource {
    Csv(PathBuf),
    Synthetic(SyntheticSpec),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct DataSection {
    #[serde(default)]
    csv: Option<PathBuf>,
    #[serde(default)]
    synthetic: Option<SyntheticSpec>,
}

/// A complete, reproducible run description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestFile {
    pub strategy: StrategyDefinition,
    pub run: RunParams,
    #[serde(default)]
    data: DataSection,
}

impl BacktestFile {
    pub fn load(path: &Path) -> Result<Self, RunnerConfigError> {
        let text = fs::read_to_string(path).map_err(|source| RunnerConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, RunnerConfigError> {
        let file: Self = toml::from_str(text)?;
        file.data_source()?;
        Ok(file)
    }

    /// Validated strategy configuration.
    pub fn strategy_config(&self) -> Result<StrategyConfig, RunnerConfigError> {
        Ok(StrategyConfig::try_from(&self.strategy)?)
    }

    pub fn run_params(&self) -> RunParams {
        self.run
    }

    /// Data source; synthetic with defaults when `[data]` is absent.
    pub fn data_source(&self) -> Result<DataSource, RunnerConfigError> {
        match (&self.data.csv, &self.data.synthetic) {
            (Some(_), Some(_)) => Err(RunnerConfigError::AmbiguousData),
            (Some(path), None) => Ok(DataSource::Csv(path.clone())),
            (None, Some(spec)) => Ok(DataSource::Synthetic(*spec)),
            (None, None) => Ok(DataSource::Synthetic(SyntheticSpec::default())),
        }
    }

    /// Resolve a relative CSV path against the directory of the run file.
    pub fn resolve_relative_to(mut self, base: &Path) -> Self {
        if let Some(csv) = self.data.csv.as_mut() {
            if csv.is_relative() {
                *csv = base.join(&*csv);
            }
        }
        self
    }

    /// Deterministic hash of the full configuration.
    ///
    /// Two files with the same `RunId` describe the same run.
    pub fn run_id(&self) -> Result<RunId, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
