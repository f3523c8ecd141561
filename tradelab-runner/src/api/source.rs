//! Bar sources for the API service.

use std::path::PathBuf;

use tradelab_core::domain::{BarSeries, Timeframe};

use crate::config::SyntheticSpec;
use crate::data_loader::{load_csv, synthetic_series, LoadError};

/// Supplies the price history for a trading pair.
pub trait BarSource: Send + Sync {
    fn load(&self, trading_pair: &str, timeframe: Timeframe) -> Result<BarSeries, LoadError>;
}

/// Reads `{dir}/{PAIR}_{timeframe}.csv`, with `/` in the pair replaced by `_`
/// (e.g. `BTC_USDT_1h.csv`).
#[derive(Debug, Clone)]
pub struct CsvBarSource {
    dir: PathBuf,
}

impl CsvBarSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn file_for(&self, trading_pair: &str, timeframe: Timeframe) -> PathBuf {
        let stem = trading_pair.replace(['/', ':'], "_");
        self.dir.join(format!("{stem}_{timeframe}.csv"))
    }
}

impl BarSource for CsvBarSource {
    fn load(&self, trading_pair: &str, timeframe: Timeframe) -> Result<BarSeries, LoadError> {
        load_csv(&self.file_for(trading_pair, timeframe), trading_pair, timeframe)
    }
}

/// Seeded random walks; each pair gets its own deterministic path.
#[derive(Debug, Clone, Default)]
pub struct SyntheticBarSource {
    spec: SyntheticSpec,
}

impl SyntheticBarSource {
    pub fn new(spec: SyntheticSpec) -> Self {
        Self { spec }
    }
}

impl BarSource for SyntheticBarSource {
    fn load(&self, trading_pair: &str, timeframe: Timeframe) -> Result<BarSeries, LoadError> {
        let digest = blake3::hash(trading_pair.as_bytes());
        let mut seed_bytes = [0u8; 8];
        seed_bytes.copy_from_slice(&digest.as_bytes()[..8]);
        let spec = SyntheticSpec {
            seed: self.spec.seed ^ u64::from_le_bytes(seed_bytes),
            ..self.spec
        };
        synthetic_series(trading_pair, timeframe, &spec)
    }
}
