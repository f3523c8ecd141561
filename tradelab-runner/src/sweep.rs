//! Parameter sweep over MA crossover windows.
//!
//! Every `(fast_ma, slow_ma)` cell is an independent run over the same
//! immutable series, so cells execute in parallel on the rayon pool.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use tradelab_core::config::{RunParams, StrategyConfig, StrategyKind};
use tradelab_core::domain::BarSeries;
use tradelab_core::BacktestError;

use crate::metrics::BacktestResult;
use crate::runner::run;

/// Parameter grid specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub fast_periods: Vec<usize>,
    pub slow_periods: Vec<usize>,
}

impl ParamGrid {
    pub fn new(fast_periods: Vec<usize>, slow_periods: Vec<usize>) -> Self {
        Self {
            fast_periods,
            slow_periods,
        }
    }

    /// Fast 5..=20 step 5, slow 20..=60 step 10.
    pub fn ma_crossover_default() -> Self {
        Self {
            fast_periods: vec![5, 10, 15, 20],
            slow_periods: vec![20, 30, 40, 50, 60],
        }
    }

    /// Number of cells including invalid ones.
    pub fn size(&self) -> usize {
        self.fast_periods.len() * self.slow_periods.len()
    }

    /// Valid `(fast, slow)` pairs in grid order, skipping `fast == 0` and `fast >= slow`.
    pub fn pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for &fast in &self.fast_periods {
            for &slow in &self.slow_periods {
                if fast == 0 || fast >= slow {
                    continue;
                }
                pairs.push((fast, slow));
            }
        }
        pairs
    }
}

/// One evaluated grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepEntry {
    pub fast_ma: usize,
    pub slow_ma: usize,
    pub result: BacktestResult,
}

/// Results from a parameter sweep, best total return first.
#[derive(Debug, Clone, Default)]
pub struct SweepResults {
    entries: Vec<SweepEntry>,
    skipped: usize,
}

impl SweepResults {
    pub fn all(&self) -> &[SweepEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn best(&self) -> Option<&SweepEntry> {
        self.entries.first()
    }

    /// Valid cells that could not run because the series was too short.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Parameter sweep executor.
pub struct ParamSweep {
    parallel: bool,
}

impl Default for ParamSweep {
    fn default() -> Self {
        Self { parallel: true }
    }
}

impl ParamSweep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run every valid cell of `grid` with `base`'s pair, timeframe and risk.
    ///
    /// Invalid run params (or an invalid base risk config) fail the whole
    /// sweep. Cells whose slow window exceeds the series are skipped.
    /// Results are sorted by `total_return_pct` descending, ties broken by
    /// `(fast_ma, slow_ma)` ascending, so the order is deterministic.
    pub fn sweep(
        &self,
        base: &StrategyConfig,
        series: &BarSeries,
        params: &RunParams,
        grid: &ParamGrid,
    ) -> Result<SweepResults, BacktestError> {
        params.validate()?;
        let pairs = grid.pairs();
        info!(cells = grid.size(), valid = pairs.len(), parallel = self.parallel, "sweep started");

        let evaluate = |&(fast, slow): &(usize, usize)| -> Result<Option<SweepEntry>, BacktestError> {
            let mut config = base.clone();
            config.strategy = StrategyKind::MaCrossover {
                fast_ma: fast,
                slow_ma: slow,
            };
            config.name = config.strategy.default_name();

            match run(&config, series, params) {
                Ok(backtest) => Ok(Some(SweepEntry {
                    fast_ma: fast,
                    slow_ma: slow,
                    result: backtest.result,
                })),
                Err(BacktestError::InsufficientData { required, available }) => {
                    warn!(fast, slow, required, available, "skipping sweep cell");
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        };

        let cells: Vec<Option<SweepEntry>> = if self.parallel {
            pairs.par_iter().map(evaluate).collect::<Result<_, _>>()?
        } else {
            pairs.iter().map(evaluate).collect::<Result<_, _>>()?
        };

        let skipped = cells.iter().filter(|c| c.is_none()).count();
        let mut entries: Vec<SweepEntry> = cells.into_iter().flatten().collect();
        entries.sort_by(|a, b| {
            b.result
                .total_return_pct
                .total_cmp(&a.result.total_return_pct)
                .then_with(|| (a.fast_ma, a.slow_ma).cmp(&(b.fast_ma, b.slow_ma)))
        });

        info!(evaluated = entries.len(), skipped, "sweep finished");
        Ok(SweepResults { entries, skipped })
    }
}
