//! Backtest orchestrator: wires together validation, replay and metrics.
//!
//! `run` is the single entry point. It performs no I/O: the caller loads the
//! series once (see `data_loader`) and may reuse it across many runs.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use tradelab_core::config::{RunParams, StrategyConfig};
use tradelab_core::domain::BarSeries;
use tradelab_core::engine::{replay, EquityPoint, TradeLedger, TradeTerms};
use tradelab_core::risk::RiskManager;
use tradelab_core::signals::{SignalGenerator, Strategy};
use tradelab_core::BacktestError;

use crate::metrics::BacktestResult;

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete output of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRun {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub result: BacktestResult,
    pub trades: TradeLedger,
    pub equity_curve: Vec<EquityPoint>,
    /// Hash of the bars actually replayed (after the `days` slice).
    pub dataset_hash: String,
    pub bar_count: usize,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Run one backtest.
///
/// Steps, in order:
/// 1. validate the strategy config and run params (ConfigurationError)
/// 2. slice the series to the last `days` days, if requested
/// 3. require a non-empty slice of at least `warmup_bars` bars (InsufficientData)
/// 4. replay bar by bar and aggregate the ledger
///
/// Series integrity is checked when the `BarSeries` is built, so a series that
/// reaches this function is already ordered and sane.
pub fn run(
    config: &StrategyConfig,
    series: &BarSeries,
    params: &RunParams,
) -> Result<BacktestRun, BacktestError> {
    config.validate()?;
    params.validate()?;
    let strategy = Strategy::from_kind(&config.strategy)?;

    let window = match params.days {
        Some(days) => series.slice_last_days(days),
        None => series.clone(),
    };

    let required = strategy.warmup_bars().max(1);
    if window.len() < required {
        return Err(BacktestError::InsufficientData {
            required,
            available: window.len(),
        });
    }

    info!(
        strategy = %config.name,
        symbol = window.symbol(),
        timeframe = %window.timeframe(),
        bars = window.len(),
        "backtest started"
    );

    if window.timeframe() != config.timeframe {
        warn!(
            configured = %config.timeframe,
            series = %window.timeframe(),
            "timeframe mismatch; annualizing with the series timeframe"
        );
    }

    let risk = RiskManager::new(config.risk);
    let terms = TradeTerms::new(window.symbol(), params.position_size, params.fee_pct);
    let output = replay(&window, &strategy, &risk, &terms, params.initial_capital);

    let result = BacktestResult::compute(
        &output.ledger,
        params.initial_capital,
        &output.equity_curve,
        window.timeframe(),
    );

    info!(
        strategy = %config.name,
        trades = result.total_trades,
        total_return_pct = result.total_return_pct,
        max_drawdown_pct = result.max_drawdown_pct,
        "backtest finished"
    );
    debug!(win_rate = result.win_rate, sharpe = result.sharpe_ratio, "backtest detail");

    Ok(BacktestRun {
        schema_version: SCHEMA_VERSION,
        result,
        dataset_hash: window.dataset_hash(),
        bar_count: window.len(),
        trades: output.ledger,
        equity_curve: output.equity_curve,
    })
}
