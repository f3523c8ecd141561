//! `StrategyService`: the strategy/backtest/trade API as plain calls.
//!
//! Route mapping:
//! - `POST   /api/strategies`               → `create_strategy`
//! - `GET    /api/strategies`               → `list_strategies`
//! - `GET    /api/strategies/{id}`          → `get_strategy`
//! - `DELETE /api/strategies/{id}`          → `delete_strategy`
//! - `POST   /api/strategies/{id}/backtest` → `run_backtest`
//! - `GET    /api/strategies/{id}/backtests`→ `list_backtests`
//! - `GET    /api/strategies/{id}/trades`   → `strategy_trades`
//! - `GET    /api/trades`                   → `list_trades`

use thiserror::Error;
use tracing::info;

use tradelab_core::config::{ConfigError, RunParams, StrategyConfig};
use tradelab_core::BacktestError;

use super::dto::{
    BacktestRecord, BacktestSummary, CreateStrategyRequest, ErrorBody, RunBacktestRequest,
    StrategyId, StrategyRecord, TradeView,
};
use super::source::BarSource;
use super::store::{StoreError, StrategyStore};
use crate::data_loader::LoadError;
use crate::runner::run;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Backtest(#[from] BacktestError),

    #[error("strategy {0} not found")]
    StrategyNotFound(StrategyId),

    #[error("bar source: {0}")]
    BarSource(#[from] LoadError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ConfigError> for ApiError {
    fn from(e: ConfigError) -> Self {
        ApiError::Backtest(BacktestError::Configuration(e))
    }
}

impl ApiError {
    /// HTTP status the error maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Backtest(BacktestError::Configuration(_)) => 400,
            ApiError::StrategyNotFound(_) => 404,
            ApiError::Backtest(BacktestError::InsufficientData { .. })
            | ApiError::Backtest(BacktestError::DataIntegrity(_))
            | ApiError::BarSource(LoadError::Series(_)) => 422,
            ApiError::BarSource(_) => 502,
            ApiError::Store(_) => 500,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Backtest(e) => e.kind(),
            ApiError::StrategyNotFound(_) => "not_found",
            ApiError::BarSource(LoadError::Series(_)) => "data_integrity_error",
            ApiError::BarSource(_) => "bar_source_error",
            ApiError::Store(_) => "store_error",
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
            kind: self.kind().to_string(),
        }
    }
}

/// Strategy API over a store and a bar source.
pub struct StrategyService<S, B> {
    store: S,
    bars: B,
}

impl<S: StrategyStore, B: BarSource> StrategyService<S, B> {
    pub fn new(store: S, bars: B) -> Self {
        Self { store, bars }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validates and stores a strategy. Nothing is run.
    pub fn create_strategy(&self, request: CreateStrategyRequest) -> Result<StrategyRecord, ApiError> {
        StrategyConfig::try_from(&request.definition())?;
        let record = self.store.insert_strategy(request)?;
        info!(id = record.id, name = %record.name, pair = %record.trading_pair, "strategy created");
        Ok(record)
    }

    pub fn get_strategy(&self, id: StrategyId) -> Result<StrategyRecord, ApiError> {
        self.store.strategy(id)?.ok_or(ApiError::StrategyNotFound(id))
    }

    pub fn list_strategies(&self) -> Result<Vec<StrategyRecord>, ApiError> {
        Ok(self.store.strategies()?)
    }

    /// Removes a strategy with its backtests and trades.
    pub fn delete_strategy(&self, id: StrategyId) -> Result<(), ApiError> {
        if !self.store.delete_strategy(id)? {
            return Err(ApiError::StrategyNotFound(id));
        }
        info!(id, "strategy deleted");
        Ok(())
    }

    /// Runs the stored strategy over the last `days` days of its pair.
    ///
    /// Configuration and run parameters are validated before any bar is
    /// loaded. The backtest and its trades are persisted together, and only on
    /// success.
    pub fn run_backtest(
        &self,
        id: StrategyId,
        request: RunBacktestRequest,
    ) -> Result<BacktestSummary, ApiError> {
        let record = self.get_strategy(id)?;
        let config = StrategyConfig::try_from(&record.definition())?;
        let params = RunParams::new(request.initial_capital).with_days(request.days);
        params.validate()?;

        let series = self.bars.load(&config.trading_pair, config.timeframe)?;
        let backtest = run(&config, &series, &params)?;

        let stored = self.store.insert_backtest_with_trades(
            id,
            request.days,
            request.initial_capital,
            &backtest,
        )?;
        info!(
            strategy_id = id,
            backtest_id = stored.id,
            trades = backtest.result.total_trades,
            "backtest stored"
        );

        Ok(BacktestSummary::from(&backtest.result))
    }

    pub fn list_backtests(&self, id: StrategyId) -> Result<Vec<BacktestRecord>, ApiError> {
        self.get_strategy(id)?;
        Ok(self.store.backtests(id)?)
    }

    pub fn list_trades(&self) -> Result<Vec<TradeView>, ApiError> {
        Ok(self.store.trades(None)?)
    }

    pub fn strategy_trades(&self, id: StrategyId) -> Result<Vec<TradeView>, ApiError> {
        self.get_strategy(id)?;
        Ok(self.store.trades(Some(id))?)
    }
}
