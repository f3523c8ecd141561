//! Request and response bodies.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradelab_core::config::StrategyDefinition;
use tradelab_core::domain::{ExitReason, PositionSide};

use crate::metrics::{profit_factor_serde, BacktestResult};

pub type StrategyId = u64;
pub type BacktestId = u64;
pub type TradeId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyStatus {
    #[default]
    Draft,
    Active,
    Paused,
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingMode {
    #[default]
    Paper,
    Live,
}

fn default_strategy_type() -> String {
    "ma_crossover".to_string()
}

/// Body of `POST /api/strategies`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateStrategyRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub exchange: String,
    pub trading_pair: String,
    pub timeframe: String,
    #[serde(default = "default_strategy_type")]
    pub strategy_type: String,
    #[serde(default)]
    pub trading_mode: TradingMode,
    #[serde(default)]
    pub parameters: BTreeMap<String, f64>,
    #[serde(default)]
    pub stop_loss_pct: Option<f64>,
    #[serde(default)]
    pub take_profit_pct: Option<f64>,
}

impl CreateStrategyRequest {
    pub fn definition(&self) -> StrategyDefinition {
        StrategyDefinition {
            name: self.name.clone(),
            trading_pair: self.trading_pair.clone(),
            timeframe: self.timeframe.clone(),
            strategy_type: self.strategy_type.clone(),
            parameters: self.parameters.clone(),
            stop_loss_pct: self.stop_loss_pct,
            take_profit_pct: self.take_profit_pct,
        }
    }
}

/// A stored strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyRecord {
    pub id: StrategyId,
    pub name: String,
    pub description: String,
    pub exchange: String,
    pub trading_pair: String,
    pub timeframe: String,
    pub strategy_type: String,
    pub parameters: BTreeMap<String, f64>,
    pub stop_loss_pct: Option<f64>,
    pub take_profit_pct: Option<f64>,
    pub status: StrategyStatus,
    pub trading_mode: TradingMode,
    pub created_at: DateTime<Utc>,
}

impl StrategyRecord {
    pub fn from_request(id: StrategyId, request: CreateStrategyRequest) -> Self {
        Self {
            id,
            name: request.name,
            description: request.description,
            exchange: request.exchange,
            trading_pair: request.trading_pair,
            timeframe: request.timeframe,
            strategy_type: request.strategy_type,
            parameters: request.parameters,
            stop_loss_pct: request.stop_loss_pct,
            take_profit_pct: request.take_profit_pct,
            status: StrategyStatus::Draft,
            trading_mode: request.trading_mode,
            created_at: Utc::now(),
        }
    }

    pub fn definition(&self) -> StrategyDefinition {
        StrategyDefinition {
            name: self.name.clone(),
            trading_pair: self.trading_pair.clone(),
            timeframe: self.timeframe.clone(),
            strategy_type: self.strategy_type.clone(),
            parameters: self.parameters.clone(),
            stop_loss_pct: self.stop_loss_pct,
            take_profit_pct: self.take_profit_pct,
        }
    }
}

fn default_days() -> u32 {
    30
}

fn default_initial_capital() -> f64 {
    10_000.0
}

/// Body of `POST /api/strategies/{id}/backtest`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunBacktestRequest {
    #[serde(default = "default_days")]
    pub days: u32,
    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,
}

impl Default for RunBacktestRequest {
    fn default() -> Self {
        Self {
            days: default_days(),
            initial_capital: default_initial_capital(),
        }
    }
}

/// Response of `POST /api/strategies/{id}/backtest`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub total_return_pct: f64,
    pub win_rate: f64,
    pub total_trades: usize,
    #[serde(with = "profit_factor_serde")]
    pub profit_factor: f64,
    pub max_drawdown_pct: f64,
}

impl From<&BacktestResult> for BacktestSummary {
    fn from(r: &BacktestResult) -> Self {
        Self {
            total_return_pct: r.total_return_pct,
            win_rate: r.win_rate,
            total_trades: r.total_trades,
            profit_factor: r.profit_factor,
            max_drawdown_pct: r.max_drawdown_pct,
        }
    }
}

/// A stored backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRecord {
    pub id: BacktestId,
    pub strategy_id: StrategyId,
    pub days: u32,
    pub initial_capital: f64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub bar_count: usize,
    pub dataset_hash: String,
    pub result: BacktestResult,
    pub created_at: DateTime<Utc>,
}

/// One row of `GET /api/trades`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeView {
    pub id: TradeId,
    pub strategy_id: StrategyId,
    pub symbol: String,
    pub side: PositionSide,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_price: f64,
    pub pnl: f64,
    pub exit_reason: ExitReason,
}

/// Error body returned with a non-2xx status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: String,
}
