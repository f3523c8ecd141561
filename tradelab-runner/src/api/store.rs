//! Strategy, backtest and trade persistence seam.

use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::Utc;
use thiserror::Error;

use tradelab_core::domain::Trade;

use super::dto::{
    BacktestId, BacktestRecord, CreateStrategyRequest, StrategyId, StrategyRecord, TradeId,
    TradeView,
};
use crate::runner::BacktestRun;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store lock poisoned")]
    Poisoned,
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Persistence for the API service.
///
/// Implementations assign ids. Deleting a strategy removes its backtests and
/// trades.
pub trait StrategyStore: Send + Sync {
    fn insert_strategy(&self, request: CreateStrategyRequest) -> Result<StrategyRecord, StoreError>;

    fn strategy(&self, id: StrategyId) -> Result<Option<StrategyRecord>, StoreError>;

    fn strategies(&self) -> Result<Vec<StrategyRecord>, StoreError>;

    fn delete_strategy(&self, id: StrategyId) -> Result<bool, StoreError>;

    /// Stores a finished backtest together with its trades.
    ///
    /// Either both land or neither does.
    fn insert_backtest_with_trades(
        &self,
        strategy_id: StrategyId,
        days: u32,
        initial_capital: f64,
        run: &BacktestRun,
    ) -> Result<BacktestRecord, StoreError>;

    fn backtests(&self, strategy_id: StrategyId) -> Result<Vec<BacktestRecord>, StoreError>;

    /// All trades, or only those of `strategy_id`, in insertion order.
    fn trades(&self, strategy_id: Option<StrategyId>) -> Result<Vec<TradeView>, StoreError>;
}

#[derive(Debug, Default)]
struct StoreState {
    last_strategy_id: StrategyId,
    last_backtest_id: BacktestId,
    last_trade_id: TradeId,
    strategies: BTreeMap<StrategyId, StrategyRecord>,
    backtests: Vec<BacktestRecord>,
    trades: Vec<TradeView>,
}

impl StoreState {
    fn push_trade(&mut self, strategy_id: StrategyId, t: &Trade) {
        self.last_trade_id += 1;
        self.trades.push(TradeView {
            id: self.last_trade_id,
            strategy_id,
            symbol: t.symbol.clone(),
            side: t.side,
            entry_time: t.entry_time,
            exit_time: t.exit_time,
            entry_price: t.entry_price,
            exit_price: t.exit_price,
            pnl: t.pnl,
            exit_reason: t.exit_reason,
        });
    }
}

/// In-memory store guarded by a `RwLock`; shareable across threads.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&StoreState) -> T) -> Result<T, StoreError> {
        let guard = self.state.read().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&guard))
    }

    fn write<T>(&self, f: impl FnOnce(&mut StoreState) -> T) -> Result<T, StoreError> {
        let mut guard = self.state.write().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&mut guard))
    }
}

impl StrategyStore for InMemoryStore {
    fn insert_strategy(&self, request: CreateStrategyRequest) -> Result<StrategyRecord, StoreError> {
        self.write(|s| {
            s.last_strategy_id += 1;
            let record = StrategyRecord::from_request(s.last_strategy_id, request);
            s.strategies.insert(record.id, record.clone());
            record
        })
    }

    fn strategy(&self, id: StrategyId) -> Result<Option<StrategyRecord>, StoreError> {
        self.read(|s| s.strategies.get(&id).cloned())
    }

    fn strategies(&self) -> Result<Vec<StrategyRecord>, StoreError> {
        self.read(|s| s.strategies.values().cloned().collect())
    }

    fn delete_strategy(&self, id: StrategyId) -> Result<bool, StoreError> {
        self.write(|s| {
            let removed = s.strategies.remove(&id).is_some();
            if removed {
                s.backtests.retain(|b| b.strategy_id != id);
                s.trades.retain(|t| t.strategy_id != id);
            }
            removed
        })
    }

    fn insert_backtest_with_trades(
        &self,
        strategy_id: StrategyId,
        days: u32,
        initial_capital: f64,
        run: &BacktestRun,
    ) -> Result<BacktestRecord, StoreError> {
        self.write(|s| {
            s.last_backtest_id += 1;
            let record = BacktestRecord {
                id: s.last_backtest_id,
                strategy_id,
                days,
                initial_capital,
                start_time: run.equity_curve.first().map(|p| p.timestamp),
                end_time: run.equity_curve.last().map(|p| p.timestamp),
                bar_count: run.bar_count,
                dataset_hash: run.dataset_hash.clone(),
                result: run.result.clone(),
                created_at: Utc::now(),
            };
            s.backtests.push(record.clone());
            for t in run.trades.as_slice() {
                s.push_trade(strategy_id, t);
            }
            record
        })
    }

    fn backtests(&self, strategy_id: StrategyId) -> Result<Vec<BacktestRecord>, StoreError> {
        self.read(|s| {
            s.backtests
                .iter()
                .filter(|b| b.strategy_id == strategy_id)
                .cloned()
                .collect()
        })
    }

    fn trades(&self, strategy_id: Option<StrategyId>) -> Result<Vec<TradeView>, StoreError> {
        self.read(|s| {
            s.trades
                .iter()
                .filter(|t| strategy_id.map_or(true, |id| t.strategy_id == id))
                .cloned()
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn request(name: &str) -> CreateStrategyRequest {
        CreateStrategyRequest {
            name: name.into(),
            description: String::new(),
            exchange: "binance".into(),
            trading_pair: "BTC/USDT".into(),
            timeframe: "1h".into(),
            strategy_type: "ma_crossover".into(),
            trading_mode: Default::default(),
            parameters: BTreeMap::from([("fast_ma".into(), 5.0), ("slow_ma".into(), 20.0)]),
            stop_loss_pct: None,
            take_profit_pct: None,
        }
    }

    #[test]
    fn ids_are_sequential() {
        let store = InMemoryStore::new();
        let a = store.insert_strategy(request("a")).unwrap();
        let b = store.insert_strategy(request("b")).unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(store.strategies().unwrap().len(), 2);
        assert_eq!(store.strategy(2).unwrap().unwrap().name, "b");
        assert!(store.strategy(3).unwrap().is_none());
    }

    #[test]
    fn delete_reports_missing() {
        let store = InMemoryStore::new();
        let a = store.insert_strategy(request("a")).unwrap();
        assert!(store.delete_strategy(a.id).unwrap());
        assert!(!store.delete_strategy(a.id).unwrap());
    }

    #[test]
    fn backtest_and_trades_land_together() {
        use chrono::{TimeZone, Utc};
        use tradelab_core::config::{RunParams, StrategyConfig};
        use tradelab_core::domain::{Bar, BarSeries, Timeframe};

        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bars = (0..60)
            .map(|i| {
                let c = 100.0 + 10.0 * (i as f64 / 6.0).sin();
                Bar::new(base + Timeframe::H1.duration() * i, c, c + 1.0, c - 1.0, c)
            })
            .collect();
        let series = BarSeries::new("BTC/USDT", Timeframe::H1, bars).unwrap();
        let config = StrategyConfig::ma_crossover("BTC/USDT", Timeframe::H1, 2, 4);
        let run = crate::runner::run(&config, &series, &RunParams::new(1_000.0)).unwrap();
        assert!(!run.trades.is_empty());

        let store = InMemoryStore::new();
        let id = store.insert_strategy(request("a")).unwrap().id;
        let record = store.insert_backtest_with_trades(id, 30, 1_000.0, &run).unwrap();
        assert_eq!(record.id, 1);
        assert_eq!(record.bar_count, 60);
        let stored: Vec<_> = store.backtests(id).unwrap().iter().map(|b| b.id).collect();
        assert_eq!(stored, vec![record.id]);

        let trades = store.trades(Some(id)).unwrap();
        assert_eq!(trades.len(), run.trades.len());
        assert!(trades.iter().map(|t| t.id).eq(1..=trades.len() as u64));
    }
}
