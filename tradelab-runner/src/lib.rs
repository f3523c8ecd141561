//! TradeLab Runner: backtest orchestration, metrics and everything around a run.
//!
//! This crate builds on `tradelab-core` to provide:
//! - Metrics aggregation over the trade ledger
//! - The backtest orchestrator (`run`)
//! - TOML run files and CSV/synthetic bar loading
//! - The strategy API service layer with an in-memory store
//! - Parallel parameter sweeps
//! - JSONL run history and artifact export

pub mod api;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod history;
pub mod metrics;
pub mod runner;
pub mod sweep;

pub use api::{ApiError, InMemoryStore, StrategyService};
pub use config::{BacktestFile, DataSource, RunnerConfigError, SyntheticSpec};
pub use data_loader::{load_csv, load_series, synthetic_series, LoadError};
pub use history::{HistoryEntry, RunHistory};
pub use metrics::BacktestResult;
pub use runner::{run, BacktestRun, SCHEMA_VERSION};
pub use sweep::{ParamGrid, ParamSweep, SweepEntry, SweepResults};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn backtest_result_is_send_sync() {
        assert_send::<BacktestResult>();
        assert_sync::<BacktestResult>();
    }

    #[test]
    fn backtest_run_is_send_sync() {
        assert_send::<BacktestRun>();
        assert_sync::<BacktestRun>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<BacktestFile>();
        assert_sync::<BacktestFile>();
        assert_send::<DataSource>();
        assert_sync::<DataSource>();
    }

    #[test]
    fn sweep_types_are_send_sync() {
        assert_send::<ParamGrid>();
        assert_sync::<ParamGrid>();
        assert_send::<SweepResults>();
        assert_sync::<SweepResults>();
    }

    #[test]
    fn history_entry_is_send_sync() {
        assert_send::<HistoryEntry>();
        assert_sync::<HistoryEntry>();
    }

    #[test]
    fn service_is_send_sync() {
        assert_send::<StrategyService<InMemoryStore, api::SyntheticBarSource>>();
        assert_sync::<StrategyService<InMemoryStore, api::SyntheticBarSource>>();
    }
}
