//! Strategy API service layer.
//!
//! The HTTP contract expressed as typed calls over two seams: a
//! [`StrategyStore`] for records and a [`BarSource`] for price history.

pub mod dto;
pub mod service;
pub mod source;
pub mod store;

pub use dto::{
    BacktestId, BacktestRecord, BacktestSummary, CreateStrategyRequest, ErrorBody,
    RunBacktestRequest, StrategyId, StrategyRecord, StrategyStatus, TradeId, TradeView,
    TradingMode,
};
pub use service::{ApiError, StrategyService};
pub use source::{BarSource, CsvBarSource, SyntheticBarSource};
pub use store::{InMemoryStore, StoreError, StrategyStore};
