//! TradeLab Core: domain types, strategy configuration and the simulation engine.
//!
//! This crate contains the deterministic part of a backtest:
//! - Domain types (bars, series, positions, trades)
//! - Strategy configuration and validation
//! - Signal generators (one variant per strategy family)
//! - Fixed stop-loss / take-profit risk manager
//! - FLAT/OPEN position tracker, append-only trade ledger
//! - Per-bar step with a fixed risk-then-signal order, and the replay loop
//!
//! Nothing here does I/O. Metrics, orchestration and data loading live in
//! `tradelab-runner`.

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod risk;
pub mod signals;

pub use error::BacktestError;
