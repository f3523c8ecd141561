//! Simulation engine: position tracker, trade ledger, per-bar step and replay.

pub mod ledger;
pub mod replay;
pub mod step;
pub mod tracker;

pub use ledger::TradeLedger;
pub use replay::{replay, EquityPoint, ReplayOutput};
pub use step::{step, StepOutcome};
pub use tracker::{transition, TrackerEvent, TrackerState, TradeTerms};
