//! Replay loop: walks a series bar by bar through `step`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::domain::{BarSeries, Trade};
use crate::risk::RiskManager;
use crate::signals::SignalGenerator;

use super::ledger::TradeLedger;
use super::step::step;
use super::tracker::{transition, TrackerEvent, TrackerState, TradeTerms};

/// Mark-to-market equity after a bar has been processed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}

/// Everything a replay produces.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReplayOutput {
    pub ledger: TradeLedger,
    /// One point per bar, in bar order.
    pub equity_curve: Vec<EquityPoint>,
}

/// Replay `series` from a flat start.
///
/// The series is assumed valid (checked at construction) and long enough for
/// the generator; an empty series yields an empty output. A position still
/// open after the last bar is closed at that bar's close with reason
/// `end_of_data`, so the returned ledger has one exit for every entry.
pub fn replay<G: SignalGenerator + ?Sized>(
    series: &BarSeries,
    generator: &G,
    risk: &RiskManager,
    terms: &TradeTerms,
    initial_capital: f64,
) -> ReplayOutput {
    let bars = series.bars();
    let mut ledger = TradeLedger::new();
    let mut equity_curve = Vec::with_capacity(bars.len());
    let mut state = TrackerState::Flat;
    let mut realized = 0.0;

    for (k, bar) in bars.iter().enumerate() {
        let outcome = step(state, &bars[..=k], k, generator, risk, terms);
        state = outcome.state;

        if let Some(TrackerEvent::Enter) = outcome.event {
            trace!(bar = k, price = bar.close, "entered position");
        }
        if let Some(trade) = outcome.closed {
            realized += trade.pnl;
            record(&mut ledger, trade);
        }

        if k + 1 == bars.len() && state.is_open() {
            let (flat, closed) = transition(state, TrackerEvent::EndOfData, bar, k, terms);
            state = flat;
            if let Some(trade) = closed {
                realized += trade.pnl;
                record(&mut ledger, trade);
            }
        }

        let unrealized = state.position().map_or(0.0, |p| p.pnl_at(bar.close));
        equity_curve.push(EquityPoint {
            timestamp: bar.timestamp,
            equity: initial_capital + realized + unrealized,
        });
    }

    debug_assert!(!state.is_open());

    ReplayOutput {
        ledger,
        equity_curve,
    }
}

fn record(ledger: &mut TradeLedger, trade: Trade) {
    debug!(
        entry_bar = trade.entry_bar,
        exit_bar = trade.exit_bar,
        entry_price = trade.entry_price,
        exit_price = trade.exit_price,
        pnl = trade.pnl,
        reason = trade.exit_reason.as_str(),
        "closed trade"
    );
    ledger.append(trade);
}
