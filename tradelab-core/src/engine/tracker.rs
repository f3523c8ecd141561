//! Position tracker: the FLAT/OPEN state machine.
//!
//! The state is a plain value: each transition consumes the current state and
//! returns the next one together with the trade it closed, if any. Nothing
//! about the position lives outside that value.
//!
//! ```text
//! Flat ──Enter──────────────▶ Open    (fill at bar close)
//! Open ──RiskExit(reason)───▶ Flat    (fill at threshold price)
//! Open ──SignalExit─────────▶ Flat    (fill at bar close, reason = signal)
//! Open ──EndOfData──────────▶ Flat    (fill at last close, reason = end_of_data)
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, ExitReason, Position, Trade};
use crate::risk::RiskExit;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum TrackerState {
    #[default]
    Flat,
    Open(Position),
}

impl TrackerState {
    pub fn is_open(&self) -> bool {
        matches!(self, TrackerState::Open(_))
    }

    pub fn position(&self) -> Option<&Position> {
        match self {
            TrackerState::Open(position) => Some(position),
            TrackerState::Flat => None,
        }
    }
}

/// An input to the state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackerEvent {
    Enter,
    RiskExit(RiskExit),
    SignalExit,
    EndOfData,
}

/// Per-run constants applied to every position and trade.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeTerms {
    pub symbol: String,
    /// Units bought on entry.
    pub position_size: f64,
    /// Fee per side in percent of notional.
    pub fee_pct: f64,
}

impl TradeTerms {
    pub fn new(symbol: impl Into<String>, position_size: f64, fee_pct: f64) -> Self {
        Self {
            symbol: symbol.into(),
            position_size,
            fee_pct,
        }
    }
}

/// Apply `event` on `bar` (at `bar_index`) to `state`.
///
/// Events that do not apply to the current state (entering while open,
/// exiting while flat) leave the state unchanged.
pub fn transition(
    state: TrackerState,
    event: TrackerEvent,
    bar: &Bar,
    bar_index: usize,
    terms: &TradeTerms,
) -> (TrackerState, Option<Trade>) {
    match (state, event) {
        (TrackerState::Flat, TrackerEvent::Enter) => {
            let position =
                Position::new_long(bar.close, bar.timestamp, bar_index, terms.position_size);
            (TrackerState::Open(position), None)
        }
        (TrackerState::Open(position), TrackerEvent::RiskExit(exit)) => {
            let trade = close(&position, bar, bar_index, exit.price, exit.reason, terms);
            (TrackerState::Flat, Some(trade))
        }
        (TrackerState::Open(position), TrackerEvent::SignalExit) => {
            let trade = close(&position, bar, bar_index, bar.close, ExitReason::Signal, terms);
            (TrackerState::Flat, Some(trade))
        }
        (TrackerState::Open(position), TrackerEvent::EndOfData) => {
            let trade = close(&position, bar, bar_index, bar.close, ExitReason::EndOfData, terms);
            (TrackerState::Flat, Some(trade))
        }
        (state, _) => (state, None),
    }
}

fn close(
    position: &Position,
    bar: &Bar,
    bar_index: usize,
    price: f64,
    reason: ExitReason,
    terms: &TradeTerms,
) -> Trade {
    Trade::close(
        &terms.symbol,
        position,
        bar_index,
        bar.timestamp,
        price,
        reason,
        terms.fee_pct,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn bar(hour: i64, close: f64) -> Bar {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(hour);
        Bar::new(ts, close, close + 2.0, close - 2.0, close)
    }

    fn terms() -> TradeTerms {
        TradeTerms::new("BTC/USDT", 1.0, 0.0)
    }

    #[test]
    fn enter_opens_at_close() {
        let (state, trade) = transition(TrackerState::Flat, TrackerEvent::Enter, &bar(3, 100.0), 3, &terms());
        assert!(trade.is_none());
        let pos = state.position().unwrap();
        assert_eq!(pos.entry_price, 100.0);
        assert_eq!(pos.entry_bar, 3);
        assert!(pos.is_long());
    }

    #[test]
    fn signal_exit_closes_at_close() {
        let (open, _) = transition(TrackerState::Flat, TrackerEvent::Enter, &bar(0, 100.0), 0, &terms());
        let (state, trade) = transition(open, TrackerEvent::SignalExit, &bar(5, 104.0), 5, &terms());
        assert_eq!(state, TrackerState::Flat);
        let trade = trade.unwrap();
        assert_eq!(trade.exit_reason, ExitReason::Signal);
        assert_eq!(trade.exit_price, 104.0);
        assert_eq!(trade.pnl, 4.0);
        assert_eq!(trade.bars_held, 5);
    }

    #[test]
    fn risk_exit_closes_at_threshold() {
        let (open, _) = transition(TrackerState::Flat, TrackerEvent::Enter, &bar(0, 100.0), 0, &terms());
        let exit = RiskExit {
            reason: ExitReason::StopLoss,
            price: 98.0,
        };
        let (state, trade) = transition(open, TrackerEvent::RiskExit(exit), &bar(1, 96.0), 1, &terms());
        assert!(!state.is_open());
        let trade = trade.unwrap();
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        assert_eq!(trade.exit_price, 98.0);
        assert_eq!(trade.pnl, -2.0);
    }

    #[test]
    fn end_of_data_closes_at_close() {
        let (open, _) = transition(TrackerState::Flat, TrackerEvent::Enter, &bar(0, 100.0), 0, &terms());
        let (state, trade) = transition(open, TrackerEvent::EndOfData, &bar(9, 120.0), 9, &terms());
        assert_eq!(state, TrackerState::Flat);
        assert_eq!(trade.unwrap().exit_reason, ExitReason::EndOfData);
    }

    #[test]
    fn inapplicable_events_are_ignored() {
        let (state, trade) = transition(TrackerState::Flat, TrackerEvent::SignalExit, &bar(0, 100.0), 0, &terms());
        assert_eq!(state, TrackerState::Flat);
        assert!(trade.is_none());

        let (open, _) = transition(TrackerState::Flat, TrackerEvent::Enter, &bar(0, 100.0), 0, &terms());
        let (still_open, trade) = transition(open.clone(), TrackerEvent::Enter, &bar(1, 150.0), 1, &terms());
        assert_eq!(still_open, open);
        assert!(trade.is_none());
    }

    #[test]
    fn default_state_is_flat() {
        assert_eq!(TrackerState::default(), TrackerState::Flat);
    }
}
