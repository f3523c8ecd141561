//! The per-bar step.
//!
//! # Ordering contract
//! For bar `k` the step applies, in this order and no other:
//!
//! 1. **Risk check** (only when a position is open): the bar's high/low is
//!    tested against the stop-loss and take-profit thresholds. A hit closes
//!    the position at the threshold price and ends the step.
//! 2. **Signal** on `bars[..=k]`: `Exit` closes an open position at the
//!    close, `Enter` opens one at the close when flat.
//!
//! At most one transition happens per bar. A position closed by the risk
//! check is not re-entered on the same bar, and a position opened on bar `k`
//! is first risk-checked on bar `k + 1`.

use crate::domain::{Bar, Trade};
use crate::risk::RiskManager;
use crate::signals::{Signal, SignalGenerator};

use super::tracker::{transition, TrackerEvent, TrackerState, TradeTerms};

/// Result of one step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub state: TrackerState,
    /// Trade closed on this bar, if any.
    pub closed: Option<Trade>,
    /// Event applied on this bar, if any.
    pub event: Option<TrackerEvent>,
}

/// Advance `state` over the last bar of `history`.
///
/// `history` is `bars[..=bar_index]`; the step never sees later bars.
pub fn step<G: SignalGenerator + ?Sized>(
    state: TrackerState,
    history: &[Bar],
    bar_index: usize,
    generator: &G,
    risk: &RiskManager,
    terms: &TradeTerms,
) -> StepOutcome {
    let Some(bar) = history.last() else {
        return StepOutcome {
            state,
            closed: None,
            event: None,
        };
    };

    let event = decide(&state, history, bar, generator, risk);
    match event {
        Some(event) => {
            let (state, closed) = transition(state, event, bar, bar_index, terms);
            StepOutcome {
                state,
                closed,
                event: Some(event),
            }
        }
        None => StepOutcome {
            state,
            closed: None,
            event: None,
        },
    }
}

fn decide<G: SignalGenerator + ?Sized>(
    state: &TrackerState,
    history: &[Bar],
    bar: &Bar,
    generator: &G,
    risk: &RiskManager,
) -> Option<TrackerEvent> {
    // (1) risk
    if let Some(position) = state.position() {
        if let Some(exit) = risk.check(position, bar) {
            return Some(TrackerEvent::RiskExit(exit));
        }
    }

    // (2) signal
    match generator.signal(history, state.is_open()) {
        Signal::Enter => Some(TrackerEvent::Enter),
        Signal::Exit => Some(TrackerEvent::SignalExit),
        Signal::Hold => None,
    }
}
