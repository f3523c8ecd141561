//! Trade: a completed round trip, immutable once recorded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::position::{Position, PositionSide};

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Signal,
    StopLoss,
    TakeProfit,
    EndOfData,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::Signal => "signal",
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::EndOfData => "end_of_data",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A closed round trip: entry → exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub side: PositionSide,

    // ── Entry ──
    pub entry_bar: usize,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_bar: usize,
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,
    pub exit_reason: ExitReason,

    pub size: f64,

    // ── PnL ──
    /// `(exit − entry) × sign(side) × size`.
    pub gross_pnl: f64,
    pub fees: f64,
    /// Realized P&L after fees.
    pub pnl: f64,

    pub bars_held: usize,
}

impl Trade {
    /// Close `position` at `exit_price`, charging `fee_pct` percent of notional on each side.
    pub fn close(
        symbol: &str,
        position: &Position,
        exit_bar: usize,
        exit_time: DateTime<Utc>,
        exit_price: f64,
        exit_reason: ExitReason,
        fee_pct: f64,
    ) -> Self {
        let gross_pnl = position.pnl_at(exit_price);
        let fees = (position.entry_price + exit_price) * position.size * fee_pct / 100.0;
        Self {
            symbol: symbol.to_string(),
            side: position.side,
            entry_bar: position.entry_bar,
            entry_time: position.entry_time,
            entry_price: position.entry_price,
            exit_bar,
            exit_time,
            exit_price,
            exit_reason,
            size: position.size,
            gross_pnl,
            fees,
            pnl: gross_pnl - fees,
            bars_held: exit_bar - position.entry_bar,
        }
    }

    /// Realized P&L as a percentage of entry notional.
    pub fn return_pct(&self) -> f64 {
        let notional = self.entry_price * self.size;
        if notional == 0.0 {
            return 0.0;
        }
        self.pnl / notional * 100.0
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn is_loser(&self) -> bool {
        self.pnl < 0.0
    }
}
