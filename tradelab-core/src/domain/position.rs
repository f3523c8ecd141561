use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of an open position.
///
/// The reference strategy only ever opens longs; `Short` exists so that P&L
/// is written once in terms of `sign()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    pub fn sign(&self) -> f64 {
        match self {
            PositionSide::Long => 1.0,
            PositionSide::Short => -1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PositionSide::Long => "long",
            PositionSide::Short => "short",
        }
    }
}

/// The single open position of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub side: PositionSide,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub entry_bar: usize,
    /// Units held, fixed for the whole run.
    pub size: f64,
}

impl Position {
    pub fn new_long(entry_price: f64, entry_time: DateTime<Utc>, entry_bar: usize, size: f64) -> Self {
        Self {
            side: PositionSide::Long,
            entry_price,
            entry_time,
            entry_bar,
            size,
        }
    }

    pub fn is_long(&self) -> bool {
        self.side == PositionSide::Long
    }

    /// Gross P&L if the position were closed at `price`.
    pub fn pnl_at(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.side.sign() * self.size
    }
}
