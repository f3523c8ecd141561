//! Risk manager: fixed stop-loss and take-profit exits.
//!
//! Thresholds are set once from the entry price and never adjusted:
//! - take-profit: `entry × (1 + take_profit_pct / 100)`, hit when `high >= price`
//! - stop-loss:   `entry × (1 − stop_loss_pct / 100)`, hit when `low <= price`
//!
//! A bar's OHLC does not say which extreme came first. When both thresholds
//! are inside the bar's range the stop-loss is assumed to have filled first.
//! The exit fills at the threshold price, never at the bar's high or low.

use serde::{Deserialize, Serialize};

use crate::config::RiskParams;
use crate::domain::{Bar, ExitReason, Position, PositionSide};

/// A forced exit decided by the risk manager.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskExit {
    pub reason: ExitReason,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskManager {
    params: RiskParams,
}

impl RiskManager {
    pub fn new(params: RiskParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> RiskParams {
        self.params
    }

    /// Stop price for `position`, or `None` when the stop-loss is disabled.
    pub fn stop_loss_price(&self, position: &Position) -> Option<f64> {
        if self.params.stop_loss_pct <= 0.0 {
            return None;
        }
        let distance = self.params.stop_loss_pct / 100.0;
        Some(match position.side {
            PositionSide::Long => position.entry_price * (1.0 - distance),
            PositionSide::Short => position.entry_price * (1.0 + distance),
        })
    }

    /// Target price for `position`, or `None` when the take-profit is disabled.
    pub fn take_profit_price(&self, position: &Position) -> Option<f64> {
        if self.params.take_profit_pct <= 0.0 {
            return None;
        }
        let distance = self.params.take_profit_pct / 100.0;
        Some(match position.side {
            PositionSide::Long => position.entry_price * (1.0 + distance),
            PositionSide::Short => position.entry_price * (1.0 - distance),
        })
    }

    /// Check `bar` against the position's thresholds.
    pub fn check(&self, position: &Position, bar: &Bar) -> Option<RiskExit> {
        let take_profit = self
            .take_profit_price(position)
            .filter(|&price| match position.side {
                PositionSide::Long => bar.high >= price,
                PositionSide::Short => bar.low <= price,
            })
            .map(|price| RiskExit {
                reason: ExitReason::TakeProfit,
                price,
            });

        let stop_loss = self
            .stop_loss_price(position)
            .filter(|&price| match position.side {
                PositionSide::Long => bar.low <= price,
                PositionSide::Short => bar.high >= price,
            })
            .map(|price| RiskExit {
                reason: ExitReason::StopLoss,
                price,
            });

        // Worst case first.
        stop_loss.or(take_profit)
    }
}
