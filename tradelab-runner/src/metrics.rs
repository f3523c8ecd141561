//! Performance metrics: pure functions that compute backtest statistics.
//!
//! Every metric is a pure function: trade list and/or equity curve in, scalar
//! out. `BacktestResult::compute` can be called again on a stored ledger
//! without re-simulating.

use serde::{Deserialize, Serialize};
use tradelab_core::domain::{Timeframe, Trade};
use tradelab_core::engine::EquityPoint;

/// Summary statistics for one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Σ pnl / initial_capital × 100.
    pub total_return_pct: f64,
    /// Winners / total × 100, in `[0, 100]`.
    pub win_rate: f64,
    pub total_trades: usize,
    /// Gross profit / |gross loss|. `+∞` when there are winners and no losers.
    #[serde(with = "profit_factor_serde")]
    pub profit_factor: f64,
    /// Deepest peak-to-trough decline of closed-trade equity, in percent (≤ 0).
    pub max_drawdown_pct: f64,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub total_pnl: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub initial_capital: f64,
    pub final_capital: f64,
    /// Annualized from bar-level equity returns.
    pub sharpe_ratio: f64,
}

impl BacktestResult {
    /// Compute all metrics from a closed-trade list.
    ///
    /// `equity_curve` and `timeframe` feed only the Sharpe ratio.
    pub fn compute<'a, I>(
        trades: I,
        initial_capital: f64,
        equity_curve: &[EquityPoint],
        timeframe: Timeframe,
    ) -> Self
    where
        I: IntoIterator<Item = &'a Trade>,
    {
        let pnls: Vec<f64> = trades.into_iter().map(|t| t.pnl).collect();
        let equity: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();
        let total_pnl: f64 = pnls.iter().sum();

        Self {
            total_return_pct: total_return_pct(total_pnl, initial_capital),
            win_rate: win_rate(&pnls),
            total_trades: pnls.len(),
            profit_factor: profit_factor(&pnls),
            max_drawdown_pct: max_drawdown_pct(&closed_trade_equity(&pnls, initial_capital)),
            winning_trades: pnls.iter().filter(|&&p| p > 0.0).count(),
            losing_trades: pnls.iter().filter(|&&p| p < 0.0).count(),
            total_pnl,
            avg_win: avg_win(&pnls),
            avg_loss: avg_loss(&pnls),
            largest_win: pnls.iter().copied().filter(|&p| p > 0.0).fold(0.0, f64::max),
            largest_loss: pnls.iter().copied().filter(|&p| p < 0.0).fold(0.0, f64::min),
            initial_capital,
            final_capital: initial_capital + total_pnl,
            sharpe_ratio: sharpe_ratio(&equity, timeframe.periods_per_year()),
        }
    }

    /// True when the profit factor is unbounded (winners, no losers).
    pub fn has_unbounded_profit_factor(&self) -> bool {
        self.profit_factor.is_infinite()
    }
}

// ─── Individual metric functions ────────────────────────────────────

pub fn total_return_pct(total_pnl: f64, initial_capital: f64) -> f64 {
    if initial_capital <= 0.0 {
        return 0.0;
    }
    total_pnl / initial_capital * 100.0
}

/// Percentage of trades with strictly positive P&L. 0 with no trades.
pub fn win_rate(pnls: &[f64]) -> f64 {
    if pnls.is_empty() {
        return 0.0;
    }
    let winners = pnls.iter().filter(|&&p| p > 0.0).count();
    winners as f64 / pnls.len() as f64 * 100.0
}

/// Gross profit / |gross loss|.
///
/// 0 with no trades or no winners; `+∞` with at least one winner and no losers.
pub fn profit_factor(pnls: &[f64]) -> f64 {
    let gross_profit: f64 = pnls.iter().filter(|&&p| p > 0.0).sum();
    let gross_loss: f64 = pnls.iter().filter(|&&p| p < 0.0).map(|p| p.abs()).sum();

    if gross_profit <= 0.0 {
        return 0.0;
    }
    if gross_loss <= 0.0 {
        return f64::INFINITY;
    }
    gross_profit / gross_loss
}

/// Equity after each trade closes, starting with `initial_capital`.
pub fn closed_trade_equity(pnls: &[f64], initial_capital: f64) -> Vec<f64> {
    let mut equity = Vec::with_capacity(pnls.len() + 1);
    let mut current = initial_capital;
    equity.push(current);
    for pnl in pnls {
        current += pnl;
        equity.push(current);
    }
    equity
}

/// Maximum drawdown in percent (e.g., -15.0 = 15% drawdown).
///
/// Returns 0.0 if equity never falls below its running peak.
pub fn max_drawdown_pct(equity: &[f64]) -> f64 {
    let Some(&first) = equity.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;

    for &eq in equity {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            let dd = (eq - peak) / peak * 100.0;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Mean P&L of winning trades, 0 if none.
pub fn avg_win(pnls: &[f64]) -> f64 {
    mean_f64(&pnls.iter().copied().filter(|&p| p > 0.0).collect::<Vec<_>>())
}

/// Mean P&L of losing trades (negative), 0 if none.
pub fn avg_loss(pnls: &[f64]) -> f64 {
    mean_f64(&pnls.iter().copied().filter(|&p| p < 0.0).collect::<Vec<_>>())
}

/// Annualized Sharpe ratio of per-bar equity returns, risk-free rate 0.
///
/// Returns 0.0 if there are fewer than 2 returns or the variance is zero.
pub fn sharpe_ratio(equity: &[f64], periods_per_year: f64) -> f64 {
    let returns = period_returns(equity);
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(&returns);
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    (mean / std) * periods_per_year.sqrt()
}

// ─── Helpers ────────────────────────────────────────────────────────

pub fn period_returns(equity: &[f64]) -> Vec<f64> {
    equity
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// JSON has no infinity: `+∞` goes over the wire as `null` and comes back as `+∞`.
pub mod profit_factor_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use tradelab_core::domain::{ExitReason, Position};

    fn make_trade(pnl: f64) -> Trade {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let pos = Position::new_long(100.0, start, 0, 1.0);
        Trade::close(
            "BTC/USDT",
            &pos,
            5,
            start + Duration::hours(5),
            100.0 + pnl,
            ExitReason::Signal,
            0.0,
        )
    }

    fn curve(values: &[f64]) -> Vec<EquityPoint> {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &equity)| EquityPoint {
                timestamp: start + Duration::hours(i as i64),
                equity,
            })
            .collect()
    }

    fn result(pnls: &[f64]) -> BacktestResult {
        let trades: Vec<Trade> = pnls.iter().map(|&p| make_trade(p)).collect();
        BacktestResult::compute(&trades, 10_000.0, &[], Timeframe::H1)
    }

    // ── No trades ──

    #[test]
    fn no_trades_is_all_zero() {
        let r = result(&[]);
        assert_eq!(r.total_trades, 0);
        assert_eq!(r.total_return_pct, 0.0);
        assert_eq!(r.win_rate, 0.0);
        assert_eq!(r.profit_factor, 0.0);
        assert_eq!(r.max_drawdown_pct, 0.0);
        assert_eq!(r.final_capital, 10_000.0);
    }

    // ── Return & win rate ──

    #[test]
    fn total_return_is_pnl_over_capital() {
        let r = result(&[100.0, -40.0]);
        assert!((r.total_return_pct - 0.6).abs() < 1e-10);
        assert!((r.total_pnl - 60.0).abs() < 1e-10);
        assert!((r.final_capital - 10_060.0).abs() < 1e-10);
    }

    #[test]
    fn win_rate_in_percent() {
        let r = result(&[10.0, -5.0, 3.0, -1.0]);
        assert!((r.win_rate - 50.0).abs() < 1e-10);
        assert_eq!(r.winning_trades, 2);
        assert_eq!(r.losing_trades, 2);
    }

    #[test]
    fn breakeven_trade_is_neither_winner_nor_loser() {
        let r = result(&[0.0, 5.0]);
        assert_eq!(r.winning_trades, 1);
        assert_eq!(r.losing_trades, 0);
        assert!((r.win_rate - 50.0).abs() < 1e-10);
    }

    // ── Profit factor ──

    #[test]
    fn profit_factor_ratio() {
        assert!((profit_factor(&[30.0, -10.0, 10.0, -10.0]) - 2.0).abs() < 1e-10);
    }

    #[test]
    fn profit_factor_all_winners_is_infinite() {
        assert_eq!(profit_factor(&[5.0, 1.0]), f64::INFINITY);
        assert!(result(&[5.0]).has_unbounded_profit_factor());
    }

    #[test]
    fn profit_factor_all_losers_is_zero() {
        assert_eq!(profit_factor(&[-5.0, -1.0]), 0.0);
    }

    #[test]
    fn infinite_profit_factor_round_trips_as_null() {
        let r = result(&[5.0]);
        let json = serde_json::to_value(&r).unwrap();
        assert!(json["profit_factor"].is_null());
        let back: BacktestResult = serde_json::from_value(json).unwrap();
        assert_eq!(back.profit_factor, f64::INFINITY);
    }

    #[test]
    fn finite_profit_factor_serializes_as_number() {
        let r = result(&[30.0, -10.0]);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["profit_factor"].as_f64(), Some(3.0));
    }

    // ── Drawdown ──

    #[test]
    fn drawdown_from_running_peak() {
        // 10_000 → 11_000 → 9_900 → 10_400
        let eq = closed_trade_equity(&[1_000.0, -1_100.0, 500.0], 10_000.0);
        assert!((max_drawdown_pct(&eq) - (-10.0)).abs() < 1e-10);
    }

    #[test]
    fn drawdown_zero_when_never_dipping() {
        let r = result(&[10.0, 20.0, 0.0]);
        assert_eq!(r.max_drawdown_pct, 0.0);
    }

    #[test]
    fn drawdown_counts_dip_below_initial_capital() {
        let r = result(&[-500.0]);
        assert!((r.max_drawdown_pct - (-5.0)).abs() < 1e-10);
    }

    // ── Averages ──

    #[test]
    fn averages_and_extremes() {
        let r = result(&[10.0, 30.0, -4.0, -8.0]);
        assert!((r.avg_win - 20.0).abs() < 1e-10);
        assert!((r.avg_loss - (-6.0)).abs() < 1e-10);
        assert!((r.largest_win - 30.0).abs() < 1e-10);
        assert!((r.largest_loss - (-8.0)).abs() < 1e-10);
    }

    // ── Sharpe ──

    #[test]
    fn sharpe_zero_for_constant_equity() {
        assert_eq!(sharpe_ratio(&[100.0; 10], 8_760.0), 0.0);
    }

    #[test]
    fn sharpe_zero_for_short_curve() {
        assert_eq!(sharpe_ratio(&[100.0, 101.0], 8_760.0), 0.0);
    }

    #[test]
    fn sharpe_positive_for_rising_equity() {
        let trades = vec![make_trade(5.0)];
        let eq = curve(&[10_000.0, 10_001.0, 10_003.0, 10_004.0, 10_005.0]);
        let r = BacktestResult::compute(&trades, 10_000.0, &eq, Timeframe::D1);
        assert!(r.sharpe_ratio > 0.0);
    }

    #[test]
    fn compute_is_repeatable() {
        let trades: Vec<Trade> = [12.0, -3.5, 7.25].iter().map(|&p| make_trade(p)).collect();
        let a = BacktestResult::compute(&trades, 5_000.0, &[], Timeframe::M15);
        let b = BacktestResult::compute(&trades, 5_000.0, &[], Timeframe::M15);
        assert_eq!(a, b);
    }
}
