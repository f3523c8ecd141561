//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Determinism: replaying the same inputs gives bit-identical output
//! 2. Pairing: trades never overlap and every entry has exactly one exit
//! 3. Risk fills: stop-loss and take-profit exits fill exactly at their thresholds
//! 4. Equity: the last equity point equals capital plus realized P&L

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use tradelab_core::config::RiskParams;
use tradelab_core::domain::{Bar, BarSeries, ExitReason, Timeframe};
use tradelab_core::engine::{replay, ReplayOutput, TradeTerms};
use tradelab_core::risk::RiskManager;
use tradelab_core::signals::MaCrossover;

// ── Strategies (proptest) ────────────────────────────────────────────

/// Random walk of closes, converted to sane hourly bars.
fn arb_bars() -> impl Strategy<Value = Vec<Bar>> {
    prop::collection::vec(-4.0..4.0_f64, 10..160).prop_map(|steps| {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let mut close = 100.0_f64;
        steps
            .iter()
            .enumerate()
            .map(|(i, step)| {
                let open = close;
                close = (close + step).max(1.0);
                Bar {
                    timestamp: base + Duration::hours(i as i64),
                    open,
                    high: open.max(close) + 0.75,
                    low: (open.min(close) - 0.75).max(0.1),
                    close,
                    volume: None,
                }
            })
            .collect()
    })
}

fn arb_windows() -> impl Strategy<Value = (usize, usize)> {
    (1usize..8, 1usize..12).prop_map(|(fast, extra)| (fast, fast + extra))
}

fn arb_risk() -> impl Strategy<Value = RiskParams> {
    (0.0..10.0_f64, 0.0..15.0_f64).prop_map(|(sl, tp)| RiskParams::new(sl, tp))
}

fn run(bars: &[Bar], (fast, slow): (usize, usize), risk: RiskParams) -> ReplayOutput {
    let series = BarSeries::new("PROP", Timeframe::H1, bars.to_vec()).unwrap();
    let sig = MaCrossover::new(fast, slow).unwrap();
    replay(
        &series,
        &sig,
        &RiskManager::new(risk),
        &TradeTerms::new("PROP", 1.0, 0.1),
        10_000.0,
    )
}

// ── 1. Determinism ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn replay_is_deterministic(bars in arb_bars(), windows in arb_windows(), risk in arb_risk()) {
        let a = run(&bars, windows, risk);
        let b = run(&bars, windows, risk);
        prop_assert_eq!(a.ledger.len(), b.ledger.len());
        for (x, y) in a.ledger.iter().zip(b.ledger.iter()) {
            prop_assert_eq!(x.pnl.to_bits(), y.pnl.to_bits());
            prop_assert_eq!(x.exit_bar, y.exit_bar);
        }
        for (x, y) in a.equity_curve.iter().zip(b.equity_curve.iter()) {
            prop_assert_eq!(x.equity.to_bits(), y.equity.to_bits());
        }
    }
}

// ── 2. Pairing ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn trades_are_ordered_and_disjoint(bars in arb_bars(), windows in arb_windows(), risk in arb_risk()) {
        let out = run(&bars, windows, risk);
        let trades = out.ledger.as_slice();
        for t in trades {
            prop_assert!(t.exit_bar >= t.entry_bar);
            prop_assert!(t.exit_bar < bars.len());
            prop_assert_eq!(t.bars_held, t.exit_bar - t.entry_bar);
        }
        for pair in trades.windows(2) {
            // One transition per bar: the next entry comes strictly after the previous exit.
            prop_assert!(pair[1].entry_bar > pair[0].exit_bar);
        }
    }

    #[test]
    fn only_the_last_trade_can_end_at_end_of_data(bars in arb_bars(), windows in arb_windows(), risk in arb_risk()) {
        let out = run(&bars, windows, risk);
        let trades = out.ledger.as_slice();
        for (i, t) in trades.iter().enumerate() {
            if t.exit_reason == ExitReason::EndOfData {
                prop_assert_eq!(i, trades.len() - 1);
                prop_assert_eq!(t.exit_bar, bars.len() - 1);
            }
        }
    }
}

// ── 3. Risk fills ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn risk_exits_fill_at_threshold(bars in arb_bars(), windows in arb_windows(), risk in arb_risk()) {
        let out = run(&bars, windows, risk);
        for t in out.ledger.iter() {
            match t.exit_reason {
                ExitReason::StopLoss => {
                    let stop = t.entry_price * (1.0 - risk.stop_loss_pct / 100.0);
                    prop_assert!((t.exit_price - stop).abs() < 1e-9);
                    prop_assert!(bars[t.exit_bar].low <= stop);
                }
                ExitReason::TakeProfit => {
                    let target = t.entry_price * (1.0 + risk.take_profit_pct / 100.0);
                    prop_assert!((t.exit_price - target).abs() < 1e-9);
                    prop_assert!(bars[t.exit_bar].high >= target);
                }
                ExitReason::Signal | ExitReason::EndOfData => {
                    prop_assert_eq!(t.exit_price, bars[t.exit_bar].close);
                }
            }
        }
    }
}

// ── 4. Equity ────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn final_equity_is_capital_plus_realized(bars in arb_bars(), windows in arb_windows(), risk in arb_risk()) {
        let out = run(&bars, windows, risk);
        prop_assert_eq!(out.equity_curve.len(), bars.len());
        let realized: f64 = out.ledger.iter().map(|t| t.pnl).sum();
        let last = out.equity_curve.last().unwrap().equity;
        prop_assert!((last - (10_000.0 + realized)).abs() < 1e-6);
    }
}
