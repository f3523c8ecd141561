//! End-to-end runs over hand-built series.
//!
//! Covers the four reference scenarios (flat, rising, stop-loss gap,
//! invalid windows) plus determinism and fee handling.

use chrono::{TimeZone, Utc};
use tradelab_core::config::{RunParams, StrategyConfig};
use tradelab_core::domain::{Bar, BarSeries, ExitReason, Timeframe};
use tradelab_runner::runner::run;

const CAPITAL: f64 = 10_000.0;

fn series(closes: &[f64]) -> BarSeries {
    let base = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            Bar::new(
                base + Timeframe::H1.duration() * i as i32,
                c,
                c * 1.01,
                c * 0.99,
                c,
            )
        })
        .collect();
    BarSeries::new("BTC/USDT", Timeframe::H1, bars).unwrap()
}

fn config(fast: usize, slow: usize) -> StrategyConfig {
    StrategyConfig::ma_crossover("BTC/USDT", Timeframe::H1, fast, slow)
}

#[test]
fn scenario_a_flat_series_has_no_trades() {
    let s = series(&[100.0; 40]);
    let backtest = run(&config(5, 20).with_risk(2.0, 5.0), &s, &RunParams::new(CAPITAL)).unwrap();

    let r = &backtest.result;
    assert_eq!(r.total_trades, 0);
    assert_eq!(r.total_return_pct, 0.0);
    assert_eq!(r.win_rate, 0.0);
    assert_eq!(r.profit_factor, 0.0);
    assert_eq!(r.max_drawdown_pct, 0.0);
    assert!(backtest.trades.is_empty());
    assert_eq!(backtest.equity_curve.len(), 40);
    assert!(backtest.equity_curve.iter().all(|p| p.equity == CAPITAL));
}

#[test]
fn scenario_b_rising_series_exits_at_end_of_data() {
    let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
    let s = series(&closes);
    let backtest = run(&config(2, 4).with_risk(100.0, 100.0), &s, &RunParams::new(CAPITAL)).unwrap();

    assert_eq!(backtest.trades.len(), 1);
    let trade = &backtest.trades.as_slice()[0];
    assert_eq!(trade.entry_bar, 3);
    assert_eq!(trade.entry_price, 103.0);
    assert_eq!(trade.exit_bar, 19);
    assert_eq!(trade.exit_price, 119.0);
    assert_eq!(trade.exit_reason, ExitReason::EndOfData);

    let expected = (119.0 - trade.entry_price) / CAPITAL * 100.0;
    assert!((backtest.result.total_return_pct - expected).abs() < 1e-12);
    assert_eq!(backtest.result.win_rate, 100.0);
    assert!(backtest.result.profit_factor.is_infinite());
}

#[test]
fn scenario_c_stop_fills_at_threshold_not_low() {
    // Golden cross on bar 4 (close 104), then a 5% drop.
    let closes = [100.0, 100.0, 100.0, 100.0, 104.0, 104.0 * 0.95];
    let s = series(&closes);
    let backtest = run(&config(2, 4).with_risk(2.0, 50.0), &s, &RunParams::new(CAPITAL)).unwrap();

    assert_eq!(backtest.trades.len(), 1);
    let trade = &backtest.trades.as_slice()[0];
    assert_eq!(trade.entry_bar, 4);
    assert_eq!(trade.entry_price, 104.0);
    assert_eq!(trade.exit_bar, 5);
    assert_eq!(trade.exit_reason, ExitReason::StopLoss);
    assert!((trade.exit_price - 104.0 * 0.98).abs() < 1e-9);
    assert!(trade.exit_price > s.bars()[5].low);
    assert!(trade.pnl < 0.0);
    assert_eq!(backtest.result.losing_trades, 1);
}

#[test]
fn scenario_d_invalid_windows_rejected_before_any_bar() {
    let empty = BarSeries::new("BTC/USDT", Timeframe::H1, Vec::new()).unwrap();
    for (fast, slow) in [(5, 5), (10, 4)] {
        let err = run(&config(fast, slow), &empty, &RunParams::new(CAPITAL)).unwrap_err();
        assert_eq!(err.kind(), "configuration_error");
    }
}

#[test]
fn identical_inputs_give_identical_runs() {
    let closes: Vec<f64> = (0..300)
        .map(|i| 100.0 + 10.0 * (i as f64 / 9.0).sin() + (i as f64) * 0.05)
        .collect();
    let s = series(&closes);
    let cfg = config(5, 20).with_risk(3.0, 6.0);
    let params = RunParams::new(CAPITAL);

    let a = run(&cfg, &s, &params).unwrap();
    let b = run(&cfg, &s, &params).unwrap();
    assert_eq!(a, b);
    assert!(a.result.total_trades > 0);
    assert!(a.result.max_drawdown_pct <= 0.0);
    assert!((0.0..=100.0).contains(&a.result.win_rate));
}

#[test]
fn every_entry_has_exactly_one_exit() {
    let closes: Vec<f64> = (0..200)
        .map(|i| 50.0 + 5.0 * (i as f64 / 6.0).sin())
        .collect();
    let backtest = run(&config(3, 8), &series(&closes), &RunParams::new(CAPITAL)).unwrap();
    let trades = backtest.trades.as_slice();
    for pair in trades.windows(2) {
        assert!(pair[1].entry_bar > pair[0].exit_bar);
    }
    for t in trades {
        assert!(t.exit_bar >= t.entry_bar);
    }
}

#[test]
fn fees_reduce_pnl_on_both_sides() {
    let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
    let s = series(&closes);
    let cfg = config(2, 4);
    let plain = run(&cfg, &s, &RunParams::new(CAPITAL)).unwrap();
    let charged = run(&cfg, &s, &RunParams::new(CAPITAL).with_fee_pct(0.1)).unwrap();

    let t = &charged.trades.as_slice()[0];
    let expected_fees = (103.0 + 119.0) * 0.1 / 100.0;
    assert!((t.fees - expected_fees).abs() < 1e-12);
    assert!(charged.result.total_pnl < plain.result.total_pnl);
}

#[test]
fn days_window_limits_replayed_bars() {
    let closes: Vec<f64> = (0..24 * 10).map(|i| 100.0 + (i % 7) as f64).collect();
    let s = series(&closes);
    let backtest = run(&config(2, 4), &s, &RunParams::new(CAPITAL).with_days(2)).unwrap();
    assert_eq!(backtest.bar_count, 48);
    assert_eq!(backtest.equity_curve.len(), 48);
}
