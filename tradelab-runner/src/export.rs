//! Export: JSON, CSV and Markdown artifacts for a finished run.
//!
//! - **JSON**: full round-trip serialization of `BacktestRun` with schema versioning
//! - **CSV**: trade tape and equity curve for spreadsheets and plotting tools
//! - **Markdown**: a short human-readable summary
//!
//! Unknown (newer) schema versions are rejected on load.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tradelab_core::config::StrategyConfig;
use tradelab_core::domain::Trade;
use tradelab_core::engine::EquityPoint;

use crate::runner::{BacktestRun, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestRun` to pretty JSON.
pub fn export_json(run: &BacktestRun) -> Result<String> {
    serde_json::to_string_pretty(run).context("failed to serialize BacktestRun to JSON")
}

/// Deserialize a `BacktestRun` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestRun> {
    let run: BacktestRun =
        serde_json::from_str(json).context("failed to deserialize BacktestRun from JSON")?;
    if run.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            run.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(run)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export a trade list as CSV.
///
/// Columns: symbol, side, entry_bar, entry_time, entry_price, exit_bar,
/// exit_time, exit_price, exit_reason, size, gross_pnl, fees, pnl, bars_held
pub fn export_trades_csv<'a, I>(trades: I) -> Result<String>
where
    I: IntoIterator<Item = &'a Trade>,
{
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "symbol",
        "side",
        "entry_bar",
        "entry_time",
        "entry_price",
        "exit_bar",
        "exit_time",
        "exit_price",
        "exit_reason",
        "size",
        "gross_pnl",
        "fees",
        "pnl",
        "bars_held",
    ])?;

    for t in trades {
        let row = [
            t.symbol.clone(),
            t.side.as_str().to_string(),
            t.entry_bar.to_string(),
            t.entry_time.to_rfc3339(),
            format!("{:.6}", t.entry_price),
            t.exit_bar.to_string(),
            t.exit_time.to_rfc3339(),
            format!("{:.6}", t.exit_price),
            t.exit_reason.as_str().to_string(),
            format!("{:.6}", t.size),
            format!("{:.6}", t.gross_pnl),
            format!("{:.6}", t.fees),
            format!("{:.6}", t.pnl),
            t.bars_held.to_string(),
        ];
        wtr.write_record(&row)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export an equity curve as CSV with timestamp and equity columns.
pub fn export_equity_csv(equity_curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "equity"])?;
    for point in equity_curve {
        wtr.write_record([&point.timestamp.to_rfc3339(), &format!("{:.6}", point.equity)])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single run.
///
/// Creates `{strategy_name}_{first 12 hex of dataset hash}/` under
/// `output_dir` containing:
/// - `run.json`: the full `BacktestRun`
/// - `trades.csv`: trade tape
/// - `equity.csv`: bar-by-bar equity curve
/// - `report.md`: Markdown summary
///
/// Returns the path to the created directory.
pub fn save_artifacts(
    config: &StrategyConfig,
    run: &BacktestRun,
    output_dir: &Path,
) -> Result<PathBuf> {
    let short_hash: String = run.dataset_hash.chars().take(12).collect();
    let dirname = format!("{}_{}", sanitize(&config.name), short_hash);
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("run.json"), export_json(run)?)?;
    std::fs::write(run_dir.join("trades.csv"), export_trades_csv(&run.trades)?)?;
    std::fs::write(run_dir.join("equity.csv"), export_equity_csv(&run.equity_curve)?)?;
    std::fs::write(run_dir.join("report.md"), generate_report(config, run))?;

    Ok(run_dir)
}

/// Load a `BacktestRun` from an artifact directory's `run.json`.
pub fn load_artifacts(dir: &Path) -> Result<BacktestRun> {
    let path = dir.join("run.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "run".to_string()
    } else {
        cleaned
    }
}

// ─── Markdown report ────────────────────────────────────────────────

/// Generate a Markdown summary of one run.
pub fn generate_report(config: &StrategyConfig, run: &BacktestRun) -> String {
    let r = &run.result;
    let mut md = String::with_capacity(1024);

    md.push_str("# Backtest Report\n\n");
    let _ = writeln!(md, "- **Strategy**: {}", config.name);
    let _ = writeln!(md, "- **Pair**: {} ({})", config.trading_pair, config.timeframe);
    let _ = writeln!(md, "- **Bars**: {}", run.bar_count);
    let _ = writeln!(md, "- **Dataset**: `{}`\n", run.dataset_hash);

    md.push_str("## Performance\n\n| Metric | Value |\n|---|---|\n");
    let _ = writeln!(md, "| Total return | {:.2}% |", r.total_return_pct);
    let _ = writeln!(md, "| Total P&L | {:.2} |", r.total_pnl);
    let _ = writeln!(md, "| Final capital | {:.2} |", r.final_capital);
    let _ = writeln!(md, "| Max drawdown | {:.2}% |", r.max_drawdown_pct);
    let _ = writeln!(md, "| Sharpe | {:.3} |", r.sharpe_ratio);
    let _ = writeln!(md, "| Trades | {} |", r.total_trades);
    let _ = writeln!(md, "| Win rate | {:.1}% |", r.win_rate);
    let _ = writeln!(md, "| Profit factor | {} |", format_profit_factor(r.profit_factor));
    let _ = writeln!(md, "| Avg win / loss | {:.2} / {:.2} |", r.avg_win, r.avg_loss);

    md
}

pub fn format_profit_factor(pf: f64) -> String {
    if pf.is_infinite() {
        "∞".to_string()
    } else {
        format!("{pf:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::run;
    use tradelab_core::config::RunParams;
    use tradelab_core::domain::Timeframe;

    use crate::config::SyntheticSpec;
    use crate::data_loader::synthetic_series;

    fn sample() -> (StrategyConfig, BacktestRun) {
        let config = StrategyConfig::ma_crossover("BTC/USDT", Timeframe::H1, 5, 20).with_risk(2.0, 4.0);
        let spec = SyntheticSpec {
            bars: 400,
            seed: 11,
            start_price: 100.0,
        };
        let series = synthetic_series("BTC/USDT", Timeframe::H1, &spec).unwrap();
        let backtest = run(&config, &series, &RunParams::new(10_000.0)).unwrap();
        (config, backtest)
    }

    #[test]
    fn json_roundtrip() {
        let (_, run) = sample();
        let json = export_json(&run).unwrap();
        let back = import_json(&json).unwrap();
        assert_eq!(back.trades.len(), run.trades.len());
        for (a, b) in back.trades.iter().zip(run.trades.iter()) {
            assert_eq!(a.exit_bar, b.exit_bar);
            assert_eq!(a.exit_reason, b.exit_reason);
            assert!((a.pnl - b.pnl).abs() < 1e-9);
        }
        assert_eq!(back.dataset_hash, run.dataset_hash);
        assert_eq!(back.result.total_trades, run.result.total_trades);
    }

    #[test]
    fn json_rejects_unknown_version() {
        let (_, mut run) = sample();
        run.schema_version = SCHEMA_VERSION + 1;
        let json = serde_json::to_string(&run).unwrap();
        assert!(import_json(&json).is_err());
    }

    #[test]
    fn csv_trades_has_header_and_rows() {
        let (_, run) = sample();
        let csv = export_trades_csv(&run.trades).unwrap();
        let mut lines = csv.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("symbol,side,entry_bar"));
        assert!(header.ends_with("pnl,bars_held"));
        assert_eq!(lines.count(), run.trades.len());
    }

    #[test]
    fn csv_empty_trades() {
        let csv = export_trades_csv(&Vec::<Trade>::new()).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn csv_equity_one_row_per_bar() {
        let (_, run) = sample();
        let csv = export_equity_csv(&run.equity_curve).unwrap();
        assert_eq!(csv.lines().count(), run.bar_count + 1);
    }

    #[test]
    fn markdown_report_has_sections() {
        let (config, run) = sample();
        let md = generate_report(&config, &run);
        assert!(md.contains("# Backtest Report"));
        assert!(md.contains("## Performance"));
        assert!(md.contains("ma_crossover_5_20"));
    }

    #[test]
    fn infinite_profit_factor_formats_as_symbol() {
        assert_eq!(format_profit_factor(f64::INFINITY), "∞");
        assert_eq!(format_profit_factor(1.5), "1.50");
    }

    #[test]
    fn artifacts_roundtrip_through_directory() {
        let (config, run) = sample();
        let dir = tempfile::tempdir().unwrap();
        let run_dir = save_artifacts(&config, &run, dir.path()).unwrap();
        assert!(run_dir.join("trades.csv").exists());
        assert!(run_dir.join("equity.csv").exists());
        assert!(run_dir.join("report.md").exists());
        let loaded = load_artifacts(&run_dir).unwrap();
        assert_eq!(loaded.trades.len(), run.trades.len());
        assert_eq!(loaded.bar_count, run.bar_count);
    }
}
