//! TradeLab CLI: run, sweep and history commands.
//!
//! Commands:
//! - `run`: execute one backtest from a TOML run file or command-line flags
//! - `sweep`: evaluate a grid of MA windows in parallel and rank them
//! - `history`: show the best runs recorded in the JSONL history

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tradelab_core::config::{RunParams, StrategyConfig};
use tradelab_core::domain::{BarSeries, Timeframe};
use tradelab_runner::export::{export_json, format_profit_factor, save_artifacts};
use tradelab_runner::history::best_by_return;
use tradelab_runner::{
    load_series, run, BacktestFile, BacktestRun, DataSource, HistoryEntry, ParamGrid, ParamSweep,
    RunHistory, SyntheticSpec,
};

#[derive(Parser)]
#[command(name = "tradelab", about = "TradeLab CLI: MA crossover backtesting engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one backtest.
    Run {
        #[command(flatten)]
        input: RunInput,

        /// Write run.json, trades.csv, equity.csv and report.md under this directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Append the result to this JSONL history file.
        #[arg(long)]
        history: Option<PathBuf>,

        /// Print the full run as JSON instead of the summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Sweep fast/slow MA windows and rank by total return.
    Sweep {
        #[command(flatten)]
        input: RunInput,

        /// Fast windows, comma separated. Defaults to 5,10,15,20.
        #[arg(long, value_delimiter = ',')]
        fast: Vec<usize>,

        /// Slow windows, comma separated. Defaults to 20,30,40,50,60.
        #[arg(long, value_delimiter = ',')]
        slow: Vec<usize>,

        /// Number of rows to print.
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Run cells one after another.
        #[arg(long, default_value_t = false)]
        sequential: bool,
    },
    /// Show the best recorded runs.
    History {
        /// JSONL history file.
        #[arg(long, default_value = "results/history.jsonl")]
        path: PathBuf,

        /// Number of rows to print.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

/// Where the strategy, run parameters and bars come from.
#[derive(Args)]
struct RunInput {
    /// TOML run file. When given, the flags below are ignored.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "BTC/USDT")]
    pair: String,

    #[arg(long, default_value = "1h")]
    timeframe: String,

    #[arg(long, default_value_t = 10)]
    fast_ma: usize,

    #[arg(long, default_value_t = 30)]
    slow_ma: usize,

    /// Stop-loss distance in percent; 0 disables it.
    #[arg(long, default_value_t = 2.0)]
    stop_loss: f64,

    /// Take-profit distance in percent; 0 disables it.
    #[arg(long, default_value_t = 5.0)]
    take_profit: f64,

    #[arg(long, default_value_t = 10_000.0)]
    capital: f64,

    /// Replay only the most recent N days.
    #[arg(long)]
    days: Option<u32>,

    /// Fee per side, in percent of notional.
    #[arg(long, default_value_t = 0.0)]
    fee: f64,

    /// Bar CSV file. Without it a seeded synthetic walk is used.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Synthetic bar count.
    #[arg(long, default_value_t = 1000)]
    bars: usize,

    /// Synthetic seed.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

struct Prepared {
    config: StrategyConfig,
    params: RunParams,
    series: BarSeries,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            output_dir,
            history,
            json,
        } => run_cmd(&input, output_dir.as_deref(), history.as_deref(), json),
        Commands::Sweep {
            input,
            fast,
            slow,
            top,
            sequential,
        } => sweep_cmd(&input, fast, slow, top, sequential),
        Commands::History { path, top } => history_cmd(path, top),
    }
}

/// `RUST_LOG` controls verbosity; defaults to `info`. Logs go to stderr.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn prepare(input: &RunInput) -> Result<Prepared> {
    let (config, params, source) = match &input.config {
        Some(path) => {
            let base = path.parent().unwrap_or(Path::new("."));
            let file = BacktestFile::load(path)
                .with_context(|| format!("failed to load run file {}", path.display()))?
                .resolve_relative_to(base);
            (file.strategy_config()?, file.run_params(), file.data_source()?)
        }
        None => {
            let timeframe: Timeframe = input.timeframe.parse()?;
            let config = StrategyConfig::ma_crossover(&input.pair, timeframe, input.fast_ma, input.slow_ma)
                .with_risk(input.stop_loss, input.take_profit);
            let mut params = RunParams::new(input.capital).with_fee_pct(input.fee);
            if let Some(days) = input.days {
                params = params.with_days(days);
            }
            let source = match &input.csv {
                Some(path) => DataSource::Csv(path.clone()),
                None => DataSource::Synthetic(SyntheticSpec {
                    bars: input.bars,
                    seed: input.seed,
                    ..SyntheticSpec::default()
                }),
            };
            (config, params, source)
        }
    };

    if let DataSource::Synthetic(spec) = &source {
        info!(bars = spec.bars, seed = spec.seed, "using synthetic bars");
    }
    let series = load_series(&source, &config.trading_pair, config.timeframe)
        .context("failed to load bars")?;

    Ok(Prepared {
        config,
        params,
        series,
    })
}

fn run_cmd(input: &RunInput, output_dir: Option<&Path>, history: Option<&Path>, json: bool) -> Result<()> {
    let Prepared {
        config,
        params,
        series,
    } = prepare(input)?;

    let backtest = run(&config, &series, &params)
        .with_context(|| format!("backtest '{}' failed", config.name))?;

    if json {
        println!("{}", export_json(&backtest)?);
    } else {
        print_summary(&config, &backtest);
    }

    if let Some(dir) = output_dir {
        let run_dir = save_artifacts(&config, &backtest, dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }

    if let Some(path) = history {
        RunHistory::new(path.to_path_buf())
            .append(&HistoryEntry::new(&config, &params, &backtest))
            .with_context(|| format!("failed to append history {}", path.display()))?;
    }

    Ok(())
}

fn sweep_cmd(input: &RunInput, fast: Vec<usize>, slow: Vec<usize>, top: usize, sequential: bool) -> Result<()> {
    let Prepared {
        config,
        params,
        series,
    } = prepare(input)?;

    let default = ParamGrid::ma_crossover_default();
    let grid = ParamGrid::new(
        if fast.is_empty() { default.fast_periods } else { fast },
        if slow.is_empty() { default.slow_periods } else { slow },
    );
    if grid.pairs().is_empty() {
        bail!("grid has no valid (fast, slow) pair; fast must be below slow");
    }

    let results = ParamSweep::new()
        .with_parallelism(!sequential)
        .sweep(&config, &series, &params, &grid)
        .context("sweep failed")?;

    println!();
    println!("=== Sweep: {} {} ({} cells) ===", config.trading_pair, config.timeframe, grid.size());
    println!(
        "{:>5} {:>5} {:>10} {:>7} {:>9} {:>8} {:>7}",
        "Fast", "Slow", "Return", "Trades", "Win Rate", "PF", "MaxDD"
    );
    println!("{}", "-".repeat(58));
    for entry in results.all().iter().take(top) {
        let r = &entry.result;
        println!(
            "{:>5} {:>5} {:>9.2}% {:>7} {:>8.1}% {:>8} {:>6.2}%",
            entry.fast_ma,
            entry.slow_ma,
            r.total_return_pct,
            r.total_trades,
            r.win_rate,
            format_profit_factor(r.profit_factor),
            r.max_drawdown_pct
        );
    }
    if results.skipped() > 0 {
        println!("Skipped {} cell(s): series too short", results.skipped());
    }
    println!();
    Ok(())
}

fn history_cmd(path: PathBuf, top: usize) -> Result<()> {
    let history = RunHistory::new(path);
    let entries = history
        .read_all()
        .with_context(|| format!("failed to read history {}", history.path().display()))?;
    if entries.is_empty() {
        println!("No runs recorded in {}", history.path().display());
        return Ok(());
    }

    println!("History: {} ({} runs)", history.path().display(), entries.len());
    println!();
    println!(
        "{:<28} {:<10} {:>4} {:>10} {:>7} {:>7}  {}",
        "Strategy", "Pair", "TF", "Return", "Trades", "MaxDD", "Recorded"
    );
    println!("{}", "-".repeat(88));
    for e in best_by_return(&entries, top) {
        println!(
            "{:<28} {:<10} {:>4} {:>9.2}% {:>7} {:>6.2}%  {}",
            e.strategy.name,
            e.strategy.trading_pair,
            e.strategy.timeframe,
            e.result.total_return_pct,
            e.result.total_trades,
            e.result.max_drawdown_pct,
            e.recorded_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

fn print_summary(config: &StrategyConfig, backtest: &BacktestRun) {
    let r = &backtest.result;
    println!();
    println!("=== Backtest Result ===");
    println!("Strategy:       {}", config.name);
    println!("Pair:           {} ({})", config.trading_pair, config.timeframe);
    if let (Some(first), Some(last)) = (backtest.equity_curve.first(), backtest.equity_curve.last()) {
        println!(
            "Period:         {} to {}",
            first.timestamp.format("%Y-%m-%d %H:%M"),
            last.timestamp.format("%Y-%m-%d %H:%M")
        );
    }
    println!("Bars:           {}", backtest.bar_count);
    println!("Trades:         {}", r.total_trades);
    println!();
    println!("--- Performance ---");
    println!("Total Return:   {:.2}%", r.total_return_pct);
    println!("Total P&L:      {:.2}", r.total_pnl);
    println!("Final Capital:  {:.2}", r.final_capital);
    println!("Max Drawdown:   {:.2}%", r.max_drawdown_pct);
    println!("Sharpe:         {:.3}", r.sharpe_ratio);
    println!("Win Rate:       {:.1}%", r.win_rate);
    println!("Profit Factor:  {}", format_profit_factor(r.profit_factor));
    println!("Avg Win:        {:.2}", r.avg_win);
    println!("Avg Loss:       {:.2}", r.avg_loss);
    println!("Largest Win:    {:.2}", r.largest_win);
    println!("Largest Loss:   {:.2}", r.largest_loss);
    println!();
}
