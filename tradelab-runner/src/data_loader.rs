//! Bar loading for the runner.
//!
//! Two sources:
//! 1. CSV files with a `timestamp,open,high,low,close[,volume]` header
//! 2. A seeded synthetic random walk for development and tests
//!
//! Either way the bars go through `BarSeries::new`, so ordering and sanity
//! violations surface as data-integrity errors naming the offending row.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use tradelab_core::domain::{Bar, BarSeries, SeriesError, Timeframe};

use crate::config::{DataSource, SyntheticSpec};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: unparseable timestamp '{value}'")]
    Timestamp { row: usize, value: String },

    #[error("synthetic data needs at least one bar and a positive start price")]
    InvalidSynthetic,

    #[error(transparent)]
    Series(#[from] SeriesError),
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: Option<f64>,
}

/// Load a series from `source`.
pub fn load_series(
    source: &DataSource,
    symbol: &str,
    timeframe: Timeframe,
) -> Result<BarSeries, LoadError> {
    match source {
        DataSource::Csv(path) => load_csv(path, symbol, timeframe),
        DataSource::Synthetic(spec) => synthetic_series(symbol, timeframe, spec),
    }
}

/// Read bars from a CSV file.
pub fn load_csv(path: &Path, symbol: &str, timeframe: Timeframe) -> Result<BarSeries, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let series = read_csv(file, symbol, timeframe)?;
    info!(path = %path.display(), bars = series.len(), "loaded csv bars");
    Ok(series)
}

/// Read bars from any CSV reader.
pub fn read_csv<R: std::io::Read>(
    reader: R,
    symbol: &str,
    timeframe: Timeframe,
) -> Result<BarSeries, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars = Vec::new();

    for (row, record) in rdr.deserialize::<CsvRow>().enumerate() {
        let record = record?;
        let timestamp = parse_timestamp(&record.timestamp).ok_or_else(|| LoadError::Timestamp {
            row,
            value: record.timestamp.clone(),
        })?;
        bars.push(Bar {
            timestamp,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume,
        });
    }

    Ok(BarSeries::new(symbol, timeframe, bars)?)
}

/// RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC), or a bare `YYYY-MM-DD` (midnight UTC).
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

/// Generate a seeded random walk.
///
/// The same `(symbol, timeframe, spec)` always produces the same bars. Bars
/// start at 2024-01-01T00:00:00Z and are spaced one timeframe apart.
pub fn synthetic_series(
    symbol: &str,
    timeframe: Timeframe,
    spec: &SyntheticSpec,
) -> Result<BarSeries, LoadError> {
    if spec.bars == 0 || !spec.start_price.is_finite() || spec.start_price <= 0.0 {
        return Err(LoadError::InvalidSynthetic);
    }

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().ok_or(LoadError::InvalidSynthetic)?;
    let step = timeframe.duration();

    let mut bars = Vec::with_capacity(spec.bars);
    let mut price = spec.start_price;
    let mut timestamp = start;

    for _ in 0..spec.bars {
        let bar_return: f64 = rng.gen_range(-0.02..0.02);
        let open = price;
        let close = (price * (1.0 + bar_return)).max(0.01);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.005));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.005));
        let volume = rng.gen_range(100.0..10_000.0);

        bars.push(Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume: Some(volume),
        });

        price = close;
        timestamp += step;
    }

    debug!(symbol, bars = bars.len(), seed = spec.seed, "generated synthetic bars");
    Ok(BarSeries::new(symbol, timeframe, bars)?)
}
