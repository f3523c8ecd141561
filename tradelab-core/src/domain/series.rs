//! BarSeries: the validated, immutable replay substrate for one run.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::bar::Bar;
use super::timeframe::Timeframe;

/// Integrity violations detected while building a series.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SeriesError {
    #[error("duplicate timestamp {timestamp} at bar {index}")]
    DuplicateTimestamp { index: usize, timestamp: String },
    #[error("timestamp at bar {index} ({current}) is earlier than the previous bar ({previous})")]
    NonMonotonic {
        index: usize,
        previous: String,
        current: String,
    },
    #[error("bar {index} has invalid OHLC values")]
    InvalidBar { index: usize },
}

/// Ordered sequence of bars for one trading pair and timeframe.
///
/// Construction is the only place integrity is checked: once a `BarSeries`
/// exists its timestamps are strictly increasing and every bar is sane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSeries")]
pub struct BarSeries {
    symbol: String,
    timeframe: Timeframe,
    bars: Vec<Bar>,
}

#[derive(Deserialize)]
struct RawSeries {
    symbol: String,
    timeframe: Timeframe,
    bars: Vec<Bar>,
}

impl TryFrom<RawSeries> for BarSeries {
    type Error = SeriesError;

    fn try_from(raw: RawSeries) -> Result<Self, Self::Error> {
        BarSeries::new(raw.symbol, raw.timeframe, raw.bars)
    }
}

impl BarSeries {
    pub fn new(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        bars: Vec<Bar>,
    ) -> Result<Self, SeriesError> {
        for (index, bar) in bars.iter().enumerate() {
            if !bar.is_sane() {
                return Err(SeriesError::InvalidBar { index });
            }
            if index == 0 {
                continue;
            }
            let previous = &bars[index - 1];
            if bar.timestamp == previous.timestamp {
                return Err(SeriesError::DuplicateTimestamp {
                    index,
                    timestamp: bar.timestamp.to_rfc3339(),
                });
            }
            if bar.timestamp < previous.timestamp {
                return Err(SeriesError::NonMonotonic {
                    index,
                    previous: previous.timestamp.to_rfc3339(),
                    current: bar.timestamp.to_rfc3339(),
                });
            }
        }

        Ok(Self {
            symbol: symbol.into(),
            timeframe,
            bars,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Keep only the bars within `days` days of the last bar.
    ///
    /// The window is half-open: a bar exactly `days` days older than the last
    /// bar is excluded, so a daily series sliced to 30 days has 30 bars.
    /// A window reaching past the earliest representable date keeps every bar.
    pub fn slice_last_days(&self, days: u32) -> BarSeries {
        let Some(last) = self.bars.last() else {
            return self.clone();
        };
        let Some(cutoff) = last.timestamp.checked_sub_signed(Duration::days(i64::from(days))) else {
            return self.clone();
        };
        let start = self.bars.partition_point(|b| b.timestamp <= cutoff);
        Self {
            symbol: self.symbol.clone(),
            timeframe: self.timeframe,
            bars: self.bars[start..].to_vec(),
        }
    }

    /// BLAKE3 hash over every bar's timestamp and OHLCV bits, hex-encoded.
    ///
    /// Two series with the same hash replay identically.
    pub fn dataset_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.symbol.as_bytes());
        hasher.update(self.timeframe.as_str().as_bytes());
        for bar in &self.bars {
            hasher.update(&bar.timestamp.timestamp_millis().to_le_bytes());
            for value in [bar.open, bar.high, bar.low, bar.close] {
                hasher.update(&value.to_bits().to_le_bytes());
            }
            let volume = bar.volume.map_or(u64::MAX, f64::to_bits);
            hasher.update(&volume.to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}
