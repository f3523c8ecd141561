//! Simple Moving Average (SMA).
//!
//! Arithmetic mean of the last `period` closes. Every value is summed from its
//! own window in bar order, so `latest(&bars[..=k])` and `compute(bars)[k]`
//! are bit-identical regardless of how many bars follow `k`.

use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    /// Returns `None` for a zero period.
    pub fn new(period: usize) -> Option<Self> {
        if period == 0 {
            return None;
        }
        Some(Self {
            period,
            name: format!("sma_{period}"),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Bars before the first defined value.
    pub fn lookback(&self) -> usize {
        self.period - 1
    }

    /// SMA of the last `period` closes of `history`, or `None` if the history
    /// is shorter than the period or the window contains a NaN.
    pub fn latest(&self, history: &[Bar]) -> Option<f64> {
        if history.len() < self.period {
            return None;
        }
        let window = &history[history.len() - self.period..];
        let sum: f64 = window.iter().map(|b| b.close).sum();
        let mean = sum / self.period as f64;
        if mean.is_nan() {
            return None;
        }
        Some(mean)
    }

    /// Full SMA series aligned to `bars`; NaN where undefined.
    pub fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        (0..bars.len())
            .map(|i| self.latest(&bars[..=i]).unwrap_or(f64::NAN))
            .collect()
    }
}
