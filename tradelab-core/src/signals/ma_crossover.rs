//! Moving average crossover: golden cross and death cross detection.
//!
//! Reports `Up` when the fast SMA moves from at-or-below to strictly above the
//! slow SMA on the current bar, and `Down` on the reverse move. On the first
//! bar where the slow SMA is defined the previous relation counts as
//! "not above", so a series that opens in an uptrend still produces an entry.

use crate::config::ConfigError;
use crate::domain::Bar;
use crate::indicators::Sma;

use super::{Crossover, SignalGenerator};

/// Moving average crossover signal generator.
#[derive(Debug, Clone)]
pub struct MaCrossover {
    fast: Sma,
    slow: Sma,
}

impl MaCrossover {
    pub fn new(fast_ma: usize, slow_ma: usize) -> Result<Self, ConfigError> {
        let fast = Sma::new(fast_ma).ok_or(ConfigError::InvalidWindow {
            name: "fast_ma",
            value: 0.0,
        })?;
        if fast_ma >= slow_ma {
            return Err(ConfigError::FastNotBelowSlow {
                fast: fast_ma,
                slow: slow_ma,
            });
        }
        let slow = Sma::new(slow_ma).ok_or(ConfigError::InvalidWindow {
            name: "slow_ma",
            value: 0.0,
        })?;
        Ok(Self { fast, slow })
    }

    pub fn fast_period(&self) -> usize {
        self.fast.period()
    }

    pub fn slow_period(&self) -> usize {
        self.slow.period()
    }

    /// Whether fast > slow on the last bar of `history`; `None` while either is undefined.
    fn fast_above(&self, history: &[Bar]) -> Option<bool> {
        let fast = self.fast.latest(history)?;
        let slow = self.slow.latest(history)?;
        Some(fast > slow)
    }
}

impl SignalGenerator for MaCrossover {
    fn name(&self) -> &str {
        "ma_crossover"
    }

    fn warmup_bars(&self) -> usize {
        self.slow.period()
    }

    fn evaluate(&self, history: &[Bar]) -> Option<Crossover> {
        if history.len() < self.warmup_bars() {
            return None;
        }

        let current = self.fast_above(history)?;
        let previous = self
            .fast_above(&history[..history.len() - 1])
            .unwrap_or(false);

        match (previous, current) {
            (false, true) => Some(Crossover::Up),
            (true, false) => Some(Crossover::Down),
            _ => None,
        }
    }
}
