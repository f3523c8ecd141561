//! Signal generation: maps a history prefix to a directional decision.
//!
//! Generators are position-agnostic: `evaluate` sees only the bars up to and
//! including the current one and reports a market event (a crossover). The
//! position state is applied afterwards in `signal`, which turns the event
//! into `Enter`, `Exit` or `Hold`.

pub mod ma_crossover;

pub use ma_crossover::MaCrossover;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, StrategyKind};
use crate::domain::Bar;

/// A market event detected on the current bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Crossover {
    /// Fast series moved from at-or-below to strictly above the slow series.
    Up,
    /// Fast series moved from strictly above to at-or-below the slow series.
    Down,
}

/// Decision for the current bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Enter,
    Exit,
    Hold,
}

/// Trait for signal generators.
///
/// # Architecture invariant
/// `evaluate` receives `history = bars[0..=k]` and nothing else. Because the
/// slice ends at the current bar, an implementation has no way to read bar
/// `k + 1`; the decision on bar `k` cannot change when later bars do.
pub trait SignalGenerator: Send + Sync {
    /// Human-readable name (e.g., "ma_crossover").
    fn name(&self) -> &str;

    /// Minimum history length before this generator can produce an event.
    fn warmup_bars(&self) -> usize;

    /// Detect a market event on the last bar of `history`.
    fn evaluate(&self, history: &[Bar]) -> Option<Crossover>;

    /// Combine the market event with the position state.
    fn signal(&self, history: &[Bar], position_open: bool) -> Signal {
        match (self.evaluate(history), position_open) {
            (Some(Crossover::Up), false) => Signal::Enter,
            (Some(Crossover::Down), true) => Signal::Exit,
            _ => Signal::Hold,
        }
    }
}

/// Runtime strategy: one variant per family, dispatched by match.
///
/// Adding a family means adding a `StrategyKind` variant and a variant here;
/// the replay loop only ever sees `SignalGenerator`.
#[derive(Debug, Clone)]
pub enum Strategy {
    MaCrossover(MaCrossover),
}

impl Strategy {
    pub fn from_kind(kind: &StrategyKind) -> Result<Self, ConfigError> {
        kind.validate()?;
        match *kind {
            StrategyKind::MaCrossover { fast_ma, slow_ma } => {
                Ok(Strategy::MaCrossover(MaCrossover::new(fast_ma, slow_ma)?))
            }
        }
    }
}

impl SignalGenerator for Strategy {
    fn name(&self) -> &str {
        match self {
            Strategy::MaCrossover(s) => s.name(),
        }
    }

    fn warmup_bars(&self) -> usize {
        match self {
            Strategy::MaCrossover(s) => s.warmup_bars(),
        }
    }

    fn evaluate(&self, history: &[Bar]) -> Option<Crossover> {
        match self {
            Strategy::MaCrossover(s) => s.evaluate(history),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    struct Fixed(Option<Crossover>);

    impl SignalGenerator for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }
        fn warmup_bars(&self) -> usize {
            0
        }
        fn evaluate(&self, _history: &[Bar]) -> Option<Crossover> {
            self.0
        }
    }

    #[test]
    fn signal_respects_position_state() {
        let bars = make_bars(&[1.0]);
        assert_eq!(Fixed(Some(Crossover::Up)).signal(&bars, false), Signal::Enter);
        assert_eq!(Fixed(Some(Crossover::Up)).signal(&bars, true), Signal::Hold);
        assert_eq!(Fixed(Some(Crossover::Down)).signal(&bars, true), Signal::Exit);
        assert_eq!(Fixed(Some(Crossover::Down)).signal(&bars, false), Signal::Hold);
        assert_eq!(Fixed(None).signal(&bars, true), Signal::Hold);
    }

    #[test]
    fn strategy_from_kind_dispatches() {
        let strategy = Strategy::from_kind(&StrategyKind::MaCrossover { fast_ma: 3, slow_ma: 8 }).unwrap();
        assert_eq!(strategy.name(), "ma_crossover");
        assert_eq!(strategy.warmup_bars(), 8);
    }

    #[test]
    fn strategy_from_kind_rejects_invalid_windows() {
        let err = Strategy::from_kind(&StrategyKind::MaCrossover { fast_ma: 8, slow_ma: 3 }).unwrap_err();
        assert_eq!(err, ConfigError::FastNotBelowSlow { fast: 8, slow: 3 });
    }
}
