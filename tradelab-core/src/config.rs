//! Strategy and run configuration, with validation.
//!
//! `StrategyDefinition` is the loose wire/file shape (strategy type as a string,
//! parameters as a name → number map). `StrategyConfig` is the validated,
//! strongly-typed form a run is built from; the only way from one to the other
//! is `TryFrom`, so an invalid definition never reaches the replay loop.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{Timeframe, UnknownTimeframe};

/// Invalid strategy or run parameters.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("unsupported strategy_type '{0}' (supported: ma_crossover)")]
    UnknownStrategyType(String),
    #[error(transparent)]
    Timeframe(#[from] UnknownTimeframe),
    #[error("trading_pair must not be empty")]
    EmptyTradingPair,
    #[error("{strategy} requires parameter '{name}'")]
    MissingParameter { strategy: &'static str, name: &'static str },
    #[error("parameter '{name}' must be a positive whole number, got {value}")]
    InvalidWindow { name: &'static str, value: f64 },
    #[error("fast_ma ({fast}) must be smaller than slow_ma ({slow})")]
    FastNotBelowSlow { fast: usize, slow: usize },
    #[error("{name} must be a non-negative number, got {value}")]
    InvalidPercentage { name: &'static str, value: f64 },
    #[error("initial_capital must be positive, got {0}")]
    InvalidCapital(f64),
    #[error("days must be at least 1")]
    InvalidDays,
    #[error("position_size must be positive, got {0}")]
    InvalidPositionSize(f64),
}

// ─── Strategy families ───────────────────────────────────────────────

/// Closed set of strategy families, one variant per family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy_type", rename_all = "snake_case")]
pub enum StrategyKind {
    /// Simple moving average crossover on closes.
    MaCrossover { fast_ma: usize, slow_ma: usize },
}

impl StrategyKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            StrategyKind::MaCrossover { .. } => "ma_crossover",
        }
    }

    /// Name used when a definition arrives without one, e.g. `ma_crossover_10_30`.
    pub fn default_name(&self) -> String {
        match self {
            StrategyKind::MaCrossover { fast_ma, slow_ma } => format!("ma_crossover_{fast_ma}_{slow_ma}"),
        }
    }

    /// Minimum number of bars before the family can emit any signal.
    pub fn warmup_bars(&self) -> usize {
        match self {
            StrategyKind::MaCrossover { slow_ma, .. } => *slow_ma,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            StrategyKind::MaCrossover { fast_ma, slow_ma } => {
                if fast_ma == 0 {
                    return Err(ConfigError::InvalidWindow {
                        name: "fast_ma",
                        value: 0.0,
                    });
                }
                if fast_ma >= slow_ma {
                    return Err(ConfigError::FastNotBelowSlow {
                        fast: fast_ma,
                        slow: slow_ma,
                    });
                }
                Ok(())
            }
        }
    }

    fn parameters(&self) -> BTreeMap<String, f64> {
        match *self {
            StrategyKind::MaCrossover { fast_ma, slow_ma } => BTreeMap::from([
                ("fast_ma".to_string(), fast_ma as f64),
                ("slow_ma".to_string(), slow_ma as f64),
            ]),
        }
    }
}

// ─── Risk ────────────────────────────────────────────────────────────

/// Stop-loss / take-profit distances in percent of entry price.
///
/// A value of `0` disables that exit.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskParams {
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
}

impl RiskParams {
    pub fn new(stop_loss_pct: f64, take_profit_pct: f64) -> Self {
        Self {
            stop_loss_pct,
            take_profit_pct,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_percentage("stop_loss_pct", self.stop_loss_pct)?;
        check_percentage("take_profit_pct", self.take_profit_pct)
    }
}

fn check_percentage(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::InvalidPercentage { name, value });
    }
    Ok(())
}

// ─── Strategy config ─────────────────────────────────────────────────

/// Validated strategy configuration. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub name: String,
    pub trading_pair: String,
    pub timeframe: Timeframe,
    pub strategy: StrategyKind,
    pub risk: RiskParams,
}

impl StrategyConfig {
    pub fn ma_crossover(trading_pair: &str, timeframe: Timeframe, fast_ma: usize, slow_ma: usize) -> Self {
        let strategy = StrategyKind::MaCrossover { fast_ma, slow_ma };
        Self {
            name: strategy.default_name(),
            trading_pair: trading_pair.to_string(),
            timeframe,
            strategy,
            risk: RiskParams::default(),
        }
    }

    pub fn with_risk(mut self, stop_loss_pct: f64, take_profit_pct: f64) -> Self {
        self.risk = RiskParams::new(stop_loss_pct, take_profit_pct);
        self
    }

    /// Re-check every invariant. Fields are public, so the orchestrator calls
    /// this before each run rather than trusting construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trading_pair.trim().is_empty() {
            return Err(ConfigError::EmptyTradingPair);
        }
        self.strategy.validate()?;
        self.risk.validate()
    }

    pub fn warmup_bars(&self) -> usize {
        self.strategy.warmup_bars()
    }

    pub fn to_definition(&self) -> StrategyDefinition {
        StrategyDefinition {
            name: self.name.clone(),
            trading_pair: self.trading_pair.clone(),
            timeframe: self.timeframe.to_string(),
            strategy_type: self.strategy.type_name().to_string(),
            parameters: self.strategy.parameters(),
            stop_loss_pct: Some(self.risk.stop_loss_pct),
            take_profit_pct: Some(self.risk.take_profit_pct),
        }
    }
}

/// Loose strategy definition as it arrives from an API body or a TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyDefinition {
    #[serde(default)]
    pub name: String,
    pub trading_pair: String,
    pub timeframe: String,
    pub strategy_type: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, f64>,
    #[serde(default)]
    pub stop_loss_pct: Option<f64>,
    #[serde(default)]
    pub take_profit_pct: Option<f64>,
}

impl StrategyDefinition {
    fn window(&self, strategy: &'static str, name: &'static str) -> Result<usize, ConfigError> {
        let value = *self
            .parameters
            .get(name)
            .ok_or(ConfigError::MissingParameter { strategy, name })?;
        if !value.is_finite() || value < 1.0 || value.fract() != 0.0 {
            return Err(ConfigError::InvalidWindow { name, value });
        }
        Ok(value as usize)
    }
}

impl TryFrom<&StrategyDefinition> for StrategyConfig {
    type Error = ConfigError;

    fn try_from(def: &StrategyDefinition) -> Result<Self, Self::Error> {
        let timeframe: Timeframe = def.timeframe.parse()?;

        let strategy = match def.strategy_type.trim() {
            "ma_crossover" => StrategyKind::MaCrossover {
                fast_ma: def.window("ma_crossover", "fast_ma")?,
                slow_ma: def.window("ma_crossover", "slow_ma")?,
            },
            other => return Err(ConfigError::UnknownStrategyType(other.to_string())),
        };

        let name = match def.name.trim() {
            "" => strategy.default_name(),
            name => name.to_string(),
        };

        let config = StrategyConfig {
            name,
            trading_pair: def.trading_pair.trim().to_string(),
            timeframe,
            strategy,
            risk: RiskParams::new(
                def.stop_loss_pct.unwrap_or(0.0),
                def.take_profit_pct.unwrap_or(0.0),
            ),
        };
        config.validate()?;
        Ok(config)
    }
}

impl TryFrom<StrategyDefinition> for StrategyConfig {
    type Error = ConfigError;

    fn try_from(def: StrategyDefinition) -> Result<Self, Self::Error> {
        StrategyConfig::try_from(&def)
    }
}

// ─── Run parameters ──────────────────────────────────────────────────

/// Per-run parameters supplied by the caller, separate from the strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunParams {
    pub initial_capital: f64,
    /// Replay only the most recent `days` days of the series.
    #[serde(default)]
    pub days: Option<u32>,
    /// Units bought on every entry.
    #[serde(default = "default_position_size")]
    pub position_size: f64,
    /// Fee charged on each side of a trade, in percent of notional.
    #[serde(default)]
    pub fee_pct: f64,
}

fn default_position_size() -> f64 {
    1.0
}

impl RunParams {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            days: None,
            position_size: default_position_size(),
            fee_pct: 0.0,
        }
    }

    pub fn with_days(mut self, days: u32) -> Self {
        self.days = Some(days);
        self
    }

    pub fn with_position_size(mut self, position_size: f64) -> Self {
        self.position_size = position_size;
        self
    }

    pub fn with_fee_pct(mut self, fee_pct: f64) -> Self {
        self.fee_pct = fee_pct;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(ConfigError::InvalidCapital(self.initial_capital));
        }
        if self.days == Some(0) {
            return Err(ConfigError::InvalidDays);
        }
        if !self.position_size.is_finite() || self.position_size <= 0.0 {
            return Err(ConfigError::InvalidPositionSize(self.position_size));
        }
        check_percentage("fee_pct", self.fee_pct)
    }
}
