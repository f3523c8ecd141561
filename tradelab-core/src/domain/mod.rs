//! Domain types for TradeLab

pub mod bar;
pub mod position;
pub mod series;
pub mod timeframe;
pub mod trade;

pub use bar::Bar;
pub use position::{Position, PositionSide};
pub use series::{BarSeries, SeriesError};
pub use timeframe::{Timeframe, UnknownTimeframe};
pub use trade::{ExitReason, Trade};
