//! Deterministic candle replay with trade statistics.

mod engine;
mod report;
mod statistics;

pub use engine::{merge_streams, replay_instrument, BacktestConfig, BacktestEngine, InstrumentData, ReplayCandle};
pub use report::{BacktestReport, InstrumentReport};
pub use statistics::{BacktestStats, TradeRecord};
