//! Position sizing, drawdown-adaptive risk, trailing stops and the
//! per-instrument position manager.

mod drawdown;
mod position_manager;
mod position_sizer;
mod trailing;

pub use drawdown::{DrawdownConfig, DrawdownTracker};
pub use position_manager::{PositionConfig, PositionManager, PositionState, PositionUpdate};
pub use position_sizer::{PositionSize, PositionSizer};
pub use trailing::{TrailingConfig, TrailingStop};
