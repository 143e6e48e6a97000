//! Core data types for the ICT engine.

mod candle;
mod event;
mod intent;
mod market;
mod position;
mod structure;
mod timeframe;

pub use candle::Candle;
pub use event::{EngineEvent, IgnoreReason, RejectReason};
pub use intent::{ExecutionIntent, IntentKind};
pub use market::{BiasAssessment, BiasDerivation, Direction, MarketBias, SwingKind, SwingPoint};
pub use position::{ClosedPosition, ExitReason, Position, PositionStatus};
pub use structure::{
    FairValueGap, FvgId, LiquiditySweep, SetupId, SetupState, SweepId, TradeSetup,
};
pub use timeframe::Timeframe;
