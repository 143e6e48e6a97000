//! ICT signal stages.
//!
//! Each stage is a deterministic function of its own state and the next
//! closed candle:
//! - Market bias from HTF swing structure with a moving-average fallback
//! - Liquidity sweeps of LTF swing points
//! - Fair value gaps following a confirmed sweep
//! - Retest setups with entry, stop and target
//! - Optional session windows gating new setups

mod bias;
mod fvg;
mod session;
mod setup;
mod sweep;

pub use bias::{BiasClassifier, BiasConfig};
pub use fvg::{FvgConfig, FvgOutcome, FvgScanner};
pub use session::{SessionFilter, SessionWindow};
pub use setup::{EntryTrigger, FillPolicy, SetupConfig, SetupEngine, SetupOutcome};
pub use sweep::{SweepConfig, SweepDetector, SweepOutcome};
