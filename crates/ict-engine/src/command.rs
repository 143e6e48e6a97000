use serde::{Deserialize, Serialize};

/// External control for one instrument, applied between candles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum EngineCommand {
    /// Close the open position at `price` with `MANUAL`
    ClosePosition { price: f64, time: i64 },
    /// Abandon the pending setup
    CancelSetup { time: i64 },
    /// Drop all state, including a fault
    Reset,
}
