//! Execution intents handed to the execution sink.

use serde::{Deserialize, Serialize};

use super::{ClosedPosition, Direction, ExitReason, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentKind {
    Open,
    Close,
}

/// A request to open or close a position at a given price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionIntent {
    pub instrument: String,
    pub kind: IntentKind,
    pub direction: Direction,
    pub size: f64,
    pub price: f64,
    pub stop: f64,
    pub target: f64,
    pub exit_reason: Option<ExitReason>,
    pub time: i64,
}

impl ExecutionIntent {
    /// Intent for a freshly opened position.
    pub fn open(position: &Position) -> Self {
        Self {
            instrument: position.instrument.clone(),
            kind: IntentKind::Open,
            direction: position.direction,
            size: position.size,
            price: position.entry_price,
            stop: position.stop_price,
            target: position.take_profit_price,
            exit_reason: None,
            time: position.opened_at,
        }
    }

    /// Intent for a position exit.
    pub fn close(closed: &ClosedPosition) -> Self {
        let position = &closed.position;
        Self {
            instrument: position.instrument.clone(),
            kind: IntentKind::Close,
            direction: position.direction,
            size: position.size,
            price: closed.exit_price,
            stop: position.effective_stop(),
            target: position.take_profit_price,
            exit_reason: Some(closed.exit_reason),
            time: closed.closed_at,
        }
    }
}
