//! Position types.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Direction, SetupId};

/// Position status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionStatus {
    Open,
    Closed,
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    TrailingStop,
    Invalidated,
    Manual,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::TakeProfit => "TAKE_PROFIT",
            ExitReason::StopLoss => "STOP_LOSS",
            ExitReason::TrailingStop => "TRAILING_STOP",
            ExitReason::Invalidated => "INVALIDATED",
            ExitReason::Manual => "MANUAL",
        };
        write!(f, "{}", s)
    }
}

/// An open trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub instrument: String,
    pub direction: Direction,
    pub entry_price: f64,
    /// Quantity in base units
    pub size: f64,
    /// Initial stop
    pub stop_price: f64,
    pub take_profit_price: f64,
    /// Trailing stop once activated. Only ever tightens.
    pub trailing_stop_price: Option<f64>,
    pub opened_at: i64,
    pub status: PositionStatus,
    pub setup_id: SetupId,
    /// (low, high) of the originating FVG
    pub fvg_zone: (f64, f64),
    /// Account currency at risk at entry
    pub risk_amount: f64,
    /// Most favorable price seen since entry
    pub best_price: f64,
}

impl Position {
    /// Distance between entry and the initial stop (1R).
    #[inline]
    pub fn risk_distance(&self) -> f64 {
        (self.entry_price - self.stop_price).abs()
    }

    /// The tighter of the initial and trailing stop.
    pub fn effective_stop(&self) -> f64 {
        match (self.trailing_stop_price, self.direction) {
            (Some(trail), Direction::Bullish) => trail.max(self.stop_price),
            (Some(trail), Direction::Bearish) => trail.min(self.stop_price),
            (None, _) => self.stop_price,
        }
    }

    /// Whether the trailing stop is the binding stop.
    pub fn trailing_is_binding(&self) -> bool {
        match (self.trailing_stop_price, self.direction) {
            (Some(trail), Direction::Bullish) => trail > self.stop_price,
            (Some(trail), Direction::Bearish) => trail < self.stop_price,
            (None, _) => false,
        }
    }

    /// PnL at `price` if closed now.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.size * self.direction.sign()
    }

    /// Favorable excursion from entry to `price`, zero if adverse.
    pub fn favorable_move(&self, price: f64) -> f64 {
        ((price - self.entry_price) * self.direction.sign()).max(0.0)
    }
}

/// A position after exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedPosition {
    pub position: Position,
    pub exit_price: f64,
    pub exit_reason: ExitReason,
    pub closed_at: i64,
    pub realized_pnl: f64,
}

impl ClosedPosition {
    /// Close `position` at `exit_price`.
    pub fn from_position(
        mut position: Position,
        exit_price: f64,
        exit_reason: ExitReason,
        closed_at: i64,
    ) -> Self {
        let realized_pnl = position.unrealized_pnl(exit_price);
        position.status = PositionStatus::Closed;
        Self {
            position,
            exit_price,
            exit_reason,
            closed_at,
            realized_pnl,
        }
    }

    /// Result in multiples of the initial risk.
    pub fn r_multiple(&self) -> f64 {
        if self.position.risk_amount > 0.0 {
            self.realized_pnl / self.position.risk_amount
        } else {
            0.0
        }
    }

    pub fn is_winner(&self) -> bool {
        self.realized_pnl > 0.0
    }
}
