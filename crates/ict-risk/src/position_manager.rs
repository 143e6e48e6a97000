//! Position lifecycle: `Flat → Open → Closed`, then a fresh cycle.
//!
//! While open, each candle after the entry candle is checked in order:
//! stop and target touches (the stop wins when both are touched), the
//! optional close-through-FVG invalidation, then the trailing stop is
//! advanced from the updated best price so it applies from the next candle.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use ict_core::error::EngineError;
use ict_core::traits::{AccountSnapshot, ComponentConfig};
use ict_core::types::{
    Candle, ClosedPosition, Direction, ExitReason, Position, PositionStatus, TradeSetup,
};

use crate::position_sizer::PositionSizer;
use crate::trailing::{TrailingConfig, TrailingStop};

/// Position management configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionConfig {
    pub trailing: TrailingConfig,
    /// Close at the candle close when it closes fully through the
    /// originating FVG against the position
    pub close_on_fvg_fill: bool,
    /// Cap on the quantity of any single position
    pub max_position_size: Option<f64>,
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            trailing: TrailingConfig::default(),
            close_on_fvg_fill: true,
            max_position_size: None,
        }
    }
}

impl ComponentConfig for PositionConfig {
    fn validate(&self) -> Result<(), EngineError> {
        if let Some(max) = self.max_position_size {
            if !max.is_finite() || max <= 0.0 {
                return Err(EngineError::InvalidConfig(
                    "max_position_size must be positive".into(),
                ));
            }
        }
        self.trailing.validate()
    }
}

/// Position state for one instrument.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PositionState {
    #[default]
    Flat,
    Open(Position),
    Closed(ClosedPosition),
}

/// Change produced by a candle update.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionUpdate {
    TrailingAdvanced {
        previous: Option<f64>,
        trailing_stop: f64,
        time: i64,
    },
    Closed(ClosedPosition),
}

/// Owns at most one open position per instrument.
#[derive(Debug, Clone)]
pub struct PositionManager {
    instrument: String,
    config: PositionConfig,
    sizer: PositionSizer,
    trailing: TrailingStop,
    state: PositionState,
}

impl PositionManager {
    pub fn new(instrument: impl Into<String>, config: PositionConfig) -> Self {
        let trailing = TrailingStop::new(config.trailing.clone());
        let sizer = match config.max_position_size {
            Some(max) => PositionSizer::new().with_max_size(max),
            None => PositionSizer::new(),
        };
        Self {
            instrument: instrument.into(),
            config,
            sizer,
            trailing,
            state: PositionState::Flat,
        }
    }

    pub fn state(&self) -> &PositionState {
        &self.state
    }

    pub fn position(&self) -> Option<&Position> {
        match &self.state {
            PositionState::Open(position) => Some(position),
            _ => None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, PositionState::Open(_))
    }

    /// Open a position for an entered setup.
    ///
    /// Opening while a position is open is an invariant violation and leaves
    /// the current position untouched. A sizing failure is returned as
    /// `EntryRejected`.
    pub fn open(
        &mut self,
        setup: &TradeSetup,
        entry_price: f64,
        opened_at: i64,
        snapshot: &AccountSnapshot,
    ) -> Result<Position, EngineError> {
        if let PositionState::Open(existing) = &self.state {
            return Err(EngineError::InvariantViolation {
                instrument: self.instrument.clone(),
                detail: format!(
                    "open requested for {} while a {} position from {} is open",
                    setup.id, existing.direction, existing.setup_id
                ),
            });
        }

        let sized = self
            .sizer
            .calculate(snapshot, entry_price, setup.stop_price)
            .map_err(|e| EngineError::EntryRejected {
                instrument: self.instrument.clone(),
                reason: e.to_string(),
            })?;

        let position = Position {
            instrument: self.instrument.clone(),
            direction: setup.direction(),
            entry_price,
            size: sized.size,
            stop_price: setup.stop_price,
            take_profit_price: setup.target_price,
            trailing_stop_price: None,
            opened_at,
            status: PositionStatus::Open,
            setup_id: setup.id,
            fvg_zone: setup.entry_zone,
            risk_amount: sized.risk_amount,
            best_price: entry_price,
        };

        info!(
            instrument = %self.instrument,
            direction = %position.direction,
            entry = entry_price,
            size = position.size,
            stop = position.stop_price,
            target = position.take_profit_price,
            "Position opened"
        );
        self.state = PositionState::Open(position.clone());
        Ok(position)
    }

    /// Advance the open position by one closed candle.
    pub fn update(&mut self, candle: &Candle) -> Vec<PositionUpdate> {
        let PositionState::Open(position) = &mut self.state else {
            return Vec::new();
        };
        if candle.open_time <= position.opened_at {
            return Vec::new();
        }

        if let Some((exit_price, reason)) = exit_for(position, candle, self.config.close_on_fvg_fill) {
            let closed = ClosedPosition::from_position(position.clone(), exit_price, reason, candle.open_time);
            info!(
                instrument = %self.instrument,
                reason = %reason,
                exit = exit_price,
                pnl = closed.realized_pnl,
                "Position closed"
            );
            self.state = PositionState::Closed(closed.clone());
            return vec![PositionUpdate::Closed(closed)];
        }

        position.best_price = match position.direction {
            Direction::Bullish => position.best_price.max(candle.high),
            Direction::Bearish => position.best_price.min(candle.low),
        };

        let previous = position.trailing_stop_price;
        let next = self.trailing.next_stop(position);
        match next {
            Some(trailing_stop) if next != previous => {
                position.trailing_stop_price = Some(trailing_stop);
                debug!(instrument = %self.instrument, ?previous, trailing_stop, "Trailing stop advanced");
                vec![PositionUpdate::TrailingAdvanced {
                    previous,
                    trailing_stop,
                    time: candle.open_time,
                }]
            }
            _ => Vec::new(),
        }
    }

    /// Close the open position at `price` with `MANUAL`.
    pub fn close_manual(&mut self, price: f64, time: i64) -> Option<ClosedPosition> {
        let PositionState::Open(position) = &self.state else {
            return None;
        };
        let closed = ClosedPosition::from_position(position.clone(), price, ExitReason::Manual, time);
        info!(instrument = %self.instrument, exit = price, pnl = closed.realized_pnl, "Position closed manually");
        self.state = PositionState::Closed(closed.clone());
        Some(closed)
    }

    pub fn reset(&mut self) {
        self.state = PositionState::Flat;
    }
}

/// Exit price and reason if `candle` ends the position.
fn exit_for(position: &Position, candle: &Candle, close_on_fvg_fill: bool) -> Option<(f64, ExitReason)> {
    let stop = position.effective_stop();
    let stop_reason = if position.trailing_is_binding() {
        ExitReason::TrailingStop
    } else {
        ExitReason::StopLoss
    };
    let target = position.take_profit_price;

    match position.direction {
        Direction::Bullish => {
            if candle.open <= stop {
                return Some((candle.open, stop_reason));
            }
            if candle.low <= stop {
                return Some((stop, stop_reason));
            }
            if candle.high >= target {
                return Some((target, ExitReason::TakeProfit));
            }
        }
        Direction::Bearish => {
            if candle.open >= stop {
                return Some((candle.open, stop_reason));
            }
            if candle.high >= stop {
                return Some((stop, stop_reason));
            }
            if candle.low <= target {
                return Some((target, ExitReason::TakeProfit));
            }
        }
    }

    if close_on_fvg_fill {
        let (zone_low, zone_high) = position.fvg_zone;
        let through = match position.direction {
            Direction::Bullish => candle.close < zone_low,
            Direction::Bearish => candle.close > zone_high,
        };
        if through {
            return Some((candle.close, ExitReason::Invalidated));
        }
    }

    None
}
