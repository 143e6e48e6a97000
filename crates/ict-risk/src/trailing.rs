//! Trailing stop.

use serde::{Deserialize, Serialize};

use ict_core::error::EngineError;
use ict_core::traits::ComponentConfig;
use ict_core::types::{Direction, Position};

/// Trailing stop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailingConfig {
    /// Favorable move, in multiples of the initial risk, before trailing starts
    pub trail_activation_r: f64,
    /// Fraction of the favorable move given back by the trailing stop
    pub trail_ratio: f64,
}

impl Default for TrailingConfig {
    fn default() -> Self {
        Self {
            trail_activation_r: 1.0,
            trail_ratio: 0.5,
        }
    }
}

impl ComponentConfig for TrailingConfig {
    fn validate(&self) -> Result<(), EngineError> {
        if !self.trail_activation_r.is_finite() || self.trail_activation_r < 0.0 {
            return Err(EngineError::InvalidConfig(
                "trail_activation_r must be non-negative".into(),
            ));
        }
        if !(self.trail_ratio > 0.0 && self.trail_ratio <= 1.0) {
            return Err(EngineError::InvalidConfig(
                "trail_ratio must be in (0, 1]".into(),
            ));
        }
        Ok(())
    }
}

/// Computes the next trailing stop from a position's best price.
#[derive(Debug, Clone)]
pub struct TrailingStop {
    config: TrailingConfig,
}

impl TrailingStop {
    pub fn new(config: TrailingConfig) -> Self {
        Self { config }
    }

    /// Candidate stop for `position`, or `None` before activation.
    ///
    /// The candidate is merged with the current trailing stop so the result
    /// never loosens.
    pub fn next_stop(&self, position: &Position) -> Option<f64> {
        let favorable = position.favorable_move(position.best_price);
        let activation = self.config.trail_activation_r * position.risk_distance();
        if favorable <= 0.0 || favorable < activation {
            return position.trailing_stop_price;
        }

        let candidate = position.best_price - position.direction.sign() * self.config.trail_ratio * favorable;
        Some(match (position.trailing_stop_price, position.direction) {
            (Some(current), Direction::Bullish) => candidate.max(current),
            (Some(current), Direction::Bearish) => candidate.min(current),
            (None, _) => candidate,
        })
    }
}
