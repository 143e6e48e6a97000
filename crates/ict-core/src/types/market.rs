//! Market structure primitives: direction, swing points and bias.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Trade or structure direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Long / upward
    Bullish,
    /// Short / downward
    Bearish,
}

impl Direction {
    /// Get the opposite direction.
    pub fn opposite(&self) -> Self {
        match self {
            Direction::Bullish => Direction::Bearish,
            Direction::Bearish => Direction::Bullish,
        }
    }

    /// Get the sign for PnL calculations (+1 for long, -1 for short).
    #[inline]
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Bullish => 1.0,
            Direction::Bearish => -1.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Bullish => write!(f, "LONG"),
            Direction::Bearish => write!(f, "SHORT"),
        }
    }
}

/// Kind of swing point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwingKind {
    High,
    Low,
}

impl SwingKind {
    /// The swing kind a sweep in `direction` hunts: lows are swept before a
    /// bullish move, highs before a bearish one.
    pub fn swept_before(direction: Direction) -> Self {
        match direction {
            Direction::Bullish => SwingKind::Low,
            Direction::Bearish => SwingKind::High,
        }
    }

    /// Whether `price` is more extreme than `other` for this kind.
    #[inline]
    pub fn is_more_extreme(&self, price: f64, other: f64) -> bool {
        match self {
            SwingKind::High => price > other,
            SwingKind::Low => price < other,
        }
    }
}

/// A confirmed local extremum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    /// Sequence number of the candle within its timeframe stream
    pub index: u64,
    /// Open time of the candle (Unix milliseconds)
    pub time: i64,
    /// The swing price (candle high or low)
    pub price: f64,
    /// High or low
    pub kind: SwingKind,
}

impl SwingPoint {
    pub fn new(index: u64, time: i64, price: f64, kind: SwingKind) -> Self {
        Self {
            index,
            time,
            price,
            kind,
        }
    }
}

/// Directional bias of the higher timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MarketBias {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

impl MarketBias {
    /// The trade direction this bias supports, if any.
    pub fn direction(&self) -> Option<Direction> {
        match self {
            MarketBias::Bullish => Some(Direction::Bullish),
            MarketBias::Bearish => Some(Direction::Bearish),
            MarketBias::Neutral => None,
        }
    }

    /// Check whether the bias supports trades in `direction`.
    pub fn supports(&self, direction: Direction) -> bool {
        self.direction() == Some(direction)
    }
}

impl From<Direction> for MarketBias {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Bullish => MarketBias::Bullish,
            Direction::Bearish => MarketBias::Bearish,
        }
    }
}

impl fmt::Display for MarketBias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketBias::Bullish => write!(f, "BULLISH"),
            MarketBias::Bearish => write!(f, "BEARISH"),
            MarketBias::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// How a bias was derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum BiasDerivation {
    /// Higher-highs/higher-lows or lower-highs/lower-lows over the swing window
    SwingBased,
    /// Short vs long moving average of HTF closes. `None` values mean there
    /// were not enough closes to compute the average.
    MovingAverageBased {
        short_ma: Option<f64>,
        long_ma: Option<f64>,
    },
}

/// Result of one bias classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasAssessment {
    pub bias: MarketBias,
    pub derivation: BiasDerivation,
    /// Open time of the HTF candle that triggered the classification
    pub derived_at: i64,
    /// Swing points the classification looked at
    pub swings: Vec<SwingPoint>,
}

impl BiasAssessment {
    /// Neutral assessment used before any HTF candle closed.
    pub fn neutral(derived_at: i64) -> Self {
        Self {
            bias: MarketBias::Neutral,
            derivation: BiasDerivation::MovingAverageBased {
                short_ma: None,
                long_ma: None,
            },
            derived_at,
            swings: Vec::new(),
        }
    }
}
