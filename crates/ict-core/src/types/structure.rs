//! Sweeps, fair value gaps and trade setups.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Candle, Direction, SwingPoint};

macro_rules! id_type {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "-{}"), self.0)
            }
        }
    };
}

id_type!(SweepId, "sweep");
id_type!(FvgId, "fvg");
id_type!(SetupId, "setup");

/// A liquidity sweep of a swing point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquiditySweep {
    pub id: SweepId,
    /// The swing point whose liquidity was taken
    pub swept_point: SwingPoint,
    /// The candle that broke the swing level
    pub sweep_candle: Candle,
    /// Direction of the expected reversal
    pub direction: Direction,
    /// Price closed back on the correct side of the level in time
    pub reversal_confirmed: bool,
    /// Whether the sweep may drive an entry (aligned with bias)
    pub actionable: bool,
    /// Furthest price beyond the swept level between sweep and confirmation
    pub extreme: f64,
    pub detected_at: i64,
    pub confirmed_at: Option<i64>,
}

impl LiquiditySweep {
    /// Distance between the swept level and the extreme, as a fraction of the level.
    pub fn penetration(&self) -> f64 {
        if self.swept_point.price == 0.0 {
            return 0.0;
        }
        (self.extreme - self.swept_point.price).abs() / self.swept_point.price
    }
}

/// A three-candle imbalance zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FairValueGap {
    pub id: FvgId,
    pub zone_low: f64,
    pub zone_high: f64,
    pub direction: Direction,
    /// The sweep that armed the scan. Resolved through the sweep history.
    pub origin_sweep: SweepId,
    /// C1 boundary the size is measured against
    pub reference_price: f64,
    /// Open time of C3
    pub created_at: i64,
    pub filled: bool,
}

impl FairValueGap {
    /// Zone height in price units.
    #[inline]
    pub fn height(&self) -> f64 {
        self.zone_high - self.zone_low
    }

    /// Zone height relative to the reference price.
    pub fn size_fraction(&self) -> f64 {
        if self.reference_price > 0.0 {
            self.height() / self.reference_price
        } else {
            0.0
        }
    }

    /// Consequent encroachment (the zone midpoint).
    #[inline]
    pub fn midpoint(&self) -> f64 {
        (self.zone_low + self.zone_high) / 2.0
    }

    /// Whether the candle's range overlaps the zone.
    pub fn intersects(&self, candle: &Candle) -> bool {
        candle.low <= self.zone_high && candle.high >= self.zone_low
    }

    /// Whether `close` is fully through the far boundary of the zone.
    pub fn closed_through(&self, close: f64) -> bool {
        match self.direction {
            Direction::Bullish => close < self.zone_low,
            Direction::Bearish => close > self.zone_high,
        }
    }
}

/// Setup lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SetupState {
    AwaitingRetest,
    Entered,
    Expired,
    Invalidated,
}

impl fmt::Display for SetupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SetupState::AwaitingRetest => "AWAITING_RETEST",
            SetupState::Entered => "ENTERED",
            SetupState::Expired => "EXPIRED",
            SetupState::Invalidated => "INVALIDATED",
        };
        write!(f, "{}", s)
    }
}

/// A pending trade idea built from an FVG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSetup {
    pub id: SetupId,
    pub fvg: FairValueGap,
    /// (low, high) of the retest zone
    pub entry_zone: (f64, f64),
    /// Stop derived from the sweep extreme
    pub stop_price: f64,
    /// Target at the configured reward multiple. Provisional until entry,
    /// then recomputed from the fill price.
    pub target_price: f64,
    pub risk_reward_ratio: f64,
    pub state: SetupState,
    pub candles_waited: u32,
    pub created_at: i64,
}

impl TradeSetup {
    #[inline]
    pub fn direction(&self) -> Direction {
        self.fvg.direction
    }
}
