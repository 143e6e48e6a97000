//! Fair value gap detection after a confirmed sweep.
//!
//! The scanner is armed with the sweep's confirmation candle as the first
//! C1 and slides a three-candle window forward. A bullish gap needs
//! `C3.low > C1.high` with a bullish impulse C2; a bearish gap needs
//! `C3.high < C1.low` with a bearish C2. One gap per sweep.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use ict_core::error::EngineError;
use ict_core::traits::ComponentConfig;
use ict_core::types::{Candle, Direction, FairValueGap, FvgId, RejectReason, SweepId};

/// Configuration for the FVG scanner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FvgConfig {
    /// Minimum zone height as a fraction of the C1 reference price
    pub min_fvg_size: f64,
    /// Minimum C2 body / range
    pub min_impulse_body_ratio: f64,
    /// Candles scanned after arming before giving up
    pub fvg_lookahead: u32,
}

impl Default for FvgConfig {
    fn default() -> Self {
        Self {
            min_fvg_size: 0.0005,
            min_impulse_body_ratio: 0.5,
            fvg_lookahead: 10,
        }
    }
}

impl ComponentConfig for FvgConfig {
    fn validate(&self) -> Result<(), EngineError> {
        if !self.min_fvg_size.is_finite() || self.min_fvg_size <= 0.0 {
            return Err(EngineError::InvalidConfig(
                "min_fvg_size must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_impulse_body_ratio) {
            return Err(EngineError::InvalidConfig(
                "min_impulse_body_ratio must be between 0 and 1".into(),
            ));
        }
        if self.fvg_lookahead < 2 {
            return Err(EngineError::InvalidConfig(
                "fvg_lookahead must allow at least two candles after the confirmation".into(),
            ));
        }
        Ok(())
    }
}

/// Scanner result for one candle.
#[derive(Debug, Clone, PartialEq)]
pub enum FvgOutcome {
    Detected(FairValueGap),
    Rejected {
        origin_sweep: SweepId,
        direction: Direction,
        reason: RejectReason,
        time: i64,
    },
    /// Lookahead exhausted without a gap
    Expired { origin_sweep: SweepId, time: i64 },
}

#[derive(Debug, Clone)]
struct ArmedScan {
    origin_sweep: SweepId,
    direction: Direction,
    window: VecDeque<Candle>,
    scanned: u32,
}

#[derive(Debug, Clone)]
pub struct FvgScanner {
    config: FvgConfig,
    armed: Option<ArmedScan>,
    next_id: u64,
}

impl FvgScanner {
    pub fn new(config: FvgConfig) -> Self {
        Self {
            config,
            armed: None,
            next_id: 1,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// The sweep currently being scanned for.
    pub fn armed_sweep(&self) -> Option<SweepId> {
        self.armed.as_ref().map(|a| a.origin_sweep)
    }

    /// Arm the scanner for a confirmed sweep.
    ///
    /// Returns `false` (and changes nothing) while a scan is already running.
    pub fn arm(&mut self, origin_sweep: SweepId, direction: Direction, confirmation: Candle) -> bool {
        if self.armed.is_some() {
            return false;
        }
        let mut window = VecDeque::with_capacity(3);
        window.push_back(confirmation);
        self.armed = Some(ArmedScan {
            origin_sweep,
            direction,
            window,
            scanned: 0,
        });
        true
    }

    pub fn disarm(&mut self) {
        self.armed = None;
    }

    /// Feed the next LTF candle after the confirmation candle.
    pub fn on_candle(&mut self, candle: &Candle) -> Vec<FvgOutcome> {
        let Some(scan) = self.armed.as_mut() else {
            return Vec::new();
        };

        scan.window.push_back(*candle);
        if scan.window.len() > 3 {
            scan.window.pop_front();
        }
        scan.scanned += 1;

        let origin_sweep = scan.origin_sweep;
        let direction = scan.direction;
        let exhausted = scan.scanned >= self.config.fvg_lookahead;
        let mut outcomes = Vec::new();

        if scan.window.len() == 3 {
            let (c1, c2, c3) = (scan.window[0], scan.window[1], scan.window[2]);
            match self.evaluate(&c1, &c2, &c3, direction, origin_sweep) {
                Some(Ok(fvg)) => {
                    debug!(id = %fvg.id, low = fvg.zone_low, high = fvg.zone_high, "FVG confirmed");
                    self.armed = None;
                    return vec![FvgOutcome::Detected(fvg)];
                }
                Some(Err(reason)) => outcomes.push(FvgOutcome::Rejected {
                    origin_sweep,
                    direction,
                    reason,
                    time: c3.open_time,
                }),
                None => {}
            }
        }

        if exhausted {
            self.armed = None;
            outcomes.push(FvgOutcome::Expired {
                origin_sweep,
                time: candle.open_time,
            });
        }

        outcomes
    }

    /// `None` when there is no gap at all, `Some(Err)` for a gap that fails a filter.
    fn evaluate(
        &mut self,
        c1: &Candle,
        c2: &Candle,
        c3: &Candle,
        direction: Direction,
        origin_sweep: SweepId,
    ) -> Option<Result<FairValueGap, RejectReason>> {
        let (zone_low, zone_high, reference_price, impulse_aligned) = match direction {
            Direction::Bullish if c3.low > c1.high => (c1.high, c3.low, c1.high, c2.is_bullish()),
            Direction::Bearish if c3.high < c1.low => (c3.high, c1.low, c1.low, c2.is_bearish()),
            _ => return None,
        };

        if !impulse_aligned || c2.body_ratio() < self.config.min_impulse_body_ratio {
            return Some(Err(RejectReason::WeakImpulse));
        }
        if reference_price <= 0.0 || (zone_high - zone_low) / reference_price < self.config.min_fvg_size {
            return Some(Err(RejectReason::BelowMinSize));
        }

        let id = FvgId(self.next_id);
        self.next_id += 1;
        Some(Ok(FairValueGap {
            id,
            zone_low,
            zone_high,
            direction,
            origin_sweep,
            reference_price,
            created_at: c3.open_time,
            filled: false,
        }))
    }

    pub fn reset(&mut self) {
        self.armed = None;
    }
}
