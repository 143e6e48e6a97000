//! Liquidity sweep detection on the lower timeframe.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use ict_core::error::EngineError;
use ict_core::traits::ComponentConfig;
use ict_core::types::{
    Candle, Direction, LiquiditySweep, MarketBias, SweepId, SwingKind, SwingPoint,
};
use ict_indicators::SwingWindow;

/// Configuration for the sweep detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Candles after the sweep candle allowed for the reversal close
    pub sweep_confirmation_window: u32,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            sweep_confirmation_window: 3,
        }
    }
}

impl ComponentConfig for SweepConfig {
    fn validate(&self) -> Result<(), EngineError> {
        if self.sweep_confirmation_window == 0 {
            return Err(EngineError::InvalidConfig(
                "sweep_confirmation_window must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// What happened to a sweep on a candle.
#[derive(Debug, Clone, PartialEq)]
pub enum SweepOutcome {
    /// Level broken, waiting for the reversal close
    Detected(LiquiditySweep),
    /// Reversal confirmed and aligned with bias
    Confirmed(LiquiditySweep),
    /// No reversal close inside the window
    Expired(LiquiditySweep),
    /// Counter-bias or neutral-bias sweep, never drives entries
    Recorded(LiquiditySweep),
}

#[derive(Debug, Clone)]
struct PendingSweep {
    sweep: LiquiditySweep,
    candles_waited: u32,
}

/// Tracks the pending sweep and which swing points were already swept.
#[derive(Debug, Clone)]
pub struct SweepDetector {
    config: SweepConfig,
    pending: Option<PendingSweep>,
    /// (kind, index) of swept points, bounded
    consumed: VecDeque<(SwingKind, u64)>,
    consumed_capacity: usize,
    next_id: u64,
}

impl SweepDetector {
    /// `consumed_capacity` should be at least the swing window capacity.
    pub fn new(config: SweepConfig, consumed_capacity: usize) -> Self {
        Self {
            config,
            pending: None,
            consumed: VecDeque::with_capacity(consumed_capacity),
            consumed_capacity: consumed_capacity.max(1),
            next_id: 1,
        }
    }

    pub fn pending(&self) -> Option<&LiquiditySweep> {
        self.pending.as_ref().map(|p| &p.sweep)
    }

    pub fn is_consumed(&self, point: &SwingPoint) -> bool {
        self.consumed.contains(&(point.kind, point.index))
    }

    fn consume(&mut self, point: &SwingPoint) {
        self.consumed.push_back((point.kind, point.index));
        while self.consumed.len() > self.consumed_capacity {
            self.consumed.pop_front();
        }
    }

    fn next_sweep_id(&mut self) -> SweepId {
        let id = SweepId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Most recent unswept point of `kind`.
    fn target<'a>(&self, swings: &'a SwingWindow, kind: SwingKind) -> Option<&'a SwingPoint> {
        swings
            .iter_newest()
            .filter(|p| p.kind == kind)
            .find(|p| !self.is_consumed(p))
    }

    /// Process one closed LTF candle against the current bias and swing window.
    pub fn on_candle(
        &mut self,
        candle: &Candle,
        bias: MarketBias,
        swings: &SwingWindow,
    ) -> Vec<SweepOutcome> {
        if self.pending.is_some() {
            return self.advance_pending(candle, bias).into_iter().collect();
        }

        let mut outcomes = Vec::new();
        // A broken low hunts for a bullish reversal, a broken high for a bearish one
        let breaks = [Direction::Bullish, Direction::Bearish].map(|direction| {
            let kind = SwingKind::swept_before(direction);
            let reach = match kind {
                SwingKind::Low => candle.low,
                SwingKind::High => candle.high,
            };
            let point = self
                .target(swings, kind)
                .filter(|p| kind.is_more_extreme(reach, p.price))
                .copied();
            (point, direction)
        });
        for (point, direction) in breaks {
            let Some(point) = point else { continue };
            self.consume(&point);
            let aligned = bias.supports(direction);
            let sweep = self.open_sweep(point, *candle, direction, aligned);

            if !aligned {
                debug!(id = %sweep.id, level = point.price, %bias, "Counter-bias sweep recorded");
                outcomes.push(SweepOutcome::Recorded(sweep));
            } else if sweep.reversal_confirmed {
                outcomes.push(SweepOutcome::Confirmed(sweep));
            } else {
                outcomes.push(SweepOutcome::Detected(sweep.clone()));
                self.pending = Some(PendingSweep {
                    sweep,
                    candles_waited: 0,
                });
            }
        }

        outcomes
    }

    fn open_sweep(
        &mut self,
        point: SwingPoint,
        candle: Candle,
        direction: Direction,
        actionable: bool,
    ) -> LiquiditySweep {
        let confirmed = closes_back(direction, point.price, candle.close);
        LiquiditySweep {
            id: self.next_sweep_id(),
            swept_point: point,
            sweep_candle: candle,
            direction,
            reversal_confirmed: confirmed,
            actionable,
            extreme: wick_extreme(direction, &candle),
            detected_at: candle.open_time,
            confirmed_at: confirmed.then_some(candle.open_time),
        }
    }

    fn advance_pending(&mut self, candle: &Candle, bias: MarketBias) -> Option<SweepOutcome> {
        let mut pending = self.pending.take()?;
        pending.candles_waited += 1;

        let sweep = &mut pending.sweep;
        sweep.extreme = match sweep.direction {
            Direction::Bullish => sweep.extreme.min(candle.low),
            Direction::Bearish => sweep.extreme.max(candle.high),
        };

        if closes_back(sweep.direction, sweep.swept_point.price, candle.close) {
            sweep.reversal_confirmed = true;
            sweep.confirmed_at = Some(candle.open_time);
            sweep.actionable = bias.supports(sweep.direction);
            let sweep = pending.sweep;
            return Some(if sweep.actionable {
                SweepOutcome::Confirmed(sweep)
            } else {
                SweepOutcome::Recorded(sweep)
            });
        }

        if pending.candles_waited >= self.config.sweep_confirmation_window {
            return Some(SweepOutcome::Expired(pending.sweep));
        }

        self.pending = Some(pending);
        None
    }

    pub fn reset(&mut self) {
        self.pending = None;
        self.consumed.clear();
    }
}

#[inline]
fn closes_back(direction: Direction, level: f64, close: f64) -> bool {
    match direction {
        Direction::Bullish => close > level,
        Direction::Bearish => close < level,
    }
}

#[inline]
fn wick_extreme(direction: Direction, candle: &Candle) -> f64 {
    match direction {
        Direction::Bullish => candle.low,
        Direction::Bearish => candle.high,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(t: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle::new(t * 60_000, open, high, low, close, 1.0)
    }

    fn window_with(points: &[SwingPoint]) -> SwingWindow {
        let mut window = SwingWindow::new(16);
        for p in points {
            window.push(*p);
        }
        window
    }

    fn detector() -> SweepDetector {
        SweepDetector::new(SweepConfig::default(), 32)
    }

    #[test]
    fn test_sweep_confirmed_by_later_close() {
        let swings = window_with(&[
            SwingPoint::new(1, 60_000, 100.0, SwingKind::Low),
            SwingPoint::new(3, 180_000, 106.0, SwingKind::High),
        ]);
        let mut det = detector();

        let out = det.on_candle(&c(10, 100.5, 100.8, 99.2, 99.5), MarketBias::Bullish, &swings);
        assert!(matches!(out.as_slice(), [SweepOutcome::Detected(_)]));
        assert!(det.pending().is_some());

        let out = det.on_candle(&c(11, 99.5, 101.2, 98.9, 101.0), MarketBias::Bullish, &swings);
        match out.as_slice() {
            [SweepOutcome::Confirmed(sweep)] => {
                assert!(sweep.actionable);
                assert!(sweep.reversal_confirmed);
                assert_eq!(sweep.direction, Direction::Bullish);
                assert_eq!(sweep.extreme, 98.9);
                assert_eq!(sweep.confirmed_at, Some(11 * 60_000));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(det.pending().is_none());
    }

    #[test]
    fn test_sweep_candle_close_confirms_immediately() {
        let swings = window_with(&[SwingPoint::new(1, 60_000, 100.0, SwingKind::Low)]);
        let mut det = detector();

        let out = det.on_candle(&c(5, 100.5, 101.5, 99.0, 101.0), MarketBias::Bullish, &swings);
        assert!(matches!(out.as_slice(), [SweepOutcome::Confirmed(s)] if s.extreme == 99.0));
        assert!(det.pending().is_none());
    }

    #[test]
    fn test_unconfirmed_sweep_expires_and_point_is_not_retried() {
        let swings = window_with(&[SwingPoint::new(1, 60_000, 100.0, SwingKind::Low)]);
        let mut det = detector();

        det.on_candle(&c(5, 100.2, 100.3, 99.0, 99.2), MarketBias::Bullish, &swings);
        assert!(det.on_candle(&c(6, 99.2, 99.5, 98.5, 99.0), MarketBias::Bullish, &swings).is_empty());
        assert!(det.on_candle(&c(7, 99.0, 99.6, 98.7, 99.1), MarketBias::Bullish, &swings).is_empty());
        let out = det.on_candle(&c(8, 99.1, 99.8, 98.8, 99.3), MarketBias::Bullish, &swings);
        assert!(matches!(out.as_slice(), [SweepOutcome::Expired(s)] if s.extreme == 98.5));

        // The same low is never swept again
        let out = det.on_candle(&c(9, 99.3, 99.5, 97.0, 99.4), MarketBias::Bullish, &swings);
        assert!(out.is_empty());
    }

    #[test]
    fn test_counter_bias_break_is_recorded_and_consumed() {
        let high = SwingPoint::new(2, 120_000, 110.0, SwingKind::High);
        let swings = window_with(&[high]);
        let mut det = detector();

        let out = det.on_candle(&c(5, 109.0, 111.0, 108.5, 109.5), MarketBias::Bullish, &swings);
        match out.as_slice() {
            [SweepOutcome::Recorded(sweep)] => {
                assert!(!sweep.actionable);
                assert_eq!(sweep.direction, Direction::Bearish);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(det.is_consumed(&high));
        assert!(det.pending().is_none());
    }

    #[test]
    fn test_neutral_bias_never_actionable() {
        let swings = window_with(&[SwingPoint::new(1, 60_000, 100.0, SwingKind::Low)]);
        let mut det = detector();

        let out = det.on_candle(&c(5, 100.5, 101.5, 99.0, 101.0), MarketBias::Neutral, &swings);
        assert!(matches!(out.as_slice(), [SweepOutcome::Recorded(s)] if !s.actionable));
    }

    #[test]
    fn test_breaks_while_pending_are_ignored() {
        let low = SwingPoint::new(1, 60_000, 100.0, SwingKind::Low);
        let high = SwingPoint::new(3, 180_000, 102.0, SwingKind::High);
        let swings = window_with(&[low, high]);
        let mut det = detector();

        det.on_candle(&c(5, 100.2, 100.3, 99.0, 99.2), MarketBias::Bullish, &swings);
        // Breaks the high while the low sweep is pending
        let out = det.on_candle(&c(6, 99.2, 102.5, 99.1, 99.8), MarketBias::Bullish, &swings);
        assert!(out.is_empty());
        assert!(!det.is_consumed(&high));
    }

    #[test]
    fn test_bias_flip_before_confirmation_is_not_actionable() {
        let swings = window_with(&[SwingPoint::new(1, 60_000, 100.0, SwingKind::Low)]);
        let mut det = detector();

        det.on_candle(&c(5, 100.2, 100.3, 99.0, 99.2), MarketBias::Bullish, &swings);
        let out = det.on_candle(&c(6, 99.2, 101.0, 99.1, 100.8), MarketBias::Bearish, &swings);
        assert!(matches!(out.as_slice(), [SweepOutcome::Recorded(s)] if s.reversal_confirmed && !s.actionable));
    }

    #[test]
    fn test_sweep_ids_increase() {
        let swings = window_with(&[
            SwingPoint::new(1, 60_000, 100.0, SwingKind::Low),
            SwingPoint::new(2, 120_000, 105.0, SwingKind::High),
            SwingPoint::new(3, 180_000, 99.0, SwingKind::Low),
        ]);
        let mut det = detector();

        let first = det.on_candle(&c(5, 99.5, 100.0, 98.5, 99.6), MarketBias::Bullish, &swings);
        let second = det.on_candle(&c(6, 99.6, 100.5, 97.5, 100.2), MarketBias::Bullish, &swings);
        let id = |o: &SweepOutcome| match o {
            SweepOutcome::Detected(s)
            | SweepOutcome::Confirmed(s)
            | SweepOutcome::Expired(s)
            | SweepOutcome::Recorded(s) => s.id,
        };
        // Newest unswept low (99.0) first, then the older 100.0 low
        assert_eq!(id(&first[0]), SweepId(1));
        assert_eq!(id(&second[0]), SweepId(2));
        assert!(matches!(&second[0], SweepOutcome::Confirmed(s) if s.swept_point.price == 100.0));
    }
}
