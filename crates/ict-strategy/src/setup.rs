//! Retest setup state machine.
//!
//! A setup waits for price to return into its FVG. Each candle is checked
//! for invalidation first (close through the far boundary), then for entry,
//! then for expiry.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use ict_core::error::EngineError;
use ict_core::traits::ComponentConfig;
use ict_core::types::{
    Candle, Direction, FairValueGap, IgnoreReason, SetupId, SetupState, TradeSetup,
};

use crate::session::SessionFilter;

/// What counts as a retest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntryTrigger {
    /// The candle range intersects the zone
    #[default]
    Touch,
    /// The candle wicks into the zone and closes back outside on the trade side
    Rejection,
}

/// Which price an entry is filled at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// Deepest traded price, clamped into the zone
    #[default]
    TouchPrice,
    /// Near edge of the zone
    ZoneBoundary,
    /// Consequent encroachment
    Midpoint,
}

impl fmt::Display for FillPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillPolicy::TouchPrice => write!(f, "touch_price"),
            FillPolicy::ZoneBoundary => write!(f, "zone_boundary"),
            FillPolicy::Midpoint => write!(f, "midpoint"),
        }
    }
}

/// Configuration for the setup engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SetupConfig {
    /// Candles a setup may wait for its retest
    pub setup_expiry: u32,
    pub entry_trigger: EntryTrigger,
    pub fill_policy: FillPolicy,
    /// Stop distance beyond the sweep extreme, as a fraction of the extreme
    pub stop_buffer: f64,
    pub risk_reward_ratio: f64,
    /// Only create setups inside these windows. `None` trades around the clock.
    pub session_filter: Option<SessionFilter>,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            setup_expiry: 20,
            entry_trigger: EntryTrigger::Touch,
            fill_policy: FillPolicy::TouchPrice,
            stop_buffer: 0.001,
            risk_reward_ratio: 2.0,
            session_filter: None,
        }
    }
}

impl ComponentConfig for SetupConfig {
    fn validate(&self) -> Result<(), EngineError> {
        if self.setup_expiry == 0 {
            return Err(EngineError::InvalidConfig(
                "setup_expiry must be greater than 0".into(),
            ));
        }
        if !self.stop_buffer.is_finite() || self.stop_buffer < 0.0 || self.stop_buffer >= 1.0 {
            return Err(EngineError::InvalidConfig(
                "stop_buffer must be in [0, 1)".into(),
            ));
        }
        if !self.risk_reward_ratio.is_finite() || self.risk_reward_ratio <= 0.0 {
            return Err(EngineError::InvalidConfig(
                "risk_reward_ratio must be positive".into(),
            ));
        }
        if let Some(filter) = &self.session_filter {
            filter.validate()?;
        }
        Ok(())
    }
}

/// Result of offering an FVG or evaluating a candle.
#[derive(Debug, Clone, PartialEq)]
pub enum SetupOutcome {
    Created(TradeSetup),
    Ignored {
        fvg: FairValueGap,
        reason: IgnoreReason,
    },
    Entered {
        setup: TradeSetup,
        entry_price: f64,
    },
    Invalidated(TradeSetup),
    Expired(TradeSetup),
}

/// Holds at most one setup awaiting its retest.
#[derive(Debug, Clone)]
pub struct SetupEngine {
    config: SetupConfig,
    pending: Option<TradeSetup>,
    next_id: u64,
}

impl SetupEngine {
    pub fn new(config: SetupConfig) -> Self {
        Self {
            config,
            pending: None,
            next_id: 1,
        }
    }

    pub fn config(&self) -> &SetupConfig {
        &self.config
    }

    pub fn pending(&self) -> Option<&TradeSetup> {
        self.pending.as_ref()
    }

    /// Stop beyond the sweep extreme, offset by the configured buffer.
    pub fn stop_for(&self, direction: Direction, sweep_extreme: f64) -> f64 {
        match direction {
            Direction::Bullish => sweep_extreme * (1.0 - self.config.stop_buffer),
            Direction::Bearish => sweep_extreme * (1.0 + self.config.stop_buffer),
        }
    }

    /// Target at the configured multiple of the entry-to-stop distance.
    pub fn target_for(&self, direction: Direction, entry: f64, stop: f64) -> f64 {
        entry + direction.sign() * (entry - stop).abs() * self.config.risk_reward_ratio
    }

    /// Whether a setup may be created at `time`.
    pub fn in_session(&self, time: i64) -> bool {
        self.config
            .session_filter
            .as_ref()
            .map_or(true, |filter| filter.contains(time))
    }

    /// Offer a freshly detected FVG.
    ///
    /// Ignored while another setup is pending, a position is open, or the
    /// gap formed outside the session windows.
    pub fn offer(&mut self, fvg: FairValueGap, sweep_extreme: f64, position_open: bool) -> SetupOutcome {
        if position_open {
            return SetupOutcome::Ignored {
                fvg,
                reason: IgnoreReason::PositionOpen,
            };
        }
        if self.pending.is_some() {
            return SetupOutcome::Ignored {
                fvg,
                reason: IgnoreReason::SetupPending,
            };
        }
        if !self.in_session(fvg.created_at) {
            return SetupOutcome::Ignored {
                fvg,
                reason: IgnoreReason::OutsideSession,
            };
        }

        let direction = fvg.direction;
        let stop_price = self.stop_for(direction, sweep_extreme);
        let provisional_entry = self.fill_price(&fvg, None);
        let setup = TradeSetup {
            id: SetupId(self.next_id),
            fvg,
            entry_zone: (fvg.zone_low, fvg.zone_high),
            stop_price,
            target_price: self.target_for(direction, provisional_entry, stop_price),
            risk_reward_ratio: self.config.risk_reward_ratio,
            state: SetupState::AwaitingRetest,
            candles_waited: 0,
            created_at: fvg.created_at,
        };
        self.next_id += 1;

        info!(id = %setup.id, %direction, zone_low = fvg.zone_low, zone_high = fvg.zone_high, stop = stop_price, "Setup created");
        self.pending = Some(setup.clone());
        SetupOutcome::Created(setup)
    }

    /// Evaluate the pending setup against the next candle.
    pub fn evaluate(&mut self, candle: &Candle) -> Option<SetupOutcome> {
        let mut setup = self.pending.take()?;
        setup.candles_waited += 1;
        let fvg = setup.fvg;

        if fvg.closed_through(candle.close) {
            setup.state = SetupState::Invalidated;
            setup.fvg.filled = true;
            debug!(id = %setup.id, close = candle.close, "Setup invalidated by close through zone");
            return Some(SetupOutcome::Invalidated(setup));
        }

        if self.triggered(&fvg, candle) {
            let entry_price = self.fill_price(&fvg, Some(candle));
            let direction = fvg.direction;
            let stop_on_losing_side = match direction {
                Direction::Bullish => setup.stop_price < entry_price,
                Direction::Bearish => setup.stop_price > entry_price,
            };
            if !stop_on_losing_side {
                setup.state = SetupState::Invalidated;
                debug!(id = %setup.id, entry_price, stop = setup.stop_price, "Stop not beyond entry");
                return Some(SetupOutcome::Invalidated(setup));
            }

            setup.target_price = self.target_for(direction, entry_price, setup.stop_price);
            setup.state = SetupState::Entered;
            return Some(SetupOutcome::Entered { setup, entry_price });
        }

        if setup.candles_waited > self.config.setup_expiry {
            setup.state = SetupState::Expired;
            return Some(SetupOutcome::Expired(setup));
        }

        self.pending = Some(setup);
        None
    }

    /// Drop the pending setup.
    pub fn cancel(&mut self) -> Option<TradeSetup> {
        self.pending.take()
    }

    fn triggered(&self, fvg: &FairValueGap, candle: &Candle) -> bool {
        if !fvg.intersects(candle) {
            return false;
        }
        match self.config.entry_trigger {
            EntryTrigger::Touch => true,
            EntryTrigger::Rejection => match fvg.direction {
                Direction::Bullish => candle.close > fvg.zone_high,
                Direction::Bearish => candle.close < fvg.zone_low,
            },
        }
    }

    /// Fill price for the configured policy. Without a candle the touch
    /// price falls back to the near edge.
    fn fill_price(&self, fvg: &FairValueGap, candle: Option<&Candle>) -> f64 {
        let near_edge = match fvg.direction {
            Direction::Bullish => fvg.zone_high,
            Direction::Bearish => fvg.zone_low,
        };
        match (self.config.fill_policy, candle) {
            (FillPolicy::TouchPrice, Some(candle)) => {
                let deepest = match fvg.direction {
                    Direction::Bullish => candle.low,
                    Direction::Bearish => candle.high,
                };
                deepest.clamp(fvg.zone_low, fvg.zone_high)
            }
            (FillPolicy::TouchPrice, None) | (FillPolicy::ZoneBoundary, _) => near_edge,
            (FillPolicy::Midpoint, _) => fvg.midpoint(),
        }
    }

    pub fn reset(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ict_core::types::{FvgId, SweepId};

    fn c(t: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle::new(t * 60_000, open, high, low, close, 1.0)
    }

    fn gap(direction: Direction) -> FairValueGap {
        FairValueGap {
            id: FvgId(1),
            zone_low: 100.0,
            zone_high: 102.0,
            direction,
            origin_sweep: SweepId(1),
            reference_price: 100.0,
            created_at: 0,
            filled: false,
        }
    }

    fn engine(config: SetupConfig) -> SetupEngine {
        SetupEngine::new(config)
    }

    #[test]
    fn test_touch_entry_with_stop_and_target() {
        let mut setups = engine(SetupConfig::default());
        assert!(matches!(setups.offer(gap(Direction::Bullish), 98.9, false), SetupOutcome::Created(_)));

        // Dips to 101 inside [100, 102]
        let out = setups.evaluate(&c(1, 102.8, 103.0, 101.0, 102.5));
        match out {
            Some(SetupOutcome::Entered { setup, entry_price }) => {
                assert_eq!(entry_price, 101.0);
                assert!(setup.stop_price < 98.9);
                assert!((setup.stop_price - 98.9 * 0.999).abs() < 1e-9);
                let risk = entry_price - setup.stop_price;
                assert!((setup.target_price - (entry_price + 2.0 * risk)).abs() < 1e-9);
                assert_eq!(setup.state, SetupState::Entered);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(setups.pending().is_none());
    }

    #[test]
    fn test_close_below_zone_invalidates() {
        let mut setups = engine(SetupConfig::default());
        setups.offer(gap(Direction::Bullish), 98.9, false);

        let out = setups.evaluate(&c(1, 101.0, 101.5, 98.8, 99.0));
        match out {
            Some(SetupOutcome::Invalidated(setup)) => {
                assert!(setup.fvg.filled);
                assert_eq!(setup.state, SetupState::Invalidated);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_bearish_close_above_zone_invalidates() {
        let mut setups = engine(SetupConfig::default());
        setups.offer(gap(Direction::Bearish), 103.5, false);

        let out = setups.evaluate(&c(1, 101.0, 103.2, 100.9, 103.0));
        assert!(matches!(out, Some(SetupOutcome::Invalidated(s)) if s.fvg.filled));
    }

    #[test]
    fn test_rejection_requires_close_outside_zone() {
        let config = SetupConfig {
            entry_trigger: EntryTrigger::Rejection,
            fill_policy: FillPolicy::Midpoint,
            ..Default::default()
        };
        let mut setups = engine(config);
        setups.offer(gap(Direction::Bullish), 98.9, false);

        // Wick into the zone but close inside it
        assert!(setups.evaluate(&c(1, 103.0, 103.2, 101.5, 101.8)).is_none());
        let out = setups.evaluate(&c(2, 101.8, 103.0, 100.5, 102.6));
        assert!(matches!(out, Some(SetupOutcome::Entered { entry_price, .. }) if entry_price == 101.0));
    }

    #[test]
    fn test_fill_policies() {
        let touch = c(1, 102.5, 102.6, 100.4, 102.2);
        for (policy, expected) in [
            (FillPolicy::TouchPrice, 100.4),
            (FillPolicy::ZoneBoundary, 102.0),
            (FillPolicy::Midpoint, 101.0),
        ] {
            let mut setups = engine(SetupConfig {
                fill_policy: policy,
                ..Default::default()
            });
            setups.offer(gap(Direction::Bullish), 98.0, false);
            let out = setups.evaluate(&touch);
            assert!(
                matches!(out, Some(SetupOutcome::Entered { entry_price, .. }) if (entry_price - expected).abs() < 1e-9),
                "policy {}",
                policy
            );
        }
    }

    #[test]
    fn test_expiry_after_window() {
        let mut setups = engine(SetupConfig {
            setup_expiry: 2,
            ..Default::default()
        });
        setups.offer(gap(Direction::Bullish), 98.9, false);

        assert!(setups.evaluate(&c(1, 104.0, 105.0, 103.0, 104.5)).is_none());
        assert!(setups.evaluate(&c(2, 104.5, 105.0, 103.0, 104.0)).is_none());
        let out = setups.evaluate(&c(3, 104.0, 105.0, 103.0, 104.2));
        assert!(matches!(out, Some(SetupOutcome::Expired(s)) if s.candles_waited == 3));
    }

    #[test]
    fn test_stop_not_beyond_entry_invalidates() {
        let mut setups = engine(SetupConfig {
            stop_buffer: 0.0,
            fill_policy: FillPolicy::ZoneBoundary,
            ..Default::default()
        });
        // Extreme above the bullish entry makes the stop useless
        setups.offer(gap(Direction::Bullish), 102.5, false);
        let out = setups.evaluate(&c(1, 103.0, 103.5, 101.0, 103.0));
        assert!(matches!(out, Some(SetupOutcome::Invalidated(_))));
    }

    #[test]
    fn test_second_offer_ignored() {
        let mut setups = engine(SetupConfig::default());
        setups.offer(gap(Direction::Bullish), 98.9, false);
        assert!(matches!(
            setups.offer(gap(Direction::Bullish), 98.9, false),
            SetupOutcome::Ignored { reason: IgnoreReason::SetupPending, .. }
        ));

        let mut fresh = engine(SetupConfig::default());
        assert!(matches!(
            fresh.offer(gap(Direction::Bullish), 98.9, true),
            SetupOutcome::Ignored { reason: IgnoreReason::PositionOpen, .. }
        ));
        assert!(fresh.pending().is_none());
    }

    #[test]
    fn test_offer_outside_session_ignored() {
        let mut setups = engine(SetupConfig {
            session_filter: Some(SessionFilter::ny_kill_zones()),
            ..Default::default()
        });
        // Midnight UTC is evening in New York
        assert!(matches!(
            setups.offer(gap(Direction::Bullish), 98.9, false),
            SetupOutcome::Ignored { reason: IgnoreReason::OutsideSession, .. }
        ));
        assert!(setups.pending().is_none());

        // 2024-01-15 08:30 New York
        let inside = FairValueGap {
            created_at: 1_705_325_400_000,
            ..gap(Direction::Bullish)
        };
        assert!(matches!(
            setups.offer(inside, 98.9, false),
            SetupOutcome::Created(_)
        ));
    }

    #[test]
    fn test_config_validation() {
        assert!(SetupConfig::default().validate().is_ok());
        assert!(SetupConfig {
            session_filter: Some(SessionFilter {
                windows: Vec::new(),
                ..Default::default()
            }),
            ..Default::default()
        }
        .validate()
        .is_err());
        assert!(SetupConfig {
            risk_reward_ratio: 0.0,
            ..Default::default()
        }
        .validate()
        .is_err());
        assert!(SetupConfig {
            setup_expiry: 0,
            ..Default::default()
        }
        .validate()
        .is_err());
    }
}
