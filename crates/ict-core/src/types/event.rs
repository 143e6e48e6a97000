//! Engine events for observability sinks.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{
    BiasAssessment, ClosedPosition, Direction, FairValueGap, LiquiditySweep, MarketBias, Position,
    SetupId, SweepId, SwingPoint, Timeframe, TradeSetup,
};

/// Why a gap candidate was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// C2 body/range below the minimum impulse ratio
    WeakImpulse,
    /// Gap height relative to the reference price below the minimum
    BelowMinSize,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::WeakImpulse => write!(f, "weak impulse"),
            RejectReason::BelowMinSize => write!(f, "below minimum size"),
        }
    }
}

/// Why a detected FVG did not become a setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    SetupPending,
    PositionOpen,
    /// Detected outside the configured session windows
    OutsideSession,
}

/// Everything the engine reports while processing candles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    BiasChanged {
        instrument: String,
        previous: MarketBias,
        assessment: BiasAssessment,
    },
    SwingConfirmed {
        instrument: String,
        timeframe: Timeframe,
        point: SwingPoint,
    },
    SweepDetected {
        instrument: String,
        sweep: LiquiditySweep,
    },
    SweepConfirmed {
        instrument: String,
        sweep: LiquiditySweep,
    },
    SweepExpired {
        instrument: String,
        sweep: LiquiditySweep,
    },
    /// A sweep that may not drive entries (counter-bias or neutral bias).
    SweepRecorded {
        instrument: String,
        sweep: LiquiditySweep,
    },
    FvgDetected {
        instrument: String,
        fvg: FairValueGap,
    },
    FvgRejected {
        instrument: String,
        origin_sweep: SweepId,
        direction: Direction,
        reason: RejectReason,
        time: i64,
    },
    FvgIgnored {
        instrument: String,
        fvg: FairValueGap,
        reason: IgnoreReason,
    },
    /// The lookahead ran out without a qualifying gap.
    FvgScanExpired {
        instrument: String,
        origin_sweep: SweepId,
        time: i64,
    },
    SetupCreated {
        instrument: String,
        setup: TradeSetup,
    },
    SetupEntered {
        instrument: String,
        setup: TradeSetup,
        entry_price: f64,
        time: i64,
    },
    SetupInvalidated {
        instrument: String,
        setup: TradeSetup,
        time: i64,
    },
    SetupExpired {
        instrument: String,
        setup: TradeSetup,
        time: i64,
    },
    SetupCancelled {
        instrument: String,
        setup_id: SetupId,
        time: i64,
    },
    /// The setup triggered but no position could be sized or opened.
    EntryRejected {
        instrument: String,
        setup_id: SetupId,
        reason: String,
        time: i64,
    },
    PositionOpened {
        instrument: String,
        position: Position,
    },
    TrailingStopAdvanced {
        instrument: String,
        previous: Option<f64>,
        trailing_stop: f64,
        time: i64,
    },
    PositionClosed {
        instrument: String,
        closed: ClosedPosition,
    },
    /// The feed skipped one or more intervals. Reported, not bridged.
    FeedGap {
        instrument: String,
        timeframe: Timeframe,
        expected: i64,
        actual: i64,
    },
    Faulted {
        instrument: String,
        detail: String,
    },
    Reset {
        instrument: String,
    },
}

impl EngineEvent {
    /// Instrument the event belongs to.
    pub fn instrument(&self) -> &str {
        match self {
            EngineEvent::BiasChanged { instrument, .. }
            | EngineEvent::SwingConfirmed { instrument, .. }
            | EngineEvent::SweepDetected { instrument, .. }
            | EngineEvent::SweepConfirmed { instrument, .. }
            | EngineEvent::SweepExpired { instrument, .. }
            | EngineEvent::SweepRecorded { instrument, .. }
            | EngineEvent::FvgDetected { instrument, .. }
            | EngineEvent::FvgRejected { instrument, .. }
            | EngineEvent::FvgIgnored { instrument, .. }
            | EngineEvent::FvgScanExpired { instrument, .. }
            | EngineEvent::SetupCreated { instrument, .. }
            | EngineEvent::SetupEntered { instrument, .. }
            | EngineEvent::SetupInvalidated { instrument, .. }
            | EngineEvent::SetupExpired { instrument, .. }
            | EngineEvent::SetupCancelled { instrument, .. }
            | EngineEvent::EntryRejected { instrument, .. }
            | EngineEvent::PositionOpened { instrument, .. }
            | EngineEvent::TrailingStopAdvanced { instrument, .. }
            | EngineEvent::PositionClosed { instrument, .. }
            | EngineEvent::FeedGap { instrument, .. }
            | EngineEvent::Faulted { instrument, .. }
            | EngineEvent::Reset { instrument } => instrument,
        }
    }

    /// Short name used for counting and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineEvent::BiasChanged { .. } => "bias_changed",
            EngineEvent::SwingConfirmed { .. } => "swing_confirmed",
            EngineEvent::SweepDetected { .. } => "sweep_detected",
            EngineEvent::SweepConfirmed { .. } => "sweep_confirmed",
            EngineEvent::SweepExpired { .. } => "sweep_expired",
            EngineEvent::SweepRecorded { .. } => "sweep_recorded",
            EngineEvent::FvgDetected { .. } => "fvg_detected",
            EngineEvent::FvgRejected { .. } => "fvg_rejected",
            EngineEvent::FvgIgnored { .. } => "fvg_ignored",
            EngineEvent::FvgScanExpired { .. } => "fvg_scan_expired",
            EngineEvent::SetupCreated { .. } => "setup_created",
            EngineEvent::SetupEntered { .. } => "setup_entered",
            EngineEvent::SetupInvalidated { .. } => "setup_invalidated",
            EngineEvent::SetupExpired { .. } => "setup_expired",
            EngineEvent::SetupCancelled { .. } => "setup_cancelled",
            EngineEvent::EntryRejected { .. } => "entry_rejected",
            EngineEvent::PositionOpened { .. } => "position_opened",
            EngineEvent::TrailingStopAdvanced { .. } => "trailing_stop_advanced",
            EngineEvent::PositionClosed { .. } => "position_closed",
            EngineEvent::FeedGap { .. } => "feed_gap",
            EngineEvent::Faulted { .. } => "faulted",
            EngineEvent::Reset { .. } => "reset",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_tag() {
        let event = EngineEvent::FeedGap {
            instrument: "ETHUSDT".to_string(),
            timeframe: Timeframe::Minute15,
            expected: 900_000,
            actual: 2_700_000,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "feed_gap");
        assert_eq!(json["timeframe"], "15m");
        assert_eq!(event.instrument(), "ETHUSDT");
        assert_eq!(event.kind(), "feed_gap");
    }
}
