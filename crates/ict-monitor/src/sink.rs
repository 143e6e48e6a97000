//! Event sinks.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use ict_core::traits::EventSink;
use ict_core::types::EngineEvent;

/// Logs every engine event through `tracing`.
///
/// Lifecycle transitions go to `info`, per-candle detail to `debug`, feed
/// gaps and rejected entries to `warn`, faults to `error`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &EngineEvent) {
        let instrument = event.instrument();
        let kind = event.kind();
        match event {
            EngineEvent::BiasChanged { previous, assessment, .. } => {
                info!(instrument, kind, %previous, bias = %assessment.bias, "Bias changed");
            }
            EngineEvent::SwingConfirmed { timeframe, point, .. } => {
                debug!(instrument, kind, %timeframe, price = point.price, index = point.index, "Swing confirmed");
            }
            EngineEvent::SweepDetected { sweep, .. }
            | EngineEvent::SweepExpired { sweep, .. }
            | EngineEvent::SweepRecorded { sweep, .. } => {
                debug!(instrument, kind, id = %sweep.id, level = sweep.swept_point.price, direction = %sweep.direction, "Sweep");
            }
            EngineEvent::SweepConfirmed { sweep, .. } => {
                info!(instrument, kind, id = %sweep.id, level = sweep.swept_point.price, extreme = sweep.extreme, "Sweep confirmed");
            }
            EngineEvent::FvgDetected { fvg, .. } => {
                info!(instrument, kind, id = %fvg.id, low = fvg.zone_low, high = fvg.zone_high, "FVG detected");
            }
            EngineEvent::FvgRejected { origin_sweep, reason, .. } => {
                debug!(instrument, kind, %origin_sweep, %reason, "FVG candidate rejected");
            }
            EngineEvent::FvgIgnored { fvg, reason, .. } => {
                debug!(instrument, kind, id = %fvg.id, ?reason, "FVG ignored");
            }
            EngineEvent::FvgScanExpired { origin_sweep, .. } => {
                debug!(instrument, kind, %origin_sweep, "FVG scan expired");
            }
            EngineEvent::SetupCreated { setup, .. } => {
                info!(instrument, kind, id = %setup.id, stop = setup.stop_price, "Setup created");
            }
            EngineEvent::SetupEntered { setup, entry_price, .. } => {
                info!(instrument, kind, id = %setup.id, entry_price, "Setup entered");
            }
            EngineEvent::SetupInvalidated { setup, .. }
            | EngineEvent::SetupExpired { setup, .. } => {
                info!(instrument, kind, id = %setup.id, state = %setup.state, "Setup ended");
            }
            EngineEvent::SetupCancelled { setup_id, .. } => {
                info!(instrument, kind, id = %setup_id, "Setup cancelled");
            }
            EngineEvent::EntryRejected { setup_id, reason, .. } => {
                warn!(instrument, kind, id = %setup_id, %reason, "Entry rejected");
            }
            EngineEvent::PositionOpened { position, .. } => {
                info!(
                    instrument,
                    kind,
                    direction = %position.direction,
                    entry = position.entry_price,
                    size = position.size,
                    stop = position.stop_price,
                    target = position.take_profit_price,
                    "Position opened"
                );
            }
            EngineEvent::TrailingStopAdvanced { trailing_stop, .. } => {
                debug!(instrument, kind, trailing_stop, "Trailing stop advanced");
            }
            EngineEvent::PositionClosed { closed, .. } => {
                info!(
                    instrument,
                    kind,
                    reason = %closed.exit_reason,
                    exit = closed.exit_price,
                    pnl = closed.realized_pnl,
                    r = closed.r_multiple(),
                    "Position closed"
                );
            }
            EngineEvent::FeedGap { timeframe, expected, actual, .. } => {
                warn!(instrument, kind, %timeframe, expected, actual, "Feed gap");
            }
            EngineEvent::Faulted { detail, .. } => {
                error!(instrument, kind, %detail, "Instrument faulted");
            }
            EngineEvent::Reset { .. } => {
                info!(instrument, kind, "Instrument reset");
            }
        }
    }
}

/// Forwards each event to several sinks in order.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: &EngineEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventJournal;

    #[test]
    fn test_fanout_reaches_every_sink() {
        let first = Arc::new(EventJournal::new());
        let second = Arc::new(EventJournal::new());
        let fanout = FanoutSink::new()
            .with(Arc::new(TracingEventSink))
            .with(first.clone())
            .with(second.clone());

        fanout.emit(&EngineEvent::Reset {
            instrument: "BTCUSDT".to_string(),
        });
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
    }
}
