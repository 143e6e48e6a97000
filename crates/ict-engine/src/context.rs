//! Per-instrument engine state.

use std::collections::VecDeque;

use ict_core::error::EngineError;
use ict_core::types::{BiasAssessment, Candle, LiquiditySweep, SweepId, Timeframe};
use ict_indicators::{SwingDetector, SwingWindow};
use ict_risk::PositionManager;
use ict_strategy::{BiasClassifier, FvgScanner, SetupEngine, SweepDetector};

use crate::config::EngineConfig;

/// Everything the engine knows about one instrument.
///
/// Owned by exactly one worker. Nothing here is shared across instruments.
#[derive(Debug, Clone)]
pub struct InstrumentContext {
    pub(crate) instrument: String,
    pub(crate) config: EngineConfig,

    pub(crate) htf_detector: SwingDetector,
    pub(crate) htf_swings: SwingWindow,
    pub(crate) htf_closes: VecDeque<f64>,
    closes_capacity: usize,
    pub(crate) bias: BiasAssessment,

    pub(crate) ltf_detector: SwingDetector,
    pub(crate) ltf_swings: SwingWindow,
    pub(crate) sweeps: SweepDetector,
    sweep_history: VecDeque<LiquiditySweep>,
    pub(crate) fvg: FvgScanner,
    pub(crate) setups: SetupEngine,
    pub(crate) positions: PositionManager,

    pub(crate) last_htf: Option<i64>,
    pub(crate) last_ltf: Option<i64>,
    pub(crate) fault: Option<String>,
}

impl InstrumentContext {
    /// Fresh context. `config` is assumed to be validated.
    pub fn new(instrument: impl Into<String>, config: &EngineConfig) -> Self {
        let instrument = instrument.into();
        let closes_capacity = BiasClassifier::new(config.bias()).closes_required();
        Self {
            htf_detector: SwingDetector::new(config.swing_radius),
            htf_swings: SwingWindow::new(config.swing_capacity),
            htf_closes: VecDeque::with_capacity(closes_capacity),
            closes_capacity,
            bias: BiasAssessment::neutral(0),
            ltf_detector: SwingDetector::new(config.swing_radius),
            ltf_swings: SwingWindow::new(config.swing_capacity),
            sweeps: SweepDetector::new(config.sweep(), config.swing_capacity * 2),
            sweep_history: VecDeque::with_capacity(config.sweep_history),
            fvg: FvgScanner::new(config.fvg()),
            setups: SetupEngine::new(config.setup()),
            positions: PositionManager::new(instrument.clone(), config.position()),
            last_htf: None,
            last_ltf: None,
            fault: None,
            instrument,
            config: config.clone(),
        }
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn bias(&self) -> &BiasAssessment {
        &self.bias
    }

    pub fn htf_swings(&self) -> &SwingWindow {
        &self.htf_swings
    }

    pub fn ltf_swings(&self) -> &SwingWindow {
        &self.ltf_swings
    }

    pub fn sweep_detector(&self) -> &SweepDetector {
        &self.sweeps
    }

    pub fn fvg_scanner(&self) -> &FvgScanner {
        &self.fvg
    }

    pub fn setups(&self) -> &SetupEngine {
        &self.setups
    }

    pub fn positions(&self) -> &PositionManager {
        &self.positions
    }

    /// Retained sweeps, oldest first.
    pub fn sweep_history(&self) -> impl Iterator<Item = &LiquiditySweep> {
        self.sweep_history.iter()
    }

    pub fn sweep(&self, id: SweepId) -> Option<&LiquiditySweep> {
        self.sweep_history.iter().rev().find(|s| s.id == id)
    }

    pub fn is_faulted(&self) -> bool {
        self.fault.is_some()
    }

    pub fn fault(&self) -> Option<&str> {
        self.fault.as_deref()
    }

    /// Insert or update a sweep, evicting the oldest beyond capacity.
    pub(crate) fn record_sweep(&mut self, sweep: LiquiditySweep) {
        if let Some(existing) = self.sweep_history.iter_mut().find(|s| s.id == sweep.id) {
            *existing = sweep;
            return;
        }
        self.sweep_history.push_back(sweep);
        while self.sweep_history.len() > self.config.sweep_history {
            self.sweep_history.pop_front();
        }
    }

    pub(crate) fn push_htf_close(&mut self, close: f64) {
        self.htf_closes.push_back(close);
        while self.htf_closes.len() > self.closes_capacity {
            self.htf_closes.pop_front();
        }
    }

    pub(crate) fn ensure_active(&self) -> Result<(), EngineError> {
        if self.fault.is_some() {
            return Err(EngineError::Faulted {
                instrument: self.instrument.clone(),
            });
        }
        Ok(())
    }

    /// Validate a candle against the last one seen on `timeframe`.
    ///
    /// Nothing is mutated. Returns the expected open time when the candle
    /// skips one or more intervals.
    pub(crate) fn check_candle(
        &self,
        timeframe: Timeframe,
        candle: &Candle,
    ) -> Result<Option<i64>, EngineError> {
        candle
            .validate()
            .map_err(|reason| EngineError::MalformedCandle {
                instrument: self.instrument.clone(),
                timeframe,
                open_time: candle.open_time,
                reason,
            })?;

        let last = if timeframe == self.config.htf {
            self.last_htf
        } else {
            self.last_ltf
        };
        let Some(previous) = last else {
            return Ok(None);
        };
        if candle.open_time <= previous {
            return Err(EngineError::OutOfOrderCandle {
                instrument: self.instrument.clone(),
                timeframe,
                previous,
                received: candle.open_time,
            });
        }

        let expected = previous + timeframe.as_millis() as i64;
        Ok((candle.open_time > expected).then_some(expected))
    }

    /// Back to the freshly created state, keeping the instrument and config.
    pub fn reset(&mut self) {
        *self = Self::new(self.instrument.clone(), &self.config);
    }
}
