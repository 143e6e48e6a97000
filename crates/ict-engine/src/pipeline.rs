//! Candle pipeline.
//!
//! HTF candles only update swings, closes and bias. LTF candles run the
//! full chain in a fixed order:
//!
//! 1. LTF swing update
//! 2. sweep scan against the current bias
//! 3. FVG scan for the armed sweep, offering a detected gap as a setup
//! 4. pending setup evaluation, opening a position on entry
//! 5. open position update
//!
//! A candle that arms the scanner is not scanned, a setup is not evaluated
//! on the candle that created it, and a position is not updated on the
//! candle that opened it.

use tracing::{debug, error, info, warn};

use ict_core::error::EngineError;
use ict_core::traits::{AccountProvider, ComponentConfig};
use ict_core::types::{Candle, EngineEvent, ExecutionIntent, Timeframe, TradeSetup};
use ict_risk::PositionUpdate;
use ict_strategy::{BiasClassifier, FvgOutcome, SetupOutcome, SweepOutcome};

use crate::command::EngineCommand;
use crate::config::EngineConfig;
use crate::context::InstrumentContext;

/// Output of one candle or command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineStep {
    pub events: Vec<EngineEvent>,
    /// Intents for the execution sink, in event order
    pub intents: Vec<ExecutionIntent>,
}

impl EngineStep {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.intents.is_empty()
    }

    fn push(&mut self, event: EngineEvent) {
        match &event {
            EngineEvent::PositionOpened { position, .. } => {
                self.intents.push(ExecutionIntent::open(position));
            }
            EngineEvent::PositionClosed { closed, .. } => {
                self.intents.push(ExecutionIntent::close(closed));
            }
            _ => {}
        }
        self.events.push(event);
    }
}

/// Stateless driver shared by every instrument context.
#[derive(Debug, Clone)]
pub struct IctEngine {
    config: EngineConfig,
    classifier: BiasClassifier,
}

impl IctEngine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let classifier = BiasClassifier::new(config.bias());
        Ok(Self { config, classifier })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// A fresh context for `instrument`.
    pub fn context(&self, instrument: impl Into<String>) -> InstrumentContext {
        InstrumentContext::new(instrument, &self.config)
    }

    /// Process one closed HTF candle.
    pub fn process_htf(
        &self,
        ctx: &mut InstrumentContext,
        candle: Candle,
    ) -> Result<EngineStep, EngineError> {
        ctx.ensure_active()?;
        let timeframe = self.config.htf;
        let gap = ctx.check_candle(timeframe, &candle)?;

        let mut step = EngineStep::default();
        if let Some(expected) = gap {
            step.push(feed_gap(ctx, timeframe, expected, candle.open_time));
        }
        ctx.last_htf = Some(candle.open_time);

        for point in ctx.htf_detector.push(candle) {
            if ctx.htf_swings.push(point) {
                step.push(EngineEvent::SwingConfirmed {
                    instrument: ctx.instrument.clone(),
                    timeframe,
                    point,
                });
            }
        }
        ctx.push_htf_close(candle.close);

        let swings = ctx.htf_swings.recent(self.config.bias_swing_count);
        let assessment =
            self.classifier
                .classify(&swings, ctx.htf_closes.make_contiguous(), candle.open_time);

        let previous = ctx.bias.bias;
        if assessment.bias != previous {
            info!(instrument = %ctx.instrument, %previous, bias = %assessment.bias, "Bias changed");
            step.push(EngineEvent::BiasChanged {
                instrument: ctx.instrument.clone(),
                previous,
                assessment: assessment.clone(),
            });
        }
        ctx.bias = assessment;

        Ok(step)
    }

    /// Process one closed LTF candle.
    ///
    /// An invariant violation faults the context and is returned as the
    /// error. Every later call fails with `Faulted` until a reset.
    pub fn process_ltf(
        &self,
        ctx: &mut InstrumentContext,
        candle: Candle,
        account: &dyn AccountProvider,
    ) -> Result<EngineStep, EngineError> {
        ctx.ensure_active()?;
        let timeframe = self.config.ltf;
        let gap = ctx.check_candle(timeframe, &candle)?;

        let mut step = EngineStep::default();
        if let Some(expected) = gap {
            step.push(feed_gap(ctx, timeframe, expected, candle.open_time));
        }
        ctx.last_ltf = Some(candle.open_time);

        match self.run_ltf(ctx, &candle, account, &mut step) {
            Ok(()) => Ok(step),
            Err(err) => {
                if matches!(err, EngineError::InvariantViolation { .. }) {
                    error!(instrument = %ctx.instrument, error = %err, "Instrument faulted");
                    ctx.fault = Some(err.to_string());
                }
                Err(err)
            }
        }
    }

    fn run_ltf(
        &self,
        ctx: &mut InstrumentContext,
        candle: &Candle,
        account: &dyn AccountProvider,
        step: &mut EngineStep,
    ) -> Result<(), EngineError> {
        let instrument = ctx.instrument.clone();

        for point in ctx.ltf_detector.push(*candle) {
            if ctx.ltf_swings.push(point) {
                step.push(EngineEvent::SwingConfirmed {
                    instrument: instrument.clone(),
                    timeframe: self.config.ltf,
                    point,
                });
            }
        }

        let mut armed_now = false;
        let bias = ctx.bias.bias;
        for outcome in ctx.sweeps.on_candle(candle, bias, &ctx.ltf_swings) {
            let event = match outcome {
                SweepOutcome::Detected(sweep) => {
                    ctx.record_sweep(sweep.clone());
                    EngineEvent::SweepDetected {
                        instrument: instrument.clone(),
                        sweep,
                    }
                }
                SweepOutcome::Confirmed(sweep) => {
                    ctx.record_sweep(sweep.clone());
                    if ctx.fvg.arm(sweep.id, sweep.direction, *candle) {
                        armed_now = true;
                        info!(
                            instrument = %instrument,
                            id = %sweep.id,
                            direction = %sweep.direction,
                            level = sweep.swept_point.price,
                            penetration = sweep.penetration(),
                            "Sweep confirmed, scanning for FVG"
                        );
                    } else {
                        debug!(instrument = %instrument, id = %sweep.id, "FVG scan already running, sweep not armed");
                    }
                    EngineEvent::SweepConfirmed {
                        instrument: instrument.clone(),
                        sweep,
                    }
                }
                SweepOutcome::Expired(sweep) => {
                    ctx.record_sweep(sweep.clone());
                    EngineEvent::SweepExpired {
                        instrument: instrument.clone(),
                        sweep,
                    }
                }
                SweepOutcome::Recorded(sweep) => {
                    ctx.record_sweep(sweep.clone());
                    EngineEvent::SweepRecorded {
                        instrument: instrument.clone(),
                        sweep,
                    }
                }
            };
            step.push(event);
        }

        let mut created_now = false;
        if !armed_now {
            for outcome in ctx.fvg.on_candle(candle) {
                match outcome {
                    FvgOutcome::Detected(fvg) => {
                        step.push(EngineEvent::FvgDetected {
                            instrument: instrument.clone(),
                            fvg,
                        });
                        let extreme = ctx
                            .sweep(fvg.origin_sweep)
                            .map(|s| s.extreme)
                            .ok_or_else(|| EngineError::InvariantViolation {
                                instrument: instrument.clone(),
                                detail: format!("{} references unknown {}", fvg.id, fvg.origin_sweep),
                            })?;
                        let position_open = ctx.positions.is_open();
                        match ctx.setups.offer(fvg, extreme, position_open) {
                            SetupOutcome::Created(setup) => {
                                created_now = true;
                                step.push(EngineEvent::SetupCreated {
                                    instrument: instrument.clone(),
                                    setup,
                                });
                            }
                            SetupOutcome::Ignored { fvg, reason } => {
                                debug!(instrument = %instrument, id = %fvg.id, ?reason, "FVG ignored");
                                step.push(EngineEvent::FvgIgnored {
                                    instrument: instrument.clone(),
                                    fvg,
                                    reason,
                                });
                            }
                            other => {
                                return Err(EngineError::InvariantViolation {
                                    instrument: instrument.clone(),
                                    detail: format!("unexpected offer outcome {:?}", other),
                                })
                            }
                        }
                    }
                    FvgOutcome::Rejected {
                        origin_sweep,
                        direction,
                        reason,
                        time,
                    } => step.push(EngineEvent::FvgRejected {
                        instrument: instrument.clone(),
                        origin_sweep,
                        direction,
                        reason,
                        time,
                    }),
                    FvgOutcome::Expired { origin_sweep, time } => {
                        step.push(EngineEvent::FvgScanExpired {
                            instrument: instrument.clone(),
                            origin_sweep,
                            time,
                        })
                    }
                }
            }
        }

        let mut opened_now = false;
        if !created_now {
            if let Some(outcome) = ctx.setups.evaluate(candle) {
                opened_now = self.apply_setup_outcome(ctx, candle, outcome, account, step)?;
            }
        }

        if !opened_now {
            for update in ctx.positions.update(candle) {
                match update {
                    PositionUpdate::TrailingAdvanced {
                        previous,
                        trailing_stop,
                        time,
                    } => step.push(EngineEvent::TrailingStopAdvanced {
                        instrument: instrument.clone(),
                        previous,
                        trailing_stop,
                        time,
                    }),
                    PositionUpdate::Closed(closed) => step.push(EngineEvent::PositionClosed {
                        instrument: instrument.clone(),
                        closed,
                    }),
                }
            }
        }

        Ok(())
    }

    /// Returns whether a position was opened.
    fn apply_setup_outcome(
        &self,
        ctx: &mut InstrumentContext,
        candle: &Candle,
        outcome: SetupOutcome,
        account: &dyn AccountProvider,
        step: &mut EngineStep,
    ) -> Result<bool, EngineError> {
        let instrument = ctx.instrument.clone();
        let time = candle.open_time;
        match outcome {
            SetupOutcome::Entered { setup, entry_price } => {
                step.push(EngineEvent::SetupEntered {
                    instrument: instrument.clone(),
                    setup: setup.clone(),
                    entry_price,
                    time,
                });
                self.open_position(ctx, &setup, entry_price, time, account, step)
            }
            SetupOutcome::Invalidated(setup) => {
                step.push(EngineEvent::SetupInvalidated {
                    instrument,
                    setup,
                    time,
                });
                Ok(false)
            }
            SetupOutcome::Expired(setup) => {
                debug!(instrument = %instrument, id = %setup.id, "Setup expired");
                step.push(EngineEvent::SetupExpired {
                    instrument,
                    setup,
                    time,
                });
                Ok(false)
            }
            other => Err(EngineError::InvariantViolation {
                instrument,
                detail: format!("unexpected evaluation outcome {:?}", other),
            }),
        }
    }

    fn open_position(
        &self,
        ctx: &mut InstrumentContext,
        setup: &TradeSetup,
        entry_price: f64,
        time: i64,
        account: &dyn AccountProvider,
        step: &mut EngineStep,
    ) -> Result<bool, EngineError> {
        let instrument = ctx.instrument.clone();
        let rejected = |reason: String| EngineEvent::EntryRejected {
            instrument: instrument.clone(),
            setup_id: setup.id,
            reason,
            time,
        };

        let snapshot = match account.snapshot(&instrument) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(instrument = %instrument, id = %setup.id, error = %e, "Account snapshot unavailable, entry rejected");
                step.push(rejected(e.to_string()));
                return Ok(false);
            }
        };

        match ctx.positions.open(setup, entry_price, time, &snapshot) {
            Ok(position) => {
                step.push(EngineEvent::PositionOpened {
                    instrument: instrument.clone(),
                    position,
                });
                Ok(true)
            }
            Err(EngineError::EntryRejected { reason, .. }) => {
                warn!(instrument = %instrument, id = %setup.id, %reason, "Entry rejected");
                step.push(rejected(reason));
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Apply a control command between candles.
    ///
    /// `Reset` is always accepted, including on a faulted context.
    pub fn apply_command(
        &self,
        ctx: &mut InstrumentContext,
        command: EngineCommand,
    ) -> Result<EngineStep, EngineError> {
        let mut step = EngineStep::default();
        let instrument = ctx.instrument.clone();

        match command {
            EngineCommand::Reset => {
                ctx.reset();
                info!(instrument = %instrument, "Context reset");
                step.push(EngineEvent::Reset { instrument });
            }
            EngineCommand::ClosePosition { price, time } => {
                ctx.ensure_active()?;
                match ctx.positions.close_manual(price, time) {
                    Some(closed) => step.push(EngineEvent::PositionClosed { instrument, closed }),
                    None => debug!(instrument = %instrument, "Close requested while flat"),
                }
            }
            EngineCommand::CancelSetup { time } => {
                ctx.ensure_active()?;
                if let Some(setup) = ctx.setups.cancel() {
                    info!(instrument = %instrument, id = %setup.id, "Setup cancelled");
                    step.push(EngineEvent::SetupCancelled {
                        instrument,
                        setup_id: setup.id,
                        time,
                    });
                }
            }
        }

        Ok(step)
    }
}

fn feed_gap(ctx: &InstrumentContext, timeframe: Timeframe, expected: i64, actual: i64) -> EngineEvent {
    warn!(instrument = %ctx.instrument, %timeframe, expected, actual, "Feed gap");
    EngineEvent::FeedGap {
        instrument: ctx.instrument.clone(),
        timeframe,
        expected,
        actual,
    }
}
