//! One worker task per instrument.
//!
//! Each worker owns its [`InstrumentContext`] and drains a bounded channel,
//! so candles for one instrument are processed strictly in arrival order
//! while instruments run independently of each other.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use ict_core::error::EngineError;
use ict_core::traits::{AccountProvider, EventSink, ExecutionSink};
use ict_core::types::{Candle, EngineEvent};

use crate::command::EngineCommand;
use crate::context::InstrumentContext;
use crate::pipeline::{EngineStep, IctEngine};

/// Input for a worker.
#[derive(Debug, Clone)]
pub enum WorkerMessage {
    Htf(Candle),
    Ltf(Candle),
    Command(EngineCommand),
    Shutdown,
}

/// Drives one instrument context from a channel.
pub struct InstrumentWorker {
    engine: Arc<IctEngine>,
    context: InstrumentContext,
    account: Arc<dyn AccountProvider>,
    execution: Arc<dyn ExecutionSink>,
    events: Arc<dyn EventSink>,
}

impl InstrumentWorker {
    pub fn new(
        engine: Arc<IctEngine>,
        instrument: impl Into<String>,
        account: Arc<dyn AccountProvider>,
        execution: Arc<dyn ExecutionSink>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let context = engine.context(instrument);
        Self {
            engine,
            context,
            account,
            execution,
            events,
        }
    }

    pub fn context(&self) -> &InstrumentContext {
        &self.context
    }

    /// Handle one message. Returns `false` on shutdown.
    pub async fn handle(&mut self, message: WorkerMessage) -> bool {
        let result = match message {
            WorkerMessage::Htf(candle) => self.engine.process_htf(&mut self.context, candle),
            WorkerMessage::Ltf(candle) => {
                self.engine
                    .process_ltf(&mut self.context, candle, self.account.as_ref())
            }
            WorkerMessage::Command(command) => self.engine.apply_command(&mut self.context, command),
            WorkerMessage::Shutdown => return false,
        };

        match result {
            Ok(step) => self.dispatch(step).await,
            Err(err) => self.report(err),
        }
        true
    }

    /// Process messages until shutdown or until every sender is dropped.
    pub async fn run(mut self, mut rx: mpsc::Receiver<WorkerMessage>) -> InstrumentContext {
        let instrument = self.context.instrument().to_string();
        info!(instrument = %instrument, "Instrument worker started");

        while let Some(message) = rx.recv().await {
            if !self.handle(message).await {
                break;
            }
        }

        info!(instrument = %instrument, "Instrument worker stopped");
        self.context
    }

    async fn dispatch(&self, step: EngineStep) {
        for event in &step.events {
            self.events.emit(event);
        }
        for intent in step.intents {
            let kind = intent.kind;
            if let Err(e) = self.execution.submit(intent).await {
                error!(
                    instrument = %self.context.instrument(),
                    sink = self.execution.name(),
                    ?kind,
                    error = %e,
                    "Execution intent failed"
                );
            }
        }
    }

    fn report(&self, err: EngineError) {
        let instrument = self.context.instrument().to_string();
        match err {
            EngineError::InvariantViolation { detail, .. } => {
                self.events.emit(&EngineEvent::Faulted { instrument, detail });
            }
            EngineError::Faulted { .. } => {
                debug!(instrument = %instrument, "Candle dropped on faulted instrument");
            }
            other => {
                warn!(instrument = %instrument, error = %other, "Input rejected");
            }
        }
    }
}

/// Routes messages to per-instrument workers.
pub struct EngineRuntime {
    senders: HashMap<String, mpsc::Sender<WorkerMessage>>,
    handles: Vec<(String, JoinHandle<InstrumentContext>)>,
}

impl EngineRuntime {
    /// Spawn one worker per instrument. Must be called inside a tokio runtime.
    pub fn spawn(
        engine: Arc<IctEngine>,
        instruments: &[String],
        account: Arc<dyn AccountProvider>,
        execution: Arc<dyn ExecutionSink>,
        events: Arc<dyn EventSink>,
        channel_capacity: usize,
    ) -> Self {
        let mut senders = HashMap::new();
        let mut handles = Vec::new();

        for instrument in instruments {
            if senders.contains_key(instrument) {
                continue;
            }
            let (tx, rx) = mpsc::channel(channel_capacity.max(1));
            let worker = InstrumentWorker::new(
                Arc::clone(&engine),
                instrument.clone(),
                Arc::clone(&account),
                Arc::clone(&execution),
                Arc::clone(&events),
            );
            handles.push((instrument.clone(), tokio::spawn(worker.run(rx))));
            senders.insert(instrument.clone(), tx);
        }

        info!(workers = senders.len(), "Engine runtime started");
        Self { senders, handles }
    }

    pub fn instruments(&self) -> impl Iterator<Item = &str> {
        self.senders.keys().map(String::as_str)
    }

    pub async fn send(&self, instrument: &str, message: WorkerMessage) -> Result<(), EngineError> {
        let sender = self
            .senders
            .get(instrument)
            .ok_or_else(|| EngineError::UnknownInstrument(instrument.to_string()))?;
        sender
            .send(message)
            .await
            .map_err(|_| EngineError::WorkerStopped(instrument.to_string()))
    }

    /// Stop every worker and collect the final contexts.
    pub async fn shutdown(self) -> HashMap<String, InstrumentContext> {
        for (instrument, sender) in &self.senders {
            if sender.send(WorkerMessage::Shutdown).await.is_err() {
                debug!(instrument = %instrument, "Worker already stopped");
            }
        }
        drop(self.senders);

        let mut contexts = HashMap::new();
        for (instrument, handle) in self.handles {
            match handle.await {
                Ok(context) => {
                    contexts.insert(instrument, context);
                }
                Err(e) => error!(instrument = %instrument, error = %e, "Instrument worker panicked"),
            }
        }
        contexts
    }
}
