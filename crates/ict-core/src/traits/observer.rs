//! Observability sink trait.

use crate::types::EngineEvent;

/// Receives every event the engine emits.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &EngineEvent);
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _event: &EngineEvent) {}
}
