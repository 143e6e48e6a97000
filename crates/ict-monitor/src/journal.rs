//! In-memory event journal.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};

use ict_core::error::IctError;
use ict_core::traits::EventSink;
use ict_core::types::EngineEvent;

/// Collects engine events for reports and JSON-lines export.
///
/// With a limit, the oldest events are dropped first. Counts always cover
/// every event seen.
#[derive(Debug, Default)]
pub struct EventJournal {
    events: Mutex<Vec<EngineEvent>>,
    counts: Mutex<BTreeMap<&'static str, usize>>,
    limit: Option<usize>,
}

impl EventJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit.max(1)),
            ..Self::default()
        }
    }

    fn events_guard(&self) -> MutexGuard<'_, Vec<EngineEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.events_guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        self.events_guard().clone()
    }

    /// Events for one instrument, in arrival order.
    pub fn events_for(&self, instrument: &str) -> Vec<EngineEvent> {
        self.events_guard()
            .iter()
            .filter(|e| e.instrument() == instrument)
            .cloned()
            .collect()
    }

    /// Number of events per kind.
    pub fn counts(&self) -> BTreeMap<&'static str, usize> {
        self.counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Write one JSON object per line.
    pub fn write_json_lines<W: Write>(&self, mut writer: W) -> Result<usize, IctError> {
        let events = self.events_guard();
        for event in events.iter() {
            serde_json::to_writer(&mut writer, event)
                .map_err(|e| IctError::Serialization(e.to_string()))?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(events.len())
    }
}

impl EventSink for EventJournal {
    fn emit(&self, event: &EngineEvent) {
        *self
            .counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event.kind())
            .or_insert(0) += 1;

        let mut events = self.events_guard();
        events.push(event.clone());
        if let Some(limit) = self.limit {
            if events.len() > limit {
                let excess = events.len() - limit;
                events.drain(..excess);
            }
        }
    }
}
