//! Logging setup and observability sinks for engine events.

mod journal;
mod logging;
mod sink;

pub use journal::EventJournal;
pub use logging::setup_logging;
pub use sink::{FanoutSink, TracingEventSink};
