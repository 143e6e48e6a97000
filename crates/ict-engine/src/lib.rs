//! ICT engine: per-instrument context, candle pipeline and worker runtime.
//!
//! Each instrument owns an [`InstrumentContext`]. [`IctEngine`] drives a
//! context one closed candle at a time and returns the events and execution
//! intents the candle produced. [`EngineRuntime`] runs one worker task per
//! instrument so contexts never share mutable state.

pub mod command;
pub mod config;
pub mod context;
pub mod pipeline;
pub mod runtime;

pub use command::EngineCommand;
pub use config::EngineConfig;
pub use context::InstrumentContext;
pub use pipeline::{EngineStep, IctEngine};
pub use runtime::{EngineRuntime, InstrumentWorker, WorkerMessage};
