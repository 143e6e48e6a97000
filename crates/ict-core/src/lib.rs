//! Core types and traits for the ICT engine.
//!
//! This crate provides the foundational building blocks including:
//! - Market data types (Candle, Timeframe)
//! - Market structure types (swing points, bias, sweeps, fair value gaps, setups)
//! - Position, execution intent and engine event types
//! - Collaborator traits for candle feeds, account providers, execution and observability sinks

pub mod types;
pub mod traits;
pub mod error;

pub use error::{IctError, IctResult};
pub use types::*;
pub use traits::*;
