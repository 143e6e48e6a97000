//! Error types for the ICT engine.

use thiserror::Error;

use crate::types::Timeframe;

/// Top-level error.
#[derive(Error, Debug)]
pub enum IctError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Indicator error: {0}")]
    Indicator(#[from] IndicatorError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors surfaced by the per-instrument engine.
///
/// Input errors (`OutOfOrderCandle`, `MalformedCandle`) are fatal for the call
/// that produced them and leave the instrument state untouched. An
/// `InvariantViolation` faults the instrument until it is reset.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Out-of-order {timeframe} candle for {instrument}: open_time {received} is not after {previous}")]
    OutOfOrderCandle {
        instrument: String,
        timeframe: Timeframe,
        previous: i64,
        received: i64,
    },

    #[error("Malformed {timeframe} candle for {instrument} at {open_time}: {reason}")]
    MalformedCandle {
        instrument: String,
        timeframe: Timeframe,
        open_time: i64,
        reason: String,
    },

    #[error("Invariant violation for {instrument}: {detail}")]
    InvariantViolation { instrument: String, detail: String },

    #[error("Entry rejected for {instrument}: {reason}")]
    EntryRejected { instrument: String, reason: String },

    #[error("Instrument {instrument} is faulted and must be reset before further input")]
    Faulted { instrument: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("Worker for {0} is no longer running")]
    WorkerStopped(String),
}

/// Errors raised by execution sinks and account providers.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Position not found: {0}")]
    PositionNotFound(String),

    #[error("Position already open: {0}")]
    PositionAlreadyOpen(String),

    #[error("Intent rejected: {0}")]
    Rejected(String),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: rust_decimal::Decimal,
        available: rust_decimal::Decimal,
    },

    #[error("Execution sink error: {0}")]
    Internal(String),
}

/// Candle feed errors.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Instrument not found: {0}")]
    InstrumentNotFound(String),

    #[error("No data available for the requested range")]
    NoDataAvailable,

    #[error("Invalid timeframe: {0}")]
    InvalidTimeframe(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Feed closed: {0}")]
    FeedClosed(String),

    #[error("Data source error: {0}")]
    Internal(String),
}

/// Indicator calculation errors.
#[derive(Error, Debug)]
pub enum IndicatorError {
    #[error("Insufficient data: need {required} points, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type alias for engine operations.
pub type IctResult<T> = Result<T, IctError>;
