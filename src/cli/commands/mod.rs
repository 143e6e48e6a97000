//! CLI command implementations.

pub mod backtest;
pub mod config;
pub mod paper;
