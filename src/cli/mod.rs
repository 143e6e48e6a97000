//! CLI definitions.

pub mod commands;
pub mod data;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ict")]
#[command(author, version, about = "ICT liquidity-sweep / fair-value-gap signal and position engine")]
pub struct Cli {
    /// Configuration file path (TOML). Environment variables prefixed with
    /// `ICT__` override it.
    #[arg(short, long, env = "ICT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level, overrides the configuration file
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    /// Also write daily-rolling JSON logs into this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay CSV history through the engine and report trade statistics
    Backtest(BacktestArgs),
    /// Stream CSV candles through the per-instrument runtime against a paper account
    Paper(PaperArgs),
    /// Load and validate the configuration
    ValidateConfig,
    /// Print the configuration as TOML
    ShowConfig(ShowConfigArgs),
}

#[derive(Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(clap::Args)]
pub struct BacktestArgs {
    /// Instruments to replay (comma-separated)
    #[arg(short = 'S', long, value_delimiter = ',', required = true)]
    pub instruments: Vec<String>,

    /// Directory holding `{instrument}_{timeframe}.csv` files
    #[arg(short, long)]
    pub data: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Save the JSON report to a file
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Save the combined equity curve as CSV
    #[arg(long)]
    pub equity_csv: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct PaperArgs {
    /// Instruments to stream (comma-separated)
    #[arg(short = 'S', long, value_delimiter = ',', required = true)]
    pub instruments: Vec<String>,

    /// Directory holding `{instrument}_{timeframe}.csv` files
    #[arg(short, long)]
    pub data: PathBuf,

    /// Pause between replayed candles in milliseconds
    #[arg(long)]
    pub replay_delay_ms: Option<u64>,

    /// Write every engine event as JSON lines to this file
    #[arg(long)]
    pub events: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct ShowConfigArgs {
    /// Show the loaded configuration instead of the built-in defaults
    #[arg(long)]
    pub resolved: bool,
}
