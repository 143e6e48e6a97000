//! ICT engine CLI application.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use cli::{Cli, Commands};
use ict_config::load_config;
use ict_monitor::setup_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Failed to load configuration from the environment".to_string(),
    })?;

    // CLI flags win over the configuration file
    let level = cli
        .log_level
        .map(|l| l.as_str())
        .unwrap_or(config.logging.level.as_str());
    let log_dir = cli
        .log_dir
        .clone()
        .or_else(|| config.logging.dir.as_ref().map(PathBuf::from));
    let _guard = setup_logging(level, cli.json_logs || config.logging.is_json(), log_dir.as_deref());

    match cli.command {
        Commands::Backtest(args) => cli::commands::backtest::run(args, &config).await,
        Commands::Paper(args) => cli::commands::paper::run(args, &config).await,
        Commands::ValidateConfig => cli::commands::config::validate(&config, cli.config.as_deref()).await,
        Commands::ShowConfig(args) => cli::commands::config::show(&config, args).await,
    }
}
