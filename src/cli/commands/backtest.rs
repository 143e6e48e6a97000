//! Backtest command implementation.

use anyhow::{Context, Result};
use std::collections::HashMap;
use tracing::info;

use ict_backtest::{BacktestConfig, BacktestEngine, InstrumentData};
use ict_config::AppConfig;

use crate::cli::data::{csv_source, preflight};
use crate::cli::{BacktestArgs, OutputFormat};

pub async fn run(args: BacktestArgs, config: &AppConfig) -> Result<()> {
    config.validate().context("Invalid configuration")?;
    let engine_config = config.engine.clone();
    let (htf, ltf) = (engine_config.htf, engine_config.ltf);
    info!(instruments = ?args.instruments, %htf, %ltf, "Starting backtest");

    let source = csv_source(&args.data, &args.instruments, [htf, ltf])?;
    let mut data = HashMap::new();
    for instrument in &args.instruments {
        preflight(&source, instrument, htf)?;
        preflight(&source, instrument, ltf)?;
        data.insert(
            instrument.clone(),
            InstrumentData {
                htf: source.load(instrument, htf)?,
                ltf: source.load(instrument, ltf)?,
            },
        );
    }

    let backtest_config = BacktestConfig {
        initial_balance: config.account.initial_balance,
        risk_per_trade: config.account.risk_per_trade,
        commission: config.backtest.commission,
        slippage_pct: config.backtest.slippage_pct,
        drawdown: config.account.drawdown,
    };
    let engine = BacktestEngine::new(engine_config, backtest_config)?;
    let report = engine.run(data).await?;

    match args.output {
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Text => println!("{}", report.summary()),
    }

    if let Some(path) = &args.save {
        std::fs::write(path, report.to_json()?)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "Report saved");
    }
    if let Some(path) = &args.equity_csv {
        std::fs::write(path, report.equity_to_csv())
            .with_context(|| format!("Failed to write equity curve to {}", path.display()))?;
        info!(path = %path.display(), "Equity curve saved");
    }

    Ok(())
}
