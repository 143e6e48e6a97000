//! Paper streaming command implementation.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use ict_broker::{DrawdownScaledAccount, PaperAccount};
use ict_config::AppConfig;
use ict_core::traits::{AccountProvider, CandleFeed};
use ict_core::types::{Candle, Timeframe};
use ict_engine::{EngineRuntime, IctEngine, WorkerMessage};
use ict_monitor::{EventJournal, FanoutSink, TracingEventSink};

use crate::cli::data::csv_source;
use crate::cli::PaperArgs;

pub async fn run(args: PaperArgs, config: &AppConfig) -> Result<()> {
    config.validate().context("Invalid configuration")?;
    let engine = Arc::new(IctEngine::new(config.engine.clone())?);
    let (htf, ltf) = (engine.config().htf, engine.config().ltf);

    let delay = args.replay_delay_ms.unwrap_or(config.paper.replay_delay_ms);
    let mut source = csv_source(&args.data, &args.instruments, [htf, ltf])?;
    if delay > 0 {
        source = source.with_replay_delay(Duration::from_millis(delay));
    }

    let account = Arc::new(
        PaperAccount::new(config.account.initial_balance, config.account.risk_per_trade)
            .with_slippage(config.backtest.slippage_pct)
            .with_commission(config.backtest.commission),
    );
    let provider: Arc<dyn AccountProvider> = match config.account.drawdown {
        Some(drawdown) => {
            info!(max_drawdown = %drawdown.max_drawdown, "Drawdown-scaled risk enabled");
            Arc::new(DrawdownScaledAccount::new(PaperAccount::clone(&account), drawdown))
        }
        None => account.clone(),
    };
    let journal = Arc::new(EventJournal::new());
    let events = FanoutSink::new()
        .with(Arc::new(TracingEventSink))
        .with(journal.clone());

    let runtime = EngineRuntime::spawn(
        engine,
        &args.instruments,
        provider,
        account.clone(),
        Arc::new(events),
        config.paper.channel_capacity,
    );

    let htf_rx = source.subscribe(&args.instruments, htf).await?;
    let ltf_rx = source.subscribe(&args.instruments, ltf).await?;
    info!(instruments = ?args.instruments, %htf, %ltf, feed = source.name(), "Paper streaming started");

    tokio::select! {
        result = forward(&runtime, htf_rx, ltf_rx, htf, ltf) => result?,
        _ = tokio::signal::ctrl_c() => warn!("Interrupted, shutting down"),
    }

    let contexts = runtime.shutdown().await;
    for (instrument, ctx) in &contexts {
        if let Some(position) = ctx.positions().position() {
            info!(
                instrument = %instrument,
                direction = %position.direction,
                entry = position.entry_price,
                "Position still open"
            );
        }
        if let Some(fault) = ctx.fault() {
            warn!(instrument = %instrument, fault, "Instrument ended faulted");
        }
    }

    println!("Paper session finished");
    println!("  Balance:        {:.2}", account.balance());
    println!("  Realized PnL:   {:.2}", account.realized_pnl());
    println!("  Fills:          {}", account.fills().len());
    for (kind, count) in journal.counts() {
        println!("  {:<16}{}", format!("{}:", kind), count);
    }

    if let Some(path) = &args.events {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let written = journal.write_json_lines(std::io::BufWriter::new(file))?;
        info!(path = %path.display(), events = written, "Events saved");
    }

    Ok(())
}

/// Deliver both streams to the runtime, each HTF candle once it has closed
/// and ahead of the LTF candle closing at or after it.
async fn forward(
    runtime: &EngineRuntime,
    mut htf_rx: mpsc::Receiver<(String, Candle)>,
    mut ltf_rx: mpsc::Receiver<(String, Candle)>,
    htf: Timeframe,
    ltf: Timeframe,
) -> Result<()> {
    let mut pending = htf_rx.recv().await;

    while let Some((instrument, candle)) = ltf_rx.recv().await {
        let close = candle.close_time(ltf);
        while let Some((h_instrument, h_candle)) = pending.take() {
            if h_candle.close_time(htf) > close {
                pending = Some((h_instrument, h_candle));
                break;
            }
            runtime.send(&h_instrument, WorkerMessage::Htf(h_candle)).await?;
            pending = htf_rx.recv().await;
        }
        runtime.send(&instrument, WorkerMessage::Ltf(candle)).await?;
    }

    while let Some((instrument, candle)) = pending {
        runtime.send(&instrument, WorkerMessage::Htf(candle)).await?;
        pending = htf_rx.recv().await;
    }
    Ok(())
}
