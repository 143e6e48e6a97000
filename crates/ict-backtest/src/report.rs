//! Backtest report generation.

use serde::{Deserialize, Serialize};

use ict_engine::EngineConfig;

use crate::{BacktestConfig, BacktestStats};

/// Result of replaying one instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentReport {
    pub instrument: String,
    pub stats: BacktestStats,
    /// Set when the replay stopped on an invariant violation
    pub fault: Option<String>,
}

/// Complete backtest report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub config: BacktestConfig,
    pub engine: EngineConfig,
    /// Sorted by instrument
    pub instruments: Vec<InstrumentReport>,
    pub total: BacktestStats,
}

impl BacktestReport {
    /// Generate a text summary.
    pub fn summary(&self) -> String {
        let stats = &self.total;
        let mut s = String::new();

        s.push_str("═══════════════════════════════════════════════════════════\n");
        s.push_str("                     BACKTEST REPORT                        \n");
        s.push_str("═══════════════════════════════════════════════════════════\n\n");

        s.push_str(&format!(
            "  Timeframes:          {} / {}\n\n",
            self.engine.htf, self.engine.ltf
        ));

        s.push_str("PERFORMANCE\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Initial Balance:     ${:.2}\n", stats.initial_balance));
        s.push_str(&format!("  Final Balance:       ${:.2}\n", stats.final_balance));
        s.push_str(&format!("  Total Return:        {:.2}%\n", stats.total_return_pct));
        s.push_str(&format!("  Max Drawdown:        {:.2}%\n", stats.max_drawdown_pct));
        s.push_str(&format!("  Profit Factor:       {:.2}\n", stats.profit_factor));
        s.push_str(&format!("  Expectancy:          {:.2}R\n", stats.expectancy_r));
        s.push('\n');

        s.push_str("TRADE STATISTICS\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Total Trades:        {}\n", stats.total_trades));
        s.push_str(&format!("  Winning Trades:      {}\n", stats.winning_trades));
        s.push_str(&format!("  Losing Trades:       {}\n", stats.losing_trades));
        s.push_str(&format!("  Breakeven Trades:    {}\n", stats.breakeven_trades));
        s.push_str(&format!("  Win Rate:            {:.2}%\n", stats.win_rate_pct));
        s.push_str(&format!("  Avg Win:             ${:.2}\n", stats.avg_win));
        s.push_str(&format!("  Avg Loss:            ${:.2}\n", stats.avg_loss));
        for (reason, count) in &stats.exits {
            s.push_str(&format!("  {:<21}{}\n", format!("{}:", reason), count));
        }
        s.push('\n');

        if !self.instruments.is_empty() {
            s.push_str("INSTRUMENTS\n");
            s.push_str("───────────────────────────────────────────────────────────\n");
            for report in &self.instruments {
                s.push_str(&format!(
                    "  {:<12} trades {:>4}   pnl ${:>10.2}   dd {:>6.2}%{}\n",
                    report.instrument,
                    report.stats.total_trades,
                    report.stats.final_balance - report.stats.initial_balance,
                    report.stats.max_drawdown_pct,
                    if report.fault.is_some() { "   FAULTED" } else { "" }
                ));
            }
            s.push('\n');
        }

        s.push_str("EVENTS\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Candles Processed:   {}\n", stats.candles_processed));
        s.push_str(&format!("  Candles Rejected:    {}\n", stats.candles_rejected));
        for (kind, count) in &stats.event_counts {
            s.push_str(&format!("  {:<21}{}\n", format!("{}:", kind), count));
        }
        s.push('\n');

        s.push_str("═══════════════════════════════════════════════════════════\n");

        s
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export the combined equity curve as CSV.
    pub fn equity_to_csv(&self) -> String {
        let mut csv = String::from("timestamp,equity\n");
        for (ts, equity) in &self.total.equity_curve {
            csv.push_str(&format!("{},{}\n", ts, equity));
        }
        csv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn report() -> BacktestReport {
        let mut stats = BacktestStats::new(dec!(10000));
        stats.final_balance = dec!(11000);
        stats.total_return_pct = dec!(10);
        stats.total_trades = 4;
        stats.count_event("position_opened");
        stats.record_equity(900_000, dec!(11000));

        BacktestReport {
            config: BacktestConfig::default(),
            engine: EngineConfig::default(),
            instruments: vec![InstrumentReport {
                instrument: "BTCUSDT".to_string(),
                stats: stats.clone(),
                fault: None,
            }],
            total: stats,
        }
    }

    #[test]
    fn test_report_summary() {
        let summary = report().summary();
        assert!(summary.contains("Total Return"));
        assert!(summary.contains("10.00%"));
        assert!(summary.contains("4h / 15m"));
        assert!(summary.contains("position_opened:"));
        assert!(summary.contains("BTCUSDT"));
    }

    #[test]
    fn test_json_export() {
        let json: serde_json::Value = serde_json::from_str(&report().to_json().unwrap()).unwrap();
        assert_eq!(json["total"]["total_trades"], 4);
        assert_eq!(json["engine"]["ltf"], "15m");
        assert_eq!(json["instruments"][0]["instrument"], "BTCUSDT");
    }

    #[test]
    fn test_equity_csv() {
        assert_eq!(report().equity_to_csv(), "timestamp,equity\n900000,11000\n");
    }
}
