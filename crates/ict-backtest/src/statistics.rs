//! Backtest statistics.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use ict_core::types::{ClosedPosition, Direction, ExitReason};

/// Record of a single round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub instrument: String,
    pub direction: Direction,
    pub size: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub opened_at: i64,
    pub closed_at: i64,
    pub exit_reason: ExitReason,
    /// Net of commission
    pub pnl: Decimal,
    pub r_multiple: f64,
}

impl TradeRecord {
    /// Build a record from the engine's closed position and the account's
    /// net PnL for it.
    pub fn new(closed: &ClosedPosition, net_pnl: Option<Decimal>) -> Self {
        let pnl = net_pnl
            .or_else(|| Decimal::from_f64(closed.realized_pnl))
            .unwrap_or(Decimal::ZERO);
        Self {
            instrument: closed.position.instrument.clone(),
            direction: closed.position.direction,
            size: closed.position.size,
            entry_price: closed.position.entry_price,
            exit_price: closed.exit_price,
            opened_at: closed.position.opened_at,
            closed_at: closed.closed_at,
            exit_reason: closed.exit_reason,
            pnl,
            r_multiple: closed.r_multiple(),
        }
    }
}

/// Backtest statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestStats {
    pub initial_balance: Decimal,
    pub final_balance: Decimal,
    pub total_return_pct: Decimal,
    /// Largest peak-to-trough fall of the equity curve
    pub max_drawdown_pct: Decimal,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub breakeven_trades: usize,
    pub win_rate_pct: Decimal,
    pub avg_win: Decimal,
    pub avg_loss: Decimal,
    /// Gross profit / gross loss, zero when there are no losses
    pub profit_factor: Decimal,
    /// Mean R multiple per trade
    pub expectancy_r: f64,
    pub candles_processed: usize,
    /// Candles the engine refused as malformed or out of order
    pub candles_rejected: usize,
    pub exits: BTreeMap<String, usize>,
    pub event_counts: BTreeMap<String, usize>,
    pub equity_curve: Vec<(i64, Decimal)>,
    pub trades: Vec<TradeRecord>,
    #[serde(skip)]
    peak_equity: Decimal,
}

impl BacktestStats {
    pub fn new(initial_balance: Decimal) -> Self {
        Self {
            initial_balance,
            final_balance: initial_balance,
            total_return_pct: Decimal::ZERO,
            max_drawdown_pct: Decimal::ZERO,
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            breakeven_trades: 0,
            win_rate_pct: Decimal::ZERO,
            avg_win: Decimal::ZERO,
            avg_loss: Decimal::ZERO,
            profit_factor: Decimal::ZERO,
            expectancy_r: 0.0,
            candles_processed: 0,
            candles_rejected: 0,
            exits: BTreeMap::new(),
            event_counts: BTreeMap::new(),
            equity_curve: Vec::new(),
            trades: Vec::new(),
            peak_equity: initial_balance,
        }
    }

    /// Record equity at a timestamp.
    pub fn record_equity(&mut self, timestamp: i64, equity: Decimal) {
        self.equity_curve.push((timestamp, equity));

        if equity > self.peak_equity {
            self.peak_equity = equity;
        }
        if self.peak_equity > Decimal::ZERO {
            let drawdown = (self.peak_equity - equity) / self.peak_equity * Decimal::ONE_HUNDRED;
            if drawdown > self.max_drawdown_pct {
                self.max_drawdown_pct = drawdown;
            }
        }
    }

    pub fn add_trade(&mut self, trade: TradeRecord) {
        *self.exits.entry(trade.exit_reason.to_string()).or_insert(0) += 1;
        self.trades.push(trade);
        self.total_trades += 1;
    }

    pub fn count_event(&mut self, kind: &str) {
        *self.event_counts.entry(kind.to_string()).or_insert(0) += 1;
    }

    /// Fold another run's event and candle counts into this one.
    pub fn merge_counts(&mut self, other: &BacktestStats) {
        for (kind, count) in &other.event_counts {
            *self.event_counts.entry(kind.clone()).or_insert(0) += count;
        }
        self.candles_processed += other.candles_processed;
        self.candles_rejected += other.candles_rejected;
    }

    /// Calculate final statistics.
    pub fn finalize(&mut self, final_balance: Decimal) {
        self.final_balance = final_balance;

        if self.initial_balance > Decimal::ZERO {
            self.total_return_pct = (self.final_balance - self.initial_balance)
                / self.initial_balance
                * Decimal::ONE_HUNDRED;
        }

        let mut gross_profit = Decimal::ZERO;
        let mut gross_loss = Decimal::ZERO;
        self.winning_trades = 0;
        self.losing_trades = 0;
        self.breakeven_trades = 0;

        for trade in &self.trades {
            if trade.pnl > Decimal::ZERO {
                self.winning_trades += 1;
                gross_profit += trade.pnl;
            } else if trade.pnl < Decimal::ZERO {
                self.losing_trades += 1;
                gross_loss += trade.pnl.abs();
            } else {
                self.breakeven_trades += 1;
            }
        }

        if self.total_trades > 0 {
            self.win_rate_pct = Decimal::from(self.winning_trades * 100) / Decimal::from(self.total_trades);
            self.expectancy_r =
                self.trades.iter().map(|t| t.r_multiple).sum::<f64>() / self.total_trades as f64;
        }
        if self.winning_trades > 0 {
            self.avg_win = gross_profit / Decimal::from(self.winning_trades);
        }
        if self.losing_trades > 0 {
            self.avg_loss = gross_loss / Decimal::from(self.losing_trades);
        }
        if gross_loss > Decimal::ZERO {
            self.profit_factor = gross_profit / gross_loss;
        }
    }
}
