//! Paper account for backtesting and simulation.

use async_trait::async_trait;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};
use uuid::Uuid;

use ict_core::error::ExecutionError;
use ict_core::traits::{AccountProvider, AccountSnapshot, ExecutionSink};
use ict_core::types::{Direction, ExecutionIntent, ExitReason, IntentKind};

/// One simulated execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperFill {
    pub id: Uuid,
    pub instrument: String,
    pub kind: IntentKind,
    pub direction: Direction,
    pub size: Decimal,
    pub price: Decimal,
    pub commission: Decimal,
    /// Set on closing fills, net of commission on both legs
    pub realized_pnl: Option<Decimal>,
    pub exit_reason: Option<ExitReason>,
    pub time: i64,
}

#[derive(Debug)]
struct AccountState {
    balance: Decimal,
    open: HashMap<String, PaperFill>,
    fills: Vec<PaperFill>,
}

/// Simulated account shared by every instrument of a run.
///
/// Provides balance snapshots to the engine and applies execution intents.
/// Cloning shares the underlying state.
#[derive(Debug, Clone)]
pub struct PaperAccount {
    state: Arc<Mutex<AccountState>>,
    initial_balance: Decimal,
    risk_per_trade: Decimal,
    slippage_pct: Decimal,
    commission_per_unit: Decimal,
}

impl PaperAccount {
    pub fn new(initial_balance: Decimal, risk_per_trade: Decimal) -> Self {
        Self {
            state: Arc::new(Mutex::new(AccountState {
                balance: initial_balance,
                open: HashMap::new(),
                fills: Vec::new(),
            })),
            initial_balance,
            risk_per_trade,
            slippage_pct: Decimal::ZERO,
            commission_per_unit: Decimal::ZERO,
        }
    }

    /// Adverse slippage in percent of the intent price.
    pub fn with_slippage(mut self, slippage_pct: Decimal) -> Self {
        self.slippage_pct = slippage_pct;
        self
    }

    /// Commission per unit of size, charged on each leg.
    pub fn with_commission(mut self, commission_per_unit: Decimal) -> Self {
        self.commission_per_unit = commission_per_unit;
        self
    }

    fn lock(&self) -> MutexGuard<'_, AccountState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn initial_balance(&self) -> Decimal {
        self.initial_balance
    }

    pub fn balance(&self) -> Decimal {
        self.lock().balance
    }

    pub fn fills(&self) -> Vec<PaperFill> {
        self.lock().fills.clone()
    }

    pub fn open_instruments(&self) -> Vec<String> {
        let mut instruments: Vec<String> = self.lock().open.keys().cloned().collect();
        instruments.sort();
        instruments
    }

    /// Apply an intent and return the resulting fill.
    pub fn apply(&self, intent: &ExecutionIntent) -> Result<PaperFill, ExecutionError> {
        let size = to_decimal(intent.size, "size")?;
        let price = to_decimal(intent.price, "price")?;
        if size <= Decimal::ZERO {
            return Err(ExecutionError::Rejected(format!(
                "non-positive size {} for {}",
                size, intent.instrument
            )));
        }

        let fill_price = self.slipped(price, intent.direction, intent.kind);
        let commission = self.commission_per_unit * size;
        let mut state = self.lock();

        match intent.kind {
            IntentKind::Open => {
                if state.open.contains_key(&intent.instrument) {
                    return Err(ExecutionError::PositionAlreadyOpen(intent.instrument.clone()));
                }
                if commission > state.balance {
                    return Err(ExecutionError::InsufficientFunds {
                        required: commission,
                        available: state.balance,
                    });
                }

                let fill = PaperFill {
                    id: Uuid::new_v4(),
                    instrument: intent.instrument.clone(),
                    kind: IntentKind::Open,
                    direction: intent.direction,
                    size,
                    price: fill_price,
                    commission,
                    realized_pnl: None,
                    exit_reason: None,
                    time: intent.time,
                };
                state.balance -= commission;
                state.open.insert(intent.instrument.clone(), fill.clone());
                state.fills.push(fill.clone());
                debug!(instrument = %fill.instrument, id = %fill.id, price = %fill.price, size = %fill.size, "Paper entry filled");
                Ok(fill)
            }
            IntentKind::Close => {
                let entry = state
                    .open
                    .remove(&intent.instrument)
                    .ok_or_else(|| ExecutionError::PositionNotFound(intent.instrument.clone()))?;

                let gross = match entry.direction {
                    Direction::Bullish => (fill_price - entry.price) * entry.size,
                    Direction::Bearish => (entry.price - fill_price) * entry.size,
                };
                let pnl = gross - commission - entry.commission;

                let fill = PaperFill {
                    id: Uuid::new_v4(),
                    instrument: intent.instrument.clone(),
                    kind: IntentKind::Close,
                    direction: entry.direction,
                    size: entry.size,
                    price: fill_price,
                    commission,
                    realized_pnl: Some(pnl),
                    exit_reason: intent.exit_reason,
                    time: intent.time,
                };
                // Entry commission was already charged
                state.balance += gross - commission;
                state.fills.push(fill.clone());
                info!(
                    instrument = %fill.instrument,
                    id = %fill.id,
                    price = %fill.price,
                    pnl = %pnl,
                    balance = %state.balance,
                    "Paper exit filled"
                );
                Ok(fill)
            }
        }
    }

    /// Entries and exits both slip against the trade.
    fn slipped(&self, price: Decimal, direction: Direction, kind: IntentKind) -> Decimal {
        let slip = self.slippage_pct / Decimal::ONE_HUNDRED;
        let buying = matches!(
            (direction, kind),
            (Direction::Bullish, IntentKind::Open) | (Direction::Bearish, IntentKind::Close)
        );
        if buying {
            price * (Decimal::ONE + slip)
        } else {
            price * (Decimal::ONE - slip)
        }
    }

    /// Realized PnL over all closing fills as `f64`.
    pub fn realized_pnl(&self) -> f64 {
        self.lock()
            .fills
            .iter()
            .filter_map(|f| f.realized_pnl)
            .sum::<Decimal>()
            .to_f64()
            .unwrap_or(0.0)
    }
}

fn to_decimal(value: f64, field: &str) -> Result<Decimal, ExecutionError> {
    Decimal::from_f64(value)
        .ok_or_else(|| ExecutionError::Rejected(format!("{} {} is not representable", field, value)))
}

impl AccountProvider for PaperAccount {
    fn snapshot(&self, _instrument: &str) -> Result<AccountSnapshot, ExecutionError> {
        Ok(AccountSnapshot {
            balance: self.balance(),
            risk_per_trade: self.risk_per_trade,
        })
    }
}

#[async_trait]
impl ExecutionSink for PaperAccount {
    async fn submit(&self, intent: ExecutionIntent) -> Result<(), ExecutionError> {
        self.apply(&intent).map(|_| ())
    }

    fn name(&self) -> &str {
        "paper"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn intent(kind: IntentKind, direction: Direction, price: f64) -> ExecutionIntent {
        ExecutionIntent {
            instrument: "BTCUSDT".to_string(),
            kind,
            direction,
            size: 50.0,
            price,
            stop: 99.0,
            target: 105.0,
            exit_reason: (kind == IntentKind::Close).then_some(ExitReason::TakeProfit),
            time: 0,
        }
    }

    #[tokio::test]
    async fn test_long_round_trip_updates_balance() {
        let account = PaperAccount::new(dec!(10000), dec!(0.01));

        account
            .submit(intent(IntentKind::Open, Direction::Bullish, 101.0))
            .await
            .unwrap();
        assert_eq!(account.open_instruments(), vec!["BTCUSDT".to_string()]);

        account
            .submit(intent(IntentKind::Close, Direction::Bullish, 105.0))
            .await
            .unwrap();
        assert_eq!(account.balance(), dec!(10200));
        assert!(account.open_instruments().is_empty());
        assert_eq!(account.fills().len(), 2);
        assert_eq!(account.realized_pnl(), 200.0);
    }

    #[tokio::test]
    async fn test_short_loss() {
        let account = PaperAccount::new(dec!(10000), dec!(0.01));
        account
            .submit(intent(IntentKind::Open, Direction::Bearish, 101.0))
            .await
            .unwrap();
        let fill = account
            .apply(&intent(IntentKind::Close, Direction::Bearish, 103.0))
            .unwrap();
        assert_eq!(fill.realized_pnl, Some(dec!(-100)));
        assert_eq!(account.balance(), dec!(9900));
    }

    #[test]
    fn test_snapshot_reports_balance_and_risk() {
        let account = PaperAccount::new(dec!(5000), dec!(0.02));
        let snapshot = account.snapshot("ETHUSDT").unwrap();
        assert_eq!(snapshot.balance, dec!(5000));
        assert_eq!(snapshot.risk_amount(), dec!(100));
    }

    #[test]
    fn test_double_open_and_orphan_close_rejected() {
        let account = PaperAccount::new(dec!(10000), dec!(0.01));
        account
            .apply(&intent(IntentKind::Open, Direction::Bullish, 101.0))
            .unwrap();
        assert!(matches!(
            account.apply(&intent(IntentKind::Open, Direction::Bullish, 101.0)),
            Err(ExecutionError::PositionAlreadyOpen(_))
        ));

        let other = PaperAccount::new(dec!(10000), dec!(0.01));
        assert!(matches!(
            other.apply(&intent(IntentKind::Close, Direction::Bullish, 101.0)),
            Err(ExecutionError::PositionNotFound(_))
        ));
    }

    #[test]
    fn test_slippage_and_commission() {
        let account = PaperAccount::new(dec!(10000), dec!(0.01))
            .with_slippage(dec!(1))
            .with_commission(dec!(0.1));

        let entry = account
            .apply(&intent(IntentKind::Open, Direction::Bullish, 100.0))
            .unwrap();
        assert_eq!(entry.price, dec!(101));
        assert_eq!(entry.commission, dec!(5));
        assert_eq!(account.balance(), dec!(9995));

        let exit = account
            .apply(&intent(IntentKind::Close, Direction::Bullish, 110.0))
            .unwrap();
        assert_eq!(exit.price, dec!(108.9));
        // (108.9 - 101) * 50 - 5 - 5
        assert_eq!(exit.realized_pnl, Some(dec!(385)));
        assert_eq!(account.balance(), dec!(10385));
    }

    #[test]
    fn test_clones_share_state() {
        let account = PaperAccount::new(dec!(10000), dec!(0.01));
        let handle = account.clone();
        handle
            .apply(&intent(IntentKind::Open, Direction::Bullish, 101.0))
            .unwrap();
        assert_eq!(account.open_instruments().len(), 1);
    }
}
