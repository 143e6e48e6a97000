//! Account provider trait.

use crate::error::ExecutionError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Balance and risk settings at the moment of a sizing decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Account balance in quote currency
    pub balance: Decimal,
    /// Fraction of the balance risked per trade (0.01 = 1%)
    pub risk_per_trade: Decimal,
}

impl AccountSnapshot {
    /// Currency amount at risk for one trade.
    pub fn risk_amount(&self) -> Decimal {
        self.balance * self.risk_per_trade
    }
}

/// Synchronous account view used for position sizing.
///
/// Implementations must not block on I/O; the engine calls this inline while
/// processing a candle.
pub trait AccountProvider: Send + Sync {
    fn snapshot(&self, instrument: &str) -> Result<AccountSnapshot, ExecutionError>;
}
