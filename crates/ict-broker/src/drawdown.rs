//! Account provider that scales risk per trade by drawdown.

use std::sync::Mutex;
use tracing::debug;

use ict_core::error::ExecutionError;
use ict_core::traits::{AccountProvider, AccountSnapshot};
use ict_risk::{DrawdownConfig, DrawdownTracker};

/// Wraps an account provider and replaces its risk per trade with the
/// drawdown-adjusted fraction.
///
/// Equity is observed at each snapshot, so peaks follow the balance as seen
/// at entry decisions.
#[derive(Debug)]
pub struct DrawdownScaledAccount<A> {
    inner: A,
    tracker: Mutex<DrawdownTracker>,
}

impl<A: AccountProvider> DrawdownScaledAccount<A> {
    pub fn new(inner: A, config: DrawdownConfig) -> Self {
        Self {
            inner,
            tracker: Mutex::new(DrawdownTracker::new(config)),
        }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }
}

impl<A: AccountProvider> AccountProvider for DrawdownScaledAccount<A> {
    fn snapshot(&self, instrument: &str) -> Result<AccountSnapshot, ExecutionError> {
        let snapshot = self.inner.snapshot(instrument)?;
        let mut tracker = self
            .tracker
            .lock()
            .map_err(|_| ExecutionError::Internal("drawdown tracker lock poisoned".into()))?;

        let risk_per_trade = tracker.next_risk(snapshot.balance);
        debug!(
            instrument,
            balance = %snapshot.balance,
            drawdown = %tracker.drawdown(snapshot.balance),
            risk = %risk_per_trade,
            "Drawdown-scaled risk"
        );

        Ok(AccountSnapshot {
            risk_per_trade,
            ..snapshot
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PaperAccount;
    use ict_core::types::{Direction, ExecutionIntent, ExitReason, IntentKind};
    use rust_decimal_macros::dec;

    fn intent(kind: IntentKind, price: f64, time: i64) -> ExecutionIntent {
        ExecutionIntent {
            instrument: "BTCUSDT".to_string(),
            kind,
            direction: Direction::Bullish,
            size: 10.0,
            price,
            stop: 90.0,
            target: 120.0,
            exit_reason: (kind == IntentKind::Close).then_some(ExitReason::StopLoss),
            time,
        }
    }

    #[test]
    fn test_losses_shrink_risk() {
        let account = PaperAccount::new(dec!(10000), dec!(0.01));
        let scaled = DrawdownScaledAccount::new(account.clone(), DrawdownConfig::default());

        let first = scaled.snapshot("BTCUSDT").unwrap();
        assert_eq!(first.balance, dec!(10000));
        assert_eq!(first.risk_per_trade, dec!(0.005));

        // Lose 200 on a long of 10 from 100 to 80
        account.apply(&intent(IntentKind::Open, 100.0, 0)).unwrap();
        account.apply(&intent(IntentKind::Close, 80.0, 1)).unwrap();

        let second = scaled.snapshot("BTCUSDT").unwrap();
        assert_eq!(second.balance, dec!(9800));
        assert_eq!(second.risk_per_trade, dec!(0.003));
    }

    #[test]
    fn test_inner_errors_pass_through() {
        struct Closed;
        impl AccountProvider for Closed {
            fn snapshot(&self, instrument: &str) -> Result<AccountSnapshot, ExecutionError> {
                Err(ExecutionError::Rejected(format!("{} closed", instrument)))
            }
        }

        let scaled = DrawdownScaledAccount::new(Closed, DrawdownConfig::default());
        assert!(matches!(scaled.snapshot("BTCUSDT"), Err(ExecutionError::Rejected(_))));
    }
}
