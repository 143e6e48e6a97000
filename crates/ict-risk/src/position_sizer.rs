//! Risk-based position sizing.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ict_core::error::ExecutionError;
use ict_core::traits::AccountSnapshot;

/// Result of a sizing decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSize {
    /// Quantity in base units
    pub size: f64,
    /// Account currency at risk if the stop is hit
    pub risk_amount: f64,
}

/// Sizes positions so that a stop-out loses a fixed fraction of the balance.
#[derive(Debug, Clone, Default)]
pub struct PositionSizer {
    max_size: Option<f64>,
}

impl PositionSizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the quantity of any single position.
    pub fn with_max_size(mut self, max: f64) -> Self {
        self.max_size = Some(max);
        self
    }

    /// `size = balance × risk_per_trade / |entry − stop|`.
    pub fn calculate(
        &self,
        snapshot: &AccountSnapshot,
        entry_price: f64,
        stop_price: f64,
    ) -> Result<PositionSize, ExecutionError> {
        let risk = snapshot.risk_amount();
        if risk <= Decimal::ZERO {
            return Err(ExecutionError::Rejected(format!(
                "no risk budget (balance {}, risk per trade {})",
                snapshot.balance, snapshot.risk_per_trade
            )));
        }
        let risk_amount = risk
            .to_f64()
            .ok_or_else(|| ExecutionError::Rejected(format!("risk amount {} out of range", risk)))?;

        let distance = (entry_price - stop_price).abs();
        if !distance.is_finite() || distance <= 0.0 {
            return Err(ExecutionError::Rejected(format!(
                "zero stop distance (entry {}, stop {})",
                entry_price, stop_price
            )));
        }

        let mut size = risk_amount / distance;
        let mut risk_amount = risk_amount;
        if let Some(max) = self.max_size {
            if size > max {
                size = max;
                risk_amount = size * distance;
            }
        }

        Ok(PositionSize { size, risk_amount })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot(balance: Decimal, risk: Decimal) -> AccountSnapshot {
        AccountSnapshot {
            balance,
            risk_per_trade: risk,
        }
    }

    #[test]
    fn test_risk_based() {
        let sizer = PositionSizer::new();
        // Risk 1% = 100, stop 2 away = 50 units
        let sized = sizer
            .calculate(&snapshot(dec!(10000), dec!(0.01)), 101.0, 99.0)
            .unwrap();
        assert!((sized.size - 50.0).abs() < 1e-9);
        assert!((sized.size * 2.0 - sized.risk_amount).abs() < 1e-9);
    }

    #[test]
    fn test_short_uses_absolute_distance() {
        let sizer = PositionSizer::new();
        let sized = sizer
            .calculate(&snapshot(dec!(10000), dec!(0.01)), 99.0, 101.5)
            .unwrap();
        assert!((sized.size - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_risk_rejected() {
        let sizer = PositionSizer::new();
        assert!(sizer.calculate(&snapshot(dec!(0), dec!(0.01)), 101.0, 99.0).is_err());
        assert!(sizer.calculate(&snapshot(dec!(10000), dec!(0)), 101.0, 99.0).is_err());
    }

    #[test]
    fn test_zero_distance_rejected() {
        let sizer = PositionSizer::new();
        assert!(sizer.calculate(&snapshot(dec!(10000), dec!(0.01)), 100.0, 100.0).is_err());
    }

    #[test]
    fn test_max_size_limit() {
        let sizer = PositionSizer::new().with_max_size(10.0);
        let sized = sizer
            .calculate(&snapshot(dec!(10000), dec!(0.01)), 101.0, 99.0)
            .unwrap();
        assert_eq!(sized.size, 10.0);
        assert!((sized.risk_amount - 20.0).abs() < 1e-9);
    }
}
