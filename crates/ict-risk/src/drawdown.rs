//! Drawdown-adaptive risk per trade.
//!
//! The risk fraction shrinks while equity is below its peak and grows with
//! the size of the last new high. With `base = max_drawdown / drawdown_factor`:
//!
//! - below the peak by `dd`: `(max_drawdown - dd) / drawdown_factor`,
//!   rounded to four places and floored at `base / 50`
//! - at the peak: `base + drawup / drawup_factor`, capped at `max_drawdown`,
//!   where `drawup` is the gain of the current peak over the previous one

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ict_core::error::EngineError;
use ict_core::traits::ComponentConfig;

/// Drawdown scaling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawdownConfig {
    /// Drawdown the account is allowed to reach, as a fraction of the peak
    pub max_drawdown: Decimal,
    pub drawdown_factor: Decimal,
    pub drawup_factor: Decimal,
}

impl Default for DrawdownConfig {
    fn default() -> Self {
        Self {
            max_drawdown: Decimal::new(5, 2),
            drawdown_factor: Decimal::from(10),
            drawup_factor: Decimal::from(5),
        }
    }
}

impl DrawdownConfig {
    /// Risk fraction at a peak with no recent gain.
    pub fn base_risk(&self) -> Decimal {
        self.max_drawdown / self.drawdown_factor
    }

    fn min_risk(&self) -> Decimal {
        self.base_risk() / Decimal::from(50)
    }
}

impl ComponentConfig for DrawdownConfig {
    fn validate(&self) -> Result<(), EngineError> {
        if self.max_drawdown <= Decimal::ZERO || self.max_drawdown >= Decimal::ONE {
            return Err(EngineError::InvalidConfig(
                "max_drawdown must be in (0, 1)".into(),
            ));
        }
        if self.drawdown_factor <= Decimal::ZERO || self.drawup_factor <= Decimal::ZERO {
            return Err(EngineError::InvalidConfig(
                "drawdown_factor and drawup_factor must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Tracks equity peaks and derives the next trade's risk fraction.
#[derive(Debug, Clone)]
pub struct DrawdownTracker {
    config: DrawdownConfig,
    peak: Option<Decimal>,
    previous_peak: Option<Decimal>,
}

impl DrawdownTracker {
    pub fn new(config: DrawdownConfig) -> Self {
        Self {
            config,
            peak: None,
            previous_peak: None,
        }
    }

    pub fn config(&self) -> &DrawdownConfig {
        &self.config
    }

    pub fn peak(&self) -> Option<Decimal> {
        self.peak
    }

    /// Record an equity observation.
    pub fn observe(&mut self, equity: Decimal) {
        match self.peak {
            None => {
                self.peak = Some(equity);
                self.previous_peak = Some(equity);
            }
            Some(peak) if equity > peak => {
                self.previous_peak = Some(peak);
                self.peak = Some(equity);
            }
            Some(_) => {}
        }
    }

    /// Fraction of the peak lost at `equity`. Zero at or above the peak.
    pub fn drawdown(&self, equity: Decimal) -> Decimal {
        match self.peak {
            Some(peak) if peak > Decimal::ZERO && equity < peak => (peak - equity) / peak,
            _ => Decimal::ZERO,
        }
    }

    /// Risk fraction for a trade taken at `equity`.
    pub fn risk_fraction(&self, equity: Decimal) -> Decimal {
        let Some(peak) = self.peak.filter(|p| *p > Decimal::ZERO) else {
            return self.config.base_risk();
        };

        if equity < peak {
            let remaining = self.config.max_drawdown - self.drawdown(equity);
            (remaining / self.config.drawdown_factor)
                .round_dp(4)
                .max(self.config.min_risk())
        } else {
            let previous = self
                .previous_peak
                .filter(|p| *p > Decimal::ZERO)
                .unwrap_or(peak);
            let drawup = (peak - previous) / previous;
            (self.config.base_risk() + drawup / self.config.drawup_factor).min(self.config.max_drawdown)
        }
    }

    /// Observe `equity` and return the risk fraction for the next trade.
    pub fn next_risk(&mut self, equity: Decimal) -> Decimal {
        self.observe(equity);
        self.risk_fraction(equity)
    }

    pub fn reset(&mut self) {
        self.peak = None;
        self.previous_peak = None;
    }
}
