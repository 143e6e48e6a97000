//! Configuration structures.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use ict_core::error::{EngineError, IctError};
use ict_core::traits::ComponentConfig;
use ict_engine::EngineConfig;
use ict_risk::DrawdownConfig;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub account: AccountSettings,
    #[serde(default)]
    pub backtest: BacktestSettings,
    #[serde(default)]
    pub paper: PaperSettings,
}

impl AppConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), IctError> {
        self.engine.validate()?;
        self.account.validate()?;
        if self.backtest.slippage_pct < Decimal::ZERO || self.backtest.commission < Decimal::ZERO {
            return Err(IctError::Config(
                "backtest slippage and commission must not be negative".into(),
            ));
        }
        Ok(())
    }
}

/// General app settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "ict-engine".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
    /// Directory for daily-rolling JSON log files
    pub dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            dir: None,
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

/// Account settings handed to the engine through the account provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountSettings {
    pub initial_balance: Decimal,
    /// Fraction of balance risked per trade, e.g. 0.01
    pub risk_per_trade: Decimal,
    /// Replace the fixed risk per trade with a drawdown-scaled fraction
    pub drawdown: Option<DrawdownConfig>,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            initial_balance: dec!(10000),
            risk_per_trade: dec!(0.01),
            drawdown: None,
        }
    }
}

impl ComponentConfig for AccountSettings {
    fn validate(&self) -> Result<(), EngineError> {
        if self.initial_balance <= Decimal::ZERO {
            return Err(EngineError::InvalidConfig(
                "initial_balance must be positive".into(),
            ));
        }
        if self.risk_per_trade <= Decimal::ZERO || self.risk_per_trade > Decimal::ONE {
            return Err(EngineError::InvalidConfig(
                "risk_per_trade must be in (0, 1]".into(),
            ));
        }
        if let Some(drawdown) = &self.drawdown {
            drawdown.validate()?;
        }
        Ok(())
    }
}

/// Backtest settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSettings {
    /// Commission per unit of size, each leg
    pub commission: Decimal,
    pub slippage_pct: Decimal,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            commission: Decimal::ZERO,
            slippage_pct: Decimal::ZERO,
        }
    }
}

/// Paper streaming settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperSettings {
    /// Pause between replayed candles
    pub replay_delay_ms: u64,
    pub channel_capacity: usize,
}

impl Default for PaperSettings {
    fn default() -> Self {
        Self {
            replay_delay_ms: 0,
            channel_capacity: 256,
        }
    }
}
