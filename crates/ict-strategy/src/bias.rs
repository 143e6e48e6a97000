//! Higher-timeframe market bias.
//!
//! Swing structure decides first: two or more highs and two or more lows
//! that are all rising (higher highs, higher lows) give BULLISH, all falling
//! give BEARISH. A mixed pattern or too few swings falls back to the short
//! vs long SMA of HTF closes together with the slope of the short SMA.

use serde::{Deserialize, Serialize};
use tracing::debug;

use ict_core::error::EngineError;
use ict_core::traits::ComponentConfig;
use ict_core::types::{BiasAssessment, BiasDerivation, MarketBias, SwingKind, SwingPoint};
use ict_indicators::Sma;

/// Configuration for the bias classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BiasConfig {
    /// Number of most recent HTF swing points examined
    pub bias_swing_count: usize,
    /// Short SMA period for the fallback
    pub ma_short_period: usize,
    /// Long SMA period for the fallback
    pub ma_long_period: usize,
}

impl Default for BiasConfig {
    fn default() -> Self {
        Self {
            bias_swing_count: 4,
            ma_short_period: 20,
            ma_long_period: 50,
        }
    }
}

impl ComponentConfig for BiasConfig {
    fn validate(&self) -> Result<(), EngineError> {
        if self.bias_swing_count < 4 {
            return Err(EngineError::InvalidConfig(
                "bias_swing_count must be at least 4 (two highs and two lows)".into(),
            ));
        }
        if self.ma_short_period == 0 {
            return Err(EngineError::InvalidConfig(
                "ma_short_period must be greater than 0".into(),
            ));
        }
        if self.ma_short_period >= self.ma_long_period {
            return Err(EngineError::InvalidConfig(
                "ma_short_period must be less than ma_long_period".into(),
            ));
        }
        Ok(())
    }
}

/// Stateless bias classifier.
#[derive(Debug, Clone)]
pub struct BiasClassifier {
    config: BiasConfig,
    short: Sma,
    long: Sma,
}

impl BiasClassifier {
    /// Create a classifier. The config must have been validated.
    pub fn new(config: BiasConfig) -> Self {
        let short = Sma::new(config.ma_short_period.max(1));
        let long = Sma::new(config.ma_long_period.max(1));
        Self {
            config,
            short,
            long,
        }
    }

    pub fn config(&self) -> &BiasConfig {
        &self.config
    }

    /// Number of HTF closes the fallback needs for a full answer
    /// (long SMA plus one close for the short slope).
    pub fn closes_required(&self) -> usize {
        self.config.ma_long_period.max(self.config.ma_short_period + 1)
    }

    /// Classify from the retained swing window and HTF closes.
    ///
    /// Only the last `bias_swing_count` swings are considered. The result
    /// does not depend on the order the swings are passed in.
    pub fn classify(&self, swings: &[SwingPoint], closes: &[f64], derived_at: i64) -> BiasAssessment {
        let mut window: Vec<SwingPoint> = swings.to_vec();
        window.sort_by_key(|p| (p.index, p.kind == SwingKind::Low));
        let skip = window.len().saturating_sub(self.config.bias_swing_count);
        let window: Vec<SwingPoint> = window.into_iter().skip(skip).collect();

        if let Some(bias) = structure_bias(&window) {
            debug!(%bias, swings = window.len(), "Swing-based bias");
            return BiasAssessment {
                bias,
                derivation: BiasDerivation::SwingBased,
                derived_at,
                swings: window,
            };
        }

        let short_ma = self.short.latest(closes);
        let long_ma = self.long.latest(closes);
        let prev_short = self.short.previous(closes);

        let bias = match (short_ma, long_ma, prev_short) {
            (Some(s), Some(l), Some(p)) if s > l && s > p => MarketBias::Bullish,
            (Some(s), Some(l), Some(p)) if s < l && s < p => MarketBias::Bearish,
            _ => MarketBias::Neutral,
        };
        debug!(%bias, ?short_ma, ?long_ma, closes = closes.len(), "Moving-average bias");

        BiasAssessment {
            bias,
            derivation: BiasDerivation::MovingAverageBased { short_ma, long_ma },
            derived_at,
            swings: window,
        }
    }
}

/// HH/HL or LH/LL classification, `None` when too few swings or mixed.
fn structure_bias(window: &[SwingPoint]) -> Option<MarketBias> {
    let highs: Vec<f64> = window
        .iter()
        .filter(|p| p.kind == SwingKind::High)
        .map(|p| p.price)
        .collect();
    let lows: Vec<f64> = window
        .iter()
        .filter(|p| p.kind == SwingKind::Low)
        .map(|p| p.price)
        .collect();

    if highs.len() < 2 || lows.len() < 2 {
        return None;
    }

    let rising = |v: &[f64]| v.windows(2).all(|w| w[1] > w[0]);
    let falling = |v: &[f64]| v.windows(2).all(|w| w[1] < w[0]);

    if rising(&highs) && rising(&lows) {
        Some(MarketBias::Bullish)
    } else if falling(&highs) && falling(&lows) {
        Some(MarketBias::Bearish)
    } else {
        None
    }
}
