//! Engine configuration.

use serde::{Deserialize, Serialize};

use ict_core::error::EngineError;
use ict_core::traits::ComponentConfig;
use ict_core::types::Timeframe;
use ict_risk::{PositionConfig, TrailingConfig};
use ict_strategy::{
    BiasConfig, EntryTrigger, FillPolicy, FvgConfig, SessionFilter, SetupConfig, SweepConfig,
};

/// All recognized engine options.
///
/// Risk per trade is not here: it belongs to the account and reaches the
/// engine through the account provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Higher timeframe used for bias
    pub htf: Timeframe,
    /// Lower timeframe used for sweeps, gaps and entries
    pub ltf: Timeframe,
    /// Candles on each side of a swing point
    pub swing_radius: usize,
    pub bias_swing_count: usize,
    pub ma_short_period: usize,
    pub ma_long_period: usize,
    /// Retained swing points per timeframe
    pub swing_capacity: usize,
    pub sweep_confirmation_window: u32,
    /// Retained sweeps (pending, confirmed, expired and recorded)
    pub sweep_history: usize,
    pub min_fvg_size: f64,
    pub min_impulse_body_ratio: f64,
    pub fvg_lookahead: u32,
    pub setup_expiry: u32,
    pub entry_trigger: EntryTrigger,
    pub fill_policy: FillPolicy,
    pub stop_buffer: f64,
    pub risk_reward_ratio: f64,
    /// Session windows gating new setups, e.g. the New York kill zones
    pub session_filter: Option<SessionFilter>,
    pub trail_activation_r: f64,
    pub trail_ratio: f64,
    pub close_on_fvg_fill: bool,
    pub max_position_size: Option<f64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let bias = BiasConfig::default();
        let sweep = SweepConfig::default();
        let fvg = FvgConfig::default();
        let setup = SetupConfig::default();
        let position = PositionConfig::default();
        Self {
            htf: Timeframe::Hour4,
            ltf: Timeframe::Minute15,
            swing_radius: 5,
            bias_swing_count: bias.bias_swing_count,
            ma_short_period: bias.ma_short_period,
            ma_long_period: bias.ma_long_period,
            swing_capacity: 20,
            sweep_confirmation_window: sweep.sweep_confirmation_window,
            sweep_history: 50,
            min_fvg_size: fvg.min_fvg_size,
            min_impulse_body_ratio: fvg.min_impulse_body_ratio,
            fvg_lookahead: fvg.fvg_lookahead,
            setup_expiry: setup.setup_expiry,
            entry_trigger: setup.entry_trigger,
            fill_policy: setup.fill_policy,
            stop_buffer: setup.stop_buffer,
            risk_reward_ratio: setup.risk_reward_ratio,
            session_filter: setup.session_filter,
            trail_activation_r: position.trailing.trail_activation_r,
            trail_ratio: position.trailing.trail_ratio,
            close_on_fvg_fill: position.close_on_fvg_fill,
            max_position_size: position.max_position_size,
        }
    }
}

impl EngineConfig {
    pub fn bias(&self) -> BiasConfig {
        BiasConfig {
            bias_swing_count: self.bias_swing_count,
            ma_short_period: self.ma_short_period,
            ma_long_period: self.ma_long_period,
        }
    }

    pub fn sweep(&self) -> SweepConfig {
        SweepConfig {
            sweep_confirmation_window: self.sweep_confirmation_window,
        }
    }

    pub fn fvg(&self) -> FvgConfig {
        FvgConfig {
            min_fvg_size: self.min_fvg_size,
            min_impulse_body_ratio: self.min_impulse_body_ratio,
            fvg_lookahead: self.fvg_lookahead,
        }
    }

    pub fn setup(&self) -> SetupConfig {
        SetupConfig {
            setup_expiry: self.setup_expiry,
            entry_trigger: self.entry_trigger,
            fill_policy: self.fill_policy,
            stop_buffer: self.stop_buffer,
            risk_reward_ratio: self.risk_reward_ratio,
            session_filter: self.session_filter.clone(),
        }
    }

    pub fn position(&self) -> PositionConfig {
        PositionConfig {
            trailing: TrailingConfig {
                trail_activation_r: self.trail_activation_r,
                trail_ratio: self.trail_ratio,
            },
            close_on_fvg_fill: self.close_on_fvg_fill,
            max_position_size: self.max_position_size,
        }
    }
}

impl ComponentConfig for EngineConfig {
    fn validate(&self) -> Result<(), EngineError> {
        if self.htf <= self.ltf {
            return Err(EngineError::InvalidConfig(format!(
                "htf ({}) must be a longer timeframe than ltf ({})",
                self.htf, self.ltf
            )));
        }
        if self.swing_radius == 0 {
            return Err(EngineError::InvalidConfig(
                "swing_radius must be greater than 0".into(),
            ));
        }
        if self.swing_capacity < self.bias_swing_count {
            return Err(EngineError::InvalidConfig(
                "swing_capacity must hold at least bias_swing_count points".into(),
            ));
        }
        // Each candle can add at most two sweeps while a scan runs
        let min_history = 2 * self.fvg_lookahead as usize + 1;
        if self.sweep_history < min_history {
            return Err(EngineError::InvalidConfig(format!(
                "sweep_history must be at least {} for fvg_lookahead {}",
                min_history, self.fvg_lookahead
            )));
        }

        self.bias().validate()?;
        self.sweep().validate()?;
        self.fvg().validate()?;
        self.setup().validate()?;
        self.position().validate()?;
        Ok(())
    }
}
