//! Configuration management.

mod settings;

pub use settings::{AccountSettings, AppConfig, AppSettings, BacktestSettings, LoggingConfig, PaperSettings};

use config::{Config, ConfigError, Environment, File};
use std::path::Path;

/// Environment variable prefix, e.g. `ICT__ENGINE__MIN_FVG_SIZE`.
pub const ENV_PREFIX: &str = "ICT";

/// Load configuration from an optional TOML file layered with environment
/// variables.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }

    let config = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ict_core::types::Timeframe;
    use std::io::Write;

    fn write_toml(name: &str, body: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("ict-config-{}-{}.toml", std::process::id(), name));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_partial_file() {
        let path = write_toml(
            "partial",
            r#"
[engine]
htf = "1h"
ltf = "5m"
risk_reward_ratio = 3.0
entry_trigger = "rejection"

[account]
initial_balance = 25000
"#,
        );
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.engine.htf, Timeframe::Hour1);
        assert_eq!(config.engine.ltf, Timeframe::Minute5);
        assert_eq!(config.engine.risk_reward_ratio, 3.0);
        assert_eq!(config.engine.swing_radius, 5);
        assert_eq!(config.account.initial_balance, rust_decimal_macros::dec!(25000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_environment_overrides_file() {
        let path = write_toml("env", "[engine]\nsetup_expiry = 12\n");
        std::env::set_var("ICT__ENGINE__SETUP_EXPIRY", "7");
        let config = load_config(Some(&path));
        std::env::remove_var("ICT__ENGINE__SETUP_EXPIRY");
        assert_eq!(config.unwrap().engine.setup_expiry, 7);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load_config(Some(Path::new("/nonexistent/ict.toml"))).is_err());
    }
}
