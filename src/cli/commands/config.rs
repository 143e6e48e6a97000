//! Configuration commands.

use anyhow::Result;
use std::path::Path;

use ict_config::AppConfig;

use crate::cli::ShowConfigArgs;

pub async fn validate(config: &AppConfig, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => println!("Validating configuration: {}", path.display()),
        None => println!("Validating built-in defaults with environment overrides"),
    }

    if let Err(e) = config.validate() {
        println!("Configuration error: {}", e);
        return Err(e.into());
    }

    let engine = &config.engine;
    println!("Configuration is valid!");
    println!();
    println!("App:                 {}", config.app.name);
    println!("Environment:         {}", config.app.environment);
    println!("Log level:           {}", config.logging.level);
    println!("Timeframes:          {} / {}", engine.htf, engine.ltf);
    println!("Swing radius:        {}", engine.swing_radius);
    println!("Entry trigger:       {:?}", engine.entry_trigger);
    println!("Risk/reward:         {}", engine.risk_reward_ratio);
    println!("Initial balance:     {}", config.account.initial_balance);
    println!("Risk per trade:      {}", config.account.risk_per_trade);

    Ok(())
}

pub async fn show(config: &AppConfig, args: ShowConfigArgs) -> Result<()> {
    let text = if args.resolved {
        toml::to_string_pretty(config)?
    } else {
        toml::to_string_pretty(&AppConfig::default())?
    };
    println!("{}", text);
    Ok(())
}
