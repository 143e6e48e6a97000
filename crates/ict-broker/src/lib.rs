//! Simulated execution.

mod drawdown;
mod paper;

pub use drawdown::DrawdownScaledAccount;
pub use paper::{PaperAccount, PaperFill};
