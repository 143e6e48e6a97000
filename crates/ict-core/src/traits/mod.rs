//! Collaborator traits for the ICT engine.

mod account;
mod config;
mod execution;
mod feed;
mod indicator;
mod observer;

pub use account::{AccountProvider, AccountSnapshot};
pub use config::ComponentConfig;
pub use execution::ExecutionSink;
pub use feed::CandleFeed;
pub use indicator::{CandleIndicator, Indicator};
pub use observer::{EventSink, NullEventSink};
