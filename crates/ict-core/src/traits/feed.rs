//! Candle feed trait definition.

use crate::error::DataError;
use crate::types::{Candle, Timeframe};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

/// Trait for closed-candle sources.
///
/// Feeds deliver candles in `open_time` order per timeframe. Gaps are passed
/// through as-is; the engine reports them.
#[async_trait]
pub trait CandleFeed: Send + Sync {
    /// Fetch historical candles.
    ///
    /// # Arguments
    /// * `instrument` - The instrument to fetch
    /// * `timeframe` - The candle timeframe
    /// * `start` - Start of the date range (inclusive)
    /// * `end` - End of the date range (inclusive)
    ///
    /// # Returns
    /// A vector of candles ordered from oldest to newest
    async fn history(
        &self,
        instrument: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, DataError>;

    /// Subscribe to closed candles.
    ///
    /// # Returns
    /// A channel receiver yielding (instrument, candle) tuples
    async fn subscribe(
        &self,
        instruments: &[String],
        timeframe: Timeframe,
    ) -> Result<mpsc::Receiver<(String, Candle)>, DataError>;

    /// Get the name of this feed.
    fn name(&self) -> &str;
}
